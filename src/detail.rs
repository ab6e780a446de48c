/// Product detail normalization for the info modal
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::product::{format_long_date, parse_timestamp};

/// Smallest side, in pixels, for an image worth showing
const MIN_IMAGE_SIDE: f64 = 300.0;

#[derive(Debug, Clone, Default)]
struct RawDetail {
    name: Option<String>,
    asin: Option<String>,
    brand: Option<String>,
    stage: Option<String>,
    removed: Option<Value>,
    report: Option<RawReport>,
    description: Option<String>,
    reasons: Vec<String>,
    images: Vec<RawImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawReport {
    date: Option<Value>,
}

#[derive(Debug, Clone, Default)]
struct RawImage {
    variant: Option<String>,
    width: f64,
    height: f64,
    link: Option<String>,
}

impl RawImage {
    fn from_value(value: &Value) -> Option<RawImage> {
        let text = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        let side = |name: &str| value.get(name).and_then(Value::as_f64).unwrap_or_default();
        value.is_object().then(|| RawImage {
            variant: text("variant"),
            width: side("width"),
            height: side("height"),
            link: text("link"),
        })
    }

    fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Main product image picked for the modal
#[derive(Debug, Clone, PartialEq)]
pub struct DetailImage {
    pub src: String,
    pub alt: String,
}

/// Display-ready product details
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub title: String,
    pub image: Option<DetailImage>,
    pub asin: String,
    pub brand: String,
    pub stage: Option<String>,
    pub removed_on: Option<String>,
    pub reported_on: Option<String>,
    pub description: String,
    pub reasons: Vec<String>,
}

impl DetailView {
    /// Normalize a `/full` response, either `{product: {...}}` or the bare record.
    ///
    /// Fields with unexpected types are treated as missing rather than failing
    /// the whole modal.
    pub fn from_response(response: &Value) -> DetailView {
        let product = match response.get("product") {
            Some(inner) if inner.is_object() => inner,
            _ => response,
        };
        let raw = lenient_detail(product);

        let image = pick_main_image(&raw.images).map(|img| DetailImage {
            src: img.link.clone().unwrap_or_default(),
            alt: raw.name.clone().unwrap_or_else(|| "Product".to_string()),
        });

        DetailView {
            title: non_empty(raw.name).unwrap_or_else(|| "Product Details".to_string()),
            image,
            asin: non_empty(raw.asin).unwrap_or_else(|| "N/A".to_string()),
            brand: non_empty(raw.brand).unwrap_or_else(|| "N/A".to_string()),
            stage: non_empty(raw.stage),
            removed_on: raw.removed.as_ref().and_then(describe_date),
            reported_on: raw.report.and_then(|r| r.date).as_ref().and_then(describe_date),
            description: non_empty(raw.description)
                .unwrap_or_else(|| "No description available".to_string()),
            reasons: raw.reasons,
        }
    }
}

/// Deserialize field by field so one bad field does not hide the others.
/// List fields are read entry by entry for the same reason.
fn lenient_detail(product: &Value) -> RawDetail {
    RawDetail {
        name: field_as(product, "name"),
        asin: field_as(product, "asin"),
        brand: field_as(product, "brand"),
        stage: field_as(product, "stage"),
        removed: product.get("removed").cloned(),
        report: field_as(product, "report"),
        description: field_as(product, "description"),
        reasons: list_of(product, "reasons", |reason| match reason {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }),
        images: list_of(product, "images", RawImage::from_value),
    }
}

fn list_of<T>(product: &Value, name: &str, entry: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    product
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(entry).collect())
        .unwrap_or_default()
}

fn field_as<T: DeserializeOwned>(product: &Value, name: &str) -> Option<T> {
    product
        .get(name)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
}

/// Largest `MAIN` variant with both sides at least [`MIN_IMAGE_SIDE`]
fn pick_main_image(images: &[RawImage]) -> Option<&RawImage> {
    images
        .iter()
        .filter(|img| img.variant.as_deref() == Some("MAIN"))
        .filter(|img| img.width >= MIN_IMAGE_SIDE && img.height >= MIN_IMAGE_SIDE)
        .filter(|img| img.link.as_deref().is_some_and(|l| !l.is_empty()))
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Format a date field, keeping the raw text when it does not parse.
fn describe_date(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(
            parse_timestamp(s)
                .map(|d| format_long_date(&d))
                .unwrap_or_else(|| s.clone()),
        ),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| parse_timestamp(&ms.to_string()))
            .map(|d| format_long_date(&d)),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
