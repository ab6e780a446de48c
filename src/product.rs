/// Product data structures shared by the scanner, classifier and button views
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product card resolved to its canonical ASIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub asin: String,
    pub source_url: String,
}

impl ProductRef {
    pub fn new(asin: String, source_url: String) -> ProductRef {
        ProductRef { asin, source_url }
    }
}

/// Tracking status shown on a product button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Unreported,
    Staged,
    ToAssess,
    Reported,
    NeedsUpdate,
    Removed,
}

impl ProductStatus {
    /// Parse a status name as the tracking service spells it
    pub fn from_wire(name: &str) -> Option<ProductStatus> {
        match name {
            "unreported" => Some(ProductStatus::Unreported),
            "staged" => Some(ProductStatus::Staged),
            "to_assess" => Some(ProductStatus::ToAssess),
            "reported" => Some(ProductStatus::Reported),
            "needs_update" => Some(ProductStatus::NeedsUpdate),
            "removed" => Some(ProductStatus::Removed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Unreported => "unreported",
            ProductStatus::Staged => "staged",
            ProductStatus::ToAssess => "to_assess",
            ProductStatus::Reported => "reported",
            ProductStatus::NeedsUpdate => "needs_update",
            ProductStatus::Removed => "removed",
        }
    }

    /// Whether the tracking service knows about the product
    pub fn is_tracked(&self) -> bool {
        !matches!(self, ProductStatus::Unreported)
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a timestamp as the tracking service sends it.
///
/// Accepts RFC 3339, a zone-less date-time or bare date (read as UTC),
/// and epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// German short date, e.g. `01.01.2024`
pub fn format_short_date(date: &DateTime<Utc>) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// German date and time, e.g. `01.01.2024, 13:05:00`
pub fn format_long_date(date: &DateTime<Utc>) -> String {
    date.format("%d.%m.%Y, %H:%M:%S").to_string()
}
