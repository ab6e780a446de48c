/// ASIN extraction from Amazon product links
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::ExtractError;

static DP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/dp/([A-Z0-9]{10})").expect("valid /dp/ pattern"));
static GP_PRODUCT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/gp/product/([A-Z0-9]{10})").expect("valid /gp/product/ pattern"));
static URL_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url=([^&]+)").expect("valid url= pattern"));
static DATA_ASIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data-asin=([A-Z0-9]{10})").expect("valid data-asin pattern"));

/// Storefront used for clean product links.
pub const STOREFRONT: &str = "https://www.amazon.de";

/// Extract the canonical ASIN from a product link
///
/// Rules, first match wins:
/// 1. `/dp/<ASIN>`
/// 2. `/gp/product/<ASIN>`
/// 3. sponsored redirect (`/sspa/click`) whose percent-decoded `url=` parameter has `/dp/<ASIN>`
/// 4. a literal `data-asin=<ASIN>` fragment
///
/// An ASIN is exactly ten characters from `[A-Z0-9]`.
///
/// Examples:
/// - https://www.amazon.de/Some-Product/dp/B0DFPV89L3/ref=sr_1_1 → B0DFPV89L3
/// - https://www.amazon.de/gp/product/B07XJ8C8F5 → B07XJ8C8F5
/// - https://www.amazon.de/sspa/click?ie=UTF8&url=%2FWidget%2Fdp%2FB0C1234567%2Fref → B0C1234567
///
/// Malformed input is logged and yields `None`; callers fall back to the
/// `data-asin` attribute of the product card.
pub fn extract_asin(url: &str) -> Option<String> {
    match try_extract_asin(url) {
        Ok(asin) => asin,
        Err(e) => {
            log::warn!("Error extracting ASIN from {}: {}", url, e);
            None
        }
    }
}

fn try_extract_asin(url: &str) -> Result<Option<String>, ExtractError> {
    if let Some(asin) = first_capture(&DP_PATH, url) {
        return Ok(Some(asin));
    }

    if let Some(asin) = first_capture(&GP_PRODUCT_PATH, url) {
        return Ok(Some(asin));
    }

    if url.contains("/sspa/click") {
        if let Some(encoded) = first_capture(&URL_PARAM, url) {
            let decoded = percent_decode_str(&encoded).decode_utf8()?;
            if let Some(asin) = first_capture(&DP_PATH, &decoded) {
                return Ok(Some(asin));
            }
        }
    }

    Ok(first_capture(&DATA_ASIN, url))
}

fn first_capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Direct product page for an ASIN, free of tracking parameters
pub fn canonical_product_url(asin: &str) -> String {
    format!("{}/dp/{}", STOREFRONT, asin)
}
