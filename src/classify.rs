//! Normalization of tracking-service responses into [`ProductStatus`].
//!
//! The service's record shape has drifted over time: a `status` string may be
//! stale, identifiers appear under several names and dates under two. The
//! rules here run once, right after a fetch, so everything downstream only
//! sees the closed status set.

use serde_json::{Map, Value};

use crate::product::ProductStatus;

/// Field names the service has used for the record identifier.
const ID_FIELDS: [&str; 3] = ["productId", "_id", "id"];

/// A loosely-typed product record from the tracking service.
///
/// Field presence follows JavaScript truthiness: `null`, `false`, `0` and the
/// empty string count as absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteProductRecord {
    fields: Map<String, Value>,
}

impl RemoteProductRecord {
    /// Wrap a decoded body. Anything other than a JSON object is not a record.
    pub fn from_value(value: Value) -> Option<RemoteProductRecord> {
        match value {
            Value::Object(fields) => Some(RemoteProductRecord { fields }),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| is_truthy(v))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn success(&self) -> bool {
        self.field("success").is_some()
    }

    pub fn status(&self) -> Option<&str> {
        self.text("status")
    }

    pub fn stage(&self) -> Option<&str> {
        self.text("stage")
    }

    pub fn is_removed(&self) -> bool {
        self.field("removed").is_some()
    }

    /// Identifier under whichever name the service used, `productId` first.
    pub fn record_id(&self) -> Option<String> {
        ID_FIELDS
            .iter()
            .find_map(|name| self.field(name))
            .map(value_to_string)
    }

    pub fn report_date(&self) -> Option<String> {
        self.field("reportDate").map(value_to_string)
    }

    /// `reportDate`, falling back to `createdAt`.
    pub fn report_or_created_date(&self) -> Option<String> {
        self.report_date()
            .or_else(|| self.field("createdAt").map(value_to_string))
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result of a status lookup. A 404 is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(RemoteProductRecord),
    NotFound,
}

/// Status plus the opaque metadata the button needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: ProductStatus,
    pub date: Option<String>,
    pub record_id: Option<String>,
}

impl StatusReport {
    fn new(status: ProductStatus, date: Option<String>, record_id: Option<String>) -> StatusReport {
        StatusReport {
            status,
            date,
            record_id,
        }
    }
}

/// What to do with a looked-up product.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Render this status.
    Show(StatusReport),
    /// The service says removed, but the card is on the page: reset it.
    /// `prior` is the stage or status the record carried.
    RemovedButLive { prior: Option<String> },
}

impl Verdict {
    /// Lookup failed; let the user report.
    pub fn fail_open() -> Verdict {
        Verdict::Show(StatusReport::new(ProductStatus::Unreported, None, None))
    }
}

/// Classify a lookup result. Rule order matters: presence of an identifier
/// outranks a `status` string that may be stale.
pub fn classify(lookup: &Lookup) -> Verdict {
    let record = match lookup {
        Lookup::NotFound => return Verdict::fail_open(),
        Lookup::Found(record) => record,
    };
    let record_id = record.record_id();

    if record.success() && record.field("status").is_some() {
        let status = record.status();
        if status == Some("removed") || record.is_removed() {
            return Verdict::RemovedButLive {
                prior: record.stage().or(status).map(str::to_string),
            };
        }
        if status == Some("staged") {
            return show(ProductStatus::Staged, record.report_or_created_date(), record_id);
        }
        if status == Some("unknown") && record_id.is_some() {
            return show(ProductStatus::ToAssess, record.report_or_created_date(), record_id);
        }
        if record_id.is_some() {
            return show(ProductStatus::Reported, record.report_or_created_date(), record_id);
        }
        if status == Some("reported") {
            return show(ProductStatus::Reported, record.report_date(), None);
        }
        log::debug!(
            "Record with unhandled status {:?}, treating as unreported",
            record.field("status")
        );
        return Verdict::fail_open();
    }

    if record_id.is_some() {
        return show(ProductStatus::Reported, record.report_or_created_date(), record_id);
    }

    log::debug!(
        "Unrecognized record shape (fields: {}), treating as unreported",
        record.field_names().join(", ")
    );
    Verdict::fail_open()
}

fn show(status: ProductStatus, date: Option<String>, record_id: Option<String>) -> Verdict {
    Verdict::Show(StatusReport::new(status, date, record_id))
}

/// Answer to a report (add) request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    AlreadyReported { report_date: Option<String> },
    Removed,
    Staged,
}

impl ReportOutcome {
    /// `None` when the body carries neither `success` nor `status`.
    pub fn from_record(record: &RemoteProductRecord) -> Option<ReportOutcome> {
        if !record.success() && record.status().is_none() {
            return None;
        }
        Some(match record.status() {
            Some("already_reported") | Some("already_exists") => ReportOutcome::AlreadyReported {
                report_date: record.report_date(),
            },
            Some("removed") => ReportOutcome::Removed,
            _ => ReportOutcome::Staged,
        })
    }
}

/// Answer to a reset-removed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetOutcome {
    pub status: Option<String>,
}

impl ResetOutcome {
    /// `None` unless the body reports success.
    pub fn from_record(record: &RemoteProductRecord) -> Option<ResetOutcome> {
        record.success().then(|| ResetOutcome {
            status: record.status().map(str::to_string),
        })
    }
}

/// Status to show once an automatic reset went through.
///
/// Prefers what the record said before the reset, then what the reset
/// returned, then `reported`. The product is on the page, so it is never
/// shown as removed.
pub fn status_after_reset(prior: Option<&str>, returned: Option<&str>) -> ProductStatus {
    let name = prior
        .filter(|p| *p != "removed")
        .or(returned)
        .unwrap_or("reported");

    match ProductStatus::from_wire(name) {
        Some(ProductStatus::Removed) => ProductStatus::Reported,
        Some(status) => status,
        None => ProductStatus::Unreported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn found(value: Value) -> Lookup {
        Lookup::Found(RemoteProductRecord::from_value(value).unwrap())
    }

    fn shown(verdict: Verdict) -> StatusReport {
        match verdict {
            Verdict::Show(report) => report,
            other => panic!("expected a status, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_is_unreported() {
        assert_eq!(shown(classify(&Lookup::NotFound)).status, ProductStatus::Unreported);
    }

    #[test]
    fn test_staged_with_date() {
        let report = shown(classify(&found(json!({
            "success": true,
            "status": "staged",
            "reportDate": "2024-05-01T10:00:00Z"
        }))));

        assert_eq!(report.status, ProductStatus::Staged);
        assert_eq!(report.date.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_staged_falls_back_to_created_at() {
        let report = shown(classify(&found(json!({
            "success": true,
            "status": "staged",
            "createdAt": "2024-04-01T00:00:00Z"
        }))));

        assert_eq!(report.date.as_deref(), Some("2024-04-01T00:00:00Z"));
    }

    #[test]
    fn test_removed_status_requests_reset() {
        let verdict = classify(&found(json!({"success": true, "status": "removed"})));
        assert_eq!(verdict, Verdict::RemovedButLive { prior: Some("removed".to_string()) });
    }

    #[test]
    fn test_removed_flag_requests_reset_with_stage() {
        let verdict = classify(&found(json!({
            "success": true,
            "status": "reported",
            "stage": "staged",
            "removed": "2024-02-02T00:00:00Z"
        })));
        assert_eq!(verdict, Verdict::RemovedButLive { prior: Some("staged".to_string()) });
    }

    #[test]
    fn test_removed_flag_with_non_text_status() {
        let verdict = classify(&found(json!({"success": true, "status": 1, "removed": true})));
        assert_eq!(verdict, Verdict::RemovedButLive { prior: None });

        let with_id = classify(&found(json!({"success": true, "status": 1, "_id": "abc"})));
        assert_eq!(shown(with_id).status, ProductStatus::Reported);
    }

    #[test]
    fn test_removed_without_success_is_not_reset() {
        let verdict = classify(&found(json!({"status": "removed"})));
        assert_eq!(shown(verdict).status, ProductStatus::Unreported);
    }

    #[test]
    fn test_unknown_status_with_id_is_to_assess() {
        let report = shown(classify(&found(json!({
            "success": true,
            "status": "unknown",
            "productId": "X"
        }))));

        assert_eq!(report.status, ProductStatus::ToAssess);
        assert_eq!(report.record_id.as_deref(), Some("X"));
    }

    #[test]
    fn test_unknown_status_without_id_is_unreported() {
        let verdict = classify(&found(json!({"success": true, "status": "unknown"})));
        assert_eq!(shown(verdict).status, ProductStatus::Unreported);
    }

    #[test]
    fn test_id_presence_dominates_status() {
        let report = shown(classify(&found(json!({
            "success": true,
            "status": "pending_review",
            "_id": "65a0f"
        }))));
        assert_eq!(report.status, ProductStatus::Reported);

        let bare = shown(classify(&found(json!({"productId": "X"}))));
        assert_eq!(bare.status, ProductStatus::Reported);
    }

    #[test]
    fn test_numeric_id_is_accepted() {
        let report = shown(classify(&found(json!({"id": 42, "createdAt": "2024-01-01"}))));
        assert_eq!(report.status, ProductStatus::Reported);
        assert_eq!(report.record_id.as_deref(), Some("42"));
        assert_eq!(report.date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_reported_status_uses_report_date_only() {
        let report = shown(classify(&found(json!({
            "success": true,
            "status": "reported",
            "reportDate": "2024-01-01T00:00:00Z",
            "createdAt": "2023-01-01T00:00:00Z"
        }))));

        assert_eq!(report.status, ProductStatus::Reported);
        assert_eq!(report.date.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_falsy_fields_count_as_absent() {
        let verdict = classify(&found(json!({
            "success": true,
            "status": "",
            "productId": "",
            "_id": null,
            "id": 0
        })));
        assert_eq!(shown(verdict).status, ProductStatus::Unreported);
    }

    #[test]
    fn test_unrecognized_shape_is_unreported() {
        let verdict = classify(&found(json!({"message": "ok"})));
        assert_eq!(shown(verdict).status, ProductStatus::Unreported);
    }

    #[test]
    fn test_non_object_is_not_a_record() {
        assert!(RemoteProductRecord::from_value(json!(null)).is_none());
        assert!(RemoteProductRecord::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_report_outcomes() {
        let record = |v: Value| RemoteProductRecord::from_value(v).unwrap();

        assert_eq!(
            ReportOutcome::from_record(&record(json!({"success": true, "status": "already_exists", "reportDate": "2024-01-01"}))),
            Some(ReportOutcome::AlreadyReported { report_date: Some("2024-01-01".to_string()) })
        );
        assert_eq!(
            ReportOutcome::from_record(&record(json!({"status": "already_reported"}))),
            Some(ReportOutcome::AlreadyReported { report_date: None })
        );
        assert_eq!(
            ReportOutcome::from_record(&record(json!({"status": "removed"}))),
            Some(ReportOutcome::Removed)
        );
        assert_eq!(
            ReportOutcome::from_record(&record(json!({"success": true}))),
            Some(ReportOutcome::Staged)
        );
        assert_eq!(ReportOutcome::from_record(&record(json!({"error": "boom"}))), None);
    }

    #[test]
    fn test_reset_outcome_requires_success() {
        let record = |v: Value| RemoteProductRecord::from_value(v).unwrap();

        assert_eq!(
            ResetOutcome::from_record(&record(json!({"success": true, "status": "staged"}))),
            Some(ResetOutcome { status: Some("staged".to_string()) })
        );
        assert_eq!(ResetOutcome::from_record(&record(json!({"success": false}))), None);
    }

    #[test]
    fn test_status_after_reset() {
        assert_eq!(status_after_reset(Some("staged"), Some("reported")), ProductStatus::Staged);
        assert_eq!(status_after_reset(Some("removed"), Some("staged")), ProductStatus::Staged);
        assert_eq!(status_after_reset(Some("removed"), None), ProductStatus::Reported);
        assert_eq!(status_after_reset(None, None), ProductStatus::Reported);
        assert_eq!(status_after_reset(None, Some("removed")), ProductStatus::Reported);
        assert_eq!(status_after_reset(Some("mystery"), None), ProductStatus::Unreported);
    }
}
