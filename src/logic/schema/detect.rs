//! Schema Format Detection
//!
//! Inspects the key set of one sample record and tags the layout it
//! resembles. Detection is advisory: normalization handles every field
//! per-record regardless of the tag.

use super::types::RawRecord;
use serde::{Deserialize, Serialize};

/// Known input layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatTag {
    /// Already in canonical shape (a prior normalization pass)
    Canonical,
    /// Single explicit timestamp column
    TimestampColumn,
    /// Separate `date` + `time` columns
    SplitDateTime,
    Unknown,
}

/// Tag the layout one raw record resembles.
pub fn detect_schema_format(sample: &RawRecord) -> FormatTag {
    let has = |key: &str| sample.contains_key(key);

    if has("userId") && has("activityDescription") && has("riskScore") {
        return FormatTag::Canonical;
    }
    if has("timestamp") || has("time_stamp") || has("eventTime") {
        return FormatTag::TimestampColumn;
    }
    if has("date") && has("time") {
        return FormatTag::SplitDateTime;
    }
    FormatTag::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_detect_canonical() {
        let r = record(json!({
            "userId": "alice",
            "activityDescription": "login",
            "riskScore": 10,
        }));
        assert_eq!(detect_schema_format(&r), FormatTag::Canonical);
    }

    #[test]
    fn test_detect_timestamp_column() {
        let r = record(json!({"user": "bob", "timestamp": "2024-02-01T10:00:00Z"}));
        assert_eq!(detect_schema_format(&r), FormatTag::TimestampColumn);
    }

    #[test]
    fn test_detect_split_date_time() {
        let r = record(json!({"user": "bob", "date": "01/02/2024", "time": "13:30"}));
        assert_eq!(detect_schema_format(&r), FormatTag::SplitDateTime);
    }

    #[test]
    fn test_detect_unknown() {
        let r = record(json!({"foo": 1}));
        assert_eq!(detect_schema_format(&r), FormatTag::Unknown);
    }
}
