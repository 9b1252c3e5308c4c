//! Activity Normalization
//!
//! Maps raw records into canonical activities, one output per input,
//! order-preserving. A malformed record never aborts the batch: every field
//! coerces to a safe default and the failure is counted in the diagnostics.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde_json::Value;

use super::types::{
    ActivityStatus, BreachValue, CanonicalActivity, Integration, RawRecord, Severity,
};

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of normalizing a batch of raw records.
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub activities: Vec<CanonicalActivity>,
    pub diagnostics: NormalizeDiagnostics,
}

/// Per-batch counters for recovered malformations. Logged, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeDiagnostics {
    /// JSON-encoded fields that failed to parse (replaced by empty mappings)
    pub malformed_json_fields: usize,
    /// Timestamps that fell back to the current instant
    pub degraded_timestamps: usize,
    /// Records with no usable identity field
    pub missing_identities: usize,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a batch of raw records. Total: returns exactly one canonical
/// activity per input record and never fails. Empty input yields an empty
/// result.
pub fn normalize_activities(records: &[RawRecord]) -> NormalizeOutcome {
    let mut diagnostics = NormalizeDiagnostics::default();
    let activities = records
        .iter()
        .enumerate()
        .map(|(idx, record)| normalize_one(record, idx, &mut diagnostics))
        .collect();

    if diagnostics != NormalizeDiagnostics::default() {
        log::info!(
            "normalized {} records with recoveries: {} malformed json, {} degraded timestamps, {} missing identities",
            records.len(),
            diagnostics.malformed_json_fields,
            diagnostics.degraded_timestamps,
            diagnostics.missing_identities,
        );
    }

    NormalizeOutcome {
        activities,
        diagnostics,
    }
}

fn normalize_one(
    record: &RawRecord,
    idx: usize,
    diagnostics: &mut NormalizeDiagnostics,
) -> CanonicalActivity {
    let id = get_string(record, &["id", "activityId", "eventId"])
        .unwrap_or_else(|| format!("activity-{}", idx));

    let user_id = coerce_identity(record, diagnostics);
    let (timestamp, parse_degraded) = coerce_timestamp(record);
    let previously_degraded = record
        .get("timeDegraded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if parse_degraded {
        diagnostics.degraded_timestamps += 1;
    }

    let risk_score = coerce_risk(record);
    let integration = coerce_integration(
        get_string(record, &["integration", "source", "channel"]).as_deref(),
    );
    let activity_description = get_string(
        record,
        &["activityDescription", "activity", "description", "action"],
    )
    .unwrap_or_default();

    let policies_breached = coerce_breaches(
        record
            .get("policiesBreached")
            .or_else(|| record.get("policies_breached"))
            .or_else(|| record.get("values")),
        diagnostics,
    );

    let status = record
        .get("status")
        .and_then(|v| serde_json::from_value::<ActivityStatus>(v.clone()).ok())
        .unwrap_or(ActivityStatus::UnderReview);

    CanonicalActivity {
        id,
        user_id,
        hour: timestamp.hour() as u8,
        timestamp,
        integration,
        activity_description,
        severity: Severity::from_risk(risk_score),
        risk_score,
        status,
        policies_breached,
        time_degraded: parse_degraded || previously_degraded,
    }
}

// ============================================================================
// PER-FIELD COERCION
// ============================================================================

fn get_string(record: &RawRecord, keys: &[&str]) -> Option<String> {
    for key in keys {
        match record.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// Identity: `username` > `user` > `userId`, lower-cased; "unknown" when absent.
fn coerce_identity(record: &RawRecord, diagnostics: &mut NormalizeDiagnostics) -> String {
    match get_string(record, &["username", "user", "userId", "user_id"]) {
        Some(name) => name.to_lowercase(),
        None => {
            diagnostics.missing_identities += 1;
            "unknown".to_string()
        }
    }
}

/// Risk score: string/number coerced to a non-negative number, default 0.
fn coerce_risk(record: &RawRecord) -> f64 {
    let value = record
        .get("riskScore")
        .or_else(|| record.get("risk_score"))
        .or_else(|| record.get("risk"));

    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.max(0.0)
    } else {
        0.0
    }
}

/// Timestamp: explicit timestamp field first, else `date` + `time` columns.
/// Returns the instant and whether the current-instant fallback was taken.
fn coerce_timestamp(record: &RawRecord) -> (DateTime<Utc>, bool) {
    if let Some(value) = record
        .get("timestamp")
        .or_else(|| record.get("time_stamp"))
        .or_else(|| record.get("eventTime"))
    {
        if let Some(ts) = parse_instant(value) {
            return (ts, false);
        }
    }

    let date = get_string(record, &["date"]);
    let time = get_string(record, &["time"]);
    if let Some(date) = date {
        if let Some(parsed_date) = parse_date(&date) {
            let parsed_time = time
                .as_deref()
                .and_then(parse_time)
                .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default());
            let naive = NaiveDateTime::new(parsed_date, parsed_time);
            return (Utc.from_utc_datetime(&naive), false);
        }
    }

    // Irrecoverable: fall back to now and flag the record as time-degraded.
    (Utc::now(), true)
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            None
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Heuristic: values past ~5138 CE in seconds are epoch millis
            if raw > 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

/// Handles both `DD/MM/YYYY` and ISO date forms.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Integration: lower-case, strip the vendor prefix token, categorize.
pub fn coerce_integration(raw: Option<&str>) -> Integration {
    let raw = match raw {
        Some(r) => r.trim().to_lowercase(),
        None => return Integration::Other,
    };
    let stripped = raw
        .strip_prefix("si-")
        .or_else(|| raw.strip_prefix("si_"))
        .unwrap_or(&raw);

    if stripped.contains("email") || stripped.contains("mail") {
        Integration::Email
    } else if stripped.contains("cloud") || stripped.contains("drive") || stripped.contains("share")
    {
        Integration::Cloud
    } else if stripped.contains("usb") || stripped.contains("removable") {
        Integration::Usb
    } else if stripped.contains("app") {
        Integration::Application
    } else if stripped.contains("file") {
        Integration::File
    } else {
        Integration::Other
    }
}

/// Breach mapping: JSON-encoded strings are parsed; parse failure substitutes
/// an empty mapping rather than raising.
fn coerce_breaches(
    value: Option<&Value>,
    diagnostics: &mut NormalizeDiagnostics,
) -> BTreeMap<String, BreachValue> {
    let object = match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<RawRecord>(s) {
            Ok(map) => map,
            Err(e) => {
                log::debug!("unparseable breach mapping ({}), substituting empty", e);
                diagnostics.malformed_json_fields += 1;
                return BTreeMap::new();
            }
        },
        _ => return BTreeMap::new(),
    };

    object
        .into_iter()
        .map(|(category, value)| (category, coerce_breach_value(value)))
        .collect()
}

fn coerce_breach_value(value: Value) -> BreachValue {
    match value {
        Value::Bool(b) => BreachValue::Flag(b),
        Value::Number(n) => BreachValue::Count(n.as_f64().unwrap_or(0.0).max(0.0)),
        Value::Array(items) => BreachValue::Ids(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(s) if s.is_empty() => BreachValue::Flag(false),
        Value::String(s) => BreachValue::Ids(vec![s]),
        Value::Null => BreachValue::Flag(false),
        // Nested objects are truthy but uncountable
        Value::Object(_) => BreachValue::Flag(true),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_normalization_is_total() {
        let records = vec![
            record(json!({})),
            record(json!({"garbage": [1, 2, 3]})),
            record(json!({"username": "Alice", "riskScore": "1200"})),
        ];
        let outcome = normalize_activities(&records);
        assert_eq!(outcome.activities.len(), 3);
        for activity in &outcome.activities {
            assert_eq!(activity.severity, Severity::from_risk(activity.risk_score));
        }
        assert_eq!(outcome.activities[2].user_id, "alice");
        assert_eq!(outcome.activities[2].risk_score, 1200.0);
        assert_eq!(outcome.activities[2].severity, Severity::Medium);
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        let outcome = normalize_activities(&[]);
        assert!(outcome.activities.is_empty());
        assert_eq!(outcome.diagnostics, NormalizeDiagnostics::default());
    }

    #[test]
    fn test_split_date_time_is_day_first() {
        // {date:"01/02/2024", time:"13:30"} -> 2024-02-01, hour 13
        let records = vec![record(json!({
            "user": "bob",
            "date": "01/02/2024",
            "time": "13:30",
        }))];
        let activity = &normalize_activities(&records).activities[0];
        assert!(!activity.time_degraded);
        assert_eq!(activity.hour, 13);
        assert_eq!(activity.timestamp.year(), 2024);
        assert_eq!(activity.timestamp.month(), 2);
        assert_eq!(activity.timestamp.day(), 1);
    }

    #[test]
    fn test_unparseable_time_falls_back_and_flags() {
        let records = vec![record(json!({
            "user": "bob",
            "date": "not-a-date",
            "time": "99:99",
        }))];
        let outcome = normalize_activities(&records);
        assert!(outcome.activities[0].time_degraded);
        assert_eq!(outcome.diagnostics.degraded_timestamps, 1);
    }

    #[test]
    fn test_epoch_timestamps() {
        let seconds = record(json!({"timestamp": 1706788800}));
        let millis = record(json!({"timestamp": 1706788800000i64}));
        let outcome = normalize_activities(&[seconds, millis]);
        assert_eq!(
            outcome.activities[0].timestamp,
            outcome.activities[1].timestamp
        );
    }

    #[test]
    fn test_malformed_breach_json_substitutes_empty() {
        let records = vec![record(json!({
            "user": "carol",
            "policiesBreached": "{not json",
        }))];
        let outcome = normalize_activities(&records);
        assert!(outcome.activities[0].policies_breached.is_empty());
        assert_eq!(outcome.diagnostics.malformed_json_fields, 1);
    }

    #[test]
    fn test_breach_json_string_roundtrip() {
        let breaches = json!({"pii": ["b1", "b2"], "financial": true, "fraud": 3});
        let direct = vec![record(json!({"user": "d", "policiesBreached": breaches}))];
        let encoded = vec![record(json!({
            "user": "d",
            "policiesBreached": breaches.to_string(),
        }))];
        let a = &normalize_activities(&direct).activities[0];
        let b = &normalize_activities(&encoded).activities[0];
        assert_eq!(a.policies_breached, b.policies_breached);
        assert_eq!(a.breach_count(), 5.0);
    }

    #[test]
    fn test_integration_vendor_prefix_stripped() {
        assert_eq!(coerce_integration(Some("SI-Email")), Integration::Email);
        assert_eq!(coerce_integration(Some("si-cloud-drive")), Integration::Cloud);
        assert_eq!(coerce_integration(Some("USB")), Integration::Usb);
        assert_eq!(coerce_integration(Some("sharepoint")), Integration::Cloud);
        assert_eq!(coerce_integration(Some("mystery")), Integration::Other);
        assert_eq!(coerce_integration(None), Integration::Other);
    }

    #[test]
    fn test_missing_identity_counts() {
        let outcome = normalize_activities(&[record(json!({"riskScore": 1}))]);
        assert_eq!(outcome.activities[0].user_id, "unknown");
        assert_eq!(outcome.diagnostics.missing_identities, 1);
    }

    #[test]
    fn test_idempotent_on_canonical_records() {
        let records = vec![record(json!({
            "username": "Eve",
            "timestamp": "2024-02-01T13:30:00Z",
            "integration": "si-email",
            "activityDescription": "sent attachment",
            "riskScore": 2500,
            "policiesBreached": {"pii": ["b1"]},
        }))];
        let first = normalize_activities(&records).activities;
        assert_eq!(first[0].severity, Severity::Critical);

        let reencoded: Vec<RawRecord> = first
            .iter()
            .map(|a| {
                serde_json::to_value(a)
                    .unwrap()
                    .as_object()
                    .unwrap()
                    .clone()
            })
            .collect();
        let second = normalize_activities(&reencoded).activities;
        assert_eq!(first, second);
    }
}
