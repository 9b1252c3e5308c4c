//! Feature Extractor
//!
//! CanonicalActivity -> FeatureVector. Pure and deterministic: identical
//! activity + identical config always yields identical features, so a scoring
//! run is reproducible as long as the caps stay fixed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::vector::FeatureVector;
use crate::constants::{BREACH_NORM_CAP, RISK_NORM_CAP};
use crate::logic::schema::types::{CanonicalActivity, INTEGRATION_COUNT};

static DOWNLOAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)download|export|extract|copied|copy").expect("download pattern"));

static UPLOAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)upload|sent|send|transfer|attach").expect("upload pattern"));

/// Normalization caps. Configuration, but held fixed across a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub risk_cap: f64,
    pub breach_cap: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            risk_cap: RISK_NORM_CAP,
            breach_cap: BREACH_NORM_CAP,
        }
    }
}

/// Extract the fixed-length feature vector for one activity.
pub fn extract_features(activity: &CanonicalActivity, config: &FeatureConfig) -> FeatureVector {
    let hour_norm = f64::from(activity.hour.min(23)) / 23.0;
    let risk_norm = (activity.risk_score / config.risk_cap).clamp(0.0, 1.0);
    let breach_norm = (activity.breach_count() / config.breach_cap).clamp(0.0, 1.0);
    let integration_code =
        activity.integration.index() as f64 / (INTEGRATION_COUNT - 1) as f64;
    let is_download = DOWNLOAD_RE.is_match(&activity.activity_description);
    let is_upload = UPLOAD_RE.is_match(&activity.activity_description);

    FeatureVector::from_values([
        hour_norm as f32,
        risk_norm as f32,
        breach_norm as f32,
        integration_code as f32,
        if is_download { 1.0 } else { 0.0 },
        if is_upload { 1.0 } else { 0.0 },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::schema::normalize::normalize_activities;
    use serde_json::json;

    fn activity(value: serde_json::Value) -> CanonicalActivity {
        let record = value.as_object().unwrap().clone();
        normalize_activities(&[record]).activities.remove(0)
    }

    #[test]
    fn test_extract_is_deterministic() {
        let a = activity(json!({
            "username": "alice",
            "timestamp": "2024-02-01T13:30:00Z",
            "integration": "email",
            "activityDescription": "Downloaded quarterly report",
            "riskScore": 1500,
            "policiesBreached": {"pii": 5},
        }));
        let config = FeatureConfig::default();
        let first = extract_features(&a, &config);
        let second = extract_features(&a, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_feature_values() {
        let a = activity(json!({
            "username": "alice",
            "timestamp": "2024-02-01T13:30:00Z",
            "integration": "email",
            "activityDescription": "Downloaded and sent attachment",
            "riskScore": 1500,
            "policiesBreached": {"pii": 5},
        }));
        let v = extract_features(&a, &FeatureConfig::default());
        assert!((v.get_by_name("hour_norm").unwrap() - 13.0 / 23.0).abs() < 1e-6);
        assert!((v.get_by_name("risk_norm").unwrap() - 0.5).abs() < 1e-6);
        assert!((v.get_by_name("breach_norm").unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(v.get_by_name("integration_code"), Some(0.0));
        assert_eq!(v.get_by_name("is_download"), Some(1.0));
        assert_eq!(v.get_by_name("is_upload"), Some(1.0));
    }

    #[test]
    fn test_caps_clamp() {
        let a = activity(json!({
            "username": "alice",
            "timestamp": "2024-02-01T03:00:00Z",
            "riskScore": 99999,
            "policiesBreached": {"pii": 500},
        }));
        let v = extract_features(&a, &FeatureConfig::default());
        assert_eq!(v.get_by_name("risk_norm"), Some(1.0));
        assert_eq!(v.get_by_name("breach_norm"), Some(1.0));
    }
}
