//! Recommendation Types
//!
//! Data structures only - synthesis logic lives in `engine`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::logic::analytics::clustering::ClusteringConfig;
use crate::logic::anomaly::autoencoder::TrainConfig;
use crate::logic::features::extract::FeatureConfig;
use crate::logic::schema::types::Severity;

/// Which detector produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    DataExfiltration,
    UnusualBehavior,
    PolicyBreach,
    AccessViolation,
    SuspiciousTiming,
    BulkOperations,
    HighRiskSequence,
    Other,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::DataExfiltration => "data_exfiltration",
            RecommendationCategory::UnusualBehavior => "unusual_behavior",
            RecommendationCategory::PolicyBreach => "policy_breach",
            RecommendationCategory::AccessViolation => "access_violation",
            RecommendationCategory::SuspiciousTiming => "suspicious_timing",
            RecommendationCategory::BulkOperations => "bulk_operations",
            RecommendationCategory::HighRiskSequence => "high_risk_sequence",
            RecommendationCategory::Other => "other",
        }
    }
}

/// A derived finding. Created fresh on each analysis run; persisted only as
/// the seed for alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// Sorted user identifiers
    pub affected_users: Vec<String>,
    pub suggested_actions: Vec<String>,
    /// Human-readable reasons, ordered
    pub deviation_factors: Vec<String>,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Multiplier applied to detector confidence (higher = more findings)
    pub sensitivity_level: f64,
    pub max_recommendations: usize,
    /// Findings below this confidence are dropped
    pub confidence_threshold: f64,
    /// Toggle the model-based scoring path (statistical-only when false)
    pub use_anomaly_detection: bool,
    /// Hours treated as elevated risk
    pub critical_hours: BTreeSet<u8>,
    /// When false, only severity >= high findings are returned
    pub include_all_recommendations: bool,
    pub feature: FeatureConfig,
    pub train: TrainConfig,
    pub clustering: ClusteringConfig,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            sensitivity_level: 1.0,
            max_recommendations: 10,
            confidence_threshold: 0.5,
            use_anomaly_detection: true,
            critical_hours: [0, 1, 2, 3, 4, 5, 22, 23].into_iter().collect(),
            include_all_recommendations: true,
            feature: FeatureConfig::default(),
            train: TrainConfig::default(),
            clustering: ClusteringConfig::default(),
        }
    }
}
