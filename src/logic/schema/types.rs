//! Canonical Activity Types
//!
//! Data structures only - no coercion logic here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{SEVERITY_CRITICAL_MIN, SEVERITY_HIGH_MIN, SEVERITY_MEDIUM_MIN};

/// An untyped record as produced by an external source (CSV row, API payload).
/// No invariants; fields may be missing or encode nested structures as strings.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// SEVERITY
// ============================================================================

/// Four-level ordinal risk classification.
///
/// Always a pure function of `risk_score` - never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Derive severity from a risk score using the fixed thresholds.
    pub fn from_risk(risk_score: f64) -> Self {
        if risk_score >= SEVERITY_CRITICAL_MIN {
            Severity::Critical
        } else if risk_score >= SEVERITY_HIGH_MIN {
            Severity::High
        } else if risk_score >= SEVERITY_MEDIUM_MIN {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REVIEW STATUS
// ============================================================================

/// Review status of a single activity. Set once at normalization; only the
/// review workflow (out of scope here) updates it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    UnderReview,
    Trusted,
    Concern,
    NonConcern,
}

// ============================================================================
// INTEGRATION CATEGORY
// ============================================================================

/// Canonical source category of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    Email,
    Cloud,
    Usb,
    Application,
    File,
    Other,
}

/// Number of integration categories (heatmap grid height)
pub const INTEGRATION_COUNT: usize = 6;

impl Integration {
    pub const ALL: [Integration; INTEGRATION_COUNT] = [
        Integration::Email,
        Integration::Cloud,
        Integration::Usb,
        Integration::Application,
        Integration::File,
        Integration::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Integration::Email => "email",
            Integration::Cloud => "cloud",
            Integration::Usb => "usb",
            Integration::Application => "application",
            Integration::File => "file",
            Integration::Other => "other",
        }
    }

    /// Stable index used for heatmap rows and the feature category code.
    pub fn index(&self) -> usize {
        match self {
            Integration::Email => 0,
            Integration::Cloud => 1,
            Integration::Usb => 2,
            Integration::Application => 3,
            Integration::File => 4,
            Integration::Other => 5,
        }
    }
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// POLICY BREACHES
// ============================================================================

/// Value of one breach category: a flag, a count, or a list of breach ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreachValue {
    Flag(bool),
    Count(f64),
    Ids(Vec<String>),
}

impl BreachValue {
    /// Number of breaches this value represents. Lists count by length,
    /// truthy flags count as 1, numbers count by value.
    pub fn count(&self) -> f64 {
        match self {
            BreachValue::Flag(true) => 1.0,
            BreachValue::Flag(false) => 0.0,
            BreachValue::Count(n) => n.max(0.0),
            BreachValue::Ids(ids) => ids.len() as f64,
        }
    }
}

// ============================================================================
// CANONICAL ACTIVITY
// ============================================================================

/// The normalized unit of work. Created once during normalization; immutable
/// afterwards except for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalActivity {
    /// Unique within a dataset
    pub id: String,
    /// Lower-cased for identity comparison
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// 0-23, derived from `timestamp`
    pub hour: u8,
    pub integration: Integration,
    pub activity_description: String,
    /// Non-negative
    pub risk_score: f64,
    /// Invariant: always `Severity::from_risk(risk_score)`
    pub severity: Severity,
    pub status: ActivityStatus,
    pub policies_breached: BTreeMap<String, BreachValue>,
    /// True when the timestamp could not be parsed and fell back to "now"
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub time_degraded: bool,
}

impl CanonicalActivity {
    /// Total breaches summed across all categories.
    pub fn breach_count(&self) -> f64 {
        self.policies_breached.values().map(BreachValue::count).sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================
