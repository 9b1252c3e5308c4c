//! Anomaly Types
//!
//! Data structures only - no scoring logic here.

use serde::{Deserialize, Serialize};

/// Which strategy produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    Statistical,
    Reconstruction,
}

impl ScoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMethod::Statistical => "statistical",
            ScoreMethod::Reconstruction => "reconstruction",
        }
    }
}

/// Per-activity scoring output. Attached to its source activity by id,
/// never stored on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// Normalized 0-100 scale
    pub anomaly_score: f64,
    /// Unbounded reconstruction error; absent for the statistical baseline
    pub raw_error: Option<f64>,
    pub method: ScoreMethod,
}

impl Default for AnomalyResult {
    fn default() -> Self {
        Self {
            is_anomaly: false,
            anomaly_score: 0.0,
            raw_error: None,
            method: ScoreMethod::Statistical,
        }
    }
}
