//! Statistical Baseline Scorer
//!
//! Z-score over per-bucket counts and over per-dimension feature values.
//! Always available, no training required.

use serde::{Deserialize, Serialize};

use super::types::{AnomalyResult, ScoreMethod};
use crate::constants::{Z_SCORE_SCALE, Z_SCORE_THRESHOLD};
use crate::logic::features::vector::FeatureVector;

const EPS: f64 = 1e-6;

// ============================================================================
// BUCKET SERIES
// ============================================================================

/// Score of one bucket in a count series (e.g. one day of activity counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketScore {
    pub index: usize,
    pub count: f64,
    pub z: f64,
    pub is_anomaly: bool,
    /// min(100, |z| * 33)
    pub score: f64,
}

/// Z-score a series of per-bucket counts against its own mean/stddev.
/// Empty input yields an empty result.
pub fn score_counts(counts: &[f64]) -> Vec<BucketScore> {
    if counts.is_empty() {
        return Vec::new();
    }
    let (mean, std) = mean_std(counts);

    counts
        .iter()
        .enumerate()
        .map(|(index, &count)| {
            let z = (count - mean) / std.max(EPS);
            BucketScore {
                index,
                count,
                z,
                is_anomaly: z.abs() > Z_SCORE_THRESHOLD,
                score: (z.abs() * Z_SCORE_SCALE).round().min(100.0),
            }
        })
        .collect()
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

// ============================================================================
// FEATURE BASELINE
// ============================================================================

/// Per-dimension mean/stddev over a dataset's feature vectors. A vector is
/// scored by its largest per-dimension |z|.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreBaseline {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl ZScoreBaseline {
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let dim = vectors.first().map(|v| v.values.len()).unwrap_or(0);
        let mut mean = vec![0.0; dim];
        let mut std = vec![0.0; dim];
        if vectors.is_empty() {
            return Self { mean, std };
        }

        let n = vectors.len() as f64;
        for v in vectors {
            for (i, &x) in v.values.iter().enumerate() {
                mean[i] += f64::from(x);
            }
        }
        for m in &mut mean {
            *m /= n;
        }
        for v in vectors {
            for (i, &x) in v.values.iter().enumerate() {
                std[i] += (f64::from(x) - mean[i]).powi(2);
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
        }

        Self { mean, std }
    }

    pub fn score(&self, vector: &FeatureVector) -> AnomalyResult {
        let max_z = vector
            .values
            .iter()
            .enumerate()
            .take(self.mean.len())
            .map(|(i, &x)| ((f64::from(x) - self.mean[i]) / self.std[i].max(EPS)).abs())
            .fold(0.0f64, f64::max);

        AnomalyResult {
            is_anomaly: max_z > Z_SCORE_THRESHOLD,
            anomaly_score: (max_z * Z_SCORE_SCALE).round().min(100.0),
            raw_error: None,
            method: ScoreMethod::Statistical,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
