//! Scorer Selection
//!
//! Capability-tagged variant over the two strategies. Selection is a pure
//! function of dataset size and configuration; a failed training run falls
//! back to the statistical baseline silently (logged, never fatal).

use serde::{Deserialize, Serialize};

use super::autoencoder::{Autoencoder, TrainConfig};
use super::statistical::ZScoreBaseline;
use super::types::{AnomalyResult, ScoreMethod};
use crate::logic::features::vector::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// When false, the model-based path is never attempted
    pub use_reconstruction: bool,
    pub train: TrainConfig,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            use_reconstruction: true,
            train: TrainConfig::default(),
        }
    }
}

/// The selected scoring strategy.
pub enum Scorer {
    Statistical(ZScoreBaseline),
    Reconstruction(Autoencoder),
}

impl Scorer {
    /// Pick and prepare a strategy for this dataset.
    pub fn select(vectors: &[FeatureVector], config: &ScorerConfig) -> Self {
        if config.use_reconstruction && vectors.len() >= config.train.min_samples {
            let samples: Vec<Vec<f64>> = vectors
                .iter()
                .map(|v| v.values.iter().map(|&x| f64::from(x)).collect())
                .collect();
            match Autoencoder::train(&samples, &config.train) {
                Ok(model) => return Scorer::Reconstruction(model),
                Err(e) => {
                    log::warn!(
                        "reconstruction training unavailable ({}), using statistical baseline",
                        e
                    );
                }
            }
        }
        Scorer::Statistical(ZScoreBaseline::fit(vectors))
    }

    /// Score one feature vector.
    pub fn score(&self, vector: &FeatureVector) -> AnomalyResult {
        match self {
            Scorer::Statistical(baseline) => baseline.score(vector),
            Scorer::Reconstruction(model) => {
                let sample: Vec<f64> = vector.values.iter().map(|&x| f64::from(x)).collect();
                model.score(&sample)
            }
        }
    }

    pub fn method(&self) -> ScoreMethod {
        match self {
            Scorer::Statistical(_) => ScoreMethod::Statistical,
            Scorer::Reconstruction(_) => ScoreMethod::Reconstruction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(n: usize) -> Vec<FeatureVector> {
        (0..n)
            .map(|i| {
                FeatureVector::from_values([
                    0.5 + (i % 4) as f32 * 0.01,
                    0.2,
                    0.0,
                    0.4,
                    0.0,
                    0.0,
                ])
            })
            .collect()
    }

    #[test]
    fn test_small_dataset_selects_statistical() {
        let scorer = Scorer::select(&vectors(5), &ScorerConfig::default());
        assert_eq!(scorer.method(), ScoreMethod::Statistical);
    }

    #[test]
    fn test_large_dataset_selects_reconstruction() {
        let scorer = Scorer::select(&vectors(40), &ScorerConfig::default());
        assert_eq!(scorer.method(), ScoreMethod::Reconstruction);
    }

    #[test]
    fn test_reconstruction_disabled_by_config() {
        let config = ScorerConfig {
            use_reconstruction: false,
            ..Default::default()
        };
        let scorer = Scorer::select(&vectors(40), &config);
        assert_eq!(scorer.method(), ScoreMethod::Statistical);
    }

    #[test]
    fn test_empty_dataset_scores_without_panic() {
        let scorer = Scorer::select(&[], &ScorerConfig::default());
        let result = scorer.score(&FeatureVector::new());
        assert!(!result.is_anomaly);
    }
}
