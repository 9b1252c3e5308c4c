//! Reconstruction-Error Model
//!
//! Small encoder-bottleneck-decoder network trained in-session by SGD on
//! mean squared reconstruction error. A vector that reconstructs poorly is
//! an unusual pattern. Training is deterministic for a fixed seed and epoch
//! count; the decision threshold is the 95th percentile of training-set
//! errors.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::types::{AnomalyResult, ScoreMethod};
use crate::constants::{
    DEFAULT_TRAINING_SEED, ERROR_PERCENTILE, MIN_TRAINING_SAMPLES, TRAINING_EPOCHS,
};

const EPS: f64 = 1e-9;

// ============================================================================
// CONFIG / ERRORS
// ============================================================================

/// Training configuration. Fixed seed + epochs => reproducible model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub seed: u64,
    pub learning_rate: f64,
    pub min_samples: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: TRAINING_EPOCHS,
            seed: DEFAULT_TRAINING_SEED,
            learning_rate: 0.1,
            min_samples: MIN_TRAINING_SAMPLES,
        }
    }
}

#[derive(Debug)]
pub struct TrainError(pub String);

impl std::fmt::Display for TrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TrainError: {}", self.0)
    }
}

impl std::error::Error for TrainError {}

// ============================================================================
// MODEL
// ============================================================================

/// Trained encoder-bottleneck-decoder.
#[derive(Debug, Clone)]
pub struct Autoencoder {
    input_dim: usize,
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    threshold: f64,
    observed_max: f64,
}

impl Autoencoder {
    /// Train on a set of same-dimension samples (values expected in [0, 1]).
    pub fn train(samples: &[Vec<f64>], config: &TrainConfig) -> Result<Self, TrainError> {
        if samples.len() < config.min_samples {
            return Err(TrainError(format!(
                "insufficient training data: {} samples, need {}",
                samples.len(),
                config.min_samples
            )));
        }
        let input_dim = samples[0].len();
        if input_dim == 0 {
            return Err(TrainError("zero-dimension samples".to_string()));
        }
        if samples.iter().any(|s| s.len() != input_dim) {
            return Err(TrainError("inconsistent sample dimensions".to_string()));
        }

        let bottleneck = (input_dim / 2).max(2);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut init = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-0.5..0.5))
        };

        let mut model = Self {
            input_dim,
            w1: init(bottleneck, input_dim),
            b1: Array1::zeros(bottleneck),
            w2: init(input_dim, bottleneck),
            b2: Array1::zeros(input_dim),
            threshold: 0.0,
            observed_max: 0.0,
        };

        let inputs: Vec<Array1<f64>> = samples
            .iter()
            .map(|s| Array1::from_vec(s.clone()))
            .collect();

        for epoch in 0..config.epochs {
            let mut epoch_loss = 0.0;
            for x in &inputs {
                epoch_loss += model.train_step(x, config.learning_rate);
            }
            epoch_loss /= inputs.len() as f64;
            if !epoch_loss.is_finite() {
                return Err(TrainError(format!(
                    "training diverged at epoch {}",
                    epoch
                )));
            }
        }

        let mut errors: Vec<f64> = inputs.iter().map(|x| model.error_of(x)).collect();
        errors.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        model.observed_max = errors.last().copied().unwrap_or(0.0);
        model.threshold = percentile(&errors, ERROR_PERCENTILE);

        log::debug!(
            "autoencoder trained: dim={} bottleneck={} threshold={:.6} max_err={:.6}",
            input_dim,
            bottleneck,
            model.threshold,
            model.observed_max
        );
        Ok(model)
    }

    /// One SGD step; returns the sample's squared-error loss before update.
    fn train_step(&mut self, x: &Array1<f64>, lr: f64) -> f64 {
        let z = (self.w1.dot(x) + &self.b1).mapv(sigmoid);
        let y = (self.w2.dot(&z) + &self.b2).mapv(sigmoid);
        let err = &y - x;
        let loss = err.mapv(|e| e * e).mean().unwrap_or(0.0);

        // Backprop through MSE + sigmoid
        let dy = &err * &y.mapv(|v| v * (1.0 - v)) * (2.0 / self.input_dim as f64);
        let dz = self.w2.t().dot(&dy) * z.mapv(|v| v * (1.0 - v));

        let grad_w2 = outer(&dy, &z);
        let grad_w1 = outer(&dz, x);
        self.w2.scaled_add(-lr, &grad_w2);
        self.b2.scaled_add(-lr, &dy);
        self.w1.scaled_add(-lr, &grad_w1);
        self.b1.scaled_add(-lr, &dz);

        loss
    }

    /// Mean squared reconstruction error for one sample.
    pub fn reconstruction_error(&self, sample: &[f64]) -> f64 {
        let x = Array1::from_vec(sample.to_vec());
        self.error_of(&x)
    }

    fn error_of(&self, x: &Array1<f64>) -> f64 {
        if x.len() != self.input_dim {
            return f64::INFINITY;
        }
        let z = (self.w1.dot(x) + &self.b1).mapv(sigmoid);
        let y = (self.w2.dot(&z) + &self.b2).mapv(sigmoid);
        (&y - x).mapv(|e| e * e).mean().unwrap_or(0.0)
    }

    /// Score a sample: raw error plus the normalized 0-100 scale
    /// (error / max(observed_max, threshold * 1.5)).
    pub fn score(&self, sample: &[f64]) -> AnomalyResult {
        let error = self.reconstruction_error(sample);
        let denom = self.observed_max.max(self.threshold * 1.5).max(EPS);
        AnomalyResult {
            is_anomaly: error > self.threshold,
            anomaly_score: ((error / denom) * 100.0).clamp(0.0, 100.0),
            raw_error: Some(error),
            method: ScoreMethod::Reconstruction,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let a = a.view().insert_axis(Axis(1));
    let b = b.view().insert_axis(Axis(0));
    a.dot(&b)
}

/// Percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p * sorted.len() as f64).ceil() as usize).saturating_sub(1);
    sorted[rank.min(sorted.len() - 1)]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_samples(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let jitter = (i % 5) as f64 * 0.02;
                vec![0.5 + jitter, 0.2, 0.1, 0.4, 0.0, 0.0]
            })
            .collect()
    }

    #[test]
    fn test_training_requires_min_samples() {
        let samples = clustered_samples(5);
        assert!(Autoencoder::train(&samples, &TrainConfig::default()).is_err());
    }

    #[test]
    fn test_training_is_deterministic_for_fixed_seed() {
        let samples = clustered_samples(30);
        let config = TrainConfig::default();
        let a = Autoencoder::train(&samples, &config).unwrap();
        let b = Autoencoder::train(&samples, &config).unwrap();

        let probe = vec![0.9, 0.9, 0.9, 0.9, 1.0, 1.0];
        assert_eq!(a.reconstruction_error(&probe), b.reconstruction_error(&probe));
        assert_eq!(a.threshold(), b.threshold());
    }

    #[test]
    fn test_outlier_exceeds_threshold() {
        let samples = clustered_samples(40);
        let model = Autoencoder::train(&samples, &TrainConfig::default()).unwrap();

        let outlier = model.score(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(outlier.is_anomaly);
        assert!(outlier.raw_error.unwrap() > model.threshold());
        assert!(outlier.anomaly_score > 0.0 && outlier.anomaly_score <= 100.0);
    }

    #[test]
    fn test_dimension_mismatch_is_infinite_error() {
        let samples = clustered_samples(20);
        let model = Autoencoder::train(&samples, &TrainConfig::default()).unwrap();
        assert!(model.reconstruction_error(&[0.5]).is_infinite());
    }

    #[test]
    fn test_inconsistent_dimensions_rejected() {
        let mut samples = clustered_samples(20);
        samples.push(vec![0.1, 0.2]);
        assert!(Autoencoder::train(&samples, &TrainConfig::default()).is_err());
    }
}
