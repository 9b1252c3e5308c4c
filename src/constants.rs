//! Central Configuration Constants
//!
//! Single source of truth for all analysis defaults.
//! To retune the engine, only edit this file.

/// Severity thresholds applied to `risk_score` (lower bounds, inclusive)
pub const SEVERITY_MEDIUM_MIN: f64 = 1000.0;
pub const SEVERITY_HIGH_MIN: f64 = 1500.0;
pub const SEVERITY_CRITICAL_MIN: f64 = 2000.0;

/// Risk score normalization cap for feature extraction
pub const RISK_NORM_CAP: f64 = 3000.0;

/// Breach count normalization cap for feature extraction
pub const BREACH_NORM_CAP: f64 = 10.0;

/// Z-score magnitude above which a bucket/vector is anomalous
pub const Z_SCORE_THRESHOLD: f64 = 2.0;

/// Scale factor mapping |z| onto the 0-100 anomaly score
pub const Z_SCORE_SCALE: f64 = 33.0;

/// Minimum samples before the reconstruction model may train
pub const MIN_TRAINING_SAMPLES: usize = 15;

/// Reconstruction model training epochs
pub const TRAINING_EPOCHS: usize = 50;

/// Default training seed (fixed for reproducible scoring runs)
pub const DEFAULT_TRAINING_SEED: u64 = 42;

/// Percentile of training errors used as the anomaly threshold
pub const ERROR_PERCENTILE: f64 = 0.95;

/// Average-risk cutoff marking a sequence chain high-risk
pub const HIGH_RISK_SEQUENCE_CUTOFF: f64 = 1500.0;

/// Sequence chain window length
pub const SEQUENCE_WINDOW: usize = 3;

/// Activity count ceiling before user clustering samples the dataset
pub const CLUSTERING_SAMPLE_CEILING: usize = 10_000;

/// Maximum user profiles returned by clustering
pub const CLUSTERING_MAX_USERS: usize = 500;

/// Activity count ceiling before the analysis host down-samples
pub const ANALYSIS_SAMPLE_CEILING: usize = 25_000;

/// Records processed per chunk in the analysis host
pub const ANALYSIS_CHUNK_SIZE: usize = 500;

/// Minimum milliseconds between progress emissions
pub const PROGRESS_THROTTLE_MS: u64 = 100;

/// Download/upload-like action count marking bulk operations
pub const BULK_OPERATION_MIN: usize = 15;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
