//! Anomaly Scoring
//!
//! Two interchangeable strategies behind one interface:
//! - `statistical` - z-score baseline, always available
//! - `autoencoder` - reconstruction-error model, opportunistic
//!
//! Selection is a pure function of data availability (`Scorer::select`).
//! Training failure degrades to the statistical baseline, never to a fatal
//! error.

pub mod autoencoder;
pub mod scorer;
pub mod statistical;
pub mod types;

pub use autoencoder::{Autoencoder, TrainConfig, TrainError};
pub use scorer::{Scorer, ScorerConfig};
pub use statistical::{score_counts, BucketScore, ZScoreBaseline};
pub use types::{AnomalyResult, ScoreMethod};
