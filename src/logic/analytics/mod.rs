//! Derived Analytics
//!
//! Batch analyses over the full normalized dataset:
//! - `heatmap` - temporal (integration x hour) risk grid
//! - `sequence` - behavioral step-chain mining
//! - `clustering` - per-user behavior clustering
//! - `sampling` - stratified down-sampling shared by the above
//!
//! Shared policy: empty input yields a valid empty result, oversized input is
//! sampled with an explicit flag, nothing here panics.

pub mod clustering;
pub mod heatmap;
pub mod sampling;
pub mod sequence;

pub use clustering::{cluster_users, ClusterLabel, ClusteringConfig, ClusteringResult, UserProfile};
pub use heatmap::{HeatmapCell, TemporalHeatmap};
pub use sampling::{stratified_sample, SampleOutcome};
pub use sequence::{mine_sequences, ActionStep, SequencePattern};
