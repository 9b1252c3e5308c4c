//! UEBA Core - User Entity Behavior Analytics Engine
//!
//! Normalizes heterogeneous activity records into a canonical shape, scores
//! them for risk/anomaly, derives batch analytics (temporal heatmap, sequence
//! patterns, user clustering), aggregates the highest-signal findings into
//! recommendations, and manages the alert review lifecycle.
//!
//! The engine runs entirely in-process against an in-memory or embedded
//! dataset. UI, ingestion transports, and storage engines are collaborators.

pub mod constants;
pub mod logic;

pub use logic::alerts::{Alert, AlertManager, AlertStatus};
pub use logic::recommend::{generate_recommendations, Recommendation, RecommendConfig};
pub use logic::runner::{run_analysis, AnalysisHost, AnalysisResult};
pub use logic::schema::{normalize_activities, CanonicalActivity, RawRecord, Severity};

/// Initialize env_logger with a sane default filter.
///
/// Call once at startup from the hosting binary. Safe to call again.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
