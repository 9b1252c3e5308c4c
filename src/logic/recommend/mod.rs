//! Recommendation Engine
//!
//! Aggregates per-activity and per-user signals into ranked, explainable
//! findings. Deterministic for fixed input + config (the reconstruction
//! model trains with a fixed seed).

pub mod engine;
pub mod types;

pub use engine::generate_recommendations;
pub use types::{Recommendation, RecommendationCategory, RecommendConfig};
