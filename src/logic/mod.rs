//! Logic Module - Analysis Engines
//!
//! - `schema/` - Raw record normalization into canonical activities
//! - `features/` - Feature extraction (layout, vector, extractor)
//! - `anomaly/` - Statistical + reconstruction anomaly scoring
//! - `analytics/` - Heatmap, sequence mining, user clustering
//! - `recommend/` - Finding synthesis and ranking
//! - `alerts/` - Alert lifecycle state machine
//! - `store/` - Durable object store contract + implementations
//! - `runner` - Chunked execution host

pub mod alerts;
pub mod analytics;
pub mod anomaly;
pub mod features;
pub mod recommend;
pub mod runner;
pub mod schema;
pub mod store;
