//! Feature Extraction
//!
//! - `layout` - Versioned feature schema (single source of truth)
//! - `vector` - The fixed-length feature vector
//! - `extract` - CanonicalActivity -> FeatureVector

pub mod extract;
pub mod layout;
pub mod vector;

pub use extract::{extract_features, FeatureConfig};
pub use layout::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::FeatureVector;
