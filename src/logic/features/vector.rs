//! Feature Vector
//!
//! Versioned fixed-length vector with layout validation. Ephemeral:
//! recomputed on demand, never persisted with the activity.

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_VERSION,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in FEATURE_LAYOUT order
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        feature_index(name).and_then(|i| self.values.get(i).copied())
    }

    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        match feature_index(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Validate compatibility with the current layout.
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vector_is_compatible() {
        let v = FeatureVector::new();
        assert_eq!(v.version, FEATURE_VERSION);
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_named_access() {
        let mut v = FeatureVector::new();
        assert!(v.set_by_name("risk_norm", 0.5));
        assert_eq!(v.get_by_name("risk_norm"), Some(0.5));
        assert!(!v.set_by_name("nonexistent", 1.0));
    }
}
