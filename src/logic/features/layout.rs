//! Feature Layout - Centralized Feature Definition
//!
//! Controls the feature schema. Add, remove, or reorder a feature and
//! FEATURE_VERSION must be incremented: baselines, trained models, and
//! serialized vectors all key off this layout.

use crc32fast::Hasher;

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in exact vector order
pub const FEATURE_LAYOUT: &[&str] = &[
    "hour_norm",        // 0: Hour of day / 23
    "risk_norm",        // 1: Risk score / cap, clamped to 1
    "breach_norm",      // 2: Total breach count / cap, clamped to 1
    "integration_code", // 3: Integration category index / (count - 1)
    "is_download",      // 4: Download-like action flag
    "is_upload",        // 5: Upload-like action flag
];

/// Total number of features. Must match FEATURE_LAYOUT.len().
pub const FEATURE_COUNT: usize = 6;

/// CRC32 hash of the layout, used to detect mismatches at runtime.
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Error when incoming feature data doesn't match the current layout.
#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Validate that incoming data matches the current layout.
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();
    if version != FEATURE_VERSION || hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: version,
            actual_hash: hash,
        });
    }
    Ok(())
}

/// Get feature index by name (O(n) but features are few).
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}
