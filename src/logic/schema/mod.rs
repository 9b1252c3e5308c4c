//! Schema Adapter - Raw Record Normalization
//!
//! The one place where field presence/shape of external records is assumed.
//! Raw records stay untyped mappings at the boundary; everything downstream
//! works on `CanonicalActivity`.

pub mod detect;
pub mod normalize;
pub mod types;

pub use detect::{detect_schema_format, FormatTag};
pub use normalize::{normalize_activities, NormalizeDiagnostics, NormalizeOutcome};
pub use types::{
    ActivityStatus, BreachValue, CanonicalActivity, Integration, RawRecord, Severity,
};
