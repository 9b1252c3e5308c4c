//! Alert Lifecycle
//!
//! Turns derived findings into stateful, reviewable alerts with a
//! forward-only lifecycle: pending -> reviewing -> resolved | dismissed.

pub mod manager;
pub mod rules;
pub mod types;

pub use manager::{AlertError, AlertManager};
pub use rules::{evaluate_rules, AlertRule, RuleField};
pub use types::{Alert, AlertStatus, ManagerAction};
