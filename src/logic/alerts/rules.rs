//! Threshold Alert Rules
//!
//! Simple per-activity rules evaluated alongside the recommendation engine.
//! A rule is a single `field > threshold` comparison over the canonical
//! fields that matter for triage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::logic::recommend::types::{Recommendation, RecommendationCategory};
use crate::logic::schema::types::{CanonicalActivity, Severity};

/// Canonical field a rule condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    RiskScore,
    BreachCount,
    Hour,
}

impl RuleField {
    fn value_of(&self, activity: &CanonicalActivity) -> f64 {
        match self {
            RuleField::RiskScore => activity.risk_score,
            RuleField::BreachCount => activity.breach_count() as f64,
            RuleField::Hour => activity.hour as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub name: String,
    pub condition: RuleField,
    pub threshold: f64,
    pub enabled: bool,
    pub severity: Severity,
    /// Delivery channels, e.g. "email", "dashboard"
    pub notify_via: Vec<String>,
}

impl AlertRule {
    pub fn matches(&self, activity: &CanonicalActivity) -> bool {
        self.enabled && self.condition.value_of(activity) > self.threshold
    }
}

/// Evaluate rules across a dataset. Each matching rule yields one finding
/// covering every user that tripped it; disabled and non-matching rules
/// yield nothing.
pub fn evaluate_rules(
    rules: &[AlertRule],
    activities: &[CanonicalActivity],
) -> Vec<Recommendation> {
    let mut findings = Vec::new();
    for rule in rules {
        let users: BTreeSet<String> = activities
            .iter()
            .filter(|a| rule.matches(a))
            .map(|a| a.user_id.clone())
            .collect();
        if users.is_empty() {
            continue;
        }
        let users: Vec<String> = users.into_iter().collect();
        let hash = crc32fast::hash(format!("{}|{}", rule.name, users.join(",")).as_bytes());
        findings.push(Recommendation {
            id: format!("rule-{:08x}", hash),
            category: RecommendationCategory::Other,
            title: rule.name.clone(),
            description: format!(
                "Rule '{}' matched {} user(s)",
                rule.name,
                users.len()
            ),
            severity: rule.severity,
            confidence: 1.0,
            affected_users: users,
            suggested_actions: rule
                .notify_via
                .iter()
                .map(|c| format!("Notify via {}", c))
                .collect(),
            deviation_factors: vec![format!(
                "{:?} exceeded threshold {}",
                rule.condition, rule.threshold
            )],
        });
    }
    findings
}
