//! Alert Types
//!
//! An alert is the stateful wrapper around a recommendation: once a finding
//! becomes an alert it carries review state and survives re-analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::recommend::types::{Recommendation, RecommendationCategory};
use crate::logic::schema::types::Severity;

/// Review lifecycle state. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    /// Resolved and dismissed alerts accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Reviewing => "reviewing",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
        }
    }
}

/// Disposition recorded when a manager closes out an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerAction {
    pub action: String,
    pub comments: String,
    pub timestamp: DateTime<Utc>,
    pub manager_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub recommendation_id: String,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    pub affected_users: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub deviation_factors: Vec<String>,
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_action: Option<ManagerAction>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Wrap a freshly generated finding in a pending alert.
    pub fn from_recommendation(rec: &Recommendation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recommendation_id: rec.id.clone(),
            category: rec.category,
            title: rec.title.clone(),
            description: rec.description.clone(),
            severity: rec.severity,
            confidence: rec.confidence,
            affected_users: rec.affected_users.clone(),
            suggested_actions: rec.suggested_actions.clone(),
            deviation_factors: rec.deviation_factors.clone(),
            status: AlertStatus::Pending,
            assigned_to: None,
            manager_action: None,
            created_at: Utc::now(),
        }
    }

    /// Two alerts describe the same situation when they share a category and
    /// at least one affected user.
    pub fn covers(&self, rec: &Recommendation) -> bool {
        self.category == rec.category
            && rec
                .affected_users
                .iter()
                .any(|u| self.affected_users.contains(u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::recommend::types::RecommendationCategory;

    fn rec(category: RecommendationCategory, users: &[&str]) -> Recommendation {
        Recommendation {
            id: "rec-test-00000000".into(),
            category,
            title: "Test".into(),
            description: "test".into(),
            severity: Severity::High,
            confidence: 0.8,
            affected_users: users.iter().map(|s| s.to_string()).collect(),
            suggested_actions: vec![],
            deviation_factors: vec![],
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::Dismissed.is_terminal());
        assert!(!AlertStatus::Pending.is_terminal());
        assert!(!AlertStatus::Reviewing.is_terminal());
    }

    #[test]
    fn test_covers_requires_category_and_user_overlap() {
        let alert = Alert::from_recommendation(&rec(
            RecommendationCategory::PolicyBreach,
            &["alice", "bob"],
        ));
        assert!(alert.covers(&rec(RecommendationCategory::PolicyBreach, &["bob"])));
        assert!(!alert.covers(&rec(RecommendationCategory::PolicyBreach, &["carol"])));
        assert!(!alert.covers(&rec(RecommendationCategory::SuspiciousTiming, &["bob"])));
    }
}
