//! Sequence-Pattern Mining
//!
//! Groups sequential actions per user into ordered step chains and
//! aggregates chains by shape. A pattern is high-risk when its terminal step
//! is risky or its average risk clears the fixed cutoff.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_RISK_SEQUENCE_CUTOFF, SEQUENCE_WINDOW};
use crate::logic::schema::types::CanonicalActivity;

// ============================================================================
// ACTION STEPS
// ============================================================================

/// Coarse action classification derived from the activity description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStep {
    Login,
    Access,
    Download,
    Upload,
    Modify,
    Delete,
    Email,
    Other,
}

impl ActionStep {
    pub fn classify(description: &str) -> Self {
        let d = description.to_lowercase();
        if d.contains("login") || d.contains("log in") || d.contains("sign in") {
            ActionStep::Login
        } else if d.contains("download") || d.contains("export") {
            ActionStep::Download
        } else if d.contains("upload") || d.contains("transfer") {
            ActionStep::Upload
        } else if d.contains("delete") || d.contains("remove") {
            ActionStep::Delete
        } else if d.contains("modify") || d.contains("edit") || d.contains("change") {
            ActionStep::Modify
        } else if d.contains("email") || d.contains("sent") || d.contains("send") {
            ActionStep::Email
        } else if d.contains("access") || d.contains("open") || d.contains("view") {
            ActionStep::Access
        } else {
            ActionStep::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStep::Login => "login",
            ActionStep::Access => "access",
            ActionStep::Download => "download",
            ActionStep::Upload => "upload",
            ActionStep::Modify => "modify",
            ActionStep::Delete => "delete",
            ActionStep::Email => "email",
            ActionStep::Other => "other",
        }
    }

    /// Steps that make a chain high-risk when terminal.
    pub fn is_risky_terminal(&self) -> bool {
        matches!(
            self,
            ActionStep::Download | ActionStep::Upload | ActionStep::Delete
        )
    }
}

// ============================================================================
// PATTERNS
// ============================================================================

/// An aggregated chain shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePattern {
    pub steps: Vec<String>,
    pub count: u64,
    pub average_risk_score: f64,
    /// Users observed producing this chain, sorted
    pub users: Vec<String>,
    pub is_high_risk: bool,
}

/// Mine step-chain patterns across the dataset. Empty input yields an empty
/// result. Deterministic: users and patterns are ordered.
pub fn mine_sequences(activities: &[CanonicalActivity]) -> Vec<SequencePattern> {
    // Per-user chronological streams (BTreeMap for stable user order)
    let mut streams: BTreeMap<&str, Vec<&CanonicalActivity>> = BTreeMap::new();
    for activity in activities {
        streams.entry(&activity.user_id).or_default().push(activity);
    }

    struct Accum {
        steps: Vec<ActionStep>,
        count: u64,
        risk_sum: f64,
        users: BTreeSet<String>,
    }
    let mut patterns: BTreeMap<String, Accum> = BTreeMap::new();

    for (user, mut stream) in streams {
        stream.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        if stream.len() < 2 {
            continue;
        }

        let chains: Vec<&[&CanonicalActivity]> = if stream.len() < SEQUENCE_WINDOW {
            vec![&stream[..]]
        } else {
            stream.windows(SEQUENCE_WINDOW).collect()
        };

        for chain in chains {
            let steps: Vec<ActionStep> = chain
                .iter()
                .map(|a| ActionStep::classify(&a.activity_description))
                .collect();
            let key = steps
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join("->");
            let chain_risk =
                chain.iter().map(|a| a.risk_score).sum::<f64>() / chain.len() as f64;

            let entry = patterns.entry(key).or_insert_with(|| Accum {
                steps,
                count: 0,
                risk_sum: 0.0,
                users: BTreeSet::new(),
            });
            entry.count += 1;
            entry.risk_sum += chain_risk;
            entry.users.insert(user.to_string());
        }
    }

    let mut result: Vec<SequencePattern> = patterns
        .into_values()
        .map(|accum| {
            let average_risk_score = accum.risk_sum / accum.count as f64;
            let terminal_risky = accum
                .steps
                .last()
                .map(ActionStep::is_risky_terminal)
                .unwrap_or(false);
            SequencePattern {
                steps: accum.steps.iter().map(|s| s.as_str().to_string()).collect(),
                count: accum.count,
                average_risk_score,
                users: accum.users.into_iter().collect(),
                is_high_risk: terminal_risky
                    || average_risk_score > HIGH_RISK_SEQUENCE_CUTOFF,
            }
        })
        .collect();

    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.steps.cmp(&b.steps)));
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::schema::normalize::normalize_activities;
    use serde_json::json;

    fn activities(entries: &[(&str, &str, &str, f64)]) -> Vec<CanonicalActivity> {
        let records: Vec<_> = entries
            .iter()
            .map(|(user, time, description, risk)| {
                json!({
                    "username": user,
                    "timestamp": time,
                    "activityDescription": description,
                    "riskScore": risk,
                })
                .as_object()
                .unwrap()
                .clone()
            })
            .collect();
        normalize_activities(&records).activities
    }

    #[test]
    fn test_empty_input() {
        assert!(mine_sequences(&[]).is_empty());
    }

    #[test]
    fn test_repeated_chain_aggregates() {
        let acts = activities(&[
            ("alice", "2024-02-01T09:00:00Z", "login to portal", 100.0),
            ("alice", "2024-02-01T09:05:00Z", "access report", 100.0),
            ("alice", "2024-02-01T09:10:00Z", "modify record", 100.0),
            ("bob", "2024-02-01T10:00:00Z", "login to portal", 200.0),
            ("bob", "2024-02-01T10:05:00Z", "access report", 200.0),
            ("bob", "2024-02-01T10:10:00Z", "modify record", 200.0),
        ]);
        let patterns = mine_sequences(&acts);
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.steps, vec!["login", "access", "modify"]);
        assert_eq!(p.count, 2);
        assert_eq!(p.users, vec!["alice", "bob"]);
        assert!((p.average_risk_score - 150.0).abs() < 1e-9);
        assert!(!p.is_high_risk);
    }

    #[test]
    fn test_risky_terminal_step() {
        let acts = activities(&[
            ("carol", "2024-02-01T22:00:00Z", "login to vpn", 100.0),
            ("carol", "2024-02-01T22:05:00Z", "access customer db", 100.0),
            ("carol", "2024-02-01T22:10:00Z", "download full dump", 100.0),
        ]);
        let patterns = mine_sequences(&acts);
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_high_risk);
    }

    #[test]
    fn test_high_average_risk_marks_chain() {
        let acts = activities(&[
            ("dave", "2024-02-01T09:00:00Z", "login", 1800.0),
            ("dave", "2024-02-01T09:05:00Z", "access files", 1900.0),
            ("dave", "2024-02-01T09:10:00Z", "modify acl", 1700.0),
        ]);
        let patterns = mine_sequences(&acts);
        assert!(patterns[0].is_high_risk);
    }

    #[test]
    fn test_short_stream_uses_whole_chain() {
        let acts = activities(&[
            ("erin", "2024-02-01T09:00:00Z", "login", 10.0),
            ("erin", "2024-02-01T09:01:00Z", "download data", 10.0),
        ]);
        let patterns = mine_sequences(&acts);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].steps, vec!["login", "download"]);
    }

    #[test]
    fn test_single_activity_user_ignored() {
        let acts = activities(&[("frank", "2024-02-01T09:00:00Z", "login", 10.0)]);
        assert!(mine_sequences(&acts).is_empty());
    }
}
