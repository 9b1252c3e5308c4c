//! User Clustering
//!
//! Per-user behavioral aggregates classified into a small fixed set of
//! clusters by threshold rules. Large datasets are stratified-sampled and
//! the result is marked as sampled, output bounded by max users.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::sampling::stratified_sample;
use super::sequence::ActionStep;
use crate::constants::{CLUSTERING_MAX_USERS, CLUSTERING_SAMPLE_CEILING};
use crate::logic::schema::types::CanonicalActivity;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabel {
    HighRisk,
    Diverse,
    Active,
    Normal,
}

impl ClusterLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterLabel::HighRisk => "high_risk",
            ClusterLabel::Diverse => "diverse",
            ClusterLabel::Active => "active",
            ClusterLabel::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub activity_count: usize,
    pub avg_risk_score: f64,
    pub integrations: Vec<String>,
    pub actions: Vec<String>,
    pub breach_count: f64,
    /// |integrations| + |actions|
    pub behavior_diversity: usize,
    pub cluster: ClusterLabel,
    pub is_outlier: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub profiles: Vec<UserProfile>,
    /// True when the input was down-sampled or the output truncated
    pub sampled: bool,
    /// Distinct users before output truncation
    pub total_users: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub sample_ceiling: usize,
    pub max_users: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            sample_ceiling: CLUSTERING_SAMPLE_CEILING,
            max_users: CLUSTERING_MAX_USERS,
        }
    }
}

// Classification thresholds
const HIGH_RISK_AVG: f64 = 1500.0;
const HIGH_RISK_BREACHES: f64 = 10.0;
const DIVERSE_MIN: usize = 8;
const ACTIVE_MIN: usize = 50;
const OUTLIER_AVG: f64 = 2000.0;
const OUTLIER_BREACHES: f64 = 20.0;
const OUTLIER_NARROW_AVG: f64 = 1000.0;
const OUTLIER_NARROW_DIVERSITY: usize = 2;

// ============================================================================
// CLUSTERING
// ============================================================================

/// Cluster users by behavior. Empty input yields an empty result.
pub fn cluster_users(
    activities: &[CanonicalActivity],
    config: &ClusteringConfig,
) -> ClusteringResult {
    let sample = stratified_sample(activities, config.sample_ceiling);
    let mut sampled = sample.sampled;

    struct Accum {
        risk_sum: f64,
        count: usize,
        integrations: BTreeSet<&'static str>,
        actions: BTreeSet<&'static str>,
        breach_count: f64,
    }
    let mut per_user: BTreeMap<String, Accum> = BTreeMap::new();

    for activity in &sample.activities {
        let entry = per_user
            .entry(activity.user_id.clone())
            .or_insert_with(|| Accum {
                risk_sum: 0.0,
                count: 0,
                integrations: BTreeSet::new(),
                actions: BTreeSet::new(),
                breach_count: 0.0,
            });
        entry.risk_sum += activity.risk_score;
        entry.count += 1;
        entry.integrations.insert(activity.integration.as_str());
        entry
            .actions
            .insert(ActionStep::classify(&activity.activity_description).as_str());
        entry.breach_count += activity.breach_count();
    }

    let total_users = per_user.len();
    let mut profiles: Vec<UserProfile> = per_user
        .into_iter()
        .map(|(user_id, accum)| {
            let avg_risk_score = accum.risk_sum / accum.count as f64;
            let behavior_diversity = accum.integrations.len() + accum.actions.len();
            let cluster = classify(avg_risk_score, accum.breach_count, behavior_diversity, accum.count);
            let is_outlier = avg_risk_score >= OUTLIER_AVG
                || accum.breach_count >= OUTLIER_BREACHES
                || (avg_risk_score >= OUTLIER_NARROW_AVG
                    && behavior_diversity <= OUTLIER_NARROW_DIVERSITY);
            UserProfile {
                user_id,
                activity_count: accum.count,
                avg_risk_score,
                integrations: accum.integrations.iter().map(|s| s.to_string()).collect(),
                actions: accum.actions.iter().map(|s| s.to_string()).collect(),
                breach_count: accum.breach_count,
                behavior_diversity,
                cluster,
                is_outlier,
            }
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.avg_risk_score
            .partial_cmp(&a.avg_risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    if profiles.len() > config.max_users {
        profiles.truncate(config.max_users);
        sampled = true;
    }

    ClusteringResult {
        profiles,
        sampled,
        total_users,
    }
}

fn classify(avg_risk: f64, breaches: f64, diversity: usize, count: usize) -> ClusterLabel {
    if avg_risk >= HIGH_RISK_AVG || breaches >= HIGH_RISK_BREACHES {
        ClusterLabel::HighRisk
    } else if diversity >= DIVERSE_MIN {
        ClusterLabel::Diverse
    } else if count >= ACTIVE_MIN {
        ClusterLabel::Active
    } else {
        ClusterLabel::Normal
    }
}

// ============================================================================
// TESTS
// ============================================================================
