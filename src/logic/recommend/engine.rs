//! Finding Synthesis
//!
//! Runs the scorer and derived analytics over the dataset, synthesizes one
//! recommendation per detected pattern/cluster/anomaly group, ranks by
//! (severity desc, confidence desc), and truncates to the configured max.

use std::collections::{BTreeMap, BTreeSet};

use crc32fast::Hasher;

use super::types::{Recommendation, RecommendationCategory, RecommendConfig};
use crate::constants::{BULK_OPERATION_MIN, SEVERITY_HIGH_MIN};
use crate::logic::analytics::clustering::cluster_users;
use crate::logic::analytics::sequence::{mine_sequences, ActionStep};
use crate::logic::anomaly::scorer::{Scorer, ScorerConfig};
use crate::logic::features::extract::extract_features;
use crate::logic::schema::types::{CanonicalActivity, Severity};

/// Generate ranked findings for a dataset. Deterministic for fixed input and
/// config. Empty input yields an empty result.
pub fn generate_recommendations(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
) -> Vec<Recommendation> {
    if activities.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    detect_policy_breaches(activities, config, &mut findings);
    detect_suspicious_timing(activities, config, &mut findings);
    detect_high_risk_sequences(activities, config, &mut findings);
    detect_bulk_operations(activities, config, &mut findings);
    detect_cluster_outliers(activities, config, &mut findings);
    detect_scored_anomalies(activities, config, &mut findings);

    findings.retain(|r| r.confidence >= config.confidence_threshold);
    if !config.include_all_recommendations {
        findings.retain(|r| r.severity >= Severity::High);
    }
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.title.cmp(&b.title))
    });
    findings.truncate(config.max_recommendations);

    log::info!(
        "generated {} recommendations from {} activities",
        findings.len(),
        activities.len()
    );
    findings
}

// ============================================================================
// DETECTORS
// ============================================================================

fn detect_policy_breaches(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let breaching: Vec<&CanonicalActivity> = activities
        .iter()
        .filter(|a| a.breach_count() > 0.0)
        .collect();
    if breaching.is_empty() {
        return;
    }

    let users = user_set(breaching.iter().copied());
    let total: f64 = breaching.iter().map(|a| a.breach_count()).sum();
    let max_risk = max_risk(breaching.iter().copied());

    out.push(finding(
        RecommendationCategory::PolicyBreach,
        "Policy breaches detected".to_string(),
        format!(
            "{} policy breaches across {} activities by {} user(s)",
            total as u64,
            breaching.len(),
            users.len()
        ),
        Severity::from_risk(max_risk),
        scaled(0.45 + 0.05 * users.len() as f64, config),
        users,
        vec![
            "Review breached policies with affected users".to_string(),
            "Verify data handling compliance".to_string(),
        ],
        vec![format!("{} total breach occurrences", total as u64)],
    ));
}

fn detect_suspicious_timing(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let off_hours: Vec<&CanonicalActivity> = activities
        .iter()
        .filter(|a| config.critical_hours.contains(&a.hour) && a.risk_score >= SEVERITY_HIGH_MIN)
        .collect();
    if off_hours.is_empty() {
        return;
    }

    let users = user_set(off_hours.iter().copied());
    let hours: BTreeSet<u8> = off_hours.iter().map(|a| a.hour).collect();

    out.push(finding(
        RecommendationCategory::SuspiciousTiming,
        "High-risk activity during critical hours".to_string(),
        format!(
            "{} high-risk activities during critical hours by {} user(s)",
            off_hours.len(),
            users.len()
        ),
        Severity::from_risk(max_risk(off_hours.iter().copied())),
        scaled(0.5 + 0.05 * off_hours.len() as f64, config),
        users,
        vec![
            "Confirm legitimate business need for off-hours access".to_string(),
            "Consider time-based access restrictions".to_string(),
        ],
        hours
            .iter()
            .map(|h| format!("activity at hour {:02}:00", h))
            .collect(),
    ));
}

fn detect_high_risk_sequences(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    for pattern in mine_sequences(activities) {
        if !pattern.is_high_risk || pattern.count < 2 {
            continue;
        }
        let chain = pattern.steps.join(" -> ");
        out.push(finding(
            RecommendationCategory::HighRiskSequence,
            format!("High-risk action sequence: {}", chain),
            format!(
                "Chain {} observed {} times with average risk {:.0}",
                chain, pattern.count, pattern.average_risk_score
            ),
            Severity::from_risk(pattern.average_risk_score),
            scaled(0.5 + 0.1 * pattern.count as f64, config),
            pattern.users.clone(),
            vec![
                "Walk through the action chain with the user".to_string(),
                "Check destination of transferred data".to_string(),
            ],
            vec![format!("terminal step '{}'", pattern.steps.last().cloned().unwrap_or_default())],
        ));
    }
}

fn detect_bulk_operations(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    struct Transfer {
        moves: usize,
        risk_sum: f64,
        count: usize,
    }
    let mut per_user: BTreeMap<&str, Transfer> = BTreeMap::new();
    for activity in activities {
        let entry = per_user.entry(&activity.user_id).or_insert(Transfer {
            moves: 0,
            risk_sum: 0.0,
            count: 0,
        });
        entry.risk_sum += activity.risk_score;
        entry.count += 1;
        if matches!(
            ActionStep::classify(&activity.activity_description),
            ActionStep::Download | ActionStep::Upload
        ) {
            entry.moves += 1;
        }
    }

    for (user, transfer) in per_user {
        if transfer.moves < BULK_OPERATION_MIN {
            continue;
        }
        let avg_risk = transfer.risk_sum / transfer.count as f64;
        let exfil = avg_risk >= SEVERITY_HIGH_MIN;
        let (category, title) = if exfil {
            (
                RecommendationCategory::DataExfiltration,
                format!("Possible data exfiltration by {}", user),
            )
        } else {
            (
                RecommendationCategory::BulkOperations,
                format!("Bulk transfer activity by {}", user),
            )
        };
        out.push(finding(
            category,
            title,
            format!(
                "{} download/upload operations ({} activities, average risk {:.0})",
                transfer.moves, transfer.count, avg_risk
            ),
            Severity::from_risk(avg_risk),
            scaled(0.4 + 0.02 * transfer.moves as f64, config),
            vec![user.to_string()],
            vec![
                "Inventory the transferred files".to_string(),
                "Suspend transfer privileges pending review".to_string(),
            ],
            vec![format!("{} transfer operations", transfer.moves)],
        ));
    }
}

fn detect_cluster_outliers(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let clustering = cluster_users(activities, &config.clustering);
    let outliers: Vec<_> = clustering
        .profiles
        .iter()
        .filter(|p| p.is_outlier)
        .collect();
    if outliers.is_empty() {
        return;
    }

    let max_avg = outliers
        .iter()
        .map(|p| p.avg_risk_score)
        .fold(0.0f64, f64::max);
    out.push(finding(
        RecommendationCategory::UnusualBehavior,
        "Behavioral outlier users".to_string(),
        format!(
            "{} user(s) deviate strongly from peer behavior profiles",
            outliers.len()
        ),
        Severity::from_risk(max_avg),
        scaled(0.4 + 0.1 * outliers.len() as f64, config),
        outliers.iter().map(|p| p.user_id.clone()).collect(),
        vec![
            "Compare the user's recent activity to their historical baseline".to_string(),
            "Interview the user's manager".to_string(),
        ],
        outliers
            .iter()
            .map(|p| {
                format!(
                    "{}: avg risk {:.0}, diversity {}",
                    p.user_id, p.avg_risk_score, p.behavior_diversity
                )
            })
            .collect(),
    ));
}

fn detect_scored_anomalies(
    activities: &[CanonicalActivity],
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let vectors: Vec<_> = activities
        .iter()
        .map(|a| extract_features(a, &config.feature))
        .collect();
    let scorer = Scorer::select(
        &vectors,
        &ScorerConfig {
            use_reconstruction: config.use_anomaly_detection,
            train: config.train,
        },
    );

    let mut with_breach: Vec<&CanonicalActivity> = Vec::new();
    let mut without_breach: Vec<&CanonicalActivity> = Vec::new();
    let mut score_sum = 0.0;
    let mut score_count = 0usize;
    for (activity, vector) in activities.iter().zip(vectors.iter()) {
        let result = scorer.score(vector);
        if !result.is_anomaly {
            continue;
        }
        score_sum += result.anomaly_score;
        score_count += 1;
        if activity.breach_count() > 0.0 {
            with_breach.push(activity);
        } else {
            without_breach.push(activity);
        }
    }
    if score_count == 0 {
        return;
    }
    let avg_score = score_sum / score_count as f64;
    let method = scorer.method();

    if !with_breach.is_empty() {
        let users = user_set(with_breach.iter().copied());
        out.push(finding(
            RecommendationCategory::AccessViolation,
            "Anomalous activity with policy breaches".to_string(),
            format!(
                "{} anomalous activities carrying policy breaches ({} scoring)",
                with_breach.len(),
                method.as_str()
            ),
            Severity::from_risk(max_risk(with_breach.iter().copied())),
            scaled(avg_score / 100.0, config),
            users,
            vec!["Revoke access pending investigation".to_string()],
            vec![format!("average anomaly score {:.0}/100", avg_score)],
        ));
    }
    if !without_breach.is_empty() {
        let users = user_set(without_breach.iter().copied());
        out.push(finding(
            RecommendationCategory::UnusualBehavior,
            "Anomalous activity pattern".to_string(),
            format!(
                "{} activities deviate from the dataset profile ({} scoring)",
                without_breach.len(),
                method.as_str()
            ),
            Severity::from_risk(max_risk(without_breach.iter().copied())),
            scaled(avg_score / 100.0, config),
            users,
            vec!["Review flagged activities individually".to_string()],
            vec![format!("average anomaly score {:.0}/100", avg_score)],
        ));
    }
}

// ============================================================================
// HELPERS
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn finding(
    category: RecommendationCategory,
    title: String,
    description: String,
    severity: Severity,
    confidence: f64,
    affected_users: Vec<String>,
    suggested_actions: Vec<String>,
    deviation_factors: Vec<String>,
) -> Recommendation {
    let id = finding_id(category, &title, &affected_users);
    Recommendation {
        id,
        category,
        title,
        description,
        severity,
        confidence,
        affected_users,
        suggested_actions,
        deviation_factors,
    }
}

/// Deterministic finding id: same detector + same subjects => same id.
fn finding_id(category: RecommendationCategory, title: &str, users: &[String]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(title.as_bytes());
    for user in users {
        hasher.update(user.as_bytes());
        hasher.update(&[0]);
    }
    format!("rec-{}-{:08x}", category.as_str(), hasher.finalize())
}

fn scaled(base: f64, config: &RecommendConfig) -> f64 {
    (base * config.sensitivity_level).clamp(0.0, 1.0)
}

fn user_set<'a>(activities: impl Iterator<Item = &'a CanonicalActivity>) -> Vec<String> {
    let set: BTreeSet<String> = activities.map(|a| a.user_id.clone()).collect();
    set.into_iter().collect()
}

fn max_risk<'a>(activities: impl Iterator<Item = &'a CanonicalActivity>) -> f64 {
    activities.map(|a| a.risk_score).fold(0.0, f64::max)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::schema::normalize::normalize_activities;
    use serde_json::json;

    fn suspicious_dataset() -> Vec<CanonicalActivity> {
        let mut records = Vec::new();
        // Background noise
        for i in 0..30 {
            records.push(
                json!({
                    "username": format!("user{}", i % 6),
                    "timestamp": format!("2024-02-01T{:02}:15:00Z", 9 + i % 8),
                    "integration": "application",
                    "activityDescription": "login to workstation",
                    "riskScore": 100 + i * 10,
                })
                .as_object()
                .unwrap()
                .clone(),
            );
        }
        // Late-night high-risk transfers with breaches
        for i in 0..20 {
            records.push(
                json!({
                    "username": "mallory",
                    "timestamp": format!("2024-02-01T02:{:02}:00Z", i),
                    "integration": "usb",
                    "activityDescription": "download customer archive",
                    "riskScore": 2200,
                    "policiesBreached": {"pii": ["b1", "b2"]},
                })
                .as_object()
                .unwrap()
                .clone(),
            );
        }
        normalize_activities(&records).activities
    }

    #[test]
    fn test_empty_input_yields_no_findings() {
        assert!(generate_recommendations(&[], &RecommendConfig::default()).is_empty());
    }

    #[test]
    fn test_suspicious_dataset_yields_findings() {
        let config = RecommendConfig::default();
        let recs = generate_recommendations(&suspicious_dataset(), &config);
        assert!(!recs.is_empty());
        assert!(recs.len() <= config.max_recommendations);

        let categories: Vec<RecommendationCategory> = recs.iter().map(|r| r.category).collect();
        assert!(categories.contains(&RecommendationCategory::PolicyBreach));
        assert!(categories.contains(&RecommendationCategory::SuspiciousTiming));
        assert!(recs
            .iter()
            .any(|r| r.affected_users.contains(&"mallory".to_string())));
    }

    #[test]
    fn test_ranked_by_severity_then_confidence() {
        let recs = generate_recommendations(&suspicious_dataset(), &RecommendConfig::default());
        for pair in recs.windows(2) {
            let ordered = pair[0].severity > pair[1].severity
                || (pair[0].severity == pair[1].severity
                    && pair[0].confidence >= pair[1].confidence);
            assert!(ordered, "recommendations out of order");
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let dataset = suspicious_dataset();
        let config = RecommendConfig::default();
        let a = generate_recommendations(&dataset, &config);
        let b = generate_recommendations(&dataset, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_confidence_threshold_filters() {
        let config = RecommendConfig {
            confidence_threshold: 1.1,
            ..Default::default()
        };
        assert!(generate_recommendations(&suspicious_dataset(), &config).is_empty());
    }

    #[test]
    fn test_high_only_filter() {
        let config = RecommendConfig {
            include_all_recommendations: false,
            ..Default::default()
        };
        let recs = generate_recommendations(&suspicious_dataset(), &config);
        assert!(recs.iter().all(|r| r.severity >= Severity::High));
    }

    #[test]
    fn test_statistical_only_path() {
        let config = RecommendConfig {
            use_anomaly_detection: false,
            ..Default::default()
        };
        let a = generate_recommendations(&suspicious_dataset(), &config);
        let b = generate_recommendations(&suspicious_dataset(), &config);
        assert_eq!(a, b);
    }
}
