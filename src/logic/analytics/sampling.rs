//! Stratified Down-Sampling
//!
//! Selects a representative subset across severity strata instead of a
//! uniform cut, so large datasets bound processing cost without biasing the
//! result toward the low-risk majority. Deterministic: picks are evenly
//! spaced within each stratum, no randomness.

use crate::logic::schema::types::{CanonicalActivity, Severity};

/// Result of a sampling pass. `sampled` is false when the input fit whole.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub activities: Vec<CanonicalActivity>,
    pub sampled: bool,
    pub original_len: usize,
}

/// Down-sample to at most `max` activities, stratified by severity,
/// preserving input order.
pub fn stratified_sample(activities: &[CanonicalActivity], max: usize) -> SampleOutcome {
    let original_len = activities.len();
    if original_len <= max {
        return SampleOutcome {
            activities: activities.to_vec(),
            sampled: false,
            original_len,
        };
    }
    if max == 0 {
        return SampleOutcome {
            activities: Vec::new(),
            sampled: true,
            original_len,
        };
    }

    // Indices per severity stratum, in input order
    let strata: Vec<Vec<usize>> = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ]
    .iter()
    .map(|severity| {
        activities
            .iter()
            .enumerate()
            .filter(|(_, a)| a.severity == *severity)
            .map(|(i, _)| i)
            .collect()
    })
    .collect();

    let mut quotas = proportional_quotas(&strata, max, original_len);

    // Every non-empty stratum keeps at least one representative when room allows
    let non_empty = strata.iter().filter(|s| !s.is_empty()).count();
    if max >= non_empty {
        for (stratum, quota) in strata.iter().zip(quotas.iter_mut()) {
            if !stratum.is_empty() && *quota == 0 {
                *quota = 1;
            }
        }
        rebalance(&strata, &mut quotas, max);
    }

    let mut selected: Vec<usize> = Vec::with_capacity(max);
    for (stratum, &quota) in strata.iter().zip(quotas.iter()) {
        selected.extend(evenly_spaced(stratum, quota));
    }
    selected.sort_unstable();

    log::debug!(
        "stratified sampling: {} -> {} activities",
        original_len,
        selected.len()
    );

    SampleOutcome {
        activities: selected.iter().map(|&i| activities[i].clone()).collect(),
        sampled: true,
        original_len,
    }
}

fn proportional_quotas(strata: &[Vec<usize>], max: usize, total: usize) -> Vec<usize> {
    let mut quotas: Vec<usize> = strata
        .iter()
        .map(|s| s.len() * max / total)
        .collect();

    // Hand out the rounding remainder to the largest strata first
    let mut remainder = max.saturating_sub(quotas.iter().sum());
    let mut order: Vec<usize> = (0..strata.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(strata[i].len()));
    for &i in &order {
        if remainder == 0 {
            break;
        }
        if quotas[i] < strata[i].len() {
            quotas[i] += 1;
            remainder -= 1;
        }
    }
    quotas
}

/// Trim quota overflow (from the minimum-one rule) from the largest strata.
fn rebalance(strata: &[Vec<usize>], quotas: &mut [usize], max: usize) {
    let mut total: usize = quotas.iter().sum();
    while total > max {
        if let Some(i) = (0..quotas.len())
            .filter(|&i| quotas[i] > 1)
            .max_by_key(|&i| strata[i].len())
        {
            quotas[i] -= 1;
            total -= 1;
        } else {
            break;
        }
    }
}

fn evenly_spaced(stratum: &[usize], quota: usize) -> Vec<usize> {
    if quota == 0 || stratum.is_empty() {
        return Vec::new();
    }
    let quota = quota.min(stratum.len());
    (0..quota)
        .map(|k| stratum[k * stratum.len() / quota])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::schema::normalize::normalize_activities;
    use serde_json::json;

    fn dataset(counts: &[(f64, usize)]) -> Vec<CanonicalActivity> {
        let mut records = Vec::new();
        for &(risk, n) in counts {
            for i in 0..n {
                records.push(
                    json!({
                        "username": format!("user{}", i % 10),
                        "timestamp": "2024-02-01T10:00:00Z",
                        "riskScore": risk,
                    })
                    .as_object()
                    .unwrap()
                    .clone(),
                );
            }
        }
        normalize_activities(&records).activities
    }

    #[test]
    fn test_small_input_passes_through() {
        let activities = dataset(&[(100.0, 50)]);
        let outcome = stratified_sample(&activities, 100);
        assert!(!outcome.sampled);
        assert_eq!(outcome.activities.len(), 50);
    }

    #[test]
    fn test_sampling_bounds_output_and_flags() {
        let activities = dataset(&[(100.0, 900), (2500.0, 100)]);
        let outcome = stratified_sample(&activities, 100);
        assert!(outcome.sampled);
        assert_eq!(outcome.activities.len(), 100);
        assert_eq!(outcome.original_len, 1000);
    }

    #[test]
    fn test_minority_stratum_survives() {
        // 2 critical records in a sea of low-risk ones must not be lost
        let activities = dataset(&[(100.0, 998), (2500.0, 2)]);
        let outcome = stratified_sample(&activities, 50);
        assert!(outcome
            .activities
            .iter()
            .any(|a| a.severity == Severity::Critical));
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let activities = dataset(&[(100.0, 500), (1600.0, 300), (2500.0, 200)]);
        let a = stratified_sample(&activities, 120);
        let b = stratified_sample(&activities, 120);
        let ids_a: Vec<&str> = a.activities.iter().map(|x| x.id.as_str()).collect();
        let ids_b: Vec<&str> = b.activities.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_empty_input() {
        let outcome = stratified_sample(&[], 10);
        assert!(!outcome.sampled);
        assert!(outcome.activities.is_empty());
    }
}
