//! Analysis Pipeline Runner
//!
//! Host-agnostic orchestration of the full pipeline: sampling, chunked
//! scoring, derived analytics, recommendations. `run_analysis` drives a
//! caller-supplied update callback; `AnalysisHost` wraps it in a worker
//! thread with channel-based messaging for interactive frontends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::constants::{ANALYSIS_CHUNK_SIZE, ANALYSIS_SAMPLE_CEILING, PROGRESS_THROTTLE_MS};
use crate::logic::analytics::clustering::{cluster_users, ClusteringResult};
use crate::logic::analytics::heatmap::TemporalHeatmap;
use crate::logic::analytics::sampling::stratified_sample;
use crate::logic::analytics::sequence::{mine_sequences, SequencePattern};
use crate::logic::anomaly::scorer::{Scorer, ScorerConfig};
use crate::logic::anomaly::types::{AnomalyResult, ScoreMethod};
use crate::logic::features::extract::extract_features;
use crate::logic::recommend::engine::generate_recommendations;
use crate::logic::recommend::types::{Recommendation, RecommendConfig};
use crate::logic::schema::types::CanonicalActivity;

// ============================================================================
// CONFIG AND RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Datasets above this size are stratified-sampled before analysis
    pub sample_ceiling: usize,
    /// Scoring batch size; cancellation is checked between chunks
    pub chunk_size: usize,
    pub recommend: RecommendConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_ceiling: ANALYSIS_SAMPLE_CEILING,
            chunk_size: ANALYSIS_CHUNK_SIZE,
            recommend: RecommendConfig::default(),
        }
    }
}

/// Per-activity anomaly verdict, keyed to the activity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityScore {
    pub activity_id: String,
    pub anomaly: AnomalyResult,
}

/// The authoritative output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub scores: Vec<ActivityScore>,
    pub method: ScoreMethod,
    pub heatmap: TemporalHeatmap,
    pub sequences: Vec<SequencePattern>,
    pub clustering: ClusteringResult,
    pub recommendations: Vec<Recommendation>,
    /// True when the dataset was down-sampled before analysis
    pub sampled: bool,
    pub analyzed_count: usize,
    pub original_count: usize,
}

/// Advisory mid-run output. Each variant is emitted at most once per run,
/// always before `Complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "data")]
pub enum PartialResult {
    Heatmap(TemporalHeatmap),
    Sequences(Vec<SequencePattern>),
    Clustering(ClusteringResult),
}

/// Update pushed to the caller during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisUpdate {
    /// Monotone, 0-100
    Progress(u8),
    Partial(PartialResult),
}

#[derive(Debug)]
pub enum AnalysisError {
    /// The update callback requested a stop
    Cancelled,
    Step { step: String, detail: String },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Cancelled => write!(f, "analysis cancelled"),
            AnalysisError::Step { step, detail } => {
                write!(f, "analysis failed at {}: {}", step, detail)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

// ============================================================================
// PIPELINE
// ============================================================================

/// Run the full pipeline. `on_update` receives progress and partial results;
/// returning false cancels the run between chunks and nothing further is
/// emitted. Progress never decreases and ends at 100 on success.
pub fn run_analysis(
    activities: &[CanonicalActivity],
    config: &AnalysisConfig,
    on_update: &mut dyn FnMut(AnalysisUpdate) -> bool,
) -> Result<AnalysisResult, AnalysisError> {
    if config.chunk_size == 0 {
        return Err(AnalysisError::Step {
            step: "configuration".to_string(),
            detail: "chunk_size must be at least 1".to_string(),
        });
    }

    let mut progress = Progress::new(on_update);
    progress.report(0)?;

    let original_count = activities.len();
    let sample = stratified_sample(activities, config.sample_ceiling);
    let activities = &sample.activities;
    if sample.sampled {
        log::info!(
            "analysis input sampled: {} of {} activities",
            activities.len(),
            sample.original_len
        );
    }
    progress.report(5)?;

    // Chunked scoring. The scorer is selected once over the whole feature
    // set, then applied chunk by chunk with cancellation between chunks.
    let vectors: Vec<_> = activities
        .iter()
        .map(|a| extract_features(a, &config.recommend.feature))
        .collect();
    let scorer_config = ScorerConfig {
        use_reconstruction: config.recommend.use_anomaly_detection,
        train: config.recommend.train.clone(),
    };
    let scorer = Scorer::select(&vectors, &scorer_config);

    let chunk_size = config.chunk_size;
    let mut scores = Vec::with_capacity(activities.len());
    let total_chunks = activities.len().div_ceil(chunk_size).max(1);
    for (chunk_idx, chunk) in activities.chunks(chunk_size).enumerate() {
        let offset = chunk_idx * chunk_size;
        for (i, activity) in chunk.iter().enumerate() {
            scores.push(ActivityScore {
                activity_id: activity.id.clone(),
                anomaly: scorer.score(&vectors[offset + i]),
            });
        }
        // 5 -> 60 across the chunks
        progress.report(5 + (55 * (chunk_idx + 1) / total_chunks) as u8)?;
    }

    let mut heatmap = TemporalHeatmap::build(activities);
    if config.recommend.use_anomaly_detection {
        heatmap.apply_reconstruction_boost(&config.recommend.train);
    }
    progress.partial(PartialResult::Heatmap(heatmap.clone()))?;
    progress.report(70)?;

    let sequences = mine_sequences(activities);
    progress.partial(PartialResult::Sequences(sequences.clone()))?;
    progress.report(80)?;

    let clustering = cluster_users(activities, &config.recommend.clustering);
    progress.partial(PartialResult::Clustering(clustering.clone()))?;
    progress.report(90)?;

    let recommendations = generate_recommendations(activities, &config.recommend);
    progress.report(100)?;

    Ok(AnalysisResult {
        scores,
        method: scorer.method(),
        heatmap,
        sequences,
        clustering,
        recommendations,
        sampled: sample.sampled,
        analyzed_count: activities.len(),
        original_count,
    })
}

/// Monotone progress reporter over the update callback.
struct Progress<'a> {
    on_update: &'a mut dyn FnMut(AnalysisUpdate) -> bool,
    last: u8,
}

impl<'a> Progress<'a> {
    fn new(on_update: &'a mut dyn FnMut(AnalysisUpdate) -> bool) -> Self {
        Self { on_update, last: 0 }
    }

    fn report(&mut self, value: u8) -> Result<(), AnalysisError> {
        let value = value.max(self.last);
        self.last = value;
        if (self.on_update)(AnalysisUpdate::Progress(value)) {
            Ok(())
        } else {
            Err(AnalysisError::Cancelled)
        }
    }

    fn partial(&mut self, partial: PartialResult) -> Result<(), AnalysisError> {
        if (self.on_update)(AnalysisUpdate::Partial(partial)) {
            Ok(())
        } else {
            Err(AnalysisError::Cancelled)
        }
    }
}

// ============================================================================
// BACKGROUND HOST
// ============================================================================

pub enum HostRequest {
    Process {
        activities: Vec<CanonicalActivity>,
        config: AnalysisConfig,
    },
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Progress(u8),
    Partial(PartialResult),
    Complete(Box<AnalysisResult>),
    Error { step: String, detail: String },
}

/// Worker-thread wrapper around `run_analysis`. Requests go in over a
/// channel, events come out over another. Cancellation is a shared flag
/// checked between chunks; after a cancel nothing further is emitted for
/// that run.
pub struct AnalysisHost {
    requests: Option<Sender<HostRequest>>,
    events: Receiver<HostEvent>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AnalysisHost {
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = unbounded::<HostRequest>();
        let (evt_tx, evt_rx) = unbounded::<HostEvent>();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let worker = std::thread::spawn(move || {
            while let Ok(request) = req_rx.recv() {
                match request {
                    HostRequest::Cancel => worker_cancel.store(true, Ordering::SeqCst),
                    HostRequest::Process { activities, config } => {
                        worker_cancel.store(false, Ordering::SeqCst);
                        Self::run_one(&activities, &config, &evt_tx, &worker_cancel);
                    }
                }
            }
        });

        Self {
            requests: Some(req_tx),
            events: evt_rx,
            cancel,
            worker: Some(worker),
        }
    }

    /// Queue a dataset for analysis.
    pub fn submit(&self, activities: Vec<CanonicalActivity>, config: AnalysisConfig) {
        if let Some(requests) = &self.requests {
            let _ = requests.send(HostRequest::Process { activities, config });
        }
    }

    /// Request cancellation of the in-flight run.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(requests) = &self.requests {
            let _ = requests.send(HostRequest::Cancel);
        }
    }

    pub fn events(&self) -> &Receiver<HostEvent> {
        &self.events
    }

    fn run_one(
        activities: &[CanonicalActivity],
        config: &AnalysisConfig,
        events: &Sender<HostEvent>,
        cancel: &AtomicBool,
    ) {
        let throttle = Duration::from_millis(PROGRESS_THROTTLE_MS);
        let mut last_emit: Option<Instant> = None;
        let mut callback = |update: AnalysisUpdate| -> bool {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            match update {
                AnalysisUpdate::Progress(value) => {
                    // Throttled; terminal progress always goes through
                    let due = last_emit.map_or(true, |t| t.elapsed() >= throttle);
                    if value == 100 || due {
                        last_emit = Some(Instant::now());
                        let _ = events.send(HostEvent::Progress(value));
                    }
                }
                AnalysisUpdate::Partial(partial) => {
                    let _ = events.send(HostEvent::Partial(partial));
                }
            }
            true
        };

        match run_analysis(activities, config, &mut callback) {
            Ok(result) => {
                if !cancel.load(Ordering::SeqCst) {
                    let _ = events.send(HostEvent::Complete(Box::new(result)));
                }
            }
            Err(AnalysisError::Cancelled) => {
                log::info!("analysis run cancelled");
            }
            Err(AnalysisError::Step { step, detail }) => {
                let _ = events.send(HostEvent::Error { step, detail });
            }
        }
    }
}

impl Drop for AnalysisHost {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::schema::types::{ActivityStatus, Integration, Severity};
    use chrono::TimeZone;

    fn activity(id: usize, user: &str, risk: f64, hour: u8, desc: &str) -> CanonicalActivity {
        CanonicalActivity {
            id: format!("a-{}", id),
            user_id: user.into(),
            timestamp: chrono::Utc
                .with_ymd_and_hms(2024, 3, 1 + (id % 20) as u32, hour as u32, (id % 60) as u32, 0)
                .unwrap(),
            hour,
            integration: Integration::Cloud,
            activity_description: desc.into(),
            risk_score: risk,
            severity: Severity::from_risk(risk),
            status: ActivityStatus::UnderReview,
            policies_breached: Default::default(),
            time_degraded: false,
        }
    }

    fn dataset(n: usize) -> Vec<CanonicalActivity> {
        (0..n)
            .map(|i| activity(i, &format!("user-{}", i % 5), 400.0 + (i % 7) as f64 * 100.0, 10, "accessed file"))
            .collect()
    }

    #[test]
    fn test_progress_is_monotone_and_terminal() {
        let mut seen = Vec::new();
        let result = run_analysis(&dataset(40), &AnalysisConfig::default(), &mut |u| {
            if let AnalysisUpdate::Progress(p) = u {
                seen.push(p);
            }
            true
        })
        .unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
        assert_eq!(result.scores.len(), 40);
        assert!(!result.sampled);
    }

    #[test]
    fn test_partials_arrive_before_completion() {
        let mut kinds = Vec::new();
        run_analysis(&dataset(30), &AnalysisConfig::default(), &mut |u| {
            if let AnalysisUpdate::Partial(p) = u {
                kinds.push(match p {
                    PartialResult::Heatmap(_) => "heatmap",
                    PartialResult::Sequences(_) => "sequences",
                    PartialResult::Clustering(_) => "clustering",
                });
            }
            true
        })
        .unwrap();
        assert_eq!(kinds, vec!["heatmap", "sequences", "clustering"]);
    }

    #[test]
    fn test_cancellation_stops_the_run() {
        let mut updates = 0;
        let err = run_analysis(&dataset(100), &AnalysisConfig::default(), &mut |_| {
            updates += 1;
            updates < 3
        })
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(updates, 3);
    }

    #[test]
    fn test_oversized_input_is_sampled() {
        let config = AnalysisConfig {
            sample_ceiling: 50,
            ..AnalysisConfig::default()
        };
        let result = run_analysis(&dataset(200), &config, &mut |_| true).unwrap();
        assert!(result.sampled);
        assert_eq!(result.original_count, 200);
        assert!(result.analyzed_count <= 50);
        assert_eq!(result.scores.len(), result.analyzed_count);
    }

    #[test]
    fn test_statistical_only_skips_heatmap_boost() {
        let config = AnalysisConfig {
            recommend: RecommendConfig {
                use_anomaly_detection: false,
                ..RecommendConfig::default()
            },
            ..AnalysisConfig::default()
        };
        let result = run_analysis(&dataset(40), &config, &mut |_| true).unwrap();
        assert_eq!(result.method, ScoreMethod::Statistical);
        assert!(!result.heatmap.boosted);

        // The default config on the same data does boost
        let boosted = run_analysis(&dataset(40), &AnalysisConfig::default(), &mut |_| true).unwrap();
        assert!(boosted.heatmap.boosted);
    }

    #[test]
    fn test_zero_chunk_size_is_a_config_error() {
        let config = AnalysisConfig {
            chunk_size: 0,
            ..AnalysisConfig::default()
        };
        let mut updates = 0;
        let err = run_analysis(&dataset(10), &config, &mut |_| {
            updates += 1;
            true
        })
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Step { ref step, .. } if step == "configuration"));
        // Rejected before anything is emitted
        assert_eq!(updates, 0);
    }

    #[test]
    fn test_host_reports_config_error() {
        let host = AnalysisHost::spawn();
        host.submit(
            dataset(10),
            AnalysisConfig {
                chunk_size: 0,
                ..AnalysisConfig::default()
            },
        );
        match host.events().recv_timeout(Duration::from_secs(10)) {
            Ok(HostEvent::Error { step, .. }) => assert_eq!(step, "configuration"),
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_completes() {
        let result = run_analysis(&[], &AnalysisConfig::default(), &mut |_| true).unwrap();
        assert!(result.scores.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.analyzed_count, 0);
    }

    #[test]
    fn test_host_round_trip() {
        let host = AnalysisHost::spawn();
        host.submit(dataset(30), AnalysisConfig::default());

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut complete = None;
        while Instant::now() < deadline {
            match host.events().recv_timeout(Duration::from_secs(5)) {
                Ok(HostEvent::Complete(result)) => {
                    complete = Some(result);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        let result = complete.expect("host should complete");
        assert_eq!(result.scores.len(), 30);
    }
}
