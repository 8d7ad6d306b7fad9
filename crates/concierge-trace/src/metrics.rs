//! In-process aggregation of completed turns.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use concierge_types::TurnReport;

/// Aggregates completed turns for a health/metrics endpoint.
///
/// Shared behind `Arc` with the orchestrator; every method takes `&self`.
pub struct MetricsRecorder {
    inner: Mutex<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    turns_by_intent: BTreeMap<String, u64>,
    escalated: u64,
    review_score_sum: u64,
    latencies: Vec<Duration>,
}

/// Point-in-time aggregate over all turns recorded so far.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub turns_total: u64,
    /// Completed turn count keyed by intent name, sorted for stable output.
    pub turns_by_intent: BTreeMap<String, u64>,
    /// Fraction of turns that escalated, in [0, 1]. Zero when no turns.
    pub escalation_rate: f64,
    /// Mean review score on the 1-10 scale. Zero when no turns.
    pub mean_review_score: f64,
    /// 95th percentile turn latency. `None` when no turns.
    pub p95_latency: Option<Duration>,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    /// Record one completed turn.
    pub fn record_turn(&self, report: &TurnReport, latency: Duration) {
        let mut inner = self.inner.lock().expect("metrics mutex poisoned");
        *inner
            .turns_by_intent
            .entry(report.intent.as_str().to_string())
            .or_insert(0) += 1;
        if report.escalated {
            inner.escalated += 1;
        }
        inner.review_score_sum += u64::from(report.review_score);
        inner.latencies.push(latency);
    }

    /// Snapshot the current aggregates.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let inner = self.inner.lock().expect("metrics mutex poisoned");
        let turns_total = inner.latencies.len() as u64;

        let (escalation_rate, mean_review_score) = if turns_total == 0 {
            (0.0, 0.0)
        } else {
            (
                inner.escalated as f64 / turns_total as f64,
                inner.review_score_sum as f64 / turns_total as f64,
            )
        };

        MetricsSummary {
            turns_total,
            turns_by_intent: inner.turns_by_intent.clone(),
            escalation_rate,
            mean_review_score,
            p95_latency: percentile_95(&inner.latencies),
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// 95th percentile by nearest-rank over a copy of the samples.
fn percentile_95(latencies: &[Duration]) -> Option<Duration> {
    if latencies.is_empty() {
        return None;
    }

    let mut sorted = latencies.to_vec();
    sorted.sort();

    let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}
