//! Periodic risk monitor: pull recent tool calls, score them, feed the
//! baseline, and push novel high-severity findings through the
//! dedup → store → broadcast pipeline.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

use crate::alerts::{AlertBroadcaster, AlertStore, NewAlert};
use crate::baseline::BaselineLearner;
use crate::config::MonitorConfig;
use crate::errors::SourceError;
use crate::scorer::{RiskScorer, SessionRiskAssessment};
use crate::tool_call::{ToolCall, ToolCallSource};
use crate::window;

/// What one tick did; used by callers that want visibility and by tests.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub pulled: usize,
    pub recorded: usize,
    pub alerts_stored: usize,
    pub anomaly_score: u32,
}

pub struct RiskMonitor {
    config: MonitorConfig,
    source: Arc<dyn ToolCallSource>,
    scorer: RiskScorer,
    learner: Arc<RwLock<BaselineLearner>>,
    store: Arc<RwLock<AlertStore>>,
    broadcaster: AlertBroadcaster,
    /// Guards against a tick that outruns the interval.
    in_flight: AtomicBool,
    /// Calls at or before this timestamp have already been recorded into
    /// the baseline; repeated pulls of overlapping windows must not
    /// double-count.
    watermark: Mutex<Option<DateTime<Utc>>>,
}

impl RiskMonitor {
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn ToolCallSource>,
        learner: Arc<RwLock<BaselineLearner>>,
        store: Arc<RwLock<AlertStore>>,
        broadcaster: AlertBroadcaster,
    ) -> Self {
        Self {
            config,
            source,
            scorer: RiskScorer::new(),
            learner,
            store,
            broadcaster,
            in_flight: AtomicBool::new(false),
            watermark: Mutex::new(None),
        }
    }

    /// One polling pass. Every failure inside is either handled here or
    /// returned for the loop to log; no error state carries into the next
    /// tick.
    pub async fn tick(&self) -> Result<TickReport, SourceError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(target: "toolwatch.monitor", "previous tick still running, skipping");
            return Ok(TickReport::default());
        }
        let result = self.tick_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn tick_inner(&self) -> Result<TickReport, SourceError> {
        let calls = self.source.recent(self.config.pull_limit).await?;
        let mut report = TickReport {
            pulled: calls.len(),
            ..TickReport::default()
        };
        if calls.is_empty() {
            return Ok(report);
        }

        // Calls arrive newest-first; findings are stored in that same
        // discovery order.
        let mut candidates: Vec<NewAlert> = Vec::new();
        for call in calls.iter().take(self.config.scan_depth) {
            for finding in self.scorer.score_tool_call(call) {
                if finding.level >= self.config.min_alert_level {
                    candidates.push(NewAlert::from_finding(&finding, &call.name));
                }
            }
        }

        report.recorded = self.feed_baseline(&calls, &mut candidates).await;
        report.anomaly_score = self.detect_window_anomalies(&calls, &mut candidates);
        report.alerts_stored = self.store_novel(candidates).await;

        {
            let mut learner = self.learner.write().await;
            learner.maybe_save(Duration::seconds(self.config.save_interval_secs));
        }

        Ok(report)
    }

    /// Record unseen calls into the baseline (oldest first) and collect
    /// baseline anomalies. Each call is checked before it is recorded, so
    /// a genuinely unknown command is caught the first time it appears.
    async fn feed_baseline(&self, calls: &[ToolCall], candidates: &mut Vec<NewAlert>) -> usize {
        let mut watermark = self.watermark.lock().await;
        let mut learner = self.learner.write().await;

        let mut fresh: Vec<&ToolCall> = calls
            .iter()
            .filter(|c| watermark.map_or(true, |w| c.timestamp > w))
            .collect();
        fresh.sort_by_key(|c| c.timestamp);

        for call in &fresh {
            let verdict = learner.check(call);
            if verdict.is_anomaly {
                if let Some(candidate) = NewAlert::from_verdict(&verdict, &call.name) {
                    if candidate.severity >= self.config.min_anomaly_level {
                        candidates.push(candidate);
                    }
                }
            }
            learner.record(call);
        }

        if let Some(newest) = calls.iter().map(|c| c.timestamp).max() {
            *watermark = Some(watermark.map_or(newest, |w| w.max(newest)));
        }
        fresh.len()
    }

    /// Compare the newest hour of activity against a snapshot built from
    /// the rest of the pulled history.
    fn detect_window_anomalies(&self, calls: &[ToolCall], candidates: &mut Vec<NewAlert>) -> u32 {
        let Some(newest) = calls.iter().map(|c| c.timestamp).max() else {
            return 0;
        };
        let cutoff = newest - Duration::hours(1);
        let (current, history): (Vec<ToolCall>, Vec<ToolCall>) =
            calls.iter().cloned().partition(|c| c.timestamp > cutoff);
        if history.is_empty() || current.is_empty() {
            return 0;
        }

        let baseline = window::build_baseline(&history);
        let events = window::detect(&current, &baseline, &self.config.window);
        let score = window::anomaly_score(&events);

        for event in &events {
            let candidate = NewAlert::from_anomaly_event(event);
            if candidate.severity >= self.config.min_anomaly_level {
                candidates.push(candidate);
            }
        }
        score
    }

    /// Dedup against the store, then store and broadcast the novel ones.
    async fn store_novel(&self, candidates: Vec<NewAlert>) -> usize {
        if candidates.is_empty() {
            return 0;
        }
        let mut store = self.store.write().await;
        let mut stored = 0;
        for candidate in candidates {
            if store.is_duplicate(&candidate.evidence, self.config.dedup_window_secs) {
                continue;
            }
            let alert = store.add(candidate);
            tracing::info!(
                target: "toolwatch.monitor",
                alert_id = %alert.id,
                severity = %alert.severity,
                category = %alert.category,
                "alert stored"
            );
            self.broadcaster.publish(&alert);
            stored += 1;
        }
        stored
    }

    /// Session-level view over the most recent calls. Degrades to an
    /// empty assessment when the source is unavailable; callers asking
    /// "what is the current risk" never see an error.
    pub async fn session_risk(&self) -> SessionRiskAssessment {
        match self.source.recent(self.config.pull_limit).await {
            Ok(calls) => self.scorer.session_risk(&calls),
            Err(e) => {
                tracing::warn!(
                    target: "toolwatch.monitor",
                    error = %e,
                    "source unavailable, reporting empty session risk"
                );
                SessionRiskAssessment::empty()
            }
        }
    }

    /// Polling loop. A failed tick is logged and the next tick starts
    /// clean; shutdown flushes any unsaved baseline state first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            target: "toolwatch.monitor",
            interval_secs = self.config.interval_secs,
            "risk monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(
                            target: "toolwatch.monitor",
                            error = %e,
                            "tick failed, continuing on next interval"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.learner.write().await.flush();
        tracing::info!(target: "toolwatch.monitor", "risk monitor stopped");
    }
}
