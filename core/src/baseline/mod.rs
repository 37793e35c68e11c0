pub mod model;
pub mod normalize;
pub mod persist;

pub use model::{
    Baseline, BaselineConfig, BaselineConfigPatch, BaselineStats, HourlyWindow, MAX_WINDOWS,
};
pub use normalize::{normalize_command, normalize_path};

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::tool_call::ToolCall;

/// Outcome of an anomaly check against the learned baseline.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyVerdict {
    pub is_anomaly: bool,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AnomalyVerdict {
    fn normal(reason: &'static str) -> Self {
        Self { is_anomaly: false, reason, details: None }
    }

    fn anomalous(reason: &'static str, details: serde_json::Value) -> Self {
        Self { is_anomaly: true, reason, details: Some(details) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistKind {
    Command,
    Path,
    Tool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineStatus {
    pub learned: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_hours: f64,
    pub learning_period_hours: f64,
    pub distinct_tools: usize,
    pub distinct_commands: usize,
    pub min_distinct_tools: usize,
    pub min_distinct_commands: usize,
    pub total_calls: u64,
    pub windows_collected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternCount {
    pub pattern: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPatterns {
    pub commands: Vec<PatternCount>,
    pub tools: Vec<PatternCount>,
}

/// Pure transition predicate for the UNLEARNED → LEARNED state machine.
/// Returns the triggering reason, or `None` while still learning. Time is
/// a parameter so tests never wait on the wall clock.
pub fn learned_reason(
    config: &BaselineConfig,
    started_at: DateTime<Utc>,
    distinct_tools: usize,
    distinct_commands: usize,
    now: DateTime<Utc>,
) -> Option<&'static str> {
    let elapsed_hours = (now - started_at).num_seconds() as f64 / 3600.0;
    if elapsed_hours >= config.learning_period_hours {
        return Some("learning_period_elapsed");
    }
    if distinct_tools >= config.min_distinct_tools
        && distinct_commands >= config.min_distinct_commands
    {
        return Some("pattern_volume_reached");
    }
    None
}

/// Stateful, persisted model of "normal" tool usage for one deployment.
/// Owns the [`Baseline`] document exclusively; a single process must be
/// the only writer of the backing file.
pub struct BaselineLearner {
    baseline: Baseline,
    window_counts: HashMap<String, u64>,
    /// Anchored to the first call of the in-progress hourly window.
    window_started: Option<DateTime<Utc>>,
    path: Option<PathBuf>,
    dirty: bool,
    last_saved: DateTime<Utc>,
}

impl BaselineLearner {
    /// In-memory learner, nothing persisted.
    pub fn new(config: BaselineConfig) -> Self {
        let baseline = Baseline { config, ..Baseline::default() };
        Self::from_baseline(baseline, None)
    }

    /// Load from `path`, or start fresh with `config` when no file exists
    /// yet. Reload merges over defaults, so documents written by older
    /// versions pick up sane values for new fields.
    pub fn from_path(path: PathBuf, config: BaselineConfig) -> Self {
        let baseline = if path.exists() {
            persist::load_or_default(&path)
        } else {
            Baseline { config, ..Baseline::default() }
        };
        Self::from_baseline(baseline, Some(path))
    }

    fn from_baseline(baseline: Baseline, path: Option<PathBuf>) -> Self {
        Self {
            baseline,
            window_counts: HashMap::new(),
            window_started: None,
            path,
            dirty: false,
            last_saved: Utc::now(),
        }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn learned(&self) -> bool {
        self.baseline.learned
    }

    // -- recording ---------------------------------------------------------

    pub fn record(&mut self, call: &ToolCall) {
        self.record_at(call, Utc::now());
    }

    pub fn record_at(&mut self, call: &ToolCall, now: DateTime<Utc>) {
        self.rotate_window_if_due(now);

        let stats = &mut self.baseline.stats;
        *stats.tools.entry(call.name.clone()).or_default() += 1;
        *stats.hourly.entry(now.hour().to_string()).or_default() += 1;

        if call.is_command_tool() {
            if let Some(cmd) = call.command() {
                let pattern = normalize_command(cmd);
                if !pattern.is_empty() {
                    *stats.commands.entry(pattern).or_default() += 1;
                }
            }
        } else if call.is_file_tool() {
            if let Some(path) = call.path() {
                *stats.paths.entry(normalize_path(path)).or_default() += 1;
            }
        }

        *self.window_counts.entry(call.name.clone()).or_default() += 1;
        self.dirty = true;

        if !self.baseline.learned {
            let reason = learned_reason(
                &self.baseline.config,
                self.baseline.started_at,
                self.baseline.stats.tools.len(),
                self.baseline.stats.commands.len(),
                now,
            );
            if let Some(reason) = reason {
                self.baseline.learned = true;
                tracing::info!(
                    target: "toolwatch.baseline",
                    reason,
                    distinct_tools = self.baseline.stats.tools.len(),
                    distinct_commands = self.baseline.stats.commands.len(),
                    "baseline learned, anomaly checks active"
                );
            }
        }
    }

    fn rotate_window_if_due(&mut self, now: DateTime<Utc>) {
        let started = match self.window_started {
            Some(t) => t,
            None => {
                self.window_started = Some(now);
                return;
            }
        };
        if now - started < Duration::hours(1) {
            return;
        }
        if !self.window_counts.is_empty() {
            let counts = std::mem::take(&mut self.window_counts);
            let total = counts.values().sum();
            self.baseline.windows.push(HourlyWindow {
                started_at: started,
                hour: started.hour(),
                counts,
                total,
            });
            if self.baseline.windows.len() > MAX_WINDOWS {
                let excess = self.baseline.windows.len() - MAX_WINDOWS;
                self.baseline.windows.drain(..excess);
            }
            self.dirty = true;
        }
        self.window_started = Some(now);
    }

    // -- anomaly checks ----------------------------------------------------

    /// True once the persisted flag is set or the transition predicate
    /// holds at `now`. The predicate is consulted here too, so an elapsed
    /// learning period counts even when no call has arrived to flip the
    /// flag.
    fn is_learned_at(&self, now: DateTime<Utc>) -> bool {
        self.baseline.learned
            || learned_reason(
                &self.baseline.config,
                self.baseline.started_at,
                self.baseline.stats.tools.len(),
                self.baseline.stats.commands.len(),
                now,
            )
            .is_some()
    }

    /// The learning period must never itself raise alerts: while the
    /// baseline is unlearned every call is non-anomalous with reason
    /// `learning`.
    pub fn check(&self, call: &ToolCall) -> AnomalyVerdict {
        self.check_at(call, Utc::now())
    }

    pub fn check_at(&self, call: &ToolCall, now: DateTime<Utc>) -> AnomalyVerdict {
        if !self.is_learned_at(now) {
            return AnomalyVerdict::normal("learning");
        }

        let config = &self.baseline.config;

        if config.tool_whitelist.iter().any(|t| t == &call.name) {
            return AnomalyVerdict::normal("whitelisted_tool");
        }

        let command = if call.is_command_tool() { call.command() } else { None };
        if let Some(cmd) = command {
            let base = cmd.split_whitespace().next().unwrap_or(cmd);
            if config
                .command_whitelist
                .iter()
                .any(|w| w == cmd || w == base)
            {
                return AnomalyVerdict::normal("whitelisted_command");
            }
        }

        if let Some(path) = call.path() {
            if config.path_whitelist.iter().any(|w| path.starts_with(w.as_str())) {
                return AnomalyVerdict::normal("whitelisted_path");
            }
        }

        if let Some(cmd) = command {
            let pattern = normalize_command(cmd);
            if !pattern.is_empty() && !self.baseline.stats.commands.contains_key(&pattern) {
                return AnomalyVerdict::anomalous(
                    "unknown_command",
                    json!({ "pattern": pattern, "command": cmd }),
                );
            }
        }

        let tools = &self.baseline.stats.tools;
        if !tools.is_empty() {
            let total: u64 = tools.values().sum();
            let average = total as f64 / tools.len() as f64;
            let count = tools.get(&call.name).copied().unwrap_or(0);
            if (count as f64) < average / config.anomaly_multiplier {
                return AnomalyVerdict::anomalous(
                    "rare_tool",
                    json!({ "tool": call.name, "count": count, "average": average }),
                );
            }
        }

        AnomalyVerdict::normal("normal")
    }

    // -- control surface ---------------------------------------------------

    pub fn status(&self) -> BaselineStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> BaselineStatus {
        let b = &self.baseline;
        BaselineStatus {
            learned: self.is_learned_at(now),
            started_at: b.started_at,
            elapsed_hours: (now - b.started_at).num_seconds() as f64 / 3600.0,
            learning_period_hours: b.config.learning_period_hours,
            distinct_tools: b.stats.tools.len(),
            distinct_commands: b.stats.commands.len(),
            min_distinct_tools: b.config.min_distinct_tools,
            min_distinct_commands: b.config.min_distinct_commands,
            total_calls: b.stats.tools.values().sum(),
            windows_collected: b.windows.len(),
        }
    }

    pub fn whitelist(&mut self, kind: WhitelistKind, value: impl Into<String>) {
        let value = value.into();
        let list = match kind {
            WhitelistKind::Command => &mut self.baseline.config.command_whitelist,
            WhitelistKind::Path => &mut self.baseline.config.path_whitelist,
            WhitelistKind::Tool => &mut self.baseline.config.tool_whitelist,
        };
        if !list.contains(&value) {
            list.push(value);
            self.dirty = true;
            self.flush();
        }
    }

    pub fn update_config(&mut self, patch: &BaselineConfigPatch) {
        patch.apply(&mut self.baseline.config);
        self.dirty = true;
        self.flush();
    }

    /// Discard everything learned and restart the learning period. The
    /// configured whitelists and thresholds survive; they belong to the
    /// operator, not to the learned state.
    pub fn reset(&mut self) {
        self.baseline.stats = BaselineStats::default();
        self.baseline.windows.clear();
        self.baseline.learned = false;
        self.baseline.started_at = Utc::now();
        self.window_counts.clear();
        self.window_started = None;
        self.dirty = true;
        self.flush();
        tracing::info!(target: "toolwatch.baseline", "baseline reset, relearning");
    }

    pub fn top_patterns(&self, limit: usize) -> TopPatterns {
        fn top(map: &HashMap<String, u64>, limit: usize) -> Vec<PatternCount> {
            let mut entries: Vec<PatternCount> = map
                .iter()
                .map(|(pattern, count)| PatternCount { pattern: pattern.clone(), count: *count })
                .collect();
            entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.pattern.cmp(&b.pattern)));
            entries.truncate(limit);
            entries
        }

        TopPatterns {
            commands: top(&self.baseline.stats.commands, limit),
            tools: top(&self.baseline.stats.tools, limit),
        }
    }

    // -- persistence -------------------------------------------------------

    /// Save when dirty and the debounce interval has elapsed. A failed
    /// save is logged and retried on the next cycle; the in-memory state
    /// stays authoritative.
    pub fn maybe_save(&mut self, interval: Duration) {
        if self.dirty && Utc::now() - self.last_saved >= interval {
            self.flush();
        }
    }

    /// Save now if there is anything unsaved.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return;
        };
        match persist::save(&path, &self.baseline) {
            Ok(()) => {
                self.dirty = false;
                self.last_saved = Utc::now();
            }
            Err(e) => {
                tracing::warn!(
                    target: "toolwatch.baseline",
                    path = %path.display(),
                    error = %e,
                    "baseline save failed, will retry next cycle"
                );
            }
        }
    }
}
