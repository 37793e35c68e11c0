//! Window anomaly detection: compares a recent activity window against a
//! statistically built snapshot. This is a second, independent lens from
//! the pattern-memory baseline learner; both may run concurrently.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

use crate::tool_call::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    pub fn weight(&self) -> u32 {
        match self {
            AnomalySeverity::Low => 5,
            AnomalySeverity::Medium => 15,
            AnomalySeverity::High => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySeverity::Low => "low",
            AnomalySeverity::Medium => "medium",
            AnomalySeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    BurstActivity,
    OffHours,
    NewTool,
    UnusualFrequency,
    RapidSuccession,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::BurstActivity => "burst_activity",
            AnomalyKind::OffHours => "off_hours",
            AnomalyKind::NewTool => "new_tool",
            AnomalyKind::UnusualFrequency => "unusual_frequency",
            AnomalyKind::RapidSuccession => "rapid_succession",
        }
    }
}

/// A deviation from the statistical snapshot. Derived, ephemeral.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyEvent {
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub description: String,
    pub details: serde_json::Value,
}

/// Statistical snapshot built from a historical slice of the stream.
#[derive(Debug, Clone, Default)]
pub struct WindowBaseline {
    pub hourly_average: f64,
    pub known_tools: HashSet<String>,
    pub tool_daily_average: HashMap<String, f64>,
    /// UTC hour-of-day distribution. Construction and detection must use
    /// the same clock reference or the off-hours check silently corrupts
    /// across midnight boundaries.
    pub hour_distribution: [u64; 24],
    pub total_calls: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOptions {
    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f64,
    #[serde(default = "default_frequency_multiplier")]
    pub frequency_multiplier: f64,
    /// Off-hours span in UTC hours, start inclusive, end exclusive. Wraps
    /// midnight when start > end.
    #[serde(default = "default_off_hours_start")]
    pub off_hours_start: u32,
    #[serde(default = "default_off_hours_end")]
    pub off_hours_end: u32,
    #[serde(default = "default_rapid_gap_ms")]
    pub rapid_gap_ms: i64,
}

fn default_burst_multiplier() -> f64 {
    3.0
}

fn default_frequency_multiplier() -> f64 {
    3.0
}

fn default_off_hours_start() -> u32 {
    0
}

fn default_off_hours_end() -> u32 {
    6
}

fn default_rapid_gap_ms() -> i64 {
    500
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            burst_multiplier: default_burst_multiplier(),
            frequency_multiplier: default_frequency_multiplier(),
            off_hours_start: default_off_hours_start(),
            off_hours_end: default_off_hours_end(),
            rapid_gap_ms: default_rapid_gap_ms(),
        }
    }
}

fn in_span(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Build the statistical snapshot from historical calls.
pub fn build_baseline(calls: &[ToolCall]) -> WindowBaseline {
    if calls.is_empty() {
        return WindowBaseline::default();
    }

    let mut baseline = WindowBaseline {
        total_calls: calls.len() as u64,
        ..WindowBaseline::default()
    };

    let min_ts = calls.iter().map(|c| c.timestamp).min().unwrap_or_default();
    let max_ts = calls.iter().map(|c| c.timestamp).max().unwrap_or_default();
    let span_hours = ((max_ts - min_ts).num_seconds() as f64 / 3600.0).max(1.0);
    let span_days = (span_hours / 24.0).max(1.0);

    baseline.hourly_average = calls.len() as f64 / span_hours;

    let mut tool_counts: HashMap<String, u64> = HashMap::new();
    for call in calls {
        baseline.known_tools.insert(call.name.clone());
        *tool_counts.entry(call.name.clone()).or_default() += 1;
        baseline.hour_distribution[call.timestamp.hour() as usize] += 1;
    }
    baseline.tool_daily_average = tool_counts
        .into_iter()
        .map(|(tool, count)| (tool, count as f64 / span_days))
        .collect();

    baseline
}

/// Run the five additive checks over the current window; any subset may
/// fire.
pub fn detect(
    current: &[ToolCall],
    baseline: &WindowBaseline,
    options: &WindowOptions,
) -> Vec<AnomalyEvent> {
    let mut events = Vec::new();
    if current.is_empty() {
        return events;
    }

    // Burst: window count beyond the hourly average, with a small floor so
    // a near-idle baseline does not flag trivial activity.
    let count = current.len() as f64;
    if baseline.hourly_average > 0.0
        && count > baseline.hourly_average * options.burst_multiplier
        && current.len() > 5
    {
        events.push(AnomalyEvent {
            kind: AnomalyKind::BurstActivity,
            severity: AnomalySeverity::High,
            description: format!(
                "{} calls in the current window (hourly average {:.1})",
                current.len(),
                baseline.hourly_average
            ),
            details: json!({
                "count": current.len(),
                "hourly_average": baseline.hourly_average,
            }),
        });
    }

    // Off-hours: only meaningful when the configured span historically
    // carries under 10% of activity; a naturally nocturnal agent never
    // trips this.
    if baseline.total_calls > 0 {
        let off_hours_total: u64 = (0..24u32)
            .filter(|h| in_span(*h, options.off_hours_start, options.off_hours_end))
            .map(|h| baseline.hour_distribution[h as usize])
            .sum();
        let share = off_hours_total as f64 / baseline.total_calls as f64;
        if share < 0.10 {
            let off_hours_calls = current
                .iter()
                .filter(|c| {
                    in_span(c.timestamp.hour(), options.off_hours_start, options.off_hours_end)
                })
                .count();
            if off_hours_calls > 0 {
                events.push(AnomalyEvent {
                    kind: AnomalyKind::OffHours,
                    severity: AnomalySeverity::Medium,
                    description: format!(
                        "{} calls during off-hours ({}:00-{}:00 UTC)",
                        off_hours_calls, options.off_hours_start, options.off_hours_end
                    ),
                    details: json!({
                        "count": off_hours_calls,
                        "historical_share": share,
                    }),
                });
            }
        }
    }

    // New tools: absent from the known set.
    if !baseline.known_tools.is_empty() {
        let mut seen = HashSet::new();
        for call in current {
            if !baseline.known_tools.contains(&call.name) && seen.insert(call.name.clone()) {
                events.push(AnomalyEvent {
                    kind: AnomalyKind::NewTool,
                    severity: AnomalySeverity::Low,
                    description: format!("tool '{}' not present in baseline", call.name),
                    details: json!({ "tool": call.name }),
                });
            }
        }
    }

    // Per-tool frequency beyond the historical daily average.
    let mut current_counts: HashMap<&str, u64> = HashMap::new();
    for call in current {
        *current_counts.entry(call.name.as_str()).or_default() += 1;
    }
    for (tool, count) in &current_counts {
        if let Some(daily_avg) = baseline.tool_daily_average.get(*tool) {
            if *daily_avg > 0.0
                && *count as f64 > daily_avg * options.frequency_multiplier
                && *count > 5
            {
                events.push(AnomalyEvent {
                    kind: AnomalyKind::UnusualFrequency,
                    severity: AnomalySeverity::Medium,
                    description: format!(
                        "tool '{}' used {} times (daily average {:.1})",
                        tool, count, daily_avg
                    ),
                    details: json!({ "tool": tool, "count": count, "daily_average": daily_avg }),
                });
            }
        }
    }

    // Rapid succession: more than five consecutive pairs inside the gap.
    let mut ordered: Vec<_> = current.iter().map(|c| c.timestamp).collect();
    ordered.sort_unstable();
    let rapid_pairs = ordered
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).num_milliseconds() <= options.rapid_gap_ms)
        .count();
    if rapid_pairs > 5 {
        events.push(AnomalyEvent {
            kind: AnomalyKind::RapidSuccession,
            severity: AnomalySeverity::High,
            description: format!(
                "{} consecutive calls within {}ms of each other",
                rapid_pairs, options.rapid_gap_ms
            ),
            details: json!({ "pairs": rapid_pairs, "gap_ms": options.rapid_gap_ms }),
        });
    }

    events
}

/// Additive severity score, clamped to 100.
pub fn anomaly_score(events: &[AnomalyEvent]) -> u32 {
    events
        .iter()
        .map(|e| e.severity.weight())
        .sum::<u32>()
        .min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn call_at(hour: u32, minute: u32, name: &str) -> ToolCall {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap();
        ToolCall::new(name, ts)
    }

    #[test]
    fn score_of_nothing_is_zero() {
        assert_eq!(anomaly_score(&[]), 0);
    }

    #[test]
    fn score_clamps_at_one_hundred() {
        let events: Vec<AnomalyEvent> = (0..10)
            .map(|_| AnomalyEvent {
                kind: AnomalyKind::BurstActivity,
                severity: AnomalySeverity::High,
                description: String::new(),
                details: serde_json::Value::Null,
            })
            .collect();
        assert_eq!(anomaly_score(&events), 100);
    }

    #[test]
    fn off_hours_span_wraps_midnight() {
        assert!(in_span(23, 22, 6));
        assert!(in_span(2, 22, 6));
        assert!(!in_span(12, 22, 6));
    }

    #[test]
    fn daytime_baseline_flags_night_calls_only() {
        // Baseline built solely from hours 10-17.
        let mut history = Vec::new();
        for day in 1..=5 {
            for hour in 10..=17 {
                let ts = Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap();
                history.push(ToolCall::new("bash", ts));
            }
        }
        let baseline = build_baseline(&history);
        let options = WindowOptions::default();

        let night: Vec<_> = (0..5).map(|m| call_at(2, m * 10, "bash")).collect();
        let events = detect(&night, &baseline, &options);
        assert!(events.iter().any(|e| e.kind == AnomalyKind::OffHours));

        let day: Vec<_> = (0..5).map(|m| call_at(11, m * 10, "bash")).collect();
        let events = detect(&day, &baseline, &options);
        assert!(!events.iter().any(|e| e.kind == AnomalyKind::OffHours));
    }
}
