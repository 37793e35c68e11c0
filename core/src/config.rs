use serde::{Deserialize, Serialize};

use crate::scorer::RiskLevel;
use crate::window::WindowOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How many recent calls to pull per tick.
    #[serde(default = "default_pull_limit")]
    pub pull_limit: usize,

    /// Only the newest few calls are re-scored each tick to bound work.
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,

    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,

    /// Rule findings below this level are observed but not stored.
    #[serde(default = "default_min_alert_level")]
    pub min_alert_level: RiskLevel,

    /// Anomaly events below this level are observed but not stored.
    #[serde(default = "default_min_anomaly_level")]
    pub min_anomaly_level: RiskLevel,

    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: i64,

    #[serde(default)]
    pub window: WindowOptions,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_pull_limit() -> usize {
    100
}

fn default_scan_depth() -> usize {
    5
}

fn default_dedup_window_secs() -> i64 {
    30
}

fn default_min_alert_level() -> RiskLevel {
    RiskLevel::High
}

fn default_min_anomaly_level() -> RiskLevel {
    RiskLevel::Medium
}

fn default_save_interval_secs() -> i64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pull_limit: default_pull_limit(),
            scan_depth: default_scan_depth(),
            dedup_window_secs: default_dedup_window_secs(),
            min_alert_level: default_min_alert_level(),
            min_anomaly_level: default_min_anomaly_level(),
            save_interval_secs: default_save_interval_secs(),
            window: WindowOptions::default(),
        }
    }
}
