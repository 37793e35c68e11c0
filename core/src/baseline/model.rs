use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rolling history cap: one week of hourly windows.
pub const MAX_WINDOWS: usize = 168;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    #[serde(default = "default_learning_period_hours")]
    pub learning_period_hours: f64,

    /// A tool is "rare" when its call count falls below the per-tool
    /// average divided by this multiplier.
    #[serde(default = "default_anomaly_multiplier")]
    pub anomaly_multiplier: f64,

    /// Volume threshold: with at least this many distinct tools AND
    /// distinct command patterns, a pre-seeded baseline learns without
    /// waiting out the clock.
    #[serde(default = "default_min_distinct_tools")]
    pub min_distinct_tools: usize,

    #[serde(default = "default_min_distinct_commands")]
    pub min_distinct_commands: usize,

    #[serde(default)]
    pub command_whitelist: Vec<String>,

    #[serde(default)]
    pub path_whitelist: Vec<String>,

    #[serde(default)]
    pub tool_whitelist: Vec<String>,
}

fn default_learning_period_hours() -> f64 {
    24.0
}

fn default_anomaly_multiplier() -> f64 {
    3.0
}

fn default_min_distinct_tools() -> usize {
    5
}

fn default_min_distinct_commands() -> usize {
    10
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            learning_period_hours: default_learning_period_hours(),
            anomaly_multiplier: default_anomaly_multiplier(),
            min_distinct_tools: default_min_distinct_tools(),
            min_distinct_commands: default_min_distinct_commands(),
            command_whitelist: Vec::new(),
            path_whitelist: Vec::new(),
            tool_whitelist: Vec::new(),
        }
    }
}

/// Partial config update from the control surface; `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineConfigPatch {
    #[serde(default)]
    pub learning_period_hours: Option<f64>,
    #[serde(default)]
    pub anomaly_multiplier: Option<f64>,
    #[serde(default)]
    pub min_distinct_tools: Option<usize>,
    #[serde(default)]
    pub min_distinct_commands: Option<usize>,
}

impl BaselineConfigPatch {
    pub fn apply(&self, config: &mut BaselineConfig) {
        if let Some(v) = self.learning_period_hours {
            config.learning_period_hours = v;
        }
        if let Some(v) = self.anomaly_multiplier {
            config.anomaly_multiplier = v;
        }
        if let Some(v) = self.min_distinct_tools {
            config.min_distinct_tools = v;
        }
        if let Some(v) = self.min_distinct_commands {
            config.min_distinct_commands = v;
        }
    }
}

/// Four pattern→count mappings learned from the stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineStats {
    #[serde(default)]
    pub tools: HashMap<String, u64>,
    #[serde(default)]
    pub commands: HashMap<String, u64>,
    #[serde(default)]
    pub paths: HashMap<String, u64>,
    /// Hour-of-day ("0".."23") → call count.
    #[serde(default)]
    pub hourly: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyWindow {
    pub started_at: DateTime<Utc>,
    pub hour: u32,
    /// Tool → call count within the window.
    #[serde(default)]
    pub counts: HashMap<String, u64>,
    #[serde(default)]
    pub total: u64,
}

/// The persisted per-deployment document. Every field is serde-defaulted
/// so an old on-disk baseline merges over defaults when new fields appear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub config: BaselineConfig,
    #[serde(default)]
    pub stats: BaselineStats,
    #[serde(default)]
    pub windows: Vec<HourlyWindow>,
    #[serde(default)]
    pub learned: bool,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            config: BaselineConfig::default(),
            stats: BaselineStats::default(),
            windows: Vec::new(),
            learned: false,
            started_at: Utc::now(),
        }
    }
}
