use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use toolwatch_core::baseline::BaselineConfig;
use toolwatch_core::config::MonitorConfig;
use toolwatch_core::scorer::RiskLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the baseline document lives.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// JSONL tool-call log written by the ingestion side.
    #[serde(default = "default_source_path")]
    pub source_path: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub baseline: BaselineConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_state_dir() -> String {
    "~/.toolwatch".to_string()
}

fn default_source_path() -> String {
    "~/.toolwatch/tool-calls.jsonl".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            source_path: default_source_path(),
            server: ServerConfig::default(),
            monitor: MonitorConfig::default(),
            baseline: BaselineConfig::default(),
            alerts: AlertConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn baseline_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).to_string()).join("baseline.json")
    }

    pub fn source_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.source_path).to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_server_enabled() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,

    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_max_alerts() -> usize {
    500
}

fn default_broadcast_capacity() -> usize {
    64
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            max_alerts: default_max_alerts(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notify_min_severity")]
    pub min_severity: RiskLevel,

    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_secs: u64,
}

fn default_notify_min_severity() -> RiskLevel {
    RiskLevel::Medium
}

fn default_rate_limit_secs() -> u64 {
    60
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            min_severity: default_notify_min_severity(),
            rate_limit_secs: default_rate_limit_secs(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let path = path.unwrap_or("config.toml");
    let mut cfg: AppConfig = if Path::new(path).exists() {
        let s = std::fs::read_to_string(path)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    if let Ok(v) = std::env::var("TOOLWATCH_SOURCE") {
        if !v.trim().is_empty() {
            cfg.source_path = v;
        }
    }
    if let Ok(v) = std::env::var("TOOLWATCH_LISTEN") {
        if !v.trim().is_empty() {
            cfg.server.listen = v;
        }
    }
    if let Ok(v) = std::env::var("TOOLWATCH_WEBHOOK_URL") {
        if !v.trim().is_empty() {
            cfg.notify.webhook_url = Some(v);
            cfg.notify.enabled = true;
        }
    }

    Ok(cfg)
}
