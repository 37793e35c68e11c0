use async_trait::async_trait;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use toolwatch_core::alerts::{AlertBroadcaster, AlertStore};
use toolwatch_core::baseline::{BaselineConfig, BaselineLearner};
use toolwatch_core::config::MonitorConfig;
use toolwatch_core::errors::SourceError;
use toolwatch_core::monitor::RiskMonitor;
use toolwatch_core::scorer::RiskLevel;
use toolwatch_core::tool_call::{ToolCall, ToolCallSource};

/// Fixed batch of calls, returned newest-first the way a real source would.
struct StaticSource {
    calls: Vec<ToolCall>,
}

#[async_trait]
impl ToolCallSource for StaticSource {
    async fn recent(&self, limit: usize) -> Result<Vec<ToolCall>, SourceError> {
        let mut calls = self.calls.clone();
        calls.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        calls.truncate(limit);
        Ok(calls)
    }
}

/// Fails the first pull, then behaves like [`StaticSource`].
struct FlakySource {
    failed_once: AtomicBool,
    calls: Vec<ToolCall>,
}

#[async_trait]
impl ToolCallSource for FlakySource {
    async fn recent(&self, limit: usize) -> Result<Vec<ToolCall>, SourceError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(SourceError::Unavailable("collector offline".into()));
        }
        let mut calls = self.calls.clone();
        calls.truncate(limit);
        Ok(calls)
    }
}

fn bash(command: &str, timestamp: chrono::DateTime<Utc>) -> ToolCall {
    ToolCall::new("bash", timestamp).with_arguments(json!({ "command": command }))
}

fn monitor_with(source: Arc<dyn ToolCallSource>) -> (RiskMonitor, Arc<RwLock<AlertStore>>, AlertBroadcaster) {
    let learner = Arc::new(RwLock::new(BaselineLearner::new(BaselineConfig::default())));
    let store = Arc::new(RwLock::new(AlertStore::default()));
    let broadcaster = AlertBroadcaster::new(16);
    let monitor = RiskMonitor::new(
        MonitorConfig::default(),
        source,
        learner,
        store.clone(),
        broadcaster.clone(),
    );
    (monitor, store, broadcaster)
}

#[tokio::test]
async fn repeated_finding_is_stored_and_broadcast_once() {
    let now = Utc::now();
    let source = Arc::new(StaticSource {
        calls: vec![
            ToolCall::new("list-directory", now).with_arguments(json!({ "path": "/tmp" })),
            bash("sudo systemctl restart nginx", now - Duration::seconds(5)),
            bash("sudo systemctl restart nginx", now - Duration::seconds(35)),
        ],
    });
    let (monitor, store, broadcaster) = monitor_with(source);
    let mut rx = broadcaster.subscribe();

    let report = monitor.tick().await.expect("tick");
    assert_eq!(report.pulled, 3);
    assert_eq!(report.alerts_stored, 1);

    let store = store.read().await;
    assert_eq!(store.len(), 1);
    let alerts = store.recent(10);
    assert_eq!(alerts[0].severity, RiskLevel::High);
    assert_eq!(alerts[0].category, "privilege_escalation");

    let pushed = rx.try_recv().expect("one broadcast alert");
    assert_eq!(pushed.id, alerts[0].id);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn second_tick_over_same_window_adds_nothing() {
    let now = Utc::now();
    let source = Arc::new(StaticSource {
        calls: vec![bash("sudo reboot", now)],
    });
    let (monitor, store, _broadcaster) = monitor_with(source);

    let first = monitor.tick().await.expect("tick");
    assert_eq!(first.recorded, 1);
    assert_eq!(first.alerts_stored, 1);

    // Same batch again: the watermark skips re-recording and the dedup
    // window suppresses the repeat finding.
    let second = monitor.tick().await.expect("tick");
    assert_eq!(second.recorded, 0);
    assert_eq!(second.alerts_stored, 0);
    assert_eq!(store.read().await.len(), 1);
}

#[tokio::test]
async fn failed_tick_does_not_poison_the_next() {
    let now = Utc::now();
    let source = Arc::new(FlakySource {
        failed_once: AtomicBool::new(false),
        calls: vec![bash("sudo reboot", now)],
    });
    let (monitor, store, _broadcaster) = monitor_with(source);

    assert!(monitor.tick().await.is_err());

    let report = monitor.tick().await.expect("recovered tick");
    assert_eq!(report.pulled, 1);
    assert_eq!(report.alerts_stored, 1);
    assert_eq!(store.read().await.len(), 1);
}

#[tokio::test]
async fn learned_baseline_raises_behavioral_anomaly() {
    let now = Utc::now();
    let learner = Arc::new(RwLock::new(BaselineLearner::new(BaselineConfig::default())));
    {
        // Pre-learn via the volume trigger so the check path is active.
        let mut learner = learner.write().await;
        for name in ["read-file", "write-file", "grep", "list-directory"] {
            for _ in 0..20 {
                learner.record(&ToolCall::new(name, now - Duration::hours(2)));
            }
        }
        for i in 0..10 {
            for _ in 0..20 {
                learner.record(&bash(&format!("cmd{i}"), now - Duration::hours(2)));
            }
        }
        assert!(learner.learned());
    }

    let source = Arc::new(StaticSource {
        calls: vec![bash("nc -l 4444", now)],
    });
    let store = Arc::new(RwLock::new(AlertStore::default()));
    let broadcaster = AlertBroadcaster::new(16);
    let monitor = RiskMonitor::new(
        MonitorConfig::default(),
        source,
        learner,
        store.clone(),
        broadcaster,
    );

    let report = monitor.tick().await.expect("tick");
    assert_eq!(report.alerts_stored, 1);

    let store = store.read().await;
    let alerts = store.recent(10);
    assert_eq!(alerts[0].category, "behavioral_anomaly");
    assert_eq!(alerts[0].severity, RiskLevel::Medium);
    assert_eq!(alerts[0].evidence, "unknown_command:nc -l");
}

#[tokio::test]
async fn distinct_unknown_commands_alert_separately() {
    let now = Utc::now();
    let learner = Arc::new(RwLock::new(BaselineLearner::new(BaselineConfig::default())));
    {
        let mut learner = learner.write().await;
        for name in ["read-file", "write-file", "grep", "list-directory"] {
            for _ in 0..20 {
                learner.record(&ToolCall::new(name, now - Duration::hours(2)));
            }
        }
        for i in 0..10 {
            for _ in 0..20 {
                learner.record(&bash(&format!("cmd{i}"), now - Duration::hours(2)));
            }
        }
        assert!(learner.learned());
    }

    // Two different unseen commands through the same tool in one batch:
    // neither is a duplicate of the other.
    let source = Arc::new(StaticSource {
        calls: vec![
            bash("nc -l 4444", now),
            bash("xmrig --pool evil.example", now - Duration::seconds(1)),
        ],
    });
    let store = Arc::new(RwLock::new(AlertStore::default()));
    let broadcaster = AlertBroadcaster::new(16);
    let monitor = RiskMonitor::new(
        MonitorConfig::default(),
        source,
        learner,
        store.clone(),
        broadcaster,
    );

    let report = monitor.tick().await.expect("tick");
    assert_eq!(report.alerts_stored, 2);

    let store = store.read().await;
    let mut evidence: Vec<String> = store.recent(10).into_iter().map(|a| a.evidence).collect();
    evidence.sort();
    assert_eq!(
        evidence,
        vec![
            "unknown_command:nc -l".to_string(),
            "unknown_command:xmrig --pool".to_string(),
        ]
    );
}

#[tokio::test]
async fn session_risk_degrades_when_source_is_down() {
    let source = Arc::new(FlakySource {
        failed_once: AtomicBool::new(false),
        calls: Vec::new(),
    });
    let (monitor, _store, _broadcaster) = monitor_with(source);

    let assessment = monitor.session_risk().await;
    assert_eq!(assessment.level, RiskLevel::None);
    assert_eq!(assessment.total_risks, 0);
}

#[tokio::test]
async fn session_risk_reflects_current_batch() {
    let now = Utc::now();
    let source = Arc::new(StaticSource {
        calls: vec![
            bash("sudo rm -rf /", now),
            bash("ls -la", now - Duration::seconds(1)),
        ],
    });
    let (monitor, _store, _broadcaster) = monitor_with(source);

    let assessment = monitor.session_risk().await;
    assert_eq!(assessment.level, RiskLevel::Critical);
    assert!(assessment.total_risks >= 2);
}
