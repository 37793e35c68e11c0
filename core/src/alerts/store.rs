use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::alerts::{Alert, NewAlert};
use crate::scorer::RiskLevel;

pub const DEFAULT_MAX_ALERTS: usize = 500;

/// Bounded, newest-first alert store; the system of record for "has this
/// been seen". The store itself never deduplicates — callers check
/// [`AlertStore::is_duplicate`] before [`AlertStore::add`].
pub struct AlertStore {
    alerts: VecDeque<Alert>,
    max_alerts: usize,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALERTS)
    }
}

impl AlertStore {
    pub fn new(max_alerts: usize) -> Self {
        Self {
            alerts: VecDeque::new(),
            max_alerts: max_alerts.max(1),
        }
    }

    /// Assign identity, prepend, evict past capacity. Eviction is silent
    /// and oldest-first.
    pub fn add(&mut self, new: NewAlert) -> Alert {
        let timestamp = Utc::now();
        let alert = Alert {
            id: next_alert_id(timestamp),
            timestamp,
            acknowledged: false,
            severity: new.severity,
            category: new.category,
            title: new.title,
            description: new.description,
            evidence: new.evidence,
            details: new.details,
        };
        self.alerts.push_front(alert.clone());
        self.alerts.truncate(self.max_alerts);
        alert
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Discovery order (newest stored first), not strict event chronology.
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.alerts.iter().take(limit).cloned().collect()
    }

    pub fn filtered(
        &self,
        min_severity: Option<RiskLevel>,
        include_acked: bool,
        limit: usize,
    ) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| include_acked || !a.acknowledged)
            .filter(|a| min_severity.map_or(true, |min| a.severity >= min))
            .take(limit)
            .cloned()
            .collect()
    }

    /// The aggregate risk level: max severity over unacknowledged alerts.
    pub fn current_level(&self) -> RiskLevel {
        self.alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .map(|a| a.severity)
            .max()
            .unwrap_or(RiskLevel::None)
    }

    pub fn acknowledge(&mut self, id: &str) -> Option<Alert> {
        let alert = self.alerts.iter_mut().find(|a| a.id == id)?;
        alert.acknowledged = true;
        Some(alert.clone())
    }

    pub fn acknowledge_all(&mut self) -> usize {
        let mut count = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.acknowledged) {
            alert.acknowledged = true;
            count += 1;
        }
        count
    }

    pub fn clear(&mut self) -> usize {
        let count = self.alerts.len();
        self.alerts.clear();
        count
    }

    /// Caller-owned dedup: a candidate is a duplicate when a stored alert
    /// shares its evidence within the window. No cross-restart memory —
    /// an empty store after restart may re-raise a recent alert once.
    pub fn is_duplicate(&self, evidence: &str, window_secs: i64) -> bool {
        self.is_duplicate_at(evidence, Utc::now(), window_secs)
    }

    pub fn is_duplicate_at(&self, evidence: &str, at: DateTime<Utc>, window_secs: i64) -> bool {
        let window = Duration::seconds(window_secs);
        self.alerts
            .iter()
            .any(|a| a.evidence == evidence && (at - a.timestamp).abs() <= window)
    }
}

fn next_alert_id(timestamp: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp.timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn candidate(evidence: &str, severity: RiskLevel) -> NewAlert {
        NewAlert {
            severity,
            category: "destructive_command".into(),
            title: format!("test: {evidence}"),
            description: "test alert".into(),
            evidence: evidence.into(),
            details: Value::Null,
        }
    }

    #[test]
    fn capacity_evicts_oldest_silently() {
        let mut store = AlertStore::new(3);
        for i in 0..4 {
            store.add(candidate(&format!("e{i}"), RiskLevel::High));
        }
        assert_eq!(store.len(), 3);
        let recent = store.recent(10);
        assert_eq!(recent[0].evidence, "e3");
        assert!(recent.iter().all(|a| a.evidence != "e0"));
    }

    #[test]
    fn ids_are_unique() {
        let mut store = AlertStore::new(10);
        let a = store.add(candidate("x", RiskLevel::Low));
        let b = store.add(candidate("x", RiskLevel::Low));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn same_evidence_within_window_is_duplicate() {
        let mut store = AlertStore::new(10);
        store.add(candidate("sudo rm", RiskLevel::High));
        assert!(store.is_duplicate("sudo rm", 30));
        assert!(!store.is_duplicate("other", 30));
    }

    #[test]
    fn acknowledge_changes_level() {
        let mut store = AlertStore::new(10);
        let alert = store.add(candidate("x", RiskLevel::High));
        assert_eq!(store.current_level(), RiskLevel::High);
        assert!(store.acknowledge(&alert.id).is_some());
        assert_eq!(store.current_level(), RiskLevel::None);
        assert!(store.acknowledge("missing").is_none());
    }
}
