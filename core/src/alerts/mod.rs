pub mod broadcast;
pub mod store;

pub use broadcast::AlertBroadcaster;
pub use store::AlertStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::baseline::AnomalyVerdict;
use crate::scorer::{RiskFinding, RiskLevel};
use crate::window::{AnomalyEvent, AnomalySeverity};

/// A risk finding or anomaly persisted for human review. Created by the
/// store on ingestion; mutated only by acknowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub severity: RiskLevel,
    pub category: String,
    pub title: String,
    pub description: String,
    /// Triggering evidence; doubles as the dedup key.
    pub evidence: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// An alert candidate before the store assigns identity.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub severity: RiskLevel,
    pub category: String,
    pub title: String,
    pub description: String,
    pub evidence: String,
    pub details: serde_json::Value,
}

impl NewAlert {
    pub fn from_finding(finding: &RiskFinding, tool: &str) -> Self {
        Self {
            severity: finding.level,
            category: finding.category.to_string(),
            title: format!("{}: {}", finding.category, finding.matched),
            description: finding.description.clone(),
            evidence: finding.matched.clone(),
            details: json!({
                "tool": tool,
                "recommendation": finding.recommendation,
            }),
        }
    }

    pub fn from_anomaly_event(event: &AnomalyEvent) -> Self {
        Self {
            severity: severity_to_level(event.severity),
            category: event.kind.as_str().to_string(),
            title: format!("anomaly: {}", event.kind.as_str()),
            description: event.description.clone(),
            evidence: format!("{}:{}", event.kind.as_str(), event.description),
            details: event.details.clone(),
        }
    }

    pub fn from_verdict(verdict: &AnomalyVerdict, call_name: &str) -> Option<Self> {
        if !verdict.is_anomaly {
            return None;
        }
        // Evidence doubles as the dedup key, so it must distinguish two
        // different unknown commands issued through the same tool.
        let subject = verdict
            .details
            .as_ref()
            .and_then(|d| d.get("pattern"))
            .and_then(|v| v.as_str())
            .unwrap_or(call_name);
        Some(Self {
            severity: RiskLevel::Medium,
            category: "behavioral_anomaly".to_string(),
            title: format!("baseline anomaly: {}", verdict.reason),
            description: format!("tool '{}' deviated from the learned baseline ({})", call_name, verdict.reason),
            evidence: format!("{}:{}", verdict.reason, subject),
            details: verdict.details.clone().unwrap_or(serde_json::Value::Null),
        })
    }
}

fn severity_to_level(severity: AnomalySeverity) -> RiskLevel {
    match severity {
        AnomalySeverity::Low => RiskLevel::Low,
        AnomalySeverity::Medium => RiskLevel::Medium,
        AnomalySeverity::High => RiskLevel::High,
    }
}
