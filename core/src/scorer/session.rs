use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::scorer::rules::{RiskFinding, RiskLevel};

/// Transport cap for the per-session risk list. `total_risks` always
/// reports the true, uncapped count.
pub const MAX_TRANSPORT_RISKS: usize = 50;

/// Session-level reduction of per-call findings. Derived on demand, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRiskAssessment {
    pub level: RiskLevel,
    pub total_risks: usize,
    pub critical_count: usize,
    pub high_count: usize,
    /// Most severe first, capped to [`MAX_TRANSPORT_RISKS`].
    pub risks: Vec<RiskFinding>,
    pub by_category: HashMap<String, usize>,
}

impl SessionRiskAssessment {
    pub fn empty() -> Self {
        Self {
            level: RiskLevel::None,
            total_risks: 0,
            critical_count: 0,
            high_count: 0,
            risks: Vec::new(),
            by_category: HashMap::new(),
        }
    }

    pub fn from_findings(mut findings: Vec<RiskFinding>) -> Self {
        if findings.is_empty() {
            return Self::empty();
        }

        findings.sort_by_key(|f| std::cmp::Reverse(f.level));

        let level = findings.first().map(|f| f.level).unwrap_or(RiskLevel::None);
        let total_risks = findings.len();
        let critical_count = findings.iter().filter(|f| f.level == RiskLevel::Critical).count();
        let high_count = findings.iter().filter(|f| f.level == RiskLevel::High).count();

        let mut by_category: HashMap<String, usize> = HashMap::new();
        for f in &findings {
            *by_category.entry(f.category.to_string()).or_default() += 1;
        }

        findings.truncate(MAX_TRANSPORT_RISKS);

        Self {
            level,
            total_risks,
            critical_count,
            high_count,
            risks: findings,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::rules::RiskCategory;

    fn finding(level: RiskLevel) -> RiskFinding {
        RiskFinding {
            category: RiskCategory::PrivilegeEscalation,
            level,
            matched: "sudo x".into(),
            description: "test".into(),
            recommendation: None,
        }
    }

    #[test]
    fn empty_findings_reduce_to_none() {
        let a = SessionRiskAssessment::from_findings(vec![]);
        assert_eq!(a.level, RiskLevel::None);
        assert_eq!(a.total_risks, 0);
    }

    #[test]
    fn risks_cap_at_fifty_but_total_is_true_count() {
        let findings: Vec<_> = (0..75).map(|_| finding(RiskLevel::High)).collect();
        let a = SessionRiskAssessment::from_findings(findings);
        assert_eq!(a.risks.len(), MAX_TRANSPORT_RISKS);
        assert_eq!(a.total_risks, 75);
        assert_eq!(a.high_count, 75);
        assert_eq!(a.level, RiskLevel::High);
    }

    #[test]
    fn level_is_max_over_findings() {
        let a = SessionRiskAssessment::from_findings(vec![
            finding(RiskLevel::Medium),
            finding(RiskLevel::Critical),
            finding(RiskLevel::Low),
        ]);
        assert_eq!(a.level, RiskLevel::Critical);
        assert_eq!(a.critical_count, 1);
    }
}
