use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ordinal severity. Ordering is part of the contract: `None < Low <
/// Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    DestructiveCommand,
    PrivilegeEscalation,
    CredentialAccess,
    DataExfiltration,
    SensitiveFile,
    NetworkAnomaly,
    BehavioralAnomaly,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::DestructiveCommand => "destructive_command",
            RiskCategory::PrivilegeEscalation => "privilege_escalation",
            RiskCategory::CredentialAccess => "credential_access",
            RiskCategory::DataExfiltration => "data_exfiltration",
            RiskCategory::SensitiveFile => "sensitive_file",
            RiskCategory::NetworkAnomaly => "network_anomaly",
            RiskCategory::BehavioralAnomaly => "behavioral_anomaly",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified match of a tool call against a risk rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFinding {
    pub category: RiskCategory,
    pub level: RiskLevel,
    /// The triggering evidence (the matched fragment of the input).
    pub matched: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// One entry of the declarative rule table. The catalogue is data, not
/// control flow: adding a rule never touches the scorer.
#[derive(Debug, Clone)]
pub struct RiskRule {
    pub matcher: Regex,
    pub level: RiskLevel,
    pub category: RiskCategory,
    pub description: &'static str,
    pub recommendation: Option<&'static str>,
}

impl RiskRule {
    fn new(
        pattern: &str,
        level: RiskLevel,
        category: RiskCategory,
        description: &'static str,
        recommendation: Option<&'static str>,
    ) -> Self {
        Self {
            matcher: Regex::new(pattern).expect("valid regex"),
            level,
            category,
            description,
            recommendation,
        }
    }
}

/// The opinionated default tiers: CRITICAL for irreversible destruction,
/// HIGH for privilege escalation and credential access, MEDIUM for
/// exfiltration-shaped network use and generically sensitive paths.
pub fn default_rules() -> Vec<RiskRule> {
    vec![
        // -- CRITICAL: irreversible destructive actions --------------------
        RiskRule::new(
            r"(?i)\brm\s+-(?:[a-z]*r[a-z]*f[a-z]*|[a-z]*f[a-z]*r[a-z]*)\s+(?:/\*|/(?:home|etc|usr|var|boot)\b|/(?:[\s;&|]|$)|~/?(?:[\s;&|]|$)|\$HOME\b)",
            RiskLevel::Critical,
            RiskCategory::DestructiveCommand,
            "Recursive forced deletion rooted at / or the home directory",
            Some("Block the command and review the session transcript"),
        ),
        RiskRule::new(
            r"(?i)\bdd\s+if=\S+\s+of=/dev/(?:sd|hd|nvme|disk)\w*",
            RiskLevel::Critical,
            RiskCategory::DestructiveCommand,
            "Raw write to a block device",
            Some("Block the command; raw device writes destroy filesystems"),
        ),
        RiskRule::new(
            r"(?i)\bmkfs(?:\.\w+)?\s+/dev/",
            RiskLevel::Critical,
            RiskCategory::DestructiveCommand,
            "Filesystem creation over an existing device",
            None,
        ),
        RiskRule::new(
            r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
            RiskLevel::Critical,
            RiskCategory::DestructiveCommand,
            "Fork bomb",
            None,
        ),
        RiskRule::new(
            r"(?i)\b(?:drop\s+(?:table|database)|truncate\s+table)\b|\bflushall\b",
            RiskLevel::Critical,
            RiskCategory::DestructiveCommand,
            "Destructive data-store statement",
            Some("Verify the target database before allowing"),
        ),
        // -- HIGH: privilege escalation ------------------------------------
        RiskRule::new(
            r"(?i)\bsudo\s+\S+",
            RiskLevel::High,
            RiskCategory::PrivilegeEscalation,
            "Command executed with elevated privileges via sudo",
            Some("Confirm the agent is expected to run privileged commands"),
        ),
        RiskRule::new(
            r"(?i)\bsu\s+(?:-\s*)?(?:root\b|-l?\b|$)",
            RiskLevel::High,
            RiskCategory::PrivilegeEscalation,
            "Switch to the root user",
            None,
        ),
        RiskRule::new(
            r"(?i)\bchmod\s+(?:-[a-z]+\s+)?(?:777|u\+s|a\+s)\b",
            RiskLevel::High,
            RiskCategory::PrivilegeEscalation,
            "World-writable or setuid permission change",
            Some("Prefer narrowly scoped permissions"),
        ),
        RiskRule::new(
            r"(?i)curl\s+[^|]*\|\s*(?:sudo\s+)?(?:ba)?sh\b",
            RiskLevel::High,
            RiskCategory::DestructiveCommand,
            "Remote script piped directly into a shell",
            Some("Download and inspect scripts before executing them"),
        ),
        // -- HIGH: credential and secret access ----------------------------
        RiskRule::new(
            r"(?i)\.ssh/(?:id_[a-z0-9]+|authorized_keys|config)\b",
            RiskLevel::High,
            RiskCategory::CredentialAccess,
            "SSH key material accessed",
            Some("Rotate the affected keys if access was unexpected"),
        ),
        RiskRule::new(
            r"(?i)\.aws/credentials|\.netrc\b|\.docker/config\.json",
            RiskLevel::High,
            RiskCategory::CredentialAccess,
            "Cloud or registry credential file accessed",
            None,
        ),
        RiskRule::new(
            r"(?i)\b(?:grep|rg|cat|find|strings)\b[^|;]*\b(?:api[_-]?key|secret|token|password|passwd)\b",
            RiskLevel::High,
            RiskCategory::CredentialAccess,
            "Search for secrets in files",
            None,
        ),
        RiskRule::new(
            r"(?i)gpg\s+--export-secret-keys|security\s+find-generic-password",
            RiskLevel::High,
            RiskCategory::CredentialAccess,
            "Secret-key or keychain export",
            None,
        ),
        // -- MEDIUM: exfiltration-shaped network use -----------------------
        RiskRule::new(
            r"(?i)\bcurl\b[^|;]*(?:\s-(?:d|F|T)\b|--data\b|--form\b|--upload-file\b)",
            RiskLevel::Medium,
            RiskCategory::DataExfiltration,
            "Outbound HTTP upload",
            Some("Check the destination host against the expected set"),
        ),
        RiskRule::new(
            r"(?i)\bwget\b[^|;]*--post-(?:data|file)\b",
            RiskLevel::Medium,
            RiskCategory::DataExfiltration,
            "Outbound HTTP POST via wget",
            None,
        ),
        RiskRule::new(
            r"(?i)\b(?:nc|ncat|netcat)\b\s+\S+\s+\d{2,5}\b",
            RiskLevel::Medium,
            RiskCategory::DataExfiltration,
            "Raw socket connection",
            None,
        ),
        RiskRule::new(
            r"(?i)\bscp\s+[^\s]+\s+\S+@\S+:",
            RiskLevel::Medium,
            RiskCategory::DataExfiltration,
            "File copied to a remote host",
            None,
        ),
        // -- MEDIUM: generically sensitive paths ---------------------------
        RiskRule::new(
            r"(?i)/etc/(?:passwd|shadow|sudoers)\b",
            RiskLevel::Medium,
            RiskCategory::SensitiveFile,
            "System account or sudoers file touched",
            None,
        ),
        RiskRule::new(
            r"(?i)(?:^|[\s/])\.(?:gnupg|kube/config)\b",
            RiskLevel::Medium,
            RiskCategory::SensitiveFile,
            "Sensitive configuration directory touched",
            None,
        ),
        RiskRule::new(
            r"(?i)(?:Cookies|Login Data|Keychain|keychain-db)\b",
            RiskLevel::Medium,
            RiskCategory::SensitiveFile,
            "Browser or OS credential store touched",
            None,
        ),
        RiskRule::new(
            r"(?i)(?:^|/)\.env(?:\.\w+)?(?:\s|$)",
            RiskLevel::Medium,
            RiskCategory::SensitiveFile,
            "Environment secrets file touched",
            None,
        ),
    ]
}
