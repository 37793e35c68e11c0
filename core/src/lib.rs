//! Behavioral security monitor engine for AI-agent tool activity.
//!
//! Ingests a stream of tool invocations, classifies risk against a
//! declarative rule table, learns a persisted behavioral baseline of what
//! is normal for the deployment, and pushes novel findings through a
//! deduplicated, broadcast alert pipeline.

pub mod alerts;
pub mod baseline;
pub mod config;
pub mod errors;
pub mod monitor;
pub mod scorer;
pub mod tool_call;
pub mod window;

pub use alerts::{Alert, AlertBroadcaster, AlertStore, NewAlert};
pub use baseline::{BaselineConfig, BaselineLearner, WhitelistKind};
pub use config::MonitorConfig;
pub use monitor::{RiskMonitor, TickReport};
pub use scorer::{RiskCategory, RiskFinding, RiskLevel, RiskScorer, SessionRiskAssessment};
pub use tool_call::{JsonlFileSource, ToolCall, ToolCallSource};
