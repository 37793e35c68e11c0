use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::SourceError;
use crate::tool_call::ToolCall;

/// Where the monitor pulls tool calls from. The log-ingestion layer is an
/// external collaborator; this trait is the seam it plugs into.
#[async_trait]
pub trait ToolCallSource: Send + Sync {
    /// The most recent `limit` calls, newest first. A malformed record is
    /// the source's problem to skip; the batch must never fail because of
    /// one bad line.
    async fn recent(&self, limit: usize) -> Result<Vec<ToolCall>, SourceError>;
}

/// Reads tool calls from a JSON-lines file, one `ToolCall` object per line.
pub struct JsonlFileSource {
    path: PathBuf,
}

impl JsonlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ToolCallSource for JsonlFileSource {
    async fn recent(&self, limit: usize) -> Result<Vec<ToolCall>, SourceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            // Missing file just means nothing has been logged yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SourceError::Io(e)),
        };

        let mut skipped = 0usize;
        let mut calls: Vec<ToolCall> = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ToolCall>(line) {
                Ok(call) => calls.push(call),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                target: "toolwatch.source",
                skipped,
                path = %self.path.display(),
                "skipped malformed tool-call records"
            );
        }

        // Newest first, regardless of file order.
        calls.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        calls.truncate(limit);
        Ok(calls)
    }
}
