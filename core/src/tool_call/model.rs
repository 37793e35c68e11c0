use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One invocation of an agent capability, as produced by the log-ingestion
/// side. Only `name` and `timestamp` are guaranteed; argument shape varies
/// by tool and `success` is absent when the outcome is unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub arguments: Value,

    #[serde(default)]
    pub success: Option<bool>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            arguments: Value::Null,
            success: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    /// True for tools that carry a shell command in their arguments.
    pub fn is_command_tool(&self) -> bool {
        let n = self.name.to_lowercase();
        n.contains("bash") || n.contains("shell") || n.contains("exec") || n.contains("command") || n.contains("terminal")
    }

    /// True for tools that operate on a file path.
    pub fn is_file_tool(&self) -> bool {
        let n = self.name.to_lowercase();
        n.contains("read") || n.contains("write") || n.contains("edit") || n.contains("file") || n.contains("glob")
    }

    /// True for tools that write content to disk.
    pub fn is_write_tool(&self) -> bool {
        let n = self.name.to_lowercase();
        n.contains("write") || n.contains("edit") || n.contains("create")
    }

    pub fn command(&self) -> Option<&str> {
        self.arg_str(&["command", "cmd", "script"])
    }

    pub fn path(&self) -> Option<&str> {
        self.arg_str(&["path", "file_path", "file", "filename"])
    }

    pub fn content(&self) -> Option<&str> {
        self.arg_str(&["content", "new_string", "text", "body"])
    }

    fn arg_str(&self, keys: &[&str]) -> Option<&str> {
        let obj = self.arguments.as_object()?;
        keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
    }
}
