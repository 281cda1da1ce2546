use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fallback origin for the evaluation backend when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub base_url: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: format!("mention-check/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A validated submission. Only built by the orchestrator once both fields
/// are non-empty after trimming; the original strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub prompt: String,
    pub brand: String,
}

/// Backend-supplied position of the mention.
///
/// Integral JSON numbers land in `Rank`. Anything else the backend sends is
/// carried through untouched in `Other` so nothing is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Rank(i64),
    Other(serde_json::Value),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Rank(n) => write!(f, "{n}"),
            Position::Other(serde_json::Value::String(s)) => f.write_str(s),
            Position::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Canonical outcome of one check attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    prompt: String,
    mentioned: bool,
    position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ResultRecord {
    pub fn new(
        prompt: impl Into<String>,
        mentioned: bool,
        position: Option<Position>,
        error: Option<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            mentioned,
            position,
            error,
        }
    }

    /// Record for a check that never got a usable reply.
    pub fn failed(prompt: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(prompt, false, None, Some(error.into()))
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mentioned(&self) -> bool {
        self.mentioned
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Busy,
}

/// Change notifications emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum CheckEvent {
    StatusChanged(Status),
    ErrorChanged(Option<String>),
    RecordAppended(ResultRecord),
    HistoryCleared,
    Info(InfoEvent),
}

/// Structured info events emitted by the controller.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Exported { path: std::path::PathBuf, rows: usize },
    ExportFailed(String),
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Exported { path, rows } => {
                format!("Exported CSV ({} row(s)): {}", rows, path.display())
            }
            InfoEvent::ExportFailed(e) => format!("CSV export failed: {e}"),
        }
    }
}
