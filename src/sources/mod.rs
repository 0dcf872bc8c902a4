pub mod backlog;
pub mod kibela;

use serde_json::Value;

use crate::error::RelayError;
use backlog::BacklogEvent;
use kibela::KibelaEvent;

/// The upstream platforms we accept webhooks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Backlog.
    IssueTracker,
    /// Kibela.
    WikiTool,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::IssueTracker => "backlog",
            Source::WikiTool => "kibela",
        }
    }

    /// Fixed sender name shown in the chat channel.
    pub fn sender_name(self) -> &'static str {
        match self {
            Source::IssueTracker => "uchia",
            Source::WikiTool => "kibela webhook",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Source::IssueTracker),
            "kibela" => Ok(Source::WikiTool),
            other => Err(format!("unknown source '{other}' (expected backlog or kibela)")),
        }
    }
}

/// Rule table key derived from an inbound payload's discriminator fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKey {
    /// Backlog `type` code.
    IssueTracker(i64),
    /// Kibela `(resource_type, action)`.
    WikiTool { resource: String, action: String },
    /// Kibela's "send test" ping.
    ConnectivityTest,
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryKey::IssueTracker(code) => write!(f, "backlog:{code}"),
            CategoryKey::WikiTool { resource, action } => write!(f, "kibela:{resource}/{action}"),
            CategoryKey::ConnectivityTest => f.write_str("kibela:send/test"),
        }
    }
}

/// A parsed payload, tagged by the platform it came from.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    IssueTracker(BacklogEvent),
    WikiTool(KibelaEvent),
}

impl InboundEvent {
    /// Deserialize the platform-specific payload shape.
    pub fn parse(source: Source, body: Value) -> Result<Self, RelayError> {
        let event = match source {
            Source::IssueTracker => serde_json::from_value(body).map(InboundEvent::IssueTracker),
            Source::WikiTool => serde_json::from_value(body).map(InboundEvent::WikiTool),
        };
        event.map_err(|e| RelayError::MalformedPayload(format!("unexpected {source} payload shape: {e}")))
    }

    pub fn source(&self) -> Source {
        match self {
            InboundEvent::IssueTracker(_) => Source::IssueTracker,
            InboundEvent::WikiTool(_) => Source::WikiTool,
        }
    }
}

/// Derive the category key from the raw payload.
///
/// Only the discriminator fields are read here so that events we never
/// forward are not rejected for the shape of fields we would ignore anyway.
pub fn classify(source: Source, body: &Value) -> Result<CategoryKey, RelayError> {
    match source {
        Source::IssueTracker => backlog::classify(body),
        Source::WikiTool => kibela::classify(body),
    }
}
