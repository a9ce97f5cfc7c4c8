//! Request and event types for the Palaver API.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Request to send a message into a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Message content.
    pub content: String,
    /// Ask the server for an event-stream response.
    #[serde(default)]
    pub stream: bool,
    /// Optional metadata attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl SendMessageRequest {
    /// Create a streaming message request.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stream: true,
            metadata: None,
        }
    }

    /// Attach metadata to the message.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Request to execute a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutePlaybookRequest {
    /// User-provided input for the playbook.
    pub input: String,
    /// Ask the server for an event-stream response.
    #[serde(default)]
    pub stream: bool,
    /// Run the playbook inside an existing conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Named variables passed to the playbook.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl ExecutePlaybookRequest {
    /// Create a streaming playbook execution request.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            stream: true,
            conversation_id: None,
            variables: Map::new(),
        }
    }

    /// Run inside an existing conversation.
    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set a playbook variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming events
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of a decoded stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Assistant message started.
    #[serde(rename = "message.start")]
    MessageStart,
    /// Text content chunk.
    #[serde(rename = "content")]
    Content,
    /// Tool call started.
    #[serde(rename = "tool.start")]
    ToolStart,
    /// Tool call completed.
    #[serde(rename = "tool.complete")]
    ToolComplete,
    /// Assistant message completed.
    #[serde(rename = "message.complete")]
    MessageComplete,
    /// End of the response. Decoding stops after this event.
    #[serde(rename = "done")]
    Done,
    /// Server-reported error.
    #[serde(rename = "error")]
    Error,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageStart => "message.start",
            EventKind::Content => "content",
            EventKind::ToolStart => "tool.start",
            EventKind::ToolComplete => "tool.complete",
            EventKind::MessageComplete => "message.complete",
            EventKind::Done => "done",
            EventKind::Error => "error",
        }
    }

    /// Whether receipt of this kind ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Done)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an event type string is not a known [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message.start" => Ok(EventKind::MessageStart),
            "content" => Ok(EventKind::Content),
            "tool.start" => Ok(EventKind::ToolStart),
            "tool.complete" => Ok(EventKind::ToolComplete),
            "message.complete" => Ok(EventKind::MessageComplete),
            "done" => Ok(EventKind::Done),
            "error" => Ok(EventKind::Error),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Key used for the payload fallback when a frame's data is not a JSON object.
pub const RAW_KEY: &str = "raw";

/// One decoded application event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Structured payload. `{}` when the frame carried no data,
    /// `{ "raw": <text> }` when the data was not a JSON object.
    pub data: Map<String, Value>,
}

impl Event {
    /// Create an event.
    pub fn new(kind: EventKind, data: Map<String, Value>) -> Self {
        Self { kind, data }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// The `text` field of the payload, if present.
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }

    /// The unparsed payload text when the data fell back to `raw`.
    pub fn raw(&self) -> Option<&str> {
        if self.data.len() == 1 {
            self.data.get(RAW_KEY).and_then(Value::as_str)
        } else {
            None
        }
    }

    /// Deserialize the payload into a caller-defined type.
    pub fn data_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }
}
