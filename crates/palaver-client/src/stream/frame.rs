//! Parsing of a single blank-line-delimited SSE block.

use serde_json::{Map, Value};

use crate::types::{Event, EventKind, RAW_KEY};

/// Frame delimiter: one blank line.
pub(crate) const DELIMITER: &str = "\n\n";

/// One delimited block of SSE text before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Value of the last `event:` line, if any.
    pub event_type: Option<String>,
    /// Values of the `data:` lines, in arrival order.
    pub data_lines: Vec<String>,
}

impl Frame {
    /// Parse a block of text (without its trailing delimiter).
    ///
    /// `id:`, `retry:`, comments and unknown lines are ignored. An `event:`
    /// line with an empty value clears the type.
    pub fn parse(block: &str) -> Self {
        let mut frame = Frame::default();

        for line in block.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(value) = line.strip_prefix("event:") {
                let value = value.trim();
                frame.event_type = (!value.is_empty()).then(|| value.to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                frame.data_lines.push(value.trim_start().to_string());
            }
        }

        frame
    }

    /// Whether no recognized line was present.
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.data_lines.is_empty()
    }

    /// The data lines joined with newlines.
    pub fn data_text(&self) -> String {
        self.data_lines.join("\n")
    }

    /// Event type after defaulting: an untyped frame with data is `content`.
    pub fn resolved_type(&self) -> Option<&str> {
        match &self.event_type {
            Some(event_type) => Some(event_type.as_str()),
            None if !self.data_lines.is_empty() => Some(EventKind::Content.as_str()),
            None => None,
        }
    }

    /// Convert into an application event.
    ///
    /// Returns `None` for empty frames and for event types this client does
    /// not know about.
    pub fn into_event(self) -> Option<Event> {
        if self.is_empty() {
            return None;
        }
        let event_type = self.resolved_type()?;
        let kind = match event_type.parse::<EventKind>() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::debug!(event_type, "Skipping unknown stream event");
                return None;
            }
        };

        let data = if self.data_lines.is_empty() {
            Map::new()
        } else {
            parse_payload(&self.data_text())
        };

        Some(Event::new(kind, data))
    }
}

/// Parse a frame's data text into a mapping.
///
/// Anything that is not a JSON object is kept as `{ "raw": text }` so one
/// bad frame never ends the stream.
pub fn parse_payload(text: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => raw_payload(text),
        Err(e) => {
            tracing::warn!(data = %text, error = %e, "Failed to parse stream event payload");
            raw_payload(text)
        }
    }
}

fn raw_payload(text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(RAW_KEY.to_string(), Value::String(text.to_string()));
    map
}
