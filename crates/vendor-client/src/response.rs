//! Response bodies as JSON-or-raw-text
//!
//! The vendor sometimes answers with something that isn't JSON: an empty
//! body, an HTML error page from a load balancer. Those come back as
//! `Payload::Raw` so callers have to match before reaching for fields.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// Body that failed to parse as JSON. Unchanged when it is valid UTF-8;
    /// otherwise invalid sequences are replaced with U+FFFD.
    Raw(String),
}

impl Payload {
    /// Parse `text` as JSON, falling back to the raw text.
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Raw(text),
        }
    }

    /// Parse a body as received off the wire.
    pub fn from_bytes(body: Vec<u8>) -> Self {
        if let Ok(value) = serde_json::from_slice(&body) {
            return Payload::Json(value);
        }
        match String::from_utf8(body) {
            Ok(text) => Payload::Raw(text),
            Err(e) => {
                warn!(
                    valid_up_to = e.utf8_error().valid_up_to(),
                    "response body is not valid UTF-8, replacing invalid bytes"
                );
                Payload::Raw(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(text) => Some(text),
            Payload::Json(_) => None,
        }
    }

    /// Field of a JSON object body. `None` for raw text, non-objects, and
    /// missing keys alike.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.as_json()?.as_object()?.get(key)
    }

    /// Body as text, re-serialized if it was JSON.
    pub fn to_text(&self) -> String {
        match self {
            Payload::Json(value) => value.to_string(),
            Payload::Raw(text) => text.clone(),
        }
    }
}

/// Status plus parsed body of a dispatched call.
///
/// Non-2xx statuses are returned as-is; deciding what to do with them is up
/// to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub payload: Payload,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
