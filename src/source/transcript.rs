//! Session transcript line schema
//!
//! One line per event; only `type: "message"` events carry a nested message
//! with role, content, optional usage block, model and timestamp.

use serde::Deserialize;
use serde_json::Value;

use crate::core::{UsageAmounts, epoch_ms, resolve_model, resolve_usage};

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    message: Option<TranscriptMessage>,
    model: Option<Value>,
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptMessage {
    role: Option<String>,
    content: Option<Value>,
    usage: Option<Value>,
    model: Option<Value>,
    timestamp: Option<Value>,
}

impl TranscriptEvent {
    /// The nested message, for message events only
    pub(crate) fn message(&self) -> Option<&TranscriptMessage> {
        if self.event_type.as_deref() != Some("message") {
            return None;
        }
        self.message.as_ref()
    }

    /// Message-level timestamp first, then the event-level one
    pub(crate) fn timestamp_ms(&self) -> Option<i64> {
        self.message
            .as_ref()
            .and_then(|m| m.timestamp.as_ref())
            .and_then(epoch_ms)
            .or_else(|| self.timestamp.as_ref().and_then(epoch_ms))
    }

    /// Message model, then usage-block model, then event model
    pub(crate) fn model(&self) -> String {
        let message = self.message.as_ref();
        resolve_model([
            message.and_then(|m| m.model.as_ref()).and_then(Value::as_str),
            message
                .and_then(|m| m.usage_block())
                .and_then(|u| u.get("model"))
                .and_then(Value::as_str),
            self.model.as_ref().and_then(Value::as_str),
        ])
    }
}

impl TranscriptMessage {
    pub(crate) fn is_user(&self) -> bool {
        self.role.as_deref() == Some("user")
    }

    pub(crate) fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }

    pub(crate) fn usage_block(&self) -> Option<&Value> {
        self.usage.as_ref().filter(|u| u.is_object())
    }

    pub(crate) fn usage(&self) -> Option<UsageAmounts> {
        self.usage_block().map(resolve_usage)
    }

    /// Plain string content, or the text parts of a part list joined in order
    pub(crate) fn text(&self) -> String {
        match &self.content {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(parts)) => parts
                .iter()
                .filter(|part| {
                    part.get("type")
                        .and_then(Value::as_str)
                        .is_none_or(|t| t == "text")
                })
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
pub(crate) fn event(value: Value) -> TranscriptEvent {
    serde_json::from_value(value).expect("transcript event")
}
