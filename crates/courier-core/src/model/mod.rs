//! Domain messages: the typed payloads producers hand to the outbox.
//!
//! The wire shape is `_type`-tagged JSON; see [`crate::codec`] for the
//! byte-level contract.

mod location;
mod transition;

pub use location::MessageLocation;
pub use transition::{MessageTransition, TransitionEvent};

use serde::{Deserialize, Serialize};

/// Message kind tag, carried on queue records and used for topic
/// resolution and transport-side special cases (retained clears).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Location,
    Transition,
    Clear,
    Other,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageKind::Location => "location",
            MessageKind::Transition => "transition",
            MessageKind::Clear => "clear",
            MessageKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A typed domain message.
///
/// `Clear` is the clear-contact marker: it has no payload fields and
/// goes over the wire as a zero-length retained publish to the contact's
/// topic. `Unknown` preserves any JSON object whose `_type` we do not
/// model, so forwarding foreign message kinds is lossless.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainMessage {
    Location(MessageLocation),
    Transition(MessageTransition),
    Clear,
    Unknown(serde_json::Value),
}

impl DomainMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            DomainMessage::Location(_) => MessageKind::Location,
            DomainMessage::Transition(_) => MessageKind::Transition,
            DomainMessage::Clear => MessageKind::Clear,
            DomainMessage::Unknown(_) => MessageKind::Other,
        }
    }
}

impl From<MessageLocation> for DomainMessage {
    fn from(m: MessageLocation) -> Self {
        DomainMessage::Location(m)
    }
}

impl From<MessageTransition> for DomainMessage {
    fn from(m: MessageTransition) -> Self {
        DomainMessage::Transition(m)
    }
}
