// Protocol - Message types for sync communication
//
// Defines the JSON wire format exchanged between nodes:
// - SyncRequest/SyncResponse: pull-based anti-entropy reconciliation
// - NewMessage: optional immediate push of a freshly originated message
// - Rumor: the rumor variant's only message, sent without a type tag

use crate::store::MessageId;
use crate::transport::{Datagram, PeerAddress};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),
}

/// Types of anti-entropy messages, as tagged on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    SyncRequest,
    SyncResponse,
    NewMessage,
}

impl MessageKind {
    /// The `type` tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncRequest => "sync_request",
            Self::SyncResponse => "sync_response",
            Self::NewMessage => "new_message",
        }
    }

    /// Look up a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sync_request" => Some(Self::SyncRequest),
            "sync_response" => Some(Self::SyncResponse),
            "new_message" => Some(Self::NewMessage),
            _ => None,
        }
    }
}

/// Wrapper for all anti-entropy message types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    SyncRequest(SyncRequest),
    SyncResponse(SyncResponse),
    NewMessage(NewMessage),
}

impl Message {
    /// Get the message kind
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::SyncRequest(_) => MessageKind::SyncRequest,
            Message::SyncResponse(_) => MessageKind::SyncResponse,
            Message::NewMessage(_) => MessageKind::NewMessage,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    ///
    /// A well-formed object whose `type` is not one of ours is reported as
    /// `UnknownKind` rather than `Malformed`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing message type".to_string()))?;
        if MessageKind::from_tag(tag).is_none() {
            return Err(ProtocolError::UnknownKind(tag.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

// ============================================================================
// SYNC REQUEST
// ============================================================================

/// Request for state synchronization
///
/// Advertises every id the sender holds; the receiver answers with the
/// entries missing from that set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(rename = "knownIds")]
    known_ids: BTreeSet<MessageId>,
}

impl SyncRequest {
    pub fn new(known_ids: BTreeSet<MessageId>) -> Self {
        Self { known_ids }
    }

    /// Get the advertised ids
    pub fn known_ids(&self) -> &BTreeSet<MessageId> {
        &self.known_ids
    }
}

// ============================================================================
// SYNC RESPONSE
// ============================================================================

/// Response to a sync request, carrying the entries the requester lacks
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    messages: BTreeMap<MessageId, String>,
}

impl SyncResponse {
    pub fn new(messages: BTreeMap<MessageId, String>) -> Self {
        Self { messages }
    }

    /// Get the entries
    pub fn messages(&self) -> &BTreeMap<MessageId, String> {
        &self.messages
    }

    /// Take the entries
    pub fn into_messages(self) -> BTreeMap<MessageId, String> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ============================================================================
// NEW MESSAGE
// ============================================================================

/// Immediate announcement of one originated message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub id: MessageId,
    pub text: String,
}

impl NewMessage {
    pub fn new(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

// ============================================================================
// RUMOR
// ============================================================================

/// A rumor, the rumor variant's single message type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumor {
    pub id: MessageId,
    pub text: String,
}

impl Rumor {
    pub fn new(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

// ============================================================================
// OUTBOUND
// ============================================================================

/// A protocol message an engine wants delivered to one peer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound<M> {
    pub to: PeerAddress,
    pub message: M,
}

impl<M> Outbound<M> {
    pub fn new(to: PeerAddress, message: M) -> Self {
        Self { to, message }
    }
}

impl Outbound<Message> {
    /// Encode for the transport
    pub fn encode(&self) -> Datagram {
        Datagram::new(self.to.clone(), self.message.to_bytes())
    }
}

impl Outbound<Rumor> {
    /// Encode for the transport
    pub fn encode(&self) -> Datagram {
        Datagram::new(self.to.clone(), self.message.to_bytes())
    }
}
