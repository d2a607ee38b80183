// Dispatch - Inbound datagram decoding and routing
//
// Turns raw datagrams into typed messages for an engine and returns the
// datagrams the engine wants sent in reaction. A datagram that fails to
// decode is rejected before the engine sees it, so it cannot change state.

use crate::sync::anti_entropy::AntiEntropyEngine;
use crate::sync::protocol::{Message, ProtocolError, Rumor};
use crate::sync::rumor::RumorEngine;
use crate::transport::{Datagram, PeerAddress};
use thiserror::Error;

/// Dispatch errors; all are per-datagram and recoverable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Malformed datagram from {from}: {reason}")]
    Decode { from: PeerAddress, reason: String },

    #[error("Unknown message kind '{kind}' from {from}")]
    UnknownKind { from: PeerAddress, kind: String },
}

impl DispatchError {
    fn from_protocol(from: &PeerAddress, err: ProtocolError) -> Self {
        match err {
            ProtocolError::Malformed(reason) => Self::Decode {
                from: from.clone(),
                reason,
            },
            ProtocolError::UnknownKind(kind) => Self::UnknownKind {
                from: from.clone(),
                kind,
            },
        }
    }

    /// Check if the payload could not be decoded at all
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Something that consumes inbound datagrams
pub trait Dispatcher {
    /// Decode `data` received from `from`, apply it, and return the replies
    fn dispatch(&mut self, data: &[u8], from: &PeerAddress) -> Result<Vec<Datagram>, DispatchError>;
}

impl Dispatcher for AntiEntropyEngine {
    fn dispatch(
        &mut self,
        data: &[u8],
        from: &PeerAddress,
    ) -> Result<Vec<Datagram>, DispatchError> {
        let message = Message::from_bytes(data).map_err(|e| DispatchError::from_protocol(from, e))?;
        Ok(self
            .process_message(message, from)
            .iter()
            .map(|outbound| outbound.encode())
            .collect())
    }
}

impl Dispatcher for RumorEngine {
    fn dispatch(
        &mut self,
        data: &[u8],
        from: &PeerAddress,
    ) -> Result<Vec<Datagram>, DispatchError> {
        let rumor = Rumor::from_bytes(data).map_err(|e| DispatchError::from_protocol(from, e))?;
        Ok(self
            .handle_rumor(rumor, from)
            .into_outbound()
            .iter()
            .map(|outbound| outbound.encode())
            .collect())
    }
}
