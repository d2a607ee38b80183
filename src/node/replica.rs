// Replica - What the node loop needs from an engine
//
// Both engines speak in typed Outbound messages; this layer encodes them
// into datagrams and maps variant-specific operations onto one surface.

use crate::node::config::Variant;
use crate::node::runtime::NodeError;
use crate::store::MessageId;
use crate::sync::{AntiEntropyEngine, Dispatcher, PeerRegistry, RumorEngine};
use crate::transport::Datagram;
use std::time::Duration;

/// An engine the node event loop can drive
pub trait Replica: Dispatcher + Send + 'static {
    /// Variant this engine implements
    const VARIANT: Variant;

    /// Period of scheduled rounds; None for purely reactive engines
    fn round_interval(&self) -> Option<Duration>;

    /// Run one scheduled round
    fn on_tick(&mut self) -> Vec<Datagram>;

    /// Originate a message with the given text
    fn on_originate(&mut self, text: String) -> (MessageId, Vec<Datagram>);

    fn registry(&self) -> &PeerRegistry;

    fn registry_mut(&mut self) -> &mut PeerRegistry;

    /// Every stored message, in id order
    fn list_messages(&self) -> Result<Vec<(MessageId, String)>, NodeError>;

    /// Remove a stored message locally
    fn remove_message(&mut self, id: &MessageId) -> Result<bool, NodeError>;
}

impl Replica for AntiEntropyEngine {
    const VARIANT: Variant = Variant::AntiEntropy;

    fn round_interval(&self) -> Option<Duration> {
        Some(self.config().sync_interval)
    }

    fn on_tick(&mut self) -> Vec<Datagram> {
        self.start_round().iter().map(|o| o.encode()).collect()
    }

    fn on_originate(&mut self, text: String) -> (MessageId, Vec<Datagram>) {
        let (id, outbound) = self.originate(text);
        (id, outbound.iter().map(|o| o.encode()).collect())
    }

    fn registry(&self) -> &PeerRegistry {
        self.peers()
    }

    fn registry_mut(&mut self) -> &mut PeerRegistry {
        self.peers_mut()
    }

    fn list_messages(&self) -> Result<Vec<(MessageId, String)>, NodeError> {
        Ok(self
            .store()
            .iter()
            .map(|(id, text)| (id.clone(), text.to_string()))
            .collect())
    }

    fn remove_message(&mut self, id: &MessageId) -> Result<bool, NodeError> {
        Ok(self.delete_message(id))
    }
}

impl Replica for RumorEngine {
    const VARIANT: Variant = Variant::Rumor;

    fn round_interval(&self) -> Option<Duration> {
        None
    }

    fn on_tick(&mut self) -> Vec<Datagram> {
        Vec::new()
    }

    fn on_originate(&mut self, text: String) -> (MessageId, Vec<Datagram>) {
        let (rumor, outbound) = self.originate(text);
        (rumor.id, outbound.iter().map(|o| o.encode()).collect())
    }

    fn registry(&self) -> &PeerRegistry {
        self.peers()
    }

    fn registry_mut(&mut self) -> &mut PeerRegistry {
        self.peers_mut()
    }

    fn list_messages(&self) -> Result<Vec<(MessageId, String)>, NodeError> {
        Err(NodeError::Unsupported {
            operation: "list messages",
            variant: Self::VARIANT,
        })
    }

    fn remove_message(&mut self, _id: &MessageId) -> Result<bool, NodeError> {
        Err(NodeError::Unsupported {
            operation: "delete message",
            variant: Self::VARIANT,
        })
    }
}
