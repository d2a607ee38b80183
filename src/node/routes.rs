// Address book - Registry entries and the wire addresses behind them
//
// Peers are registered as typed (`localhost:4001`) but datagrams arrive from
// the resolved socket address (`127.0.0.1:4001`). Engines only ever see
// registry entries: inbound senders are mapped back to the entry they resolve
// from, and outbound targets are mapped to the resolved address.

use crate::transport::PeerAddress;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct AddressBook {
    wire_of: HashMap<PeerAddress, PeerAddress>,
    entry_of: HashMap<PeerAddress, PeerAddress>,
}

impl AddressBook {
    /// Record that `entry` resolves to `wire`
    ///
    /// When two entries resolve to the same address, the first one keeps the
    /// inbound mapping.
    pub(crate) fn insert(&mut self, entry: PeerAddress, wire: PeerAddress) {
        self.entry_of.entry(wire.clone()).or_insert_with(|| entry.clone());
        self.wire_of.insert(entry, wire);
    }

    /// Forget an entry
    pub(crate) fn remove(&mut self, entry: &PeerAddress) {
        if let Some(wire) = self.wire_of.remove(entry) {
            if self.entry_of.get(&wire) == Some(entry) {
                self.entry_of.remove(&wire);
            }
        }
    }

    /// Registry entry a datagram source belongs to, or the source itself
    pub(crate) fn inbound(&self, from: &PeerAddress) -> PeerAddress {
        self.entry_of.get(from).unwrap_or(from).clone()
    }

    /// Address to send to for a registry entry, or the entry itself
    pub(crate) fn outbound(&self, to: &PeerAddress) -> PeerAddress {
        self.wire_of.get(to).unwrap_or(to).clone()
    }
}
