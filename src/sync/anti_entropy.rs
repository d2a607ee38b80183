// Anti-Entropy Engine - Pull-based reconciliation of the full message set
//
// Every round the node sends its known ids to one random peer. Any node that
// receives a SyncRequest answers with the entries the requester lacks, and
// any SyncResponse is union-merged into the local store. Rounds never wait
// for replies; each direction of a pair reconciles independently.

use crate::store::{IdGenerator, MergeResult, MessageId, MessageStore};
use crate::sync::peer::PeerRegistry;
use crate::sync::protocol::{Message, NewMessage, Outbound, SyncRequest, SyncResponse};
use crate::transport::PeerAddress;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the anti-entropy engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AntiEntropyConfig {
    /// Time between two sync rounds
    pub sync_interval: Duration,
    /// Push `new_message` to every peer on origination instead of waiting for a round
    pub broadcast_on_originate: bool,
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_millis(5000),
            broadcast_on_originate: false,
        }
    }
}

impl AntiEntropyConfig {
    /// Create a new config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the round interval
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Enable or disable immediate broadcast of originated messages
    pub fn with_broadcast_on_originate(mut self, enabled: bool) -> Self {
        self.broadcast_on_originate = enabled;
        self
    }
}

/// Statistics about the anti-entropy engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AntiEntropyStats {
    pub rounds_started: u64,
    pub rounds_skipped: u64,
    pub requests_answered: u64,
    pub responses_applied: u64,
    pub entries_merged: u64,
    pub new_messages_received: u64,
}

/// The anti-entropy engine - owns the replica and the peer registry
pub struct AntiEntropyEngine {
    ids: IdGenerator,
    store: MessageStore,
    peers: PeerRegistry,
    config: AntiEntropyConfig,
    rng: StdRng,
    stats: AntiEntropyStats,
}

impl AntiEntropyEngine {
    /// Create an engine for a node listening on `port`
    pub fn new(port: u16, peers: PeerRegistry, config: AntiEntropyConfig, rng: StdRng) -> Self {
        Self {
            ids: IdGenerator::new(port),
            store: MessageStore::new(),
            peers,
            config,
            rng,
            stats: AntiEntropyStats::default(),
        }
    }

    /// Get the message store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Get the peer registry
    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Get the mutable peer registry
    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    /// Get the configuration
    pub fn config(&self) -> &AntiEntropyConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &AntiEntropyStats {
        &self.stats
    }

    // ========================================================================
    // LOCAL OPERATIONS
    // ========================================================================

    /// Create a message locally
    ///
    /// By default nothing is sent: the next rounds spread it. With
    /// `broadcast_on_originate` every peer also gets a `new_message`.
    pub fn originate(&mut self, text: impl Into<String>) -> (MessageId, Vec<Outbound<Message>>) {
        let text = text.into();
        let id = self.ids.next_id();
        self.store.put(id.clone(), text.clone());
        info!(%id, %text, "message created");

        if !self.config.broadcast_on_originate {
            return (id, Vec::new());
        }

        let announcement = Message::NewMessage(NewMessage::new(id.clone(), text));
        let outbound = self
            .peers
            .list()
            .iter()
            .map(|peer| Outbound::new(peer.clone(), announcement.clone()))
            .collect();
        (id, outbound)
    }

    /// Store a message under an explicit id, as if it had been received
    pub fn insert(&mut self, id: MessageId, text: impl Into<String>) -> bool {
        self.store.put(id, text)
    }

    /// Remove a message from the local store only
    ///
    /// No tombstone is kept: a later sync with a peer that still holds the
    /// id restores it.
    pub fn delete_message(&mut self, id: &MessageId) -> bool {
        let removed = self.store.delete(id);
        if removed {
            info!(%id, "message deleted locally");
        }
        removed
    }

    // ========================================================================
    // SYNC ROUND
    // ========================================================================

    /// Generate a sync request
    pub fn generate_sync_request(&self) -> SyncRequest {
        SyncRequest::new(self.store.known_ids())
    }

    /// Start one round: a sync request to one random peer
    /// Returns None when no peer is registered
    pub fn start_round(&mut self) -> Option<Outbound<Message>> {
        let Some(peer) = self.peers.pick_random(&mut self.rng).cloned() else {
            self.stats.rounds_skipped += 1;
            debug!("no peers known, skipping sync round");
            return None;
        };

        self.stats.rounds_started += 1;
        let request = self.generate_sync_request();
        debug!(%peer, known = request.known_ids().len(), "sending sync_request");
        Some(Outbound::new(peer, Message::SyncRequest(request)))
    }

    // ========================================================================
    // SYNC REQUEST/RESPONSE
    // ========================================================================

    /// Answer a sync request with everything `from` is missing
    ///
    /// The response goes back even when nothing is missing.
    pub fn handle_sync_request(
        &mut self,
        request: &SyncRequest,
        from: &PeerAddress,
    ) -> Outbound<Message> {
        let missing = self.store.missing_from(request.known_ids());
        self.stats.requests_answered += 1;
        debug!(peer = %from, missing = missing.len(), "sending sync_response");
        Outbound::new(from.clone(), Message::SyncResponse(SyncResponse::new(missing)))
    }

    /// Apply a sync response to our store
    pub fn apply_sync_response(&mut self, response: SyncResponse) -> MergeResult {
        let messages = response.into_messages();
        for (id, text) in messages.iter().filter(|(id, _)| !self.store.contains(id)) {
            debug!(%id, %text, "synchronized message");
        }
        let result = self.store.merge(messages);
        self.stats.responses_applied += 1;
        self.stats.entries_merged += result.new_entries as u64;

        if result.new_entries > 0 {
            info!(
                new_entries = result.new_entries,
                total = result.total_after_merge,
                "anti-entropy brought new messages"
            );
        }
        result
    }

    /// Store a pushed message
    /// Returns true if it was new
    pub fn handle_new_message(&mut self, message: NewMessage) -> bool {
        let NewMessage { id, text } = message;
        let added = self.store.put(id.clone(), text);
        if added {
            self.stats.new_messages_received += 1;
            info!(%id, "new message received");
        }
        added
    }

    // ========================================================================
    // MESSAGE PROCESSING
    // ========================================================================

    /// Process an incoming message and return what must be sent in reply
    pub fn process_message(&mut self, msg: Message, from: &PeerAddress) -> Vec<Outbound<Message>> {
        match msg {
            Message::SyncRequest(request) => vec![self.handle_sync_request(&request, from)],
            Message::SyncResponse(response) => {
                self.apply_sync_response(response);
                Vec::new()
            }
            Message::NewMessage(message) => {
                self.handle_new_message(message);
                Vec::new()
            }
        }
    }
}
