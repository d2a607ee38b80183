// Rumor Engine - Push gossip with bounded fan-out
//
// A new rumor is forwarded to at most `fanout` random peers. A node that
// receives a rumor it has not seen records the id and forwards it the same
// way, never back to the peer it came from. Rumors already seen are dropped,
// so every node relays a given id at most once and dissemination terminates.

use crate::store::{IdGenerator, MessageId, SeenSet};
use crate::sync::peer::PeerRegistry;
use crate::sync::protocol::{Outbound, Rumor};
use crate::transport::PeerAddress;
use rand::rngs::StdRng;
use tracing::{debug, info};

/// Configuration for the rumor engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RumorConfig {
    /// Number of peers to forward each rumor to
    pub fanout: usize,
}

impl Default for RumorConfig {
    fn default() -> Self {
        Self { fanout: 2 }
    }
}

impl RumorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fanout
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }
}

/// Statistics about the rumor engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RumorStats {
    pub rumors_originated: u64,
    pub rumors_accepted: u64,
    pub rumors_suppressed: u64,
    /// Individual sends, one per target peer
    pub rumors_forwarded: u64,
}

/// What happened to an incoming rumor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RumorOutcome {
    /// First sighting; forward to these peers
    Accepted(Vec<Outbound<Rumor>>),
    /// Already seen; nothing to do
    Suppressed,
}

impl RumorOutcome {
    /// Sends produced by this outcome
    pub fn into_outbound(self) -> Vec<Outbound<Rumor>> {
        match self {
            Self::Accepted(outbound) => outbound,
            Self::Suppressed => Vec::new(),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

/// The rumor engine - owns the seen-set and the peer registry
pub struct RumorEngine {
    ids: IdGenerator,
    seen: SeenSet,
    peers: PeerRegistry,
    config: RumorConfig,
    rng: StdRng,
    stats: RumorStats,
}

impl RumorEngine {
    /// Create an engine for a node listening on `port`
    pub fn new(port: u16, peers: PeerRegistry, config: RumorConfig, rng: StdRng) -> Self {
        Self {
            ids: IdGenerator::new(port),
            seen: SeenSet::new(),
            peers,
            config,
            rng,
            stats: RumorStats::default(),
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    pub fn config(&self) -> &RumorConfig {
        &self.config
    }

    pub fn stats(&self) -> &RumorStats {
        &self.stats
    }

    /// Start a new rumor and forward it to up to `fanout` peers
    pub fn originate(&mut self, text: impl Into<String>) -> (Rumor, Vec<Outbound<Rumor>>) {
        let rumor = Rumor::new(self.ids.next_id(), text);
        self.seen.insert(rumor.id.clone());
        self.stats.rumors_originated += 1;
        info!(id = %rumor.id, text = %rumor.text, "starting rumor");

        let outbound = self.forward(&rumor, None);
        (rumor, outbound)
    }

    /// Handle a rumor received from `from`
    pub fn handle_rumor(&mut self, rumor: Rumor, from: &PeerAddress) -> RumorOutcome {
        if !self.seen.insert(rumor.id.clone()) {
            self.stats.rumors_suppressed += 1;
            debug!(id = %rumor.id, peer = %from, "rumor already known, not forwarding");
            return RumorOutcome::Suppressed;
        }

        self.stats.rumors_accepted += 1;
        info!(id = %rumor.id, peer = %from, text = %rumor.text, "new rumor received");
        RumorOutcome::Accepted(self.forward(&rumor, Some(from)))
    }

    /// Check whether a rumor id has been seen
    pub fn has_seen(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    fn forward(&mut self, rumor: &Rumor, exclude: Option<&PeerAddress>) -> Vec<Outbound<Rumor>> {
        let targets = self
            .peers
            .select_random(self.config.fanout, exclude, &mut self.rng);
        if targets.is_empty() {
            debug!(id = %rumor.id, "no eligible peers to forward rumor to");
        }

        self.stats.rumors_forwarded += targets.len() as u64;
        targets
            .into_iter()
            .map(|peer| {
                debug!(id = %rumor.id, %peer, "forwarding rumor");
                Outbound::new(peer, rumor.clone())
            })
            .collect()
    }
}
