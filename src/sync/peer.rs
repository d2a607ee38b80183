// Peer Management - Track known peers
//
// Keeps the ordered list of peer addresses a node gossips with and provides
// the random selection used for sync rounds and rumor fan-out. Membership is
// a static hint: there is no liveness tracking and entries only change
// through explicit add/remove.

use crate::transport::PeerAddress;
use rand::seq::SliceRandom;
use rand::Rng;

/// Registry of known peers
///
/// Insertion order is kept for display; it has no effect on selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerRegistry {
    peers: Vec<PeerAddress>,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an initial peer list, dropping duplicates
    pub fn from_peers<I>(peers: I) -> Self
    where
        I: IntoIterator<Item = PeerAddress>,
    {
        let mut registry = Self::new();
        for peer in peers {
            registry.add(peer);
        }
        registry
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Get number of peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if we have a peer
    pub fn contains(&self, peer: &PeerAddress) -> bool {
        self.peers.contains(peer)
    }

    /// Add a peer
    /// Returns true if it was not already registered
    pub fn add(&mut self, peer: PeerAddress) -> bool {
        if self.contains(&peer) {
            return false;
        }
        self.peers.push(peer);
        true
    }

    /// Remove a peer
    /// Returns true if it was registered
    pub fn remove(&mut self, peer: &PeerAddress) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| p != peer);
        self.peers.len() != before
    }

    /// Get all peers in insertion order
    pub fn list(&self) -> &[PeerAddress] {
        &self.peers
    }

    /// Pick one peer uniformly at random
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&PeerAddress> {
        self.peers.choose(rng)
    }

    /// Select up to `count` distinct peers uniformly at random, never `exclude`
    pub fn select_random<R: Rng + ?Sized>(
        &self,
        count: usize,
        exclude: Option<&PeerAddress>,
        rng: &mut R,
    ) -> Vec<PeerAddress> {
        let candidates: Vec<&PeerAddress> = self
            .peers
            .iter()
            .filter(|p| Some(*p) != exclude)
            .collect();

        candidates
            .choose_multiple(rng, count)
            .map(|p| (*p).clone())
            .collect()
    }
}
