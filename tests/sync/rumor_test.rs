// Rumor Tests
// Tests for push gossip with bounded fan-out and duplicate suppression

use epimesh::sync::{PeerRegistry, Rumor, RumorConfig, RumorEngine, RumorOutcome};
use epimesh::transport::PeerAddress;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn peer(port: u16) -> PeerAddress {
    PeerAddress::new("localhost", port).unwrap()
}

fn engine(port: u16, peers: &[u16], fanout: usize) -> RumorEngine {
    let registry = PeerRegistry::from_peers(peers.iter().map(|p| peer(*p)));
    let config = RumorConfig::new().with_fanout(fanout);
    RumorEngine::new(port, registry, config, StdRng::seed_from_u64(port as u64))
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_rumor_config_default_fanout() {
    assert_eq!(RumorConfig::default().fanout, 2);
}

// ============================================================================
// ORIGINATE
// ============================================================================

#[test]
fn test_originate_marks_seen_and_fans_out() {
    let mut node = engine(4000, &[4001, 4002, 4003], 2);
    let (rumor, outbound) = node.originate("hello");

    assert!(node.has_seen(&rumor.id));
    assert_eq!(outbound.len(), 2);
    let targets: HashSet<_> = outbound.iter().map(|o| o.to.clone()).collect();
    assert_eq!(targets.len(), 2);
    assert!(outbound.iter().all(|o| o.message == rumor));
}

#[test]
fn test_originate_with_fewer_peers_than_fanout() {
    let mut node = engine(4000, &[4001], 3);
    let (_, outbound) = node.originate("hello");
    assert_eq!(outbound.len(), 1);
}

#[test]
fn test_originate_without_peers_sends_nothing() {
    let mut node = engine(4000, &[], 2);
    let (rumor, outbound) = node.originate("alone");

    assert!(outbound.is_empty());
    assert!(node.has_seen(&rumor.id));
}

// ============================================================================
// RECEIVE
// ============================================================================

#[test]
fn test_new_rumor_is_forwarded_never_to_sender() {
    let rumor = Rumor::new("4000-1".into(), "hi");

    for seed in 0..20 {
        let registry = PeerRegistry::from_peers([peer(4000), peer(4002), peer(4003)]);
        let rng = StdRng::seed_from_u64(seed);
        let mut node = RumorEngine::new(4001, registry, RumorConfig::default(), rng);

        let outcome = node.handle_rumor(rumor.clone(), &peer(4000));
        assert!(!outcome.is_suppressed());

        let outbound = outcome.into_outbound();
        assert_eq!(outbound.len(), 2);
        assert!(outbound.iter().all(|o| o.to != peer(4000)));
    }
}

#[test]
fn test_duplicate_rumor_is_suppressed() {
    let mut node = engine(4001, &[4000, 4002], 2);
    let rumor = Rumor::new("4000-1".into(), "hi");

    node.handle_rumor(rumor.clone(), &peer(4000));
    let second = node.handle_rumor(rumor, &peer(4002));

    assert_eq!(second, RumorOutcome::Suppressed);
    assert!(second.into_outbound().is_empty());
    assert_eq!(node.stats().rumors_suppressed, 1);
}

#[test]
fn test_own_rumor_coming_back_is_suppressed() {
    let mut node = engine(4000, &[4001], 2);
    let (rumor, _) = node.originate("boomerang");

    assert!(node.handle_rumor(rumor, &peer(4001)).is_suppressed());
}

#[test]
fn test_rumor_from_unregistered_sender_is_accepted() {
    let mut node = engine(4001, &[4002], 2);
    let outcome = node.handle_rumor(Rumor::new("9000-1".into(), "stranger"), &peer(9000));

    let outbound = outcome.into_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].to, peer(4002));
}

#[test]
fn test_only_peer_is_sender_forwards_nothing() {
    let mut node = engine(4001, &[4000], 2);
    let outcome = node.handle_rumor(Rumor::new("4000-1".into(), "hi"), &peer(4000));

    assert!(!outcome.is_suppressed());
    assert!(outcome.into_outbound().is_empty());
}

#[test]
fn test_seen_set_only_grows() {
    let mut node = engine(4001, &[4000, 4002], 2);
    let mut last = 0;

    for id in ["4000-1", "4000-2", "4000-1", "4002-1", "4000-2"] {
        node.handle_rumor(Rumor::new(id.into(), "x"), &peer(4000));
        assert!(node.seen().len() >= last);
        last = node.seen().len();
    }

    assert_eq!(last, 3);
    assert_eq!(node.stats().rumors_accepted, 3);
}
