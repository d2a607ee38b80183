// Node Config Tests
// Tests for variants, defaults, validation and engine construction

use epimesh::node::{ConfigError, NodeConfig, Variant};
use epimesh::transport::PeerAddress;
use std::time::Duration;

fn peer(port: u16) -> PeerAddress {
    PeerAddress::new("localhost", port).unwrap()
}

// ============================================================================
// VARIANT
// ============================================================================

#[test]
fn test_variant_default_ports() {
    assert_eq!(Variant::AntiEntropy.default_port(), 5000);
    assert_eq!(Variant::Rumor.default_port(), 4000);
}

#[test]
fn test_variant_display() {
    assert_eq!(Variant::AntiEntropy.to_string(), "anti-entropy");
    assert_eq!(Variant::Rumor.to_string(), "rumor");
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_config_defaults_per_variant() {
    let ae = NodeConfig::new(Variant::AntiEntropy);
    assert_eq!(ae.port, 5000);
    assert_eq!(ae.bind_host, "0.0.0.0");
    assert_eq!(ae.anti_entropy.sync_interval, Duration::from_millis(5000));
    assert!(ae.peers.is_empty());

    let rumor = NodeConfig::new(Variant::Rumor);
    assert_eq!(rumor.port, 4000);
    assert_eq!(rumor.rumor.fanout, 2);
}

#[test]
fn test_config_builder() {
    let config = NodeConfig::new(Variant::Rumor)
        .with_port(4100)
        .with_bind_host("127.0.0.1")
        .with_peer(peer(4101))
        .with_peers([peer(4102), peer(4103)])
        .with_fanout(3)
        .with_seed(Some(8));

    assert_eq!(config.port, 4100);
    assert_eq!(config.peers.len(), 3);
    assert_eq!(config.rumor.fanout, 3);
    assert_eq!(config.rng_seed, Some(8));

    let transport = config.transport_config();
    assert_eq!(transport.bind_address, "127.0.0.1");
    assert_eq!(transport.bind_port, 4100);
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_validate_accepts_defaults() {
    assert!(NodeConfig::new(Variant::AntiEntropy).validate().is_ok());
    assert!(NodeConfig::new(Variant::Rumor).validate().is_ok());
}

#[test]
fn test_validate_zero_interval() {
    let config = NodeConfig::new(Variant::AntiEntropy).with_sync_interval(Duration::ZERO);
    assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
}

#[test]
fn test_validate_zero_fanout() {
    let config = NodeConfig::new(Variant::Rumor).with_fanout(0);
    assert_eq!(config.validate(), Err(ConfigError::ZeroFanout));
}

#[test]
fn test_validate_ignores_other_variant_settings() {
    let config = NodeConfig::new(Variant::Rumor).with_sync_interval(Duration::ZERO);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_buffers() {
    let config = NodeConfig::new(Variant::Rumor).with_buffers(0, 8);
    assert_eq!(config.validate(), Err(ConfigError::ZeroBuffer("command")));

    let config = NodeConfig::new(Variant::Rumor).with_buffers(8, 0);
    assert_eq!(config.validate(), Err(ConfigError::ZeroBuffer("datagram")));
}

// ============================================================================
// ENGINE CONSTRUCTION
// ============================================================================

#[test]
fn test_build_anti_entropy_uses_bound_port() {
    let config = NodeConfig::new(Variant::AntiEntropy)
        .with_port(0)
        .with_peers([peer(5001)])
        .with_broadcast_on_originate(true);
    let mut engine = config.build_anti_entropy(5123);

    let (id, outbound) = engine.originate("x");
    assert_eq!(id.origin_port(), Some(5123));
    assert_eq!(outbound.len(), 1);
    assert!(engine.peers().contains(&peer(5001)));
}

#[test]
fn test_build_rumor_uses_fanout() {
    let config = NodeConfig::new(Variant::Rumor)
        .with_peers((4001..=4005).map(peer))
        .with_fanout(4);
    let mut engine = config.build_rumor(4000);

    let (rumor, outbound) = engine.originate("y");
    assert_eq!(rumor.id.origin_port(), Some(4000));
    assert_eq!(outbound.len(), 4);
}

#[test]
fn test_seeded_config_is_reproducible() {
    let config = NodeConfig::new(Variant::Rumor)
        .with_peers((4001..=4010).map(peer))
        .with_seed(Some(77));

    let targets = || {
        let mut engine = config.build_rumor(4000);
        let (_, outbound) = engine.originate("z");
        outbound.into_iter().map(|o| o.to).collect::<Vec<_>>()
    };

    assert_eq!(targets(), targets());
}
