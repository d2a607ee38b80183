// Node Configuration
//
// Everything a node needs at startup: variant, listen address, initial
// peers, protocol tuning and the optional seed for peer selection.

use crate::sync::{
    AntiEntropyConfig, AntiEntropyEngine, PeerRegistry, RumorConfig, RumorEngine,
};
use crate::transport::{PeerAddress, UdpTransportConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which dissemination strategy a node runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    AntiEntropy,
    Rumor,
}

impl Variant {
    /// Port used when none is given
    pub fn default_port(&self) -> u16 {
        match self {
            Self::AntiEntropy => 5000,
            Self::Rumor => 4000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AntiEntropy => "anti-entropy",
            Self::Rumor => "rumor",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Sync interval must be greater than zero")]
    ZeroInterval,

    #[error("Fanout must be greater than zero")]
    ZeroFanout,

    #[error("Capacity of the {0} channel must be greater than zero")]
    ZeroBuffer(&'static str),
}

/// Node configuration
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub variant: Variant,
    /// Address to bind the socket to
    pub bind_host: String,
    /// Port to listen on (0 for random)
    pub port: u16,
    /// Initial peer list
    pub peers: Vec<PeerAddress>,
    /// Seed for peer selection; entropy when unset
    pub rng_seed: Option<u64>,
    pub anti_entropy: AntiEntropyConfig,
    pub rumor: RumorConfig,
    /// Capacity of the console command channel
    pub command_buffer: usize,
    /// Capacity of the inbound datagram channel
    pub datagram_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(Variant::AntiEntropy)
    }
}

impl NodeConfig {
    /// Create a config with the variant's defaults
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            bind_host: "0.0.0.0".to_string(),
            port: variant.default_port(),
            peers: Vec::new(),
            rng_seed: None,
            anti_entropy: AntiEntropyConfig::default(),
            rumor: RumorConfig::default(),
            command_buffer: 256,
            datagram_buffer: 1024,
        }
    }

    pub fn with_bind_host(mut self, host: &str) -> Self {
        self.bind_host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_peer(mut self, peer: PeerAddress) -> Self {
        self.peers.push(peer);
        self
    }

    pub fn with_peers<I>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = PeerAddress>,
    {
        self.peers.extend(peers);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.rng_seed = seed;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.anti_entropy.sync_interval = interval;
        self
    }

    pub fn with_broadcast_on_originate(mut self, enabled: bool) -> Self {
        self.anti_entropy.broadcast_on_originate = enabled;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.rumor.fanout = fanout;
        self
    }

    pub fn with_buffers(mut self, command_buffer: usize, datagram_buffer: usize) -> Self {
        self.command_buffer = command_buffer;
        self.datagram_buffer = datagram_buffer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.variant {
            Variant::AntiEntropy if self.anti_entropy.sync_interval.is_zero() => {
                return Err(ConfigError::ZeroInterval)
            }
            Variant::Rumor if self.rumor.fanout == 0 => return Err(ConfigError::ZeroFanout),
            _ => {}
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::ZeroBuffer("command"));
        }
        if self.datagram_buffer == 0 {
            return Err(ConfigError::ZeroBuffer("datagram"));
        }
        Ok(())
    }

    /// Random source for peer selection
    pub fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Registry holding the initial peers
    pub fn peer_registry(&self) -> PeerRegistry {
        PeerRegistry::from_peers(self.peers.iter().cloned())
    }

    /// Socket settings for the UDP transport
    pub fn transport_config(&self) -> UdpTransportConfig {
        UdpTransportConfig::new()
            .with_bind_address(&self.bind_host)
            .with_bind_port(self.port)
    }

    /// Build an anti-entropy engine for a node bound on `port`
    pub fn build_anti_entropy(&self, port: u16) -> AntiEntropyEngine {
        AntiEntropyEngine::new(port, self.peer_registry(), self.anti_entropy.clone(), self.rng())
    }

    /// Build a rumor engine for a node bound on `port`
    pub fn build_rumor(&self, port: u16) -> RumorEngine {
        RumorEngine::new(port, self.peer_registry(), self.rumor.clone(), self.rng())
    }
}
