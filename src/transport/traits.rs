// Transport Traits and Core Types
// Defines the abstract datagram Transport trait and the types shared by all implementations

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Largest payload that fits in a single UDP datagram over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

// ============================================================================
// PEER ADDRESS
// ============================================================================

/// A peer's `host:port` address
///
/// Equality is exact on host and port: `localhost:5000` and `127.0.0.1:5000`
/// are different peers. Hostnames are resolved per send.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    /// Create an address from parts
    pub fn new(host: &str, port: u16) -> Result<Self, TransportError> {
        let host = host.trim();
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(TransportError::InvalidAddress(format!("{}:{}", host, port)));
        }
        if port == 0 {
            return Err(TransportError::InvalidAddress(format!("{}:{}", host, port)));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Parse `host:port`
    pub fn parse(address: &str) -> Result<Self, TransportError> {
        let trimmed = address.trim();
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidAddress(trimmed.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| TransportError::InvalidAddress(trimmed.to_string()))?;
        Self::new(host, port)
    }

    /// Get the host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        let host = match addr {
            SocketAddr::V4(v4) => v4.ip().to_string(),
            SocketAddr::V6(v6) => format!("[{}]", v6.ip()),
        };
        Self {
            host,
            port: addr.port(),
        }
    }
}

// ============================================================================
// DATAGRAM
// ============================================================================

/// An encoded payload addressed to one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub to: PeerAddress,
    pub payload: Vec<u8>,
}

impl Datagram {
    pub fn new(to: PeerAddress, payload: Vec<u8>) -> Self {
        Self { to, payload }
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Could not resolve {0}")]
    ResolveFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Payload too large ({0} bytes)")]
    PayloadTooLarge(usize),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Check if this is a send-related error
    pub fn is_send_error(&self) -> bool {
        matches!(
            self,
            Self::SendFailed(_) | Self::ResolveFailed(_) | Self::PayloadTooLarge(_)
        )
    }

    /// Check if the transport can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::BindFailed(_))
    }
}

// ============================================================================
// TRANSPORT STATISTICS
// ============================================================================

/// Statistics for transport operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Datagrams lost in transit (simulated transports only)
    pub datagrams_dropped: u64,
    pub errors: u64,
}

/// Counters shared between a transport's send and receive paths
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    datagrams_sent: AtomicU64,
    datagrams_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    datagrams_dropped: AtomicU64,
    errors: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record_sent(&self, bytes: usize) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Unreliable, unordered, connectionless datagram transport
///
/// A successful `send_to` only means the payload left this node; there is no
/// acknowledgment and no retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to a peer
    async fn send_to(&self, to: &PeerAddress, payload: &[u8]) -> Result<usize, TransportError>;

    /// Wait for the next datagram and its source address
    async fn recv_from(&self) -> Result<(Vec<u8>, PeerAddress), TransportError>;

    /// Resolve a peer to the address its datagrams arrive from
    ///
    /// `recv_from` reports senders in this form, so a node compares resolved
    /// addresses to recognize a registered peer. Transports that address
    /// peers literally return the address unchanged.
    async fn resolve(&self, peer: &PeerAddress) -> Result<PeerAddress, TransportError> {
        Ok(peer.clone())
    }

    /// Address this transport receives on
    fn local_address(&self) -> PeerAddress;

    /// Get transport statistics
    fn stats(&self) -> TransportStats;
}
