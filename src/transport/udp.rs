// UDP Transport Implementation
// One socket per node; hostnames are looked up per send, IP literals are used as is

use crate::transport::traits::StatsCounter;
use crate::transport::{PeerAddress, Transport, TransportError, TransportStats, MAX_DATAGRAM_SIZE};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};
use tracing::trace;

// ============================================================================
// UDP TRANSPORT CONFIG
// ============================================================================

/// Configuration for UDP transport
#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    /// Address to bind to
    pub bind_address: String,
    /// Port to bind to (0 for random)
    pub bind_port: u16,
    /// Receive buffer size; longer datagrams are truncated
    pub recv_buffer_size: usize,
}

impl Default for UdpTransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 0,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl UdpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }
}

// ============================================================================
// UDP TRANSPORT
// ============================================================================

/// UDP transport implementation
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    recv_buffer_size: usize,
    stats: StatsCounter,
}

impl UdpTransport {
    /// Bind a socket according to `config`
    pub async fn bind(config: UdpTransportConfig) -> Result<Self, TransportError> {
        let bind_addr = format!("{}:{}", config.bind_address, config.bind_port);
        let socket = UdpSocket::bind(&bind_addr)
            .await
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", bind_addr, e)))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        Ok(Self {
            socket,
            local_addr,
            recv_buffer_size: config.recv_buffer_size.max(1),
            stats: StatsCounter::default(),
        })
    }

    /// Port actually bound (useful when binding port 0)
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Look up a peer's socket address in the same family as our socket
    ///
    /// IP literals parse without touching the resolver.
    async fn lookup(&self, to: &PeerAddress) -> Result<SocketAddr, TransportError> {
        let candidates = lookup_host(to.to_string())
            .await
            .map_err(|e| TransportError::ResolveFailed(format!("{}: {}", to, e)))?;

        let want_v4 = self.local_addr.is_ipv4();
        candidates
            .into_iter()
            .find(|addr| addr.is_ipv4() == want_v4)
            .ok_or_else(|| TransportError::ResolveFailed(to.to_string()))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, to: &PeerAddress, payload: &[u8]) -> Result<usize, TransportError> {
        if payload.len() > MAX_DATAGRAM_SIZE {
            self.stats.record_error();
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }

        let target = match self.lookup(to).await {
            Ok(target) => target,
            Err(e) => {
                self.stats.record_error();
                return Err(e);
            }
        };

        match self.socket.send_to(payload, target).await {
            Ok(sent) => {
                trace!(%to, bytes = sent, "datagram sent");
                self.stats.record_sent(sent);
                Ok(sent)
            }
            Err(e) => {
                self.stats.record_error();
                Err(TransportError::SendFailed(format!("{}: {}", to, e)))
            }
        }
    }

    async fn resolve(&self, peer: &PeerAddress) -> Result<PeerAddress, TransportError> {
        self.lookup(peer).await.map(PeerAddress::from)
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, PeerAddress), TransportError> {
        let mut buf = vec![0u8; self.recv_buffer_size];
        let (n, from) = self.socket.recv_from(&mut buf).await.map_err(|e| {
            self.stats.record_error();
            TransportError::ReceiveFailed(e.to_string())
        })?;
        buf.truncate(n);
        self.stats.record_received(n);
        Ok((buf, PeerAddress::from(from)))
    }

    fn local_address(&self) -> PeerAddress {
        PeerAddress::from(self.local_addr)
    }

    fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }
}
