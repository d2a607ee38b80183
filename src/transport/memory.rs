// In-Memory Transport Implementation
// Simulated lossy datagram network for running many nodes inside one process
//
// Every endpoint bound on a MemoryNetwork gets an inbox. Sends to an address
// nobody is bound on vanish, like UDP to a closed port. A configurable loss
// rate drops datagrams at random.

use crate::transport::traits::StatsCounter;
use crate::transport::{PeerAddress, Transport, TransportError, TransportStats, MAX_DATAGRAM_SIZE};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

type Inbox = mpsc::UnboundedSender<(Vec<u8>, PeerAddress)>;

/// A datagram observed on the simulated wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub from: PeerAddress,
    pub to: PeerAddress,
    pub payload: Vec<u8>,
    pub delivered: bool,
}

struct NetworkInner {
    endpoints: HashMap<PeerAddress, Inbox>,
    loss_rate: f64,
    rng: StdRng,
    log: Vec<WireRecord>,
}

/// Shared simulated network
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    /// Create a lossless network
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(NetworkInner {
                endpoints: HashMap::new(),
                loss_rate: 0.0,
                rng: StdRng::from_entropy(),
                log: Vec::new(),
            })),
        }
    }

    /// Drop each datagram with probability `rate` (clamped to 0..=1)
    pub fn with_loss_rate(self, rate: f64) -> Self {
        self.lock().loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Seed the loss decisions for reproducible runs
    pub fn with_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Attach an endpoint at `address`, replacing any previous one
    pub fn bind(&self, address: PeerAddress) -> MemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().endpoints.insert(address.clone(), tx);

        MemoryTransport {
            address,
            network: self.clone(),
            inbox: tokio::sync::Mutex::new(rx),
            stats: StatsCounter::default(),
        }
    }

    /// Detach an endpoint; its pending receive ends with `Closed`
    pub fn unbind(&self, address: &PeerAddress) {
        self.lock().endpoints.remove(address);
    }

    /// Every datagram sent so far, in send order
    pub fn wire_log(&self) -> Vec<WireRecord> {
        self.lock().log.clone()
    }

    /// Number of datagrams sent from `from`
    pub fn sent_from(&self, from: &PeerAddress) -> usize {
        self.lock().log.iter().filter(|r| &r.from == from).count()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether the datagram reached an inbox
    fn deliver(&self, from: &PeerAddress, to: &PeerAddress, payload: &[u8]) -> bool {
        let mut inner = self.lock();
        let loss_rate = inner.loss_rate;
        let lost = loss_rate > 0.0 && inner.rng.gen_bool(loss_rate);
        let delivered = !lost
            && inner
                .endpoints
                .get(to)
                .map(|inbox| inbox.send((payload.to_vec(), from.clone())).is_ok())
                .unwrap_or(false);

        inner.log.push(WireRecord {
            from: from.clone(),
            to: to.clone(),
            payload: payload.to_vec(),
            delivered,
        });
        delivered
    }
}

/// One node's endpoint on a MemoryNetwork
pub struct MemoryTransport {
    address: PeerAddress,
    network: MemoryNetwork,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<(Vec<u8>, PeerAddress)>>,
    stats: StatsCounter,
}

impl MemoryTransport {
    /// The network this endpoint is attached to
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_to(&self, to: &PeerAddress, payload: &[u8]) -> Result<usize, TransportError> {
        if payload.len() > MAX_DATAGRAM_SIZE {
            self.stats.record_error();
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }

        if !self.network.deliver(&self.address, to, payload) {
            trace!(from = %self.address, %to, "datagram lost");
            self.stats.record_dropped();
        }
        self.stats.record_sent(payload.len());
        Ok(payload.len())
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, PeerAddress), TransportError> {
        let mut inbox = self.inbox.lock().await;
        let (payload, from) = inbox.recv().await.ok_or(TransportError::Closed)?;
        self.stats.record_received(payload.len());
        Ok((payload, from))
    }

    fn local_address(&self) -> PeerAddress {
        self.address.clone()
    }

    fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }
}
