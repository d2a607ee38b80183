// Transport module - THE WIRE (abstract)
// Unreliable point-to-point datagrams over UDP, or over a simulated in-memory network

mod memory;
mod traits;
mod udp;

pub use traits::{
    // Core trait
    Transport,
    // Address and payload types
    Datagram, PeerAddress, MAX_DATAGRAM_SIZE,
    // Errors and statistics
    TransportError, TransportStats,
};

pub use memory::{MemoryNetwork, MemoryTransport, WireRecord};
pub use udp::{UdpTransport, UdpTransportConfig};
