// epimesh - Epidemic message replication between peer processes
//
// Replicates short text messages over unreliable datagrams using one of two
// dissemination strategies:
// - Rumor mongering: push forwarding to a bounded number of random peers
// - Anti-entropy: periodic pairwise reconciliation of the full message set

pub mod console;
pub mod node;
pub mod store;
pub mod sync;
pub mod transport;
