// Node module - ONE RUNNING PEER
// Configuration, round scheduling, and the event loop that drives an engine

mod config;
mod replica;
mod routes;
mod runtime;
mod scheduler;

pub use config::{ConfigError, NodeConfig, Variant};
pub use replica::Replica;
pub use runtime::{Node, NodeError, NodeHandle};
pub use scheduler::RoundScheduler;
