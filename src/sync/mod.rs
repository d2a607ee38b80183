// Sync module - HOW NODES TALK
// Peer registry, wire protocol, dispatch, and the two dissemination engines

mod anti_entropy;
mod dispatch;
mod peer;
mod protocol;
mod rumor;

pub use anti_entropy::{AntiEntropyConfig, AntiEntropyEngine, AntiEntropyStats};
pub use dispatch::{DispatchError, Dispatcher};
pub use peer::PeerRegistry;
pub use protocol::{
    Message, MessageKind, NewMessage, Outbound, ProtocolError, Rumor, SyncRequest, SyncResponse,
};
pub use rumor::{RumorConfig, RumorEngine, RumorOutcome, RumorStats};
