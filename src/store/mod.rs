// Store module - WHAT A NODE KNOWS
// Replica state for both variants: full messages (anti-entropy) or seen ids (rumor)

mod id;
mod messages;
mod seen;

pub use id::{IdGenerator, MessageId};
pub use messages::{MergeResult, MessageStore};
pub use seen::SeenSet;
