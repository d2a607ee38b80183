// SeenSet - Ids of rumors already processed
//
// Grow-only: there is no removal, so a node relays any given id at most once.

use crate::store::MessageId;
use std::collections::HashSet;

/// Set of rumor ids this node has observed
#[derive(Clone, Debug, Default)]
pub struct SeenSet {
    ids: HashSet<MessageId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id
    /// Returns true if the id was not seen before
    pub fn insert(&mut self, id: MessageId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageId> {
        self.ids.iter()
    }
}
