// MessageStore - Replicated message map for anti-entropy
//
// Union-merge semantics: an id is inserted at most once and its text never
// changes afterwards. Deletes are local only and leave no tombstone, so a
// peer that still holds a deleted id will bring it back on the next sync.

use crate::store::MessageId;
use std::collections::{BTreeMap, BTreeSet};

/// Result of a merge operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Number of new entries added during merge
    pub new_entries: usize,
    /// Total entries after merge
    pub total_after_merge: usize,
}

/// Map from message id to message text
///
/// Properties of `merge`:
/// - Commutative: the order in which payloads arrive does not matter
/// - Idempotent: applying the same payload twice equals applying it once
/// - Monotone: the key set only shrinks through an explicit `delete`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: BTreeMap<MessageId, String>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if an id is present
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.contains_key(id)
    }

    /// Get the text of a message
    pub fn get(&self, id: &MessageId) -> Option<&str> {
        self.messages.get(id).map(String::as_str)
    }

    /// Insert a message if its id is absent
    /// Returns true if the message was new; an existing text is never replaced
    pub fn put(&mut self, id: MessageId, text: impl Into<String>) -> bool {
        if self.messages.contains_key(&id) {
            return false;
        }
        self.messages.insert(id, text.into());
        true
    }

    /// Remove a message locally
    /// Returns false if the id was not present
    pub fn delete(&mut self, id: &MessageId) -> bool {
        self.messages.remove(id).is_some()
    }

    /// All known ids
    pub fn known_ids(&self) -> BTreeSet<MessageId> {
        self.messages.keys().cloned().collect()
    }

    /// Full copy of the `id -> text` mapping
    pub fn snapshot(&self) -> BTreeMap<MessageId, String> {
        self.messages.clone()
    }

    /// Entries whose id is not in `known`
    pub fn missing_from(&self, known: &BTreeSet<MessageId>) -> BTreeMap<MessageId, String> {
        self.messages
            .iter()
            .filter(|(id, _)| !known.contains(*id))
            .map(|(id, text)| (id.clone(), text.clone()))
            .collect()
    }

    /// Merge entries into the store, keeping existing texts
    pub fn merge<I>(&mut self, entries: I) -> MergeResult
    where
        I: IntoIterator<Item = (MessageId, String)>,
    {
        let before = self.messages.len();
        for (id, text) in entries {
            self.put(id, text);
        }
        let after = self.messages.len();

        MergeResult {
            new_entries: after - before,
            total_after_merge: after,
        }
    }

    /// Iterate over messages in id order
    pub fn iter(&self) -> impl Iterator<Item = (&MessageId, &str)> {
        self.messages.iter().map(|(id, text)| (id, text.as_str()))
    }
}
