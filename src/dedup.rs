// Bounded dedup window for post ids.
//
// The same post shows up on the public stream of every server that federates
// it, so we remember the most recent ids and drop repeats. Eviction is FIFO
// by first sighting: seeing a cached id again does not extend its life.

use std::collections::{HashSet, VecDeque};

/// Default number of post ids remembered.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Insertion-ordered set of post ids with a fixed capacity.
#[derive(Debug)]
pub struct DedupCache {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Record `id`. Returns true if it was not already in the window.
    pub fn insert_if_new(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }

        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids currently in the window, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
