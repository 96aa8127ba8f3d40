use std::collections::VecDeque;

use chime_types::DeliveryId;
use hashbrown::HashSet;

use crate::amount::Amount;

/// Amounts awaiting playback, strictly in arrival order.
///
/// Never reordered and never deduplicated; duplicates are filtered before
/// they reach the queue.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<Amount>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, amount: Amount) {
        self.items.push_back(amount);
    }

    /// Oldest queued amount
    pub fn pop(&mut self) -> Option<Amount> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.items.iter().map(|a| a.value()).collect()
    }
}

/// Remembers the most recent delivery ids so an amount that arrives over both
/// the push and the poll path is announced once.
#[derive(Debug)]
pub struct DedupeWindow {
    capacity: usize,
    order: VecDeque<DeliveryId>,
    seen: HashSet<DeliveryId>,
}

impl DedupeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record an id. Returns false if it was already in the window.
    pub fn insert(&mut self, id: DeliveryId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(evicted) = self.order.pop_front()
        {
            self.seen.remove(&evicted);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
