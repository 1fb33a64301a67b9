//! FIFO of pending light changes.

use std::collections::VecDeque;

use steel_utils::BlockPos;

use super::queue_entry::QueueEntry;

/// Pending `(position, change)` pairs, processed in insertion order.
#[derive(Debug, Default)]
pub struct LightQueue {
    entries: VecDeque<(BlockPos, QueueEntry)>,
}

impl LightQueue {
    /// Creates a queue with room for a typical chunk's worth of changes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Creates a queue with room for `capacity` changes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a change.
    #[inline]
    pub fn enqueue(&mut self, pos: BlockPos, entry: QueueEntry) {
        self.entries.push_back((pos, entry));
    }

    /// Takes the oldest change.
    #[inline]
    pub fn dequeue(&mut self) -> Option<(BlockPos, QueueEntry)> {
        self.entries.pop_front()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of queued changes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every queued change.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
