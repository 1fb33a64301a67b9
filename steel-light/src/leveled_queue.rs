//! Level-bucketed FIFO sets of node ids.
//!
//! Every bucket keeps its ids in insertion order and supports removing an
//! arbitrary id in constant time, so a node that gets rescheduled can be moved
//! between buckets cheaply.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Option<u64>,
    next: Option<u64>,
}

/// An insertion-ordered set of ids backed by a hash map of links.
#[derive(Debug, Default)]
struct LinkedIdSet {
    links: FxHashMap<u64, Link>,
    head: Option<u64>,
    tail: Option<u64>,
}

impl LinkedIdSet {
    fn insert(&mut self, id: u64) -> bool {
        if self.links.contains_key(&id) {
            return false;
        }
        self.links.insert(
            id,
            Link {
                prev: self.tail,
                next: None,
            },
        );
        match self.tail {
            Some(tail) => {
                if let Some(link) = self.links.get_mut(&tail) {
                    link.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        true
    }

    fn remove(&mut self, id: u64) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        match link.prev {
            Some(prev) => {
                if let Some(prev_link) = self.links.get_mut(&prev) {
                    prev_link.next = link.next;
                }
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => {
                if let Some(next_link) = self.links.get_mut(&next) {
                    next_link.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }
        true
    }

    fn pop_front(&mut self) -> Option<u64> {
        let head = self.head?;
        self.remove(head);
        Some(head)
    }

    fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn len(&self) -> usize {
        self.links.len()
    }
}

/// A priority queue of node ids with a small, fixed number of levels.
///
/// Lower levels are served first; ids on the same level come out in the order
/// they were queued. An id is expected to sit in at most one bucket, which the
/// caller guarantees by dequeuing it from its old level before re-queuing it.
#[derive(Debug)]
pub struct LeveledPriorityQueue {
    buckets: Box<[LinkedIdSet]>,
    first_queued_level: usize,
}

impl LeveledPriorityQueue {
    /// Creates an empty queue with levels `0..level_count`.
    #[must_use]
    pub fn new(level_count: usize) -> Self {
        Self {
            buckets: (0..level_count).map(|_| LinkedIdSet::default()).collect(),
            first_queued_level: level_count,
        }
    }

    /// Number of levels of this queue.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.buckets.len()
    }

    /// Lowest non-empty level, or [`Self::level_count`] when empty.
    #[must_use]
    #[inline]
    pub fn first_queued_level(&self) -> usize {
        self.first_queued_level
    }

    /// Queues `id` at `level`. Queuing an id twice on the same level is a no-op.
    pub fn enqueue(&mut self, id: u64, level: usize) {
        debug_assert!(level < self.buckets.len(), "level {level} out of range");
        self.buckets[level].insert(id);
        if level < self.first_queued_level {
            self.first_queued_level = level;
        }
    }

    /// Removes `id` from `level`.
    ///
    /// When this empties the lowest bucket the cached minimum is rescanned, but
    /// not past `ceiling`: callers about to queue at `ceiling` pass it to skip
    /// scanning buckets that cannot become the minimum.
    pub fn dequeue(&mut self, id: u64, level: usize, ceiling: usize) {
        let bucket = &mut self.buckets[level];
        bucket.remove(id);
        if bucket.is_empty() && self.first_queued_level == level {
            self.rescan_first_queued_level(ceiling);
        }
    }

    /// Removes and returns the oldest id of the lowest level together with
    /// that level.
    pub fn pop_first(&mut self) -> Option<(u64, usize)> {
        let level = self.first_queued_level;
        let bucket = self.buckets.get_mut(level)?;
        let id = bucket.pop_front()?;
        if bucket.is_empty() {
            self.rescan_first_queued_level(self.buckets.len());
        }
        Some((id, level))
    }

    /// Removes and returns the oldest id of the lowest level.
    pub fn remove_first(&mut self) -> Option<u64> {
        self.pop_first().map(|(id, _)| id)
    }

    /// Returns true when no id is queued.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first_queued_level >= self.buckets.len()
    }

    /// Total number of queued ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(LinkedIdSet::len).sum()
    }

    fn rescan_first_queued_level(&mut self, ceiling: usize) {
        let start = self.first_queued_level;
        let ceiling = ceiling.min(self.buckets.len());
        self.first_queued_level = ceiling;
        for level in start + 1..ceiling {
            if !self.buckets[level].is_empty() {
                self.first_queued_level = level;
                break;
            }
        }
    }
}
