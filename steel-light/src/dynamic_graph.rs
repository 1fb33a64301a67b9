//! Online min fixed point over a graph with a small number of levels.
//!
//! Every node stores a level in `0..level_count`, where 0 is the strongest
//! value and `level_count - 1` means "unreached". A node's level is the minimum
//! over what its neighbors (and the implicit source node) offer it. When the
//! inputs change the engine schedules only the affected nodes and relaxes them
//! in level order until the fixed point is restored.
//!
//! The level functions supplied through [`GraphRules`] must be monotone: a
//! stronger neighbor may never make a node weaker. The engine does not check
//! this, it just stops converging to the right answer.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{LightError, leveled_queue::LeveledPriorityQueue};

/// Largest number of levels the engine supports.
pub const MAX_LEVEL_COUNT: usize = 253;

/// Node key as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// The implicit anchor all external inputs come from. It has no level of
    /// its own and is never relaxed.
    Source,
    /// A regular node.
    Node(u64),
}

impl NodeId {
    /// Returns true for [`NodeId::Source`].
    #[must_use]
    #[inline]
    pub const fn is_source(self) -> bool {
        matches!(self, Self::Source)
    }
}

/// Neighbor list filled in by [`GraphRules::neighbors_after_update`].
pub type Neighbors = SmallVec<[u64; 26]>;

/// Graph specific behavior plugged into [`DynamicGraphMinFixedPoint`].
pub trait GraphRules {
    /// Stored level of `id`.
    fn level(&self, id: u64) -> u8;

    /// Stores a new level for `id`.
    fn set_level(&mut self, id: u64, level: u8);

    /// Level `to` would get through the edge from `from`, given that `from` is
    /// at `level`.
    fn level_from_neighbor(&self, from: NodeId, to: u64, level: u8) -> u8;

    /// Best level `id` can get from all of its inputs except `excluded`,
    /// starting from `level`.
    fn computed_level(&self, id: u64, excluded: NodeId, level: u8) -> u8;

    /// Pushes the neighbors that have to be rechecked after `id` changed to
    /// `level`.
    fn neighbors_after_update(&self, id: u64, level: u8, decrease: bool, out: &mut Neighbors);
}

/// Incremental min fixed point solver.
///
/// Nodes without a pending entry are at their stored level. Pending nodes sit
/// in a [`LeveledPriorityQueue`] under `min(stored, pending)`, so stronger
/// changes always resolve before the weaker ones that depend on them.
#[derive(Debug)]
pub struct DynamicGraphMinFixedPoint {
    level_count: u8,
    queue: LeveledPriorityQueue,
    pending: FxHashMap<u64, u8>,
}

impl DynamicGraphMinFixedPoint {
    /// Creates an engine with levels `0..level_count`.
    pub fn new(level_count: usize) -> Result<Self, LightError> {
        if level_count == 0 || level_count > MAX_LEVEL_COUNT {
            return Err(LightError::LevelCount { level_count });
        }
        Ok(Self {
            level_count: level_count as u8,
            queue: LeveledPriorityQueue::new(level_count),
            pending: FxHashMap::default(),
        })
    }

    /// Number of levels.
    #[must_use]
    pub fn level_count(&self) -> u8 {
        self.level_count
    }

    /// The "unreached" level.
    #[must_use]
    #[inline]
    pub fn max_level(&self) -> u8 {
        self.level_count - 1
    }

    /// Returns true while nodes are scheduled.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of scheduled nodes.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.pending.len()
    }

    /// Level `id` is scheduled to resolve to, if any.
    #[must_use]
    pub fn pending_level(&self, id: u64) -> Option<u8> {
        self.pending.get(&id).copied()
    }

    #[inline]
    fn priority(&self, a: u8, b: u8) -> usize {
        usize::from(a.min(b).min(self.max_level()))
    }

    /// Unschedules `id`.
    pub fn remove_from_queue<R: GraphRules>(&mut self, rules: &R, id: u64) {
        if let Some(pending) = self.pending.remove(&id) {
            let stored = rules.level(id);
            let priority = self.priority(stored, pending);
            self.queue
                .dequeue(id, priority, usize::from(self.level_count));
        }
    }

    /// Unschedules every node matching `predicate`.
    pub fn remove_if<R: GraphRules>(&mut self, rules: &R, mut predicate: impl FnMut(u64) -> bool) {
        let ids: Vec<u64> = self
            .pending
            .keys()
            .copied()
            .filter(|&id| predicate(id))
            .collect();
        for id in ids {
            self.remove_from_queue(rules, id);
        }
    }

    /// Recomputes `id` from all of its inputs.
    pub fn check_node<R: GraphRules>(&mut self, rules: &mut R, id: u64) {
        let max = self.max_level();
        self.check_edge(rules, NodeId::Node(id), NodeId::Node(id), max, false);
    }

    /// Reports a changed input of `id` coming from the source node.
    pub fn update<R: GraphRules>(&mut self, rules: &mut R, id: u64, level: u8, decrease: bool) {
        self.check_edge(rules, NodeId::Source, NodeId::Node(id), level, decrease);
    }

    /// Reports that the edge `from -> to` now offers `level`.
    ///
    /// With `decrease` the offered level can only lower `to`'s level, otherwise
    /// `to` is recomputed from its remaining inputs.
    pub fn check_edge<R: GraphRules>(
        &mut self,
        rules: &mut R,
        from: NodeId,
        to: NodeId,
        level: u8,
        decrease: bool,
    ) {
        let NodeId::Node(to) = to else {
            return;
        };
        let stored = rules.level(to);
        let pending = self.pending_level(to);
        self.schedule(rules, from, to, level, stored, pending, decrease);
    }

    /// Propagates a change of `from` (now at `level`) to its neighbor `to`.
    pub fn check_neighbor<R: GraphRules>(
        &mut self,
        rules: &mut R,
        from: u64,
        to: u64,
        level: u8,
        decrease: bool,
    ) {
        let max = self.max_level();
        let pending = self.pending_level(to);
        let offered = rules
            .level_from_neighbor(NodeId::Node(from), to, level)
            .min(max);
        let stored = rules.level(to);
        if decrease {
            self.schedule(rules, NodeId::Node(from), to, offered, stored, pending, true);
        } else {
            // Only a neighbor that got its current level through this edge
            // has to be recomputed.
            let current = pending.unwrap_or(stored.min(max));
            if offered == current {
                self.schedule(rules, NodeId::Node(from), to, max, stored, pending, false);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule<R: GraphRules>(
        &mut self,
        rules: &R,
        from: NodeId,
        to: u64,
        level: u8,
        stored: u8,
        pending: Option<u8>,
        decrease: bool,
    ) {
        let max = self.max_level();
        let level = level.min(max);
        let stored = stored.min(max);
        let current = pending.unwrap_or(stored);
        let resolved = if decrease {
            current.min(level)
        } else {
            rules.computed_level(to, from, level).min(max)
        };

        let old_priority = self.priority(stored, current);
        if stored == resolved {
            if pending.is_some() {
                self.queue
                    .dequeue(to, old_priority, usize::from(self.level_count));
                self.pending.remove(&to);
            }
            return;
        }

        let new_priority = self.priority(stored, resolved);
        if pending.is_some() && old_priority != new_priority {
            self.queue.dequeue(to, old_priority, new_priority);
        }
        self.pending.insert(to, resolved);
        self.queue.enqueue(to, new_priority);
    }

    /// Resolves up to `max_steps` scheduled nodes and returns the unused steps.
    pub fn run_updates<R: GraphRules>(&mut self, rules: &mut R, max_steps: usize) -> usize {
        let max = self.max_level();
        let mut steps = max_steps;
        while steps > 0 {
            let Some(id) = self.queue.remove_first() else {
                break;
            };
            steps -= 1;
            let Some(resolved) = self.pending.remove(&id) else {
                continue;
            };
            let stored = rules.level(id).min(max);

            if resolved < stored {
                rules.set_level(id, resolved);
                self.check_neighbors_after_update(rules, id, resolved, true);
            } else if resolved > stored {
                // Drop to unreached first. The node comes back at its resolved
                // level once everything stronger has been settled.
                rules.set_level(id, max);
                if resolved != max {
                    self.queue.enqueue(id, self.priority(max, resolved));
                    self.pending.insert(id, resolved);
                }
                self.check_neighbors_after_update(rules, id, stored, false);
            }
        }
        steps
    }

    fn check_neighbors_after_update<R: GraphRules>(
        &mut self,
        rules: &mut R,
        id: u64,
        level: u8,
        decrease: bool,
    ) {
        let mut neighbors = Neighbors::new();
        rules.neighbors_after_update(id, level, decrease, &mut neighbors);
        for neighbor in neighbors {
            self.check_neighbor(rules, id, neighbor, level, decrease);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LEVELS: u8 = 16;
    const MAX: u8 = LEVELS - 1;

    /// Undirected weighted graph with per-node source levels.
    #[derive(Default)]
    struct WeightedGraph {
        levels: FxHashMap<u64, u8>,
        sources: FxHashMap<u64, u8>,
        edges: FxHashMap<u64, Vec<(u64, u8)>>,
    }

    impl WeightedGraph {
        fn grid(width: u64, weights: &[u8]) -> Self {
            let mut graph = Self::default();
            let mut next_weight = weights.iter().copied().cycle();
            for y in 0..width {
                for x in 0..width {
                    let id = y * width + x;
                    if x + 1 < width {
                        graph.connect(id, id + 1, next_weight.next().unwrap_or(1));
                    }
                    if y + 1 < width {
                        graph.connect(id, id + width, next_weight.next().unwrap_or(1));
                    }
                }
            }
            graph
        }

        fn connect(&mut self, a: u64, b: u64, weight: u8) {
            let weight = weight.max(1);
            self.edges.entry(a).or_default().push((b, weight));
            self.edges.entry(b).or_default().push((a, weight));
        }

        fn source_level(&self, id: u64) -> u8 {
            self.sources.get(&id).copied().unwrap_or(MAX)
        }

        /// Bellman-Ford recomputation from scratch.
        fn brute_force(&self) -> FxHashMap<u64, u8> {
            let mut levels: FxHashMap<u64, u8> =
                self.edges.keys().map(|&id| (id, self.source_level(id))).collect();
            loop {
                let mut changed = false;
                for (&id, edges) in &self.edges {
                    for &(neighbor, weight) in edges {
                        let offered = levels[&neighbor].saturating_add(weight).min(MAX);
                        if offered < levels[&id] {
                            levels.insert(id, offered);
                            changed = true;
                        }
                    }
                }
                if !changed {
                    return levels;
                }
            }
        }

        fn assert_matches_brute_force(&self) {
            for (id, expected) in self.brute_force() {
                assert_eq!(self.level(id), expected, "node {id}");
            }
        }
    }

    impl GraphRules for WeightedGraph {
        fn level(&self, id: u64) -> u8 {
            self.levels.get(&id).copied().unwrap_or(MAX)
        }

        fn set_level(&mut self, id: u64, level: u8) {
            self.levels.insert(id, level);
        }

        fn level_from_neighbor(&self, from: NodeId, to: u64, level: u8) -> u8 {
            match from {
                NodeId::Source => self.source_level(to),
                NodeId::Node(from) => self.edges[&to]
                    .iter()
                    .find(|(id, _)| *id == from)
                    .map_or(MAX, |(_, weight)| level.saturating_add(*weight)),
            }
        }

        fn computed_level(&self, id: u64, excluded: NodeId, level: u8) -> u8 {
            let mut best = level;
            if !excluded.is_source() {
                best = best.min(self.source_level(id));
            }
            for &(neighbor, weight) in &self.edges[&id] {
                if NodeId::Node(neighbor) != excluded {
                    best = best.min(self.level(neighbor).saturating_add(weight));
                }
            }
            best
        }

        fn neighbors_after_update(&self, id: u64, _: u8, _: bool, out: &mut Neighbors) {
            out.extend(self.edges[&id].iter().map(|(neighbor, _)| *neighbor));
        }
    }

    fn set_source(engine: &mut DynamicGraphMinFixedPoint, graph: &mut WeightedGraph, id: u64, level: u8) {
        let old = graph.source_level(id);
        graph.sources.insert(id, level);
        engine.update(graph, id, level, level < old);
    }

    fn drain(engine: &mut DynamicGraphMinFixedPoint, graph: &mut WeightedGraph, step: usize) {
        while engine.has_work() {
            engine.run_updates(graph, step);
        }
    }

    #[test]
    fn test_level_count_limit() {
        assert!(DynamicGraphMinFixedPoint::new(253).is_ok());
        assert!(matches!(
            DynamicGraphMinFixedPoint::new(254),
            Err(LightError::LevelCount { level_count: 254 })
        ));
        assert!(DynamicGraphMinFixedPoint::new(0).is_err());
    }

    #[test]
    fn test_source_is_never_relaxed() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(2, &[1]);
        engine.check_edge(&mut graph, NodeId::Node(0), NodeId::Source, 0, true);
        assert!(!engine.has_work());
        assert!(NodeId::Source.is_source());
        assert!(!NodeId::Node(0).is_source());
    }

    #[test]
    fn test_single_source_spreads() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(5, &[1]);
        set_source(&mut engine, &mut graph, 12, 0);
        drain(&mut engine, &mut graph, usize::MAX);

        assert_eq!(graph.level(12), 0);
        assert_eq!(graph.level(0), 4);
        assert_eq!(graph.level(24), 4);
        graph.assert_matches_brute_force();
    }

    #[test]
    fn test_removing_source_retracts() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(6, &[1, 2, 3]);
        set_source(&mut engine, &mut graph, 0, 0);
        set_source(&mut engine, &mut graph, 35, 2);
        drain(&mut engine, &mut graph, usize::MAX);
        graph.assert_matches_brute_force();

        set_source(&mut engine, &mut graph, 0, MAX);
        drain(&mut engine, &mut graph, usize::MAX);
        graph.assert_matches_brute_force();
        assert_eq!(graph.level(35), 2);

        set_source(&mut engine, &mut graph, 35, MAX);
        drain(&mut engine, &mut graph, usize::MAX);
        assert!(graph.levels.values().all(|&level| level == MAX));
    }

    #[test]
    fn test_bounded_steps_reach_same_fixed_point() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(7, &[2, 1, 1, 3]);
        set_source(&mut engine, &mut graph, 3, 1);
        set_source(&mut engine, &mut graph, 40, 0);
        assert_eq!(engine.run_updates(&mut graph, 0), 0);
        assert!(engine.has_work());
        drain(&mut engine, &mut graph, 3);
        graph.assert_matches_brute_force();

        set_source(&mut engine, &mut graph, 40, 6);
        set_source(&mut engine, &mut graph, 20, 3);
        drain(&mut engine, &mut graph, 1);
        graph.assert_matches_brute_force();
    }

    #[test]
    fn test_run_updates_returns_unused_steps() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(2, &[1]);
        assert_eq!(engine.run_updates(&mut graph, 10), 10);
        set_source(&mut engine, &mut graph, 0, 0);
        let left = engine.run_updates(&mut graph, 100);
        assert!(left < 100);
        assert!(!engine.has_work());
    }

    #[test]
    fn test_remove_if_unschedules() {
        let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
        let mut graph = WeightedGraph::grid(3, &[1]);
        set_source(&mut engine, &mut graph, 0, 0);
        set_source(&mut engine, &mut graph, 8, 0);
        assert_eq!(engine.queue_size(), 2);
        assert_eq!(engine.pending_level(8), Some(0));

        engine.remove_if(&graph, |id| id == 8);
        assert_eq!(engine.queue_size(), 1);
        assert_eq!(engine.pending_level(8), None);

        engine.remove_from_queue(&graph, 0);
        assert!(!engine.has_work());
    }

    proptest! {
        #[test]
        fn prop_matches_brute_force(
            weights in proptest::collection::vec(1u8..4, 1..12),
            changes in proptest::collection::vec((0u64..25, 0u8..16), 1..20),
            step in 1usize..8,
        ) {
            let mut engine = DynamicGraphMinFixedPoint::new(usize::from(LEVELS)).unwrap();
            let mut graph = WeightedGraph::grid(5, &weights);
            for (id, level) in changes {
                set_source(&mut engine, &mut graph, id, level);
                drain(&mut engine, &mut graph, step);
                for (id, expected) in graph.brute_force() {
                    prop_assert_eq!(graph.level(id), expected);
                }
            }
        }
    }
}
