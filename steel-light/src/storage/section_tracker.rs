//! Decides which sections keep a light array.
//!
//! A section needs light storage when it contains blocks or touches a section
//! that does, since light entering or leaving a non-empty section has to be
//! recorded on both sides of its faces. The tracker runs the leveled fixed
//! point engine over section ids: level 0 for a section with blocks, 1 for a
//! section next to one (all 26 neighbors count), 2 for everything else.

use rustc_hash::{FxHashMap, FxHashSet};
use steel_utils::SectionPos;

use crate::{
    LightError,
    dynamic_graph::{DynamicGraphMinFixedPoint, GraphRules, Neighbors, NodeId},
};

const HAS_DATA: u8 = 0;
const NEAR_DATA: u8 = 1;
const NO_DATA: u8 = 2;

#[inline]
fn id(section: SectionPos) -> u64 {
    section.as_long() as u64
}

#[inline]
fn section(id: u64) -> SectionPos {
    SectionPos::from_long(id as i64)
}

#[derive(Debug, Default)]
struct SectionLevels {
    levels: FxHashMap<u64, u8>,
    has_data: FxHashSet<u64>,
    touched: Vec<u64>,
}

impl SectionLevels {
    fn for_each_around(id: u64, mut f: impl FnMut(Option<u64>)) {
        let center = section(id);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        f(None);
                    } else {
                        f(Some(self::id(center.offset(dx, dy, dz))));
                    }
                }
            }
        }
    }
}

impl GraphRules for SectionLevels {
    fn level(&self, id: u64) -> u8 {
        self.levels.get(&id).copied().unwrap_or(NO_DATA)
    }

    fn set_level(&mut self, id: u64, level: u8) {
        let previous = if level >= NO_DATA {
            self.levels.remove(&id)
        } else {
            self.levels.insert(id, level)
        };
        let old = previous.unwrap_or(NO_DATA);
        if (old >= NO_DATA) != (level >= NO_DATA) {
            self.touched.push(id);
        }
    }

    fn level_from_neighbor(&self, from: NodeId, to: u64, level: u8) -> u8 {
        match from {
            NodeId::Source if self.has_data.contains(&to) => HAS_DATA,
            NodeId::Source => NO_DATA,
            NodeId::Node(_) => level.saturating_add(1),
        }
    }

    fn computed_level(&self, id: u64, excluded: NodeId, level: u8) -> u8 {
        let mut best = level;
        Self::for_each_around(id, |neighbor| {
            let from = neighbor.map_or(NodeId::Source, NodeId::Node);
            if from != excluded && best > HAS_DATA {
                let level = neighbor.map_or(HAS_DATA, |n| self.level(n));
                best = best.min(self.level_from_neighbor(from, id, level));
            }
        });
        best
    }

    fn neighbors_after_update(&self, id: u64, _: u8, _: bool, out: &mut Neighbors) {
        Self::for_each_around(id, |neighbor| out.extend(neighbor));
    }
}

/// Tracks non-empty sections and the sections that store light around them.
#[derive(Debug)]
pub struct SectionTracker {
    graph: DynamicGraphMinFixedPoint,
    state: SectionLevels,
}

impl SectionTracker {
    /// Creates a tracker with no sections.
    pub fn new() -> Result<Self, LightError> {
        Ok(Self {
            graph: DynamicGraphMinFixedPoint::new(usize::from(NO_DATA) + 1)?,
            state: SectionLevels::default(),
        })
    }

    /// Records whether `section` contains blocks and settles the levels.
    ///
    /// Returns every section whose "stores light" state flipped. A section can
    /// flip more than once while settling, so callers should look at
    /// [`SectionTracker::stores_light`] for the final answer.
    pub fn set_has_data(&mut self, section: SectionPos, has_data: bool) -> Vec<SectionPos> {
        let id = id(section);
        let changed = if has_data {
            self.state.has_data.insert(id)
        } else {
            self.state.has_data.remove(&id)
        };
        if !changed {
            return Vec::new();
        }

        let level = if has_data { HAS_DATA } else { NO_DATA };
        self.graph.update(&mut self.state, id, level, has_data);
        self.graph.run_updates(&mut self.state, usize::MAX);

        let mut seen = FxHashSet::default();
        self.state
            .touched
            .drain(..)
            .filter(|id| seen.insert(*id))
            .map(self::section)
            .collect()
    }

    /// Returns true if `section` contains blocks.
    #[must_use]
    pub fn has_data(&self, section: SectionPos) -> bool {
        self.state.has_data.contains(&id(section))
    }

    /// Returns true if `section` or one of its neighbors contains blocks.
    #[must_use]
    pub fn stores_light(&self, section: SectionPos) -> bool {
        self.level(section) <= NEAR_DATA
    }

    /// Tracker level of `section`: 0 with blocks, 1 next to blocks, 2 otherwise.
    #[must_use]
    pub fn level(&self, section: SectionPos) -> u8 {
        self.state.level(id(section))
    }
}
