//! Deferred collision candidates.
//!
//! During the scanning phase every declaration that must avoid collisions is
//! folded into one candidate per (feature part, collision group). The
//! candidate keeps the union of the declarations' boxes, the smallest
//! priority and the smallest repeat distance, and enough back-references to
//! re-run the factory for that feature part later.

use crate::style::StyleGroup;
use std::collections::HashMap;
use std::sync::Arc;

/// Position of one single geometry in the tile's feature list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartRef {
    pub feature: usize,
    pub part: usize,
}

/// Aggregated placement request awaiting arbitration.
#[derive(Debug, Clone)]
pub struct CollisionCandidate {
    pub source: PartRef,
    pub style_group: Arc<StyleGroup>,
    pub group_id: String,
    /// Union of the contributing boxes relative to the anchor: `[x0, y0, x1, y1]`.
    pub bounds: [f32; 4],
    pub priority: f32,
    pub repeat_distance: f32,
    /// Encounter order, used to keep priority ties stable.
    pub sequence: usize,
}

impl CollisionCandidate {
    pub fn half_extents(&self) -> (f32, f32) {
        (
            (self.bounds[2] - self.bounds[0]) * 0.5,
            (self.bounds[3] - self.bounds[1]) * 0.5,
        )
    }

    /// Center of the box relative to the anchor.
    pub fn center_offset(&self) -> (f32, f32) {
        (
            (self.bounds[0] + self.bounds[2]) * 0.5,
            (self.bounds[1] + self.bounds[3]) * 0.5,
        )
    }

    /// Footprint along a line: the box width.
    pub fn footprint(&self) -> f32 {
        self.bounds[2] - self.bounds[0]
    }

    fn absorb(&mut self, bounds: [f32; 4], priority: f32, repeat_distance: f32) {
        self.bounds = [
            self.bounds[0].min(bounds[0]),
            self.bounds[1].min(bounds[1]),
            self.bounds[2].max(bounds[2]),
            self.bounds[3].max(bounds[3]),
        ];
        self.priority = self.priority.min(priority);
        self.repeat_distance = self.repeat_distance.min(repeat_distance);
    }
}

/// Candidates of one compile pass, in encounter order.
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<CollisionCandidate>,
    index: HashMap<(PartRef, String), usize>,
}

/// One declaration's contribution to a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution<'a> {
    pub group_id: &'a str,
    pub bounds: [f32; 4],
    pub priority: f32,
    pub repeat_distance: f32,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, source: PartRef, style_group: &Arc<StyleGroup>, c: Contribution<'_>) {
        let key = (source, c.group_id.to_string());
        if let Some(&idx) = self.index.get(&key) {
            self.candidates[idx].absorb(c.bounds, c.priority, c.repeat_distance);
            return;
        }
        let sequence = self.candidates.len();
        self.candidates.push(CollisionCandidate {
            source,
            style_group: Arc::clone(style_group),
            group_id: c.group_id.to_string(),
            bounds: c.bounds,
            priority: c.priority,
            repeat_distance: c.repeat_distance,
            sequence,
        });
        self.index.insert(key, sequence);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates sorted by ascending priority. Ties keep encounter order.
    pub fn into_sorted(self) -> Vec<CollisionCandidate> {
        let mut sorted = self.candidates;
        sorted.sort_by(|a, b| a.priority.total_cmp(&b.priority));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(feature: usize) -> PartRef {
        PartRef { feature, part: 0 }
    }

    fn contribution(group_id: &str, bounds: [f32; 4], priority: f32) -> Contribution<'_> {
        Contribution {
            group_id,
            bounds,
            priority,
            repeat_distance: 256.0,
        }
    }

    #[test]
    fn test_merge_takes_union_and_minimum() {
        let style = Arc::new(StyleGroup::default());
        let mut set = CandidateSet::new();
        set.merge(part(0), &style, contribution("default", [-5.0, -5.0, 5.0, 5.0], 3.0));
        set.merge(
            part(0),
            &style,
            Contribution {
                repeat_distance: 100.0,
                ..contribution("default", [0.0, -2.0, 20.0, 2.0], 1.0)
            },
        );
        set.merge(part(0), &style, contribution("shields", [-1.0, -1.0, 1.0, 1.0], 0.0));
        assert_eq!(set.len(), 2);

        let sorted = set.into_sorted();
        let merged = sorted.iter().find(|c| c.group_id == "default").unwrap();
        assert_eq!(merged.bounds, [-5.0, -5.0, 20.0, 5.0]);
        assert_eq!(merged.priority, 1.0);
        assert_eq!(merged.repeat_distance, 100.0);
        assert_eq!(merged.center_offset(), (7.5, 0.0));
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let style = Arc::new(StyleGroup::default());
        let mut set = CandidateSet::new();
        for (feature, priority) in [(0, 2.0), (1, 1.0), (2, 2.0), (3, 1.0)] {
            set.merge(part(feature), &style, contribution("default", [0.0; 4], priority));
        }
        let order: Vec<usize> = set.into_sorted().iter().map(|c| c.source.feature).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
