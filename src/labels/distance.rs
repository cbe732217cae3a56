//! Tile-wide minimum spacing between repeated placements.

use crate::labels::candidate::PartRef;
use glam::Vec2;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spaced {
    point: Vec2,
    owner: PartRef,
}

/// Accepted placement points per repeat-group id, in tile-local pixels,
/// tagged with the feature part that placed them. Cleared once per tile
/// compile pass.
#[derive(Debug, Default, Clone)]
pub struct DistanceGroups {
    groups: HashMap<String, Vec<Spaced>>,
}

impl DistanceGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `point` is at least `min_distance` away from every point
    /// other parts already placed for `group`. Points of `owner` itself are
    /// skipped: a part re-placing its own line must land on the same spots.
    pub fn is_far_enough(&self, group: &str, point: Vec2, min_distance: f32, owner: PartRef) -> bool {
        let min_sq = min_distance * min_distance;
        self.groups.get(group).map_or(true, |placed| {
            placed
                .iter()
                .filter(|s| s.owner != owner)
                .all(|s| s.point.distance_squared(point) >= min_sq)
        })
    }

    pub fn insert(&mut self, group: &str, point: Vec2, owner: PartRef) {
        let placed = self.groups.entry(group.to_string()).or_default();
        let spaced = Spaced { point, owner };
        if !placed.contains(&spaced) {
            placed.push(spaced);
        }
    }

    pub fn points(&self, group: &str) -> Vec<Vec2> {
        self.groups
            .get(group)
            .map_or_else(Vec::new, |placed| placed.iter().map(|s| s.point).collect())
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROAD: PartRef = PartRef { feature: 0, part: 0 };
    const RIVER: PartRef = PartRef { feature: 1, part: 0 };

    #[test]
    fn test_spacing_is_per_group() {
        let mut groups = DistanceGroups::new();
        groups.insert("shield", Vec2::new(0.0, 0.0), ROAD);
        assert!(!groups.is_far_enough("shield", Vec2::new(100.0, 0.0), 256.0, RIVER));
        assert!(groups.is_far_enough("shield", Vec2::new(256.0, 0.0), 256.0, RIVER));
        assert!(groups.is_far_enough("name", Vec2::new(1.0, 0.0), 256.0, RIVER));
        groups.clear();
        assert!(groups.points("shield").is_empty());
    }

    #[test]
    fn test_own_points_do_not_block() {
        let mut groups = DistanceGroups::new();
        groups.insert("name", Vec2::new(10.0, 10.0), ROAD);
        groups.insert("name", Vec2::new(10.0, 10.0), ROAD);
        assert_eq!(groups.points("name").len(), 1);
        assert!(groups.is_far_enough("name", Vec2::new(10.0, 10.0), 256.0, ROAD));
        assert!(!groups.is_far_enough("name", Vec2::new(10.0, 10.0), 256.0, RIVER));
    }
}
