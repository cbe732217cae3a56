//! Deterministic draw ordering of draw groups.
//!
//! Groups are ordered by the `zLayer`/`zIndex` captured when the group was
//! created. Creation order breaks ties, so the result does not depend on
//! hash map iteration or on which feature happened to touch a group last.

use std::cmp::Ordering;

/// Sort key of a draw group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawOrder {
    pub z_layer: i32,
    pub z_index: i32,
    /// Creation order within the compile pass.
    pub order: usize,
}

impl PartialOrd for DrawOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DrawOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        // Primary: layer, then index within the layer
        self.z_layer
            .cmp(&other.z_layer)
            .then(self.z_index.cmp(&other.z_index))
            // Secondary: creation order for deterministic ties
            .then(self.order.cmp(&other.order))
    }
}

/// Stable sort by draw order.
pub fn sort_by_draw_order<T>(items: &mut [T], key: impl Fn(&T) -> DrawOrder) {
    items.sort_by_key(|item| key(item));
}
