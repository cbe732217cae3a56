//! Counters collected during one compile pass.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    pub features_scanned: usize,
    /// Single-geometry parts handed to the factory in the scanning phase.
    pub parts: usize,
    pub declarations_skipped: usize,
    /// Collision candidates deferred to the collision phase.
    pub candidates: usize,
    pub collisions_rejected: usize,
    pub triangulations_computed: usize,
    pub triangulations_reused: usize,
    pub yields: usize,
    /// Passes restarted because pending resources arrived.
    pub restarts: usize,
}

impl CompileStats {
    /// Reset everything a pass accumulates; yields and restarts carry over.
    pub(crate) fn reset_pass(&mut self) {
        *self = Self {
            yields: self.yields,
            restarts: self.restarts,
            ..Self::default()
        };
    }
}
