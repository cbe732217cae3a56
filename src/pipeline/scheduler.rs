//! Incremental, cooperatively yielding tile compilation.
//!
//! A [`CompileTask`] walks `Init -> Phase1Scanning -> Phase2Collisions ->
//! Finalizing -> Done`. Every [`CompileTask::step`] does at most one bundle
//! of work and returns, so the host can interleave compilation with its
//! frame loop. `Aborted` is reachable from every state but `Done`.
//!
//! Scanning compiles every feature part once and collects collision
//! candidates. The collision phase replays the candidates in ascending
//! priority order. Resources that were missing during the pass are waited
//! for in `Finalizing`; once all of them are settled the pass starts over.

use crate::config::CompileConfig;
use crate::core::resource::ResourceHandle;
use crate::core::session::RenderSession;
use crate::error::{CompileError, CompileResult};
use crate::geo::{Feature, Tile};
use crate::labels::candidate::{CandidateSet, CollisionCandidate, PartRef};
use crate::labels::collision::CollisionArbiter;
use crate::labels::distance::DistanceGroups;
use crate::pipeline::factory::{CompileContext, PrimitiveGroupFactory};
use crate::pipeline::finalize::{finalize, CompiledTile};
use crate::pipeline::stats::CompileStats;
use crate::style::StyleGroup;
use crate::vector::group::DrawGroupTable;
use log::{debug, info, trace};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Style lookup for the features of a tile.
pub trait StyleSource {
    /// Style group of `feature` at grid zoom `zoom`; `None` draws nothing.
    fn style_for(&self, feature: &Feature, zoom: u8) -> Option<Arc<StyleGroup>>;
}

impl<F> StyleSource for F
where
    F: Fn(&Feature, u8) -> Option<Arc<StyleGroup>>,
{
    fn style_for(&self, feature: &Feature, zoom: u8) -> Option<Arc<StyleGroup>> {
        self(feature, zoom)
    }
}

/// Lifecycle of a compile task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileState {
    Init,
    Phase1Scanning,
    Phase2Collisions,
    Finalizing,
    Done,
    Aborted,
}

impl fmt::Display for CompileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileState::Init => "init",
            CompileState::Phase1Scanning => "scanning",
            CompileState::Phase2Collisions => "collisions",
            CompileState::Finalizing => "finalizing",
            CompileState::Done => "done",
            CompileState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of one [`CompileTask::step`].
#[derive(Debug)]
pub enum StepOutcome {
    /// A bundle was processed; call `step` again on a later tick.
    Yielded,
    /// The pass is complete but waits for these resources. Step again once
    /// the host delivered or failed them.
    Pending(Vec<ResourceHandle>),
    Done(CompiledTile),
    Aborted,
}

/// Compilation of one tile.
pub struct CompileTask {
    tile: Tile,
    config: CompileConfig,
    features: Arc<[Feature]>,
    styles: Box<dyn StyleSource + Send>,
    display_zoom: f32,
    state: CompileState,
    factory: PrimitiveGroupFactory,
    groups: DrawGroupTable,
    candidates: CandidateSet,
    sorted: Vec<CollisionCandidate>,
    distances: DistanceGroups,
    pending: Vec<ResourceHandle>,
    cursor: usize,
    stats: CompileStats,
}

impl fmt::Debug for CompileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileTask")
            .field("tile", &self.tile.key)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("features", &self.features.len())
            .finish()
    }
}

impl CompileTask {
    pub fn new(
        tile: Tile,
        features: impl Into<Arc<[Feature]>>,
        styles: impl StyleSource + Send + 'static,
        config: CompileConfig,
    ) -> CompileResult<Self> {
        config.validate()?;
        Ok(Self {
            display_zoom: tile.grid_zoom() as f32,
            tile,
            config,
            features: features.into(),
            styles: Box::new(styles),
            state: CompileState::Init,
            factory: PrimitiveGroupFactory::new(),
            groups: DrawGroupTable::new(),
            candidates: CandidateSet::new(),
            sorted: Vec::new(),
            distances: DistanceGroups::new(),
            pending: Vec::new(),
            cursor: 0,
            stats: CompileStats::default(),
        })
    }

    /// Zoom the tile is shown at, e.g. 14.5 for a zoom-14 tile scaled up.
    pub fn with_display_zoom(mut self, zoom: f32) -> Self {
        self.display_zoom = zoom;
        self
    }

    pub fn state(&self) -> CompileState {
        self.state
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn stats(&self) -> &CompileStats {
        &self.stats
    }

    /// Multiplier for pixel line widths so strokes keep their on-screen
    /// width when the tile is drawn at a fractional zoom.
    pub fn line_stroke_scale(&self) -> f32 {
        if !self.config.line_width_zoom_scale {
            return 1.0;
        }
        (self.tile.grid_zoom() as f32 - self.display_zoom).exp2()
    }

    /// Discard all accumulated state. Has no effect on a finished task.
    pub fn abort(&mut self) {
        if self.state == CompileState::Done {
            return;
        }
        debug!("Tile {}: {} -> {}", self.tile.key, self.state, CompileState::Aborted);
        self.reset_pass();
        self.state = CompileState::Aborted;
    }

    /// Do one bundle of work.
    pub fn step(
        &mut self,
        session: &mut RenderSession,
        arbiter: &mut dyn CollisionArbiter,
    ) -> CompileResult<StepOutcome> {
        let started = Instant::now();
        loop {
            match self.state {
                CompileState::Done => {
                    return Err(CompileError::state(format!(
                        "tile {} is already compiled",
                        self.tile.key
                    )));
                }
                CompileState::Aborted => return Ok(StepOutcome::Aborted),
                CompileState::Init => {
                    arbiter.release_tile(&self.tile.key);
                    self.reset_pass();
                    self.transition(CompileState::Phase1Scanning);
                }
                CompileState::Phase1Scanning => {
                    if self.cursor >= self.features.len() {
                        self.sorted = std::mem::take(&mut self.candidates).into_sorted();
                        self.stats.candidates = self.sorted.len();
                        self.cursor = 0;
                        self.transition(CompileState::Phase2Collisions);
                        continue;
                    }
                    self.scan_bundle(session, arbiter, started);
                    return Ok(self.yielded(started));
                }
                CompileState::Phase2Collisions => {
                    if self.cursor >= self.sorted.len() {
                        self.transition(CompileState::Finalizing);
                        continue;
                    }
                    self.collision_bundle(session, arbiter, started);
                    return Ok(self.yielded(started));
                }
                CompileState::Finalizing => {
                    if !self.pending.is_empty() {
                        let waiting: Vec<ResourceHandle> = self
                            .pending
                            .iter()
                            .copied()
                            .filter(|&h| !session.is_settled(h))
                            .collect();
                        if !waiting.is_empty() {
                            return Ok(StepOutcome::Pending(waiting));
                        }
                        info!(
                            "Tile {}: {} resource(s) settled, restarting compile",
                            self.tile.key,
                            self.pending.len()
                        );
                        self.stats.restarts += 1;
                        self.transition(CompileState::Init);
                        continue;
                    }
                    let groups = std::mem::take(&mut self.groups).into_groups();
                    let tile = finalize(&self.tile, groups, self.stats.clone());
                    self.transition(CompileState::Done);
                    return Ok(StepOutcome::Done(tile));
                }
            }
        }
    }

    /// Step until the task finishes, waits for resources or is aborted.
    pub fn run(
        &mut self,
        session: &mut RenderSession,
        arbiter: &mut dyn CollisionArbiter,
    ) -> CompileResult<StepOutcome> {
        loop {
            match self.step(session, arbiter)? {
                StepOutcome::Yielded => continue,
                outcome => return Ok(outcome),
            }
        }
    }

    fn transition(&mut self, next: CompileState) {
        debug!("Tile {}: {} -> {}", self.tile.key, self.state, next);
        self.state = next;
    }

    fn yielded(&mut self, started: Instant) -> StepOutcome {
        self.stats.yields += 1;
        trace!(
            "Tile {}: yield in {} at {} after {:?}",
            self.tile.key,
            self.state,
            self.cursor,
            started.elapsed()
        );
        StepOutcome::Yielded
    }

    fn reset_pass(&mut self) {
        self.groups = DrawGroupTable::new();
        self.candidates = CandidateSet::new();
        self.sorted.clear();
        self.distances.clear();
        self.factory.begin_pass();
        self.pending.clear();
        self.cursor = 0;
        self.stats.reset_pass();
    }

    fn scan_bundle(
        &mut self,
        session: &mut RenderSession,
        arbiter: &mut dyn CollisionArbiter,
        started: Instant,
    ) {
        let zoom = self.tile.grid_zoom();
        let scale = self.line_stroke_scale();
        let budget = self.config.time_budget();
        let end = (self.cursor + self.config.bundle_size).min(self.features.len());
        let features = Arc::clone(&self.features);
        let mut ctx = CompileContext {
            tile: &self.tile,
            config: &self.config,
            session,
            arbiter,
            groups: &mut self.groups,
            candidates: &mut self.candidates,
            distances: &mut self.distances,
            pending: &mut self.pending,
            stats: &mut self.stats,
        };

        while self.cursor < end {
            let index = self.cursor;
            self.cursor += 1;
            let feature = &features[index];
            ctx.stats.features_scanned += 1;
            if let Some(style) = self.styles.style_for(feature, zoom) {
                for part in 0..feature.geometry.part_count() {
                    let Some(coordinates) = feature.geometry.part(part) else {
                        continue;
                    };
                    ctx.stats.parts += 1;
                    let source = PartRef {
                        feature: index,
                        part,
                    };
                    self.factory.create(
                        &mut ctx, feature, source, coordinates, &style, scale, None, None,
                    );
                }
            }
            if started.elapsed() >= budget {
                break;
            }
        }
    }

    fn collision_bundle(
        &mut self,
        session: &mut RenderSession,
        arbiter: &mut dyn CollisionArbiter,
        started: Instant,
    ) {
        let scale = self.line_stroke_scale();
        let budget = self.config.time_budget();
        let end = (self.cursor + self.config.bundle_size).min(self.sorted.len());
        let features = Arc::clone(&self.features);
        let mut ctx = CompileContext {
            tile: &self.tile,
            config: &self.config,
            session,
            arbiter,
            groups: &mut self.groups,
            candidates: &mut self.candidates,
            distances: &mut self.distances,
            pending: &mut self.pending,
            stats: &mut self.stats,
        };

        while self.cursor < end {
            let candidate = &self.sorted[self.cursor];
            self.cursor += 1;
            let source = candidate.source;
            let Some(feature) = features.get(source.feature) else {
                continue;
            };
            if let Some(coordinates) = feature.geometry.part(source.part) {
                self.factory.create(
                    &mut ctx,
                    feature,
                    source,
                    coordinates,
                    &candidate.style_group,
                    scale,
                    Some(candidate.priority),
                    Some(candidate),
                );
            }
            if started.elapsed() >= budget {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Geometry;
    use crate::labels::collision::AcceptAll;
    use crate::style::{PrimitiveKind, StyleDeclaration};
    use glam::DVec3;

    fn roads(count: usize) -> Vec<Feature> {
        (0..count)
            .map(|i| {
                let lat = -60.0 + i as f64;
                Feature::new(
                    i as u64,
                    Geometry::LineString(vec![
                        DVec3::new(-90.0, lat, 0.0),
                        DVec3::new(90.0, lat, 0.0),
                    ]),
                )
            })
            .collect()
    }

    fn stroke_style() -> impl StyleSource + Send + 'static {
        let group = Arc::new(StyleGroup::new(vec![StyleDeclaration::new(PrimitiveKind::Line)
            .with("stroke", "#202020")
            .with("strokeWidth", 2)]));
        move |_: &Feature, _: u8| Some(Arc::clone(&group))
    }

    fn task(count: usize, config: CompileConfig) -> CompileTask {
        CompileTask::new(Tile::new(0, 0, 0, 256), roads(count), stroke_style(), config).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CompileConfig {
            bundle_size: 0,
            ..CompileConfig::default()
        };
        let err = CompileTask::new(Tile::new(0, 0, 0, 256), roads(1), stroke_style(), config)
            .unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }

    #[test]
    fn test_yields_after_each_bundle() {
        let config = CompileConfig {
            bundle_size: 4,
            time_budget_ms: 60_000,
            ..CompileConfig::default()
        };
        let mut session = RenderSession::new(&config);
        let mut arbiter = AcceptAll::default();
        let mut task = task(10, config);

        for _ in 0..3 {
            assert!(matches!(
                task.step(&mut session, &mut arbiter).unwrap(),
                StepOutcome::Yielded
            ));
            assert_eq!(task.state(), CompileState::Phase1Scanning);
        }
        assert_eq!(task.stats().features_scanned, 10);

        let StepOutcome::Done(tile) = task.step(&mut session, &mut arbiter).unwrap() else {
            panic!("expected the task to finish");
        };
        assert_eq!(tile.groups.len(), 1);
        assert_eq!(tile.stats.yields, 3);
        assert_eq!(task.state(), CompileState::Done);
    }

    #[test]
    fn test_stepping_done_task_is_an_error() {
        let config = CompileConfig::default();
        let mut session = RenderSession::new(&config);
        let mut arbiter = AcceptAll::default();
        let mut task = task(1, config);
        assert!(matches!(
            task.run(&mut session, &mut arbiter).unwrap(),
            StepOutcome::Done(_)
        ));
        assert!(matches!(
            task.step(&mut session, &mut arbiter),
            Err(CompileError::State(_))
        ));
    }

    #[test]
    fn test_abort_discards_progress() {
        let config = CompileConfig {
            bundle_size: 2,
            time_budget_ms: 60_000,
            ..CompileConfig::default()
        };
        let mut session = RenderSession::new(&config);
        let mut arbiter = AcceptAll::default();
        let mut task = task(6, config);
        task.step(&mut session, &mut arbiter).unwrap();
        task.abort();
        assert_eq!(task.state(), CompileState::Aborted);
        assert_eq!(task.stats().features_scanned, 0);
        assert!(matches!(
            task.step(&mut session, &mut arbiter).unwrap(),
            StepOutcome::Aborted
        ));
    }

    #[test]
    fn test_line_stroke_scale_follows_display_zoom() {
        let t = CompileTask::new(
            Tile::new(0, 0, 3, 256),
            roads(1),
            stroke_style(),
            CompileConfig::default(),
        )
        .unwrap();
        assert_eq!(t.line_stroke_scale(), 1.0);
        let t = t.with_display_zoom(4.0);
        assert_eq!(t.line_stroke_scale(), 0.5);

        let config = CompileConfig {
            line_width_zoom_scale: false,
            ..CompileConfig::default()
        };
        let t = CompileTask::new(Tile::new(0, 0, 3, 256), roads(1), stroke_style(), config)
            .unwrap()
            .with_display_zoom(4.0);
        assert_eq!(t.line_stroke_scale(), 1.0);
    }
}
