//! Placement of anchored primitives on lines.
//!
//! A [`LineGeometryProcessor`] projects one line into tile pixels, drops
//! consecutive points that round to the same position and keeps the
//! cumulative arc length next to the points. Two placement strategies run on
//! top of that: one anchor per vertex, and repeated anchors at segment
//! midpoints expanding from the middle of the line outwards.
//!
//! The scratch buffers are reset for every feature part. Placements are
//! cached per feature part, anchor mode, trim window and repeat group until
//! [`LineGeometryProcessor::clear_placements`], so every declaration drawn on
//! the same line replays the anchors of the first one, in either collision
//! phase. The processor is not reentrant: one instance belongs to one
//! compile task.

use crate::geo::Tile;
use crate::labels::candidate::PartRef;
use crate::labels::collision::{CollisionArbiter, CollisionRequest, PlacementRecord};
use crate::labels::distance::DistanceGroups;
use crate::vector::point::Anchor;
use glam::{DVec3, Vec2, Vec3};
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI};

/// Rounding scale used to deduplicate projected points. Whole pixels below
/// zoom 18, then a tenth and a hundredth of a pixel.
pub fn dedup_scale(zoom: u8) -> f32 {
    match zoom {
        0..=17 => 1.0,
        18..=19 => 10.0,
        _ => 100.0,
    }
}

/// Relative part of a line, `0 <= start <= stop <= 1` of its arc length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f32,
    pub stop: f32,
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 1.0,
        }
    }
}

impl TrimWindow {
    pub fn new(start: f32, stop: f32) -> Self {
        let start = start.clamp(0.0, 1.0);
        let stop = stop.clamp(0.0, 1.0);
        Self {
            start: start.min(stop),
            stop: start.max(stop),
        }
    }

    pub fn is_full(&self) -> bool {
        self.start <= 0.0 && self.stop >= 1.0
    }
}

/// How anchored primitives are distributed over a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnchorMode {
    /// Repeated at segment midpoints.
    #[default]
    Line,
    /// One per vertex.
    Coordinate,
}

impl AnchorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Line" | "line" => Some(AnchorMode::Line),
            "Coordinate" | "coordinate" => Some(AnchorMode::Coordinate),
            _ => None,
        }
    }
}

/// Parameters of one placement run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams<'a> {
    /// Feature part the line belongs to.
    pub source: PartRef,
    pub window: TrimWindow,
    /// Box of the primitive relative to its anchor: `[x0, y0, x1, y1]`.
    pub bounds: [f32; 4],
    pub priority: f32,
    /// Submit placements to the collision arbiter.
    pub collides: bool,
    pub repeat_group: &'a str,
    /// Minimum distance between placements of `repeat_group`, in pixels.
    pub repeat_distance: f32,
    /// Reject segments shorter than the box width.
    pub check_line_space: bool,
}

impl PlacementParams<'_> {
    fn footprint(&self) -> f32 {
        self.bounds[2] - self.bounds[0]
    }
}

/// One accepted anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub anchor: Anchor,
    pub record: Option<PlacementRecord>,
}

/// Replay key. Box size and collision flags are not part of it: the
/// first declaration drawn on a line decides its anchors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlacementKey {
    source: PartRef,
    mode: AnchorMode,
    window: [u32; 2],
    repeat_group: String,
}

impl PlacementKey {
    fn new(mode: AnchorMode, params: &PlacementParams<'_>) -> Self {
        Self {
            source: params.source,
            mode,
            window: [params.window.start.to_bits(), params.window.stop.to_bits()],
            repeat_group: params.repeat_group.to_string(),
        }
    }
}

/// Projected points and cumulative arc length of the current line.
#[derive(Debug, Default)]
pub struct LineScratch {
    points: Vec<Vec3>,
    lengths: Vec<f32>,
}

impl LineScratch {
    fn reset(&mut self) {
        self.points.clear();
        self.lengths.clear();
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub fn total_length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at arc length `distance`, position and altitude interpolated.
    pub fn point_at(&self, distance: f32) -> Option<Vec3> {
        let last = self.points.len().checked_sub(1)?;
        let i = self.lengths.partition_point(|&l| l <= distance);
        if i == 0 {
            return self.points.first().copied();
        }
        if i > last {
            return self.points.last().copied();
        }
        let (l0, l1) = (self.lengths[i - 1], self.lengths[i]);
        let t = if l1 > l0 { (distance - l0) / (l1 - l0) } else { 0.0 };
        Some(self.points[i - 1].lerp(self.points[i], t))
    }
}

/// Per-task line placement engine.
#[derive(Debug, Default)]
pub struct LineGeometryProcessor {
    scratch: LineScratch,
    cache: HashMap<PlacementKey, Vec<Placement>>,
}

impl LineGeometryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new line. Resets the scratch buffers; cached placements of
    /// other parts stay.
    pub fn prepare(&mut self, tile: &Tile, coords: &[DVec3], zoom: u8) {
        self.scratch.reset();

        let scale = dedup_scale(zoom);
        for &coord in coords {
            let p = tile.project_with_altitude(coord);
            let rounded = Vec3::new((p.x * scale).round() / scale, (p.y * scale).round() / scale, p.z);
            if let Some(prev) = self.scratch.points.last() {
                if prev.truncate() == rounded.truncate() {
                    continue;
                }
            }
            let length = match self.scratch.points.last() {
                Some(prev) => self.scratch.total_length() + prev.truncate().distance(rounded.truncate()),
                None => 0.0,
            };
            self.scratch.points.push(rounded);
            self.scratch.lengths.push(length);
        }
    }

    pub fn scratch(&self) -> &LineScratch {
        &self.scratch
    }

    pub fn points(&self) -> &[Vec3] {
        &self.scratch.points
    }

    /// Points inside `window`, with interpolated end points.
    pub fn trimmed(&self, window: TrimWindow) -> Vec<Vec3> {
        let total = self.scratch.total_length();
        if window.is_full() || self.scratch.points.len() < 2 || total <= 0.0 {
            return self.scratch.points.clone();
        }
        let (start, stop) = (window.start * total, window.stop * total);
        let mut points = Vec::with_capacity(self.scratch.points.len());
        points.extend(self.scratch.point_at(start));
        for (p, &l) in self.scratch.points.iter().zip(&self.scratch.lengths) {
            if l > start && l < stop {
                points.push(*p);
            }
        }
        points.extend(self.scratch.point_at(stop));
        points.dedup_by(|a, b| a.truncate() == b.truncate());
        points
    }

    /// Forget every cached placement. Called once per compile pass.
    pub fn clear_placements(&mut self) {
        self.cache.clear();
    }

    /// Cached placements for `key`. A colliding declaration replaying
    /// anchors that were never arbitrated submits them now and drops the
    /// rejected ones.
    fn replay(
        &mut self,
        key: &PlacementKey,
        tile: &Tile,
        params: &PlacementParams<'_>,
        arbiter: &mut dyn CollisionArbiter,
    ) -> Option<Vec<Placement>> {
        let placements = self.cache.get_mut(key)?;
        if params.collides {
            placements.retain_mut(|placed| {
                if placed.record.is_none() {
                    placed.record =
                        arbiter.insert(&collision_request(tile, &placed.anchor, params.bounds, params.priority));
                }
                placed.record.is_some()
            });
        }
        Some(placements.clone())
    }

    /// One anchor per vertex inside the trim window.
    pub fn place_at_points(
        &mut self,
        tile: &Tile,
        params: &PlacementParams<'_>,
        arbiter: &mut dyn CollisionArbiter,
    ) -> Vec<Placement> {
        let key = PlacementKey::new(AnchorMode::Coordinate, params);
        if let Some(placements) = self.replay(&key, tile, params, arbiter) {
            return placements;
        }

        let points = self.trimmed(params.window);
        let mut placements = Vec::new();
        for (i, &position) in points.iter().enumerate() {
            let p = position.truncate();
            if !tile.contains(p) {
                continue;
            }
            let angle = match (points.get(i + 1), i.checked_sub(1).map(|j| points[j])) {
                (Some(next), _) => upright(next.truncate() - p),
                (None, Some(prev)) => upright(p - prev.truncate()),
                (None, None) => 0.0,
            };
            let anchor = Anchor::new(position, angle, true);
            let record = if params.collides {
                match arbiter.insert(&collision_request(tile, &anchor, params.bounds, params.priority)) {
                    Some(record) => Some(record),
                    None => continue,
                }
            } else {
                None
            };
            placements.push(Placement { anchor, record });
        }

        self.cache.insert(key, placements.clone());
        placements
    }

    /// Repeated anchors at segment midpoints, starting at the middle vertex
    /// and alternating towards the end and the start.
    pub fn place_along_line(
        &mut self,
        tile: &Tile,
        params: &PlacementParams<'_>,
        arbiter: &mut dyn CollisionArbiter,
        distances: &mut DistanceGroups,
    ) -> Vec<Placement> {
        let key = PlacementKey::new(AnchorMode::Line, params);
        if let Some(placements) = self.replay(&key, tile, params, arbiter) {
            return placements;
        }

        let points = self.trimmed(params.window);
        let footprint_sq = params.footprint() * params.footprint();
        let repeat_sq = params.repeat_distance * params.repeat_distance;
        let mut placements = Vec::new();
        for segment in center_out(points.len().saturating_sub(1)) {
            let (a, b) = (points[segment], points[segment + 1]);
            let d = b.truncate() - a.truncate();
            if params.check_line_space && d.length_squared() < footprint_sq {
                continue;
            }
            let mid = (a + b) * 0.5;
            let p = mid.truncate();
            if !tile.contains(p) {
                continue;
            }
            let spaced = placements.iter().all(|placed: &Placement| {
                placed.anchor.position.truncate().distance_squared(p) >= repeat_sq
            });
            if !spaced
                || !distances.is_far_enough(params.repeat_group, p, params.repeat_distance, params.source)
            {
                continue;
            }
            let anchor = Anchor::new(mid, upright(d), true);
            let record = if params.collides {
                match arbiter.insert(&collision_request(tile, &anchor, params.bounds, params.priority)) {
                    Some(record) => Some(record),
                    None => continue,
                }
            } else {
                None
            };
            distances.insert(params.repeat_group, p, params.source);
            placements.push(Placement { anchor, record });
        }

        self.cache.insert(key, placements.clone());
        placements
    }
}

/// Segment order starting in the middle: mid, mid+1, mid-1, mid+2, ...
pub fn center_out(count: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(count);
    if count == 0 {
        return order;
    }
    let mid = count / 2;
    order.push(mid);
    let mut step = 1;
    while order.len() < count {
        if mid + step < count {
            order.push(mid + step);
        }
        if step <= mid {
            order.push(mid - step);
        }
        step += 1;
    }
    order
}

/// Direction angle of `d`, flipped so text never reads upside down.
fn upright(d: Vec2) -> f32 {
    let angle = d.y.atan2(d.x);
    if angle > FRAC_PI_2 {
        angle - PI
    } else if angle <= -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    }
}

/// Arbiter request for a box `bounds` around `anchor`, rotated with the
/// anchor's angle.
pub fn collision_request(tile: &Tile, anchor: &Anchor, bounds: [f32; 4], priority: f32) -> CollisionRequest {
    let [x0, y0, x1, y1] = bounds;
    let (sin, cos) = anchor.angle.sin_cos();
    let (cx, cy) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
    CollisionRequest {
        x: anchor.position.x,
        y: anchor.position.y,
        z: anchor.position.z,
        offset_x: cx * cos - cy * sin,
        offset_y: cx * sin + cy * cos,
        half_width: (x1 - x0) * 0.5,
        half_height: (y1 - y0) * 0.5,
        tile: tile.key,
        tile_size: tile.size,
        priority,
        slope: (anchor.angle != 0.0).then_some(anchor.angle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::collision::AcceptAll;
    use crate::labels::rtree::RTreeArbiter;

    fn tile() -> Tile {
        Tile::new(0, 0, 0, 256)
    }

    /// Coordinates whose projection is `px` on tile 0/0/0.
    fn line(px: &[(f32, f32)]) -> Vec<DVec3> {
        let tile = tile();
        px.iter()
            .map(|&(x, y)| tile.unproject(Vec2::new(x, y)))
            .collect()
    }

    const MAIN_ST: PartRef = PartRef { feature: 0, part: 0 };
    const SIDE_ST: PartRef = PartRef { feature: 1, part: 0 };

    fn params(width: f32, repeat: f32) -> PlacementParams<'static> {
        PlacementParams {
            source: MAIN_ST,
            window: TrimWindow::default(),
            bounds: [-width * 0.5, -5.0, width * 0.5, 5.0],
            priority: 0.0,
            collides: true,
            repeat_group: "road",
            repeat_distance: repeat,
            check_line_space: true,
        }
    }

    fn horizontal(step: f32) -> Vec<(f32, f32)> {
        (0..=(240.0 / step) as usize)
            .map(|i| (8.0 + i as f32 * step, 100.0))
            .collect()
    }

    #[test]
    fn test_prepare_dedups_and_measures() {
        let mut lines = LineGeometryProcessor::new();
        lines.prepare(&tile(), &line(&[(10.0, 10.0), (10.2, 10.1), (13.0, 14.0)]), 10);
        assert_eq!(lines.points().len(), 2);
        assert!((lines.scratch().total_length() - 5.0).abs() < 1e-3);

        lines.prepare(&tile(), &line(&[(10.0, 10.0), (10.2, 10.1)]), 18);
        assert_eq!(lines.points().len(), 2);
    }

    #[test]
    fn test_trim_interpolates_end_points() {
        let mut lines = LineGeometryProcessor::new();
        lines.prepare(&tile(), &line(&[(0.0, 50.0), (100.0, 50.0), (200.0, 50.0)]), 10);
        let trimmed = lines.trimmed(TrimWindow::new(0.25, 0.75));
        assert_eq!(trimmed.len(), 3);
        assert!((trimmed[0].x - 50.0).abs() < 1e-3);
        assert!((trimmed[1].x - 100.0).abs() < 1e-3);
        assert!((trimmed[2].x - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_center_out_order() {
        assert_eq!(center_out(0), Vec::<usize>::new());
        assert_eq!(center_out(1), vec![0]);
        assert_eq!(center_out(4), vec![2, 3, 1, 0]);
        assert_eq!(center_out(5), vec![2, 3, 1, 4, 0]);
    }

    #[test]
    fn test_place_at_points() {
        let mut lines = LineGeometryProcessor::new();
        lines.prepare(&tile(), &line(&[(10.0, 10.0), (50.0, 10.0), (300.0, 10.0)]), 10);
        let placements = lines.place_at_points(&tile(), &params(10.0, 0.0), &mut AcceptAll::default());
        // The last vertex lies right of the tile.
        assert_eq!(placements.len(), 2);
        assert!(placements.iter().all(|p| p.record.is_some()));
    }

    #[test]
    fn test_repeat_distance_holds_across_features() {
        let mut lines = LineGeometryProcessor::new();
        let mut arbiter = AcceptAll::default();
        let mut distances = DistanceGroups::new();
        let main = params(10.0, 64.0);
        let side = PlacementParams { source: SIDE_ST, ..main };

        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let first = lines.place_along_line(&tile(), &main, &mut arbiter, &mut distances);
        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let second = lines.place_along_line(&tile(), &side, &mut arbiter, &mut distances);
        assert!(!first.is_empty());
        assert!(second.is_empty());

        let points = distances.points("road");
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 64.0);
            }
        }
    }

    #[test]
    fn test_same_part_is_not_blocked_by_its_own_spacing() {
        let mut lines = LineGeometryProcessor::new();
        let mut arbiter = AcceptAll::default();
        let mut distances = DistanceGroups::new();
        let p = params(10.0, 64.0);

        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let first = lines.place_along_line(&tile(), &p, &mut arbiter, &mut distances);
        lines.clear_placements();
        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let again = lines.place_along_line(&tile(), &p, &mut arbiter, &mut distances);
        assert!(first.len() > 1);
        let anchors = |placed: &[Placement]| placed.iter().map(|p| p.anchor).collect::<Vec<_>>();
        assert_eq!(anchors(&first), anchors(&again));
    }

    #[test]
    fn test_declarations_share_anchors_on_one_line() {
        let mut lines = LineGeometryProcessor::new();
        let mut arbiter = RTreeArbiter::new();
        let mut distances = DistanceGroups::new();
        let short = params(10.0, 64.0);
        let long = PlacementParams { bounds: [-40.0, -8.0, 40.0, 8.0], collides: false, ..short };

        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let first = lines.place_along_line(&tile(), &short, &mut arbiter, &mut distances);
        let second = lines.place_along_line(&tile(), &long, &mut arbiter, &mut distances);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_line_space_check() {
        let mut lines = LineGeometryProcessor::new();
        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let mut p = params(40.0, 0.0);
        let mut distances = DistanceGroups::new();
        let placed = lines.place_along_line(&tile(), &p, &mut AcceptAll::default(), &mut distances);
        assert!(placed.is_empty());

        p.check_line_space = false;
        lines.clear_placements();
        let placed = lines.place_along_line(&tile(), &p, &mut AcceptAll::default(), &mut distances);
        assert_eq!(placed.len(), 15);
    }

    #[test]
    fn test_first_placement_is_in_the_middle() {
        let mut lines = LineGeometryProcessor::new();
        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let mut distances = DistanceGroups::new();
        let placed = lines.place_along_line(&tile(), &params(10.0, 0.0), &mut AcceptAll::default(), &mut distances);
        assert!((placed[0].anchor.position.x - 128.0).abs() < 0.5);
    }

    #[test]
    fn test_placements_are_replayed() {
        let mut lines = LineGeometryProcessor::new();
        let mut arbiter = RTreeArbiter::new();
        let mut distances = DistanceGroups::new();
        let p = params(10.0, 0.0);
        lines.prepare(&tile(), &line(&horizontal(32.0)), 10);
        let first = lines.place_along_line(&tile(), &p, &mut arbiter, &mut distances);
        let inserted = arbiter.len();
        let replay = lines.place_along_line(&tile(), &p, &mut arbiter, &mut distances);
        assert_eq!(first, replay);
        assert_eq!(arbiter.len(), inserted);
    }

    #[test]
    fn test_colliding_replay_arbitrates_cached_anchors() {
        let mut lines = LineGeometryProcessor::new();
        let mut arbiter = RTreeArbiter::new();
        let mut distances = DistanceGroups::new();
        let label = PlacementParams { collides: false, ..params(10.0, 64.0) };
        let marker = PlacementParams { collides: true, ..label };

        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let drawn = lines.place_along_line(&tile(), &label, &mut arbiter, &mut distances);
        assert!(drawn.iter().all(|p| p.record.is_none()));
        assert_eq!(arbiter.len(), 0);

        lines.prepare(&tile(), &line(&horizontal(16.0)), 10);
        let placed = lines.place_along_line(&tile(), &marker, &mut arbiter, &mut distances);
        assert_eq!(placed.len(), drawn.len());
        assert!(placed.iter().all(|p| p.record.is_some()));
        assert_eq!(arbiter.len(), drawn.len());

        let again = lines.place_along_line(&tile(), &marker, &mut arbiter, &mut distances);
        assert_eq!(again, placed);
        assert_eq!(arbiter.len(), drawn.len());
    }

    #[test]
    fn test_upright_angles() {
        assert_eq!(upright(Vec2::new(1.0, 0.0)), 0.0);
        assert!((upright(Vec2::new(-1.0, 0.0))).abs() < 1e-6);
        assert!((upright(Vec2::new(0.0, 1.0)) - FRAC_PI_2).abs() < 1e-6);
    }
}
