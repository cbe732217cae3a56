//! Primitive group factory.
//!
//! Turns one feature part and its style group into draw-group geometry.
//! Declarations that must avoid collisions are not emitted while scanning:
//! their boxes are folded into a [`CollisionCandidate`] and the part is
//! compiled again in the collision phase with the candidate's priority.
//!
//! Nothing in here fails. Every declaration ends in an [`Emit`] value and the
//! caller only reacts to pending resources.

use crate::config::CompileConfig;
use crate::core::atlas::AtlasRegion;
use crate::core::resource::{ResourceHandle, ResourceStatus};
use crate::core::session::RenderSession;
use crate::geo::{Coordinates, Feature, Polygon, Tile};
use crate::labels::candidate::{CandidateSet, CollisionCandidate, Contribution, PartRef};
use crate::labels::collision::{CollisionArbiter, PlacementRecord};
use crate::labels::distance::DistanceGroups;
use crate::labels::layout::{layout_text, TextAnchor, TextLayout, TextStyle};
use crate::pipeline::stats::CompileStats;
use crate::style::{PrimitiveKind, Size, StyleGroup, StyleValueResolver, Unit};
use crate::vector::data::{
    ExtrudeVertex, FillVertex, GlyphVertex, GroupVertex, LineVertex, ModelInstance, PointVertex,
    ShapeVertex,
};
use crate::vector::extrusion::emit_extrusion;
use crate::vector::group::{DrawGroup, DrawGroupTable};
use crate::vector::line::{emit_line, LineCap, LineJoin, Ribbon};
use crate::vector::line_processor::{
    collision_request, AnchorMode, LineGeometryProcessor, PlacementParams, TrimWindow,
};
use crate::vector::point::{emit_box, emit_model, emit_quad, emit_vertical_line, Anchor};
use crate::vector::polygon::{emit_fill, polygon_triangles, project_rings, TriangulationSource};
use crate::vector::signature::{quantize_opacity, Alignment, GroupUniforms};
use crate::vector::text::{emit_icon, emit_text, icon_bounds};
use glam::{Vec2, Vec3};
use log::{debug, warn};
use std::borrow::Cow;
use std::sync::Arc;

pub const DEFAULT_COLLISION_GROUP: &str = "default";
pub const DEFAULT_FONT: &str = "sans-serif";
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
const DEFAULT_RADIUS: f32 = 4.0;
const DEFAULT_HEATMAP_RADIUS: f32 = 10.0;
const DEFAULT_RECT_SIZE: f32 = 8.0;
const DEFAULT_POLE_HEIGHT: f32 = 10.0;
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Why a declaration produced no geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingType,
    UnknownType,
    ZeroOpacity,
    MissingPaint,
    /// Anchored primitive on a point outside the tile.
    OutsideTile,
    /// The primitive cannot be drawn on this geometry type.
    Unsupported,
    /// Nothing left to draw: empty text, a single point, zero width.
    Degenerate,
    /// Refused by the collision arbiter.
    Rejected,
    /// No anchor survived line placement.
    NoPlacement,
    /// A referenced resource failed for good.
    Resource,
}

/// Outcome of one declaration in one [`PrimitiveGroupFactory::create`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    Emitted,
    /// Folded into a collision candidate.
    Deferred,
    /// Not part of the candidate being compiled.
    Ignored,
    Skipped(SkipReason),
    Pending(ResourceHandle),
}

/// Everything a `create` call reads or writes besides its own arguments.
pub struct CompileContext<'a> {
    pub tile: &'a Tile,
    pub config: &'a CompileConfig,
    pub session: &'a mut RenderSession,
    pub arbiter: &'a mut dyn CollisionArbiter,
    pub groups: &'a mut DrawGroupTable,
    pub candidates: &'a mut CandidateSet,
    pub distances: &'a mut DistanceGroups,
    /// Resources the pass waits for.
    pub pending: &'a mut Vec<ResourceHandle>,
    pub stats: &'a mut CompileStats,
}

impl CompileContext<'_> {
    fn wait_for(&mut self, handle: ResourceHandle) {
        if !self.pending.contains(&handle) {
            self.pending.push(handle);
        }
    }
}

/// Per-part state shared by the declarations of one `create` call.
#[derive(Default)]
struct PartState<'p> {
    rings: Option<Vec<Vec<Vec3>>>,
    triangles: Option<Cow<'p, [u32]>>,
    /// Arbiter decision for a point part in the collision phase.
    arbitration: Option<Option<PlacementRecord>>,
}

impl<'p> PartState<'p> {
    fn rings(&mut self, tile: &Tile, polygon: &Polygon) -> &[Vec<Vec3>] {
        self.rings.get_or_insert_with(|| project_rings(tile, polygon))
    }

    fn fill(
        &mut self,
        tile: &Tile,
        stats: &mut CompileStats,
        polygon: &'p Polygon,
    ) -> (&[Vec<Vec3>], &[u32]) {
        let rings = self.rings.get_or_insert_with(|| project_rings(tile, polygon));
        if self.triangles.is_none() {
            let (triangles, source) = polygon_triangles(tile, polygon, rings);
            match source {
                TriangulationSource::Computed => stats.triangulations_computed += 1,
                TriangulationSource::Cached => stats.triangulations_reused += 1,
            }
            self.triangles = Some(triangles);
        }
        (rings, self.triangles.as_deref().unwrap_or(&[]))
    }
}

/// Arguments of one `create` call, bundled per declaration.
struct Job<'a> {
    r: StyleValueResolver<'a>,
    source: PartRef,
    style_group: &'a Arc<StyleGroup>,
    line_stroke_scale: f32,
    priority: Option<f32>,
    candidate: Option<&'a CollisionCandidate>,
}

/// Resolved geometry of one anchored primitive, drawn once per anchor.
enum Shape {
    Text { layout: TextLayout, offset: Vec2 },
    Icon { region: AtlasRegion, size: Vec2, offset: Vec2 },
    Quad { half: Vec2, weight: f32 },
    Box { half: Vec2, height: f32 },
    VerticalLine { height: f32 },
    Model { rotation: f32, scale: f32 },
}

/// Paint a shape kind cannot do without.
#[derive(Clone, Copy, PartialEq)]
enum Paint {
    Optional,
    Fill,
    Stroke,
    FillOrStroke,
}

/// Compiles feature parts into draw groups. Owns the line scratch buffers,
/// so one factory serves one compile task at a time.
#[derive(Debug, Default)]
pub struct PrimitiveGroupFactory {
    lines: LineGeometryProcessor,
}

impl PrimitiveGroupFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop line placements of the previous pass.
    pub fn begin_pass(&mut self) {
        self.lines.clear_placements();
    }

    /// Compile one single geometry of `feature` with every declaration of
    /// `style_group`, in paint order.
    ///
    /// Without `priority` colliding declarations are deferred into
    /// collision candidates. With `priority` (and the `candidate` being
    /// resolved) only that candidate's declarations are compiled and placed
    /// through the arbiter.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        ctx: &mut CompileContext<'_>,
        feature: &Feature,
        source: PartRef,
        coordinates: Coordinates<'_>,
        style_group: &Arc<StyleGroup>,
        line_stroke_scale: f32,
        priority: Option<f32>,
        candidate: Option<&CollisionCandidate>,
    ) -> Vec<Emit> {
        let zoom = ctx.tile.grid_zoom();
        if let Coordinates::Line(coords) = coordinates {
            self.lines.prepare(ctx.tile, coords, zoom);
        }

        let mut part = PartState::default();
        let mut outcomes = Vec::with_capacity(style_group.len());
        for decl in &style_group.declarations {
            let job = Job {
                r: StyleValueResolver::new(decl, feature, zoom),
                source,
                style_group,
                line_stroke_scale,
                priority,
                candidate,
            };
            let emit = self.declaration(ctx, &job, coordinates, &mut part);
            match &emit {
                Emit::Skipped(_) => ctx.stats.declarations_skipped += 1,
                Emit::Pending(handle) => ctx.wait_for(*handle),
                _ => {}
            }
            outcomes.push(emit);
        }
        ctx.groups.record_feature(&feature.id);
        outcomes
    }

    fn declaration<'p>(
        &mut self,
        ctx: &mut CompileContext<'_>,
        job: &Job<'_>,
        coordinates: Coordinates<'p>,
        part: &mut PartState<'p>,
    ) -> Emit {
        let r = &job.r;
        let Some(kind) = r.kind() else {
            return match r.string("type") {
                Some(name) => {
                    warn!("Unknown primitive type '{}' on feature {}", name, r.feature().id);
                    Emit::Skipped(SkipReason::UnknownType)
                }
                None => Emit::Skipped(SkipReason::MissingType),
            };
        };
        let opacity = r.number_or("opacity", 1.0) as f32;
        if opacity <= 0.0 {
            return Emit::Skipped(SkipReason::ZeroOpacity);
        }

        let collides = kind.is_collidable() && r.boolean_or("collide", kind.collides_by_default());
        let group_id = r
            .string("collisionGroup")
            .unwrap_or_else(|| DEFAULT_COLLISION_GROUP.to_string());
        if let Some(candidate) = job.candidate {
            if !collides || candidate.group_id != group_id {
                return Emit::Ignored;
            }
        }

        match (coordinates, kind) {
            (Coordinates::Line(_), PrimitiveKind::Line) => self.line(ctx, job, opacity),
            (Coordinates::Polygon(polygon), PrimitiveKind::Polygon) => {
                Self::polygon(ctx, job, polygon, part, opacity)
            }
            (Coordinates::Polygon(polygon), PrimitiveKind::Line) => match r.color("stroke") {
                Some(stroke) => Self::outline(ctx, job, polygon, part, opacity, stroke),
                None => Emit::Skipped(SkipReason::MissingPaint),
            },
            (Coordinates::Polygon(polygon), PrimitiveKind::Extrude) => {
                Self::extrude(ctx, job, polygon, part, opacity)
            }
            (Coordinates::Polygon(_), _)
            | (_, PrimitiveKind::Line | PrimitiveKind::Polygon | PrimitiveKind::Extrude) => {
                Emit::Skipped(SkipReason::Unsupported)
            }
            _ => self.anchored(ctx, job, kind, coordinates, part, opacity, collides, &group_id),
        }
    }

    fn line(&mut self, ctx: &mut CompileContext<'_>, job: &Job<'_>, opacity: f32) -> Emit {
        let r = &job.r;
        let Some(stroke) = r.color("stroke") else {
            return Emit::Skipped(SkipReason::MissingPaint);
        };
        let mut u = base_uniforms(PrimitiveKind::Line, r, opacity, ctx.config);
        let Some(width) = stroke_uniforms(ctx, job, stroke, &mut u) else {
            return Emit::Skipped(SkipReason::Degenerate);
        };
        if let Err(emit) = line_style(ctx, r, &mut u) {
            return emit;
        }

        let mut points = self.lines.trimmed(trim_window(r));
        if points.len() < 2 {
            return Emit::Skipped(SkipReason::Degenerate);
        }
        if !u.altitude {
            flatten(&mut points);
        }
        let mut ribbon = Ribbon::new(width, u.cap, u.join);
        if ctx.tile.clipped {
            if points.first().is_some_and(|p| ctx.tile.on_border(p.truncate())) {
                ribbon.start_cap = LineCap::Butt;
            }
            if points.last().is_some_and(|p| ctx.tile.on_border(p.truncate())) {
                ribbon.end_cap = LineCap::Butt;
            }
        }
        emit_ribbons(ctx, u, &[(points, ribbon)])
    }

    fn polygon<'p>(
        ctx: &mut CompileContext<'_>,
        job: &Job<'_>,
        polygon: &'p Polygon,
        part: &mut PartState<'p>,
        opacity: f32,
    ) -> Emit {
        let r = &job.r;
        let fill = r.color("fill");
        let stroke = r.color("stroke");
        if fill.is_none() && stroke.is_none() {
            return Emit::Skipped(SkipReason::MissingPaint);
        }

        let mut emitted = false;
        if let Some(fill) = fill {
            let mut u = base_uniforms(PrimitiveKind::Polygon, r, opacity, ctx.config);
            u.fill = Some(fill);
            u.offset = style_offset(r).to_array();
            let altitude = u.altitude;
            let (rings, triangles) = part.fill(ctx.tile, ctx.stats, polygon);
            if !triangles.is_empty() {
                let idx = ctx.groups.get_or_create(u);
                if let Some((vertices, indices)) =
                    ctx.groups.get_mut(idx).and_then(|g| g.buffers::<FillVertex>())
                {
                    emit_fill(vertices, indices, rings, triangles, altitude);
                    emitted = true;
                }
            }
        }
        if let Some(stroke) = stroke {
            match Self::outline(ctx, job, polygon, part, opacity, stroke) {
                Emit::Emitted => emitted = true,
                Emit::Pending(handle) if !emitted => return Emit::Pending(handle),
                _ => {}
            }
        }
        if emitted {
            Emit::Emitted
        } else {
            Emit::Skipped(SkipReason::Degenerate)
        }
    }

    /// Ring outlines as line ribbons. On clipped tiles the edges running
    /// along the tile border are left out.
    fn outline<'p>(
        ctx: &mut CompileContext<'_>,
        job: &Job<'_>,
        polygon: &'p Polygon,
        part: &mut PartState<'p>,
        opacity: f32,
        stroke: [f32; 4],
    ) -> Emit {
        let r = &job.r;
        let mut u = base_uniforms(PrimitiveKind::Line, r, opacity, ctx.config);
        let Some(width) = stroke_uniforms(ctx, job, stroke, &mut u) else {
            return Emit::Skipped(SkipReason::Degenerate);
        };
        if let Err(emit) = line_style(ctx, r, &mut u) {
            return emit;
        }

        let tile = ctx.tile;
        let runs: Vec<(Vec<Vec3>, Ribbon)> = part
            .rings(tile, polygon)
            .iter()
            .flat_map(|ring| outline_runs(tile, ring))
            .map(|(mut points, closed)| {
                if !u.altitude {
                    flatten(&mut points);
                }
                let ribbon = if closed {
                    Ribbon::new(width, u.cap, u.join).closed()
                } else {
                    Ribbon::new(width, LineCap::Butt, u.join)
                };
                (points, ribbon)
            })
            .collect();
        emit_ribbons(ctx, u, &runs)
    }

    fn extrude<'p>(
        ctx: &mut CompileContext<'_>,
        job: &Job<'_>,
        polygon: &'p Polygon,
        part: &mut PartState<'p>,
        opacity: f32,
    ) -> Emit {
        let r = &job.r;
        let Some(fill) = r.color("fill") else {
            return Emit::Skipped(SkipReason::MissingPaint);
        };
        let ppm = ctx.tile.pixels_per_meter();
        let height = r.size("extrude").map_or(0.0, |s| meters(s, ppm));
        let base = r.size("extrudeBase").map_or(0.0, |s| meters(s, ppm));
        if !(height > base) {
            return Emit::Skipped(SkipReason::Degenerate);
        }

        let mut u = base_uniforms(PrimitiveKind::Extrude, r, opacity, ctx.config);
        u.fill = Some(fill);
        u.unit = Unit::Meter;
        let (rings, triangles) = part.fill(ctx.tile, ctx.stats, polygon);
        if triangles.is_empty() {
            return Emit::Skipped(SkipReason::Degenerate);
        }
        let idx = ctx.groups.get_or_create(u);
        let Some((vertices, indices)) =
            ctx.groups.get_mut(idx).and_then(|g| g.buffers::<ExtrudeVertex>())
        else {
            return Emit::Skipped(SkipReason::Degenerate);
        };
        emit_extrusion(vertices, indices, ctx.tile, rings, triangles, height, base);
        Emit::Emitted
    }

    #[allow(clippy::too_many_arguments)]
    fn anchored<'p>(
        &mut self,
        ctx: &mut CompileContext<'_>,
        job: &Job<'_>,
        kind: PrimitiveKind,
        coordinates: Coordinates<'p>,
        part: &mut PartState<'p>,
        opacity: f32,
        collides: bool,
        group_id: &str,
    ) -> Emit {
        let r = &job.r;
        let mut u = base_uniforms(kind, r, opacity, ctx.config);
        let (shape, bounds) = match resolve_shape(ctx, r, kind, &mut u) {
            Ok(resolved) => resolved,
            Err(emit) => return emit,
        };
        let own_priority = r.number_or("priority", 0.0) as f32;
        let repeat_distance = r
            .number("repeatDistance")
            .map_or(ctx.config.default_repeat_distance, |d| d as f32);
        let contribution = Contribution {
            group_id,
            bounds,
            priority: own_priority,
            repeat_distance,
        };

        let anchors: Vec<Anchor> = match coordinates {
            Coordinates::Point(coord) => {
                let mut position = ctx.tile.project_with_altitude(coord);
                if !u.altitude {
                    position.z = 0.0;
                }
                let inside = ctx.tile.contains(position.truncate());
                if collides && !inside {
                    return Emit::Skipped(SkipReason::OutsideTile);
                }
                let anchor = Anchor::new(position, 0.0, inside);
                if collides {
                    let Some(priority) = job.priority else {
                        ctx.candidates.merge(job.source, job.style_group, contribution);
                        return Emit::Deferred;
                    };
                    let bounds = job.candidate.map_or(bounds, |c| c.bounds);
                    let record = *part.arbitration.get_or_insert_with(|| {
                        let request = collision_request(ctx.tile, &anchor, bounds, priority);
                        let record = ctx.arbiter.insert(&request);
                        if record.is_none() {
                            ctx.stats.collisions_rejected += 1;
                        }
                        record
                    });
                    if record.is_none() {
                        return Emit::Skipped(SkipReason::Rejected);
                    }
                }
                vec![anchor]
            }
            Coordinates::Line(_) => {
                if collides && job.priority.is_none() {
                    ctx.candidates.merge(job.source, job.style_group, contribution);
                    return Emit::Deferred;
                }
                let repeat_group = r
                    .string("repeatGroup")
                    .unwrap_or_else(|| group_id.to_string());
                let (bounds, repeat_distance) = job
                    .candidate
                    .map_or((bounds, repeat_distance), |c| (c.bounds, c.repeat_distance));
                let params = PlacementParams {
                    source: job.source,
                    window: trim_window(r),
                    bounds,
                    priority: job.priority.unwrap_or(own_priority),
                    collides,
                    repeat_group: &repeat_group,
                    repeat_distance,
                    check_line_space: r.boolean_or("checkLineSpace", ctx.config.check_line_space),
                };
                let mode = r
                    .string("anchor")
                    .as_deref()
                    .and_then(AnchorMode::parse)
                    .unwrap_or_default();
                let placements = match mode {
                    AnchorMode::Line => self.lines.place_along_line(
                        ctx.tile,
                        &params,
                        &mut *ctx.arbiter,
                        &mut *ctx.distances,
                    ),
                    AnchorMode::Coordinate => {
                        self.lines.place_at_points(ctx.tile, &params, &mut *ctx.arbiter)
                    }
                };
                let follows_line = matches!(
                    kind,
                    PrimitiveKind::Text | PrimitiveKind::Icon | PrimitiveKind::Model
                );
                placements
                    .iter()
                    .map(|p| {
                        let mut anchor = p.anchor;
                        if !follows_line {
                            anchor.angle = 0.0;
                        }
                        if !u.altitude {
                            anchor.position.z = 0.0;
                        }
                        anchor
                    })
                    .collect()
            }
            Coordinates::Polygon(_) => return Emit::Skipped(SkipReason::Unsupported),
        };
        if anchors.is_empty() {
            return Emit::Skipped(SkipReason::NoPlacement);
        }

        let idx = ctx.groups.get_or_create(u);
        let emitted = ctx
            .groups
            .get_mut(idx)
            .is_some_and(|group| emit_shape(group, &shape, &anchors));
        if emitted {
            Emit::Emitted
        } else {
            Emit::Skipped(SkipReason::Degenerate)
        }
    }
}

fn base_uniforms(
    kind: PrimitiveKind,
    r: &StyleValueResolver<'_>,
    opacity: f32,
    config: &CompileConfig,
) -> GroupUniforms {
    let mut u = GroupUniforms::new(kind);
    u.z_layer = r.number_or("zLayer", 0.0) as i32;
    u.z_index = r.number_or("zIndex", 0.0) as i32;
    u.opacity = quantize_opacity(opacity, config.opacity_steps);
    u.alignment = r
        .string("alignment")
        .as_deref()
        .and_then(Alignment::parse)
        .unwrap_or_default();
    u.rotation = r.number_or("rotation", 0.0) as f32;
    u.altitude = r.boolean_or("altitude", false);
    u.depth_test = r.boolean_or("depthTest", u.depth_test);
    u
}

fn style_offset(r: &StyleValueResolver<'_>) -> Vec2 {
    Vec2::new(
        r.number_or("offsetX", 0.0) as f32,
        r.number_or("offsetY", 0.0) as f32,
    )
}

fn trim_window(r: &StyleValueResolver<'_>) -> TrimWindow {
    TrimWindow::new(r.number_or("from", 0.0) as f32, r.number_or("to", 1.0) as f32)
}

fn flatten(points: &mut [Vec3]) {
    for p in points {
        p.z = 0.0;
    }
}

/// Pixels per group unit.
fn unit_scale(unit: Unit, pixels_per_meter: f64) -> f32 {
    match unit {
        Unit::Pixel => 1.0,
        Unit::Meter => pixels_per_meter as f32,
    }
}

/// `size` expressed in `unit`.
fn in_unit(size: Size, unit: Unit, pixels_per_meter: f64) -> f32 {
    match (size.unit, unit) {
        (Unit::Meter, Unit::Pixel) => size.to_pixels(pixels_per_meter),
        (Unit::Pixel, Unit::Meter) => (size.value as f64 / pixels_per_meter) as f32,
        _ => size.value,
    }
}

fn meters(size: Size, pixels_per_meter: f64) -> f32 {
    in_unit(size, Unit::Meter, pixels_per_meter)
}

/// Stroke color and width of a line group. Returns the ribbon width in
/// pixels, `None` when it is not positive. Only pixel widths follow the
/// line stroke scale.
fn stroke_uniforms(
    ctx: &CompileContext<'_>,
    job: &Job<'_>,
    stroke: [f32; 4],
    u: &mut GroupUniforms,
) -> Option<f32> {
    let width = job.r.size("strokeWidth").unwrap_or(Size::px(1.0));
    let (stroke_width, pixels) = match width.unit {
        Unit::Pixel => {
            let w = width.value * job.line_stroke_scale;
            (w, w)
        }
        Unit::Meter => (width.value, width.to_pixels(ctx.tile.pixels_per_meter())),
    };
    u.unit = width.unit;
    u.stroke = Some(stroke);
    u.stroke_width = stroke_width;
    (pixels > 0.0).then_some(pixels)
}

/// Caps, joins, offset and dashes of a line group.
fn line_style(
    ctx: &mut CompileContext<'_>,
    r: &StyleValueResolver<'_>,
    u: &mut GroupUniforms,
) -> Result<(), Emit> {
    u.cap = r
        .string("strokeLinecap")
        .as_deref()
        .and_then(LineCap::parse)
        .unwrap_or_default();
    u.join = r
        .string("strokeLinejoin")
        .as_deref()
        .and_then(LineJoin::parse)
        .unwrap_or_default();
    u.offset = style_offset(r).to_array();
    if let Some(pattern) = r.sizes("strokeDasharray") {
        u.dash = ctx.session.dashes.get_or_insert(&pattern);
        if u.dash.is_none() {
            debug!("Dash atlas is full, drawing {:?} solid", pattern);
        }
    }
    if let Some(name) = r.string("strokeImage") {
        u.dash_region = Some(ready(ctx.session.dash_image(&name), &name)?);
        u.dash_image = Some(name);
    }
    Ok(())
}

fn ready<T>(status: ResourceStatus<T>, name: &str) -> Result<T, Emit> {
    match status {
        ResourceStatus::Ready(value) => Ok(value),
        ResourceStatus::Pending(handle) => Err(Emit::Pending(handle)),
        ResourceStatus::Skipped(reason) => {
            debug!("Skipping declaration using '{}': {}", name, reason);
            Err(Emit::Skipped(SkipReason::Resource))
        }
    }
}

fn emit_ribbons(ctx: &mut CompileContext<'_>, u: GroupUniforms, runs: &[(Vec<Vec3>, Ribbon)]) -> Emit {
    let idx = ctx.groups.get_or_create(u);
    let Some((vertices, indices)) = ctx.groups.get_mut(idx).and_then(|g| g.buffers::<LineVertex>())
    else {
        return Emit::Skipped(SkipReason::Degenerate);
    };
    let mut emitted = false;
    for (points, ribbon) in runs {
        emitted |= emit_line(vertices, indices, points, ribbon);
    }
    if emitted {
        Emit::Emitted
    } else {
        Emit::Skipped(SkipReason::Degenerate)
    }
}

/// Split a ring into drawable runs. Returns `(points, closed)` pairs; a ring
/// without border edges stays one closed run.
fn outline_runs(tile: &Tile, ring: &[Vec3]) -> Vec<(Vec<Vec3>, bool)> {
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }
    let hidden: Vec<bool> = (0..n)
        .map(|i| {
            let (a, b) = (ring[i].truncate(), ring[(i + 1) % n].truncate());
            tile.clipped
                && tile.on_border(a)
                && tile.on_border(b)
                && ((a.x - b.x).abs() < 0.5 || (a.y - b.y).abs() < 0.5)
        })
        .collect();
    let Some(first_hidden) = hidden.iter().position(|&h| h) else {
        return vec![(ring.to_vec(), true)];
    };

    let mut runs = Vec::new();
    let mut current: Vec<Vec3> = Vec::new();
    for k in 1..=n {
        let i = (first_hidden + k) % n;
        if hidden[i] {
            if current.len() >= 2 {
                runs.push((std::mem::take(&mut current), false));
            }
            current.clear();
            continue;
        }
        if current.is_empty() {
            current.push(ring[i]);
        }
        current.push(ring[(i + 1) % n]);
    }
    if current.len() >= 2 {
        runs.push((current, false));
    }
    runs
}

/// Fill, stroke and stroke width of a shape. Stroke width is stored in the
/// group unit.
fn shape_paint(
    r: &StyleValueResolver<'_>,
    u: &mut GroupUniforms,
    paint: Paint,
    pixels_per_meter: f64,
) -> Result<(), Emit> {
    u.fill = r.color("fill");
    u.stroke = r.color("stroke");
    let missing = match paint {
        Paint::Optional => false,
        Paint::Fill => u.fill.is_none(),
        Paint::Stroke => u.stroke.is_none(),
        Paint::FillOrStroke => u.fill.is_none() && u.stroke.is_none(),
    };
    if missing {
        return Err(Emit::Skipped(SkipReason::MissingPaint));
    }
    if u.stroke.is_some() {
        let width = r.size("strokeWidth").unwrap_or(Size::px(1.0));
        u.stroke_width = in_unit(width, u.unit, pixels_per_meter);
    }
    Ok(())
}

/// Box of a centered shape with half extents `half` (group units), in pixels.
fn shape_bounds(u: &GroupUniforms, half: Vec2, pixels_per_meter: f64) -> [f32; 4] {
    let halo = if u.stroke.is_some() { u.stroke_width * 0.5 } else { 0.0 };
    let size = (half + Vec2::splat(halo)) * 2.0 * unit_scale(u.unit, pixels_per_meter);
    icon_bounds(size, Vec2::from(u.offset))
}

fn resolve_shape(
    ctx: &mut CompileContext<'_>,
    r: &StyleValueResolver<'_>,
    kind: PrimitiveKind,
    u: &mut GroupUniforms,
) -> Result<(Shape, [f32; 4]), Emit> {
    let ppm = ctx.tile.pixels_per_meter();
    let offset = style_offset(r);
    match kind {
        PrimitiveKind::Text => {
            let text = r
                .string("text")
                .filter(|t| !t.trim().is_empty())
                .ok_or(Emit::Skipped(SkipReason::Degenerate))?;
            let font = r.string("fontFamily").unwrap_or_else(|| DEFAULT_FONT.to_string());
            let style = TextStyle {
                font: &font,
                size: r.pixels("fontSize", ppm).unwrap_or(DEFAULT_FONT_SIZE),
                wrap_width: r.pixels("lineWrap", ppm).filter(|w| *w > 0.0),
                anchor: r
                    .string("textAnchor")
                    .as_deref()
                    .and_then(TextAnchor::parse)
                    .unwrap_or_default(),
            };
            let layout = layout_text(&mut ctx.session.glyphs, &text, &style)
                .ok_or(Emit::Skipped(SkipReason::Degenerate))?;
            u.fill = Some(r.color("fill").unwrap_or(BLACK));
            let halo = match r.color("stroke") {
                Some(stroke) => {
                    u.stroke = Some(stroke);
                    u.stroke_width = r.pixels("strokeWidth", ppm).unwrap_or(1.0);
                    u.stroke_width
                }
                None => 0.0,
            };
            u.font = Some(font);
            let [x0, y0, x1, y1] = layout.bounds;
            let bounds = [
                x0 + offset.x - halo,
                y0 + offset.y - halo,
                x1 + offset.x + halo,
                y1 + offset.y + halo,
            ];
            Ok((Shape::Text { layout, offset }, bounds))
        }
        PrimitiveKind::Icon => {
            let name = r
                .string("image")
                .ok_or(Emit::Skipped(SkipReason::MissingPaint))?;
            let region = ready(ctx.session.image(&name), &name)?;
            let natural = Vec2::new(region.width as f32, region.height as f32);
            let size = match (r.pixels("width", ppm), r.pixels("height", ppm)) {
                (Some(w), Some(h)) => Vec2::new(w, h),
                (Some(w), None) => Vec2::new(w, w * natural.y / natural.x.max(1.0)),
                (None, Some(h)) => Vec2::new(h * natural.x / natural.y.max(1.0), h),
                (None, None) => natural,
            };
            Ok((Shape::Icon { region, size, offset }, icon_bounds(size, offset)))
        }
        PrimitiveKind::Circle | PrimitiveKind::Sphere | PrimitiveKind::Heatmap => {
            let default = if kind == PrimitiveKind::Heatmap {
                DEFAULT_HEATMAP_RADIUS
            } else {
                DEFAULT_RADIUS
            };
            let radius = r.size("radius").unwrap_or(Size::px(default));
            u.unit = radius.unit;
            u.offset = offset.to_array();
            let weight = match kind {
                PrimitiveKind::Circle => {
                    shape_paint(r, u, Paint::FillOrStroke, ppm)?;
                    1.0
                }
                PrimitiveKind::Sphere => {
                    shape_paint(r, u, Paint::Fill, ppm)?;
                    1.0
                }
                _ => {
                    shape_paint(r, u, Paint::Optional, ppm)?;
                    u.intensity = r.number_or("intensity", 1.0) as f32;
                    r.number_or("weight", 1.0) as f32
                }
            };
            let half = Vec2::splat(radius.value);
            let bounds = shape_bounds(u, half, ppm);
            Ok((Shape::Quad { half, weight }, bounds))
        }
        PrimitiveKind::Rect | PrimitiveKind::Box => {
            let width = r.size("width").unwrap_or(Size::px(DEFAULT_RECT_SIZE));
            u.unit = width.unit;
            u.offset = offset.to_array();
            let measure = |name: &str| {
                r.size(name)
                    .map_or(width.value, |s| in_unit(s, width.unit, ppm))
            };
            if kind == PrimitiveKind::Rect {
                shape_paint(r, u, Paint::FillOrStroke, ppm)?;
                let half = Vec2::new(width.value, measure("height")) * 0.5;
                let bounds = shape_bounds(u, half, ppm);
                Ok((Shape::Quad { half, weight: 1.0 }, bounds))
            } else {
                shape_paint(r, u, Paint::Fill, ppm)?;
                let half = Vec2::new(width.value, measure("depth")) * 0.5;
                let height = measure("height");
                let bounds = shape_bounds(u, half, ppm);
                Ok((Shape::Box { half, height }, bounds))
            }
        }
        PrimitiveKind::VerticalLine => {
            let height = r
                .size("height")
                .unwrap_or(Size::meters(DEFAULT_POLE_HEIGHT));
            u.unit = height.unit;
            shape_paint(r, u, Paint::Stroke, ppm)?;
            Ok((Shape::VerticalLine { height: height.value }, [0.0; 4]))
        }
        PrimitiveKind::Model => {
            let name = r
                .string("model")
                .ok_or(Emit::Skipped(SkipReason::MissingPaint))?;
            let model = ready(ctx.session.model(&name), &name)?;
            let scale = r.number_or("scale", 1.0) as f32;
            let rotation = u.rotation.to_radians();
            u.rotation = 0.0;
            u.unit = Unit::Meter;
            u.offset = offset.to_array();
            u.model = Some((name, model));
            let half = Vec2::splat(model.info.radius * scale);
            let bounds = shape_bounds(u, half, ppm);
            Ok((Shape::Model { rotation, scale }, bounds))
        }
        PrimitiveKind::Line | PrimitiveKind::Polygon | PrimitiveKind::Extrude => {
            Err(Emit::Skipped(SkipReason::Unsupported))
        }
    }
}

fn emit_shape(group: &mut DrawGroup, shape: &Shape, anchors: &[Anchor]) -> bool {
    match shape {
        Shape::Text { layout, offset } => {
            let Some((vertices, indices)) = group.buffers::<GlyphVertex>() else {
                return false;
            };
            for anchor in anchors {
                emit_text(vertices, indices, anchor, layout, *offset);
            }
        }
        Shape::Icon { region, size, offset } => {
            let Some((vertices, indices)) = group.buffers::<GlyphVertex>() else {
                return false;
            };
            for anchor in anchors {
                emit_icon(vertices, indices, anchor, region, *size, *offset);
            }
        }
        Shape::Quad { half, weight } => {
            let Some((vertices, indices)) = group.buffers::<PointVertex>() else {
                return false;
            };
            for anchor in anchors {
                emit_quad(vertices, indices, anchor, *half, *weight);
            }
        }
        Shape::Box { half, height } => {
            let Some((vertices, indices)) = group.buffers::<ShapeVertex>() else {
                return false;
            };
            for anchor in anchors {
                emit_box(vertices, indices, anchor, *half, *height);
            }
        }
        Shape::VerticalLine { height } => {
            let Some((vertices, indices)) = group.buffers::<FillVertex>() else {
                return false;
            };
            for anchor in anchors {
                emit_vertical_line(vertices, indices, anchor, *height);
            }
        }
        Shape::Model { rotation, scale } => {
            let Some(instances) = ModelInstance::buffer(&mut group.vertices) else {
                return false;
            };
            for anchor in anchors {
                emit_model(instances, anchor, *rotation, *scale);
            }
        }
    }
    true
}
