//! Finalization of a compile pass into immutable GPU-ready groups.
//!
//! No device is touched here. Each group carries its byte buffers, a
//! renderer state record in `wgpu` descriptor types and the unit scale the
//! shader needs to bring meter-sized values into tile pixels.

use crate::geo::{FeatureId, Tile, TileKey};
use crate::pipeline::stats::CompileStats;
use crate::style::{PrimitiveKind, Unit};
use crate::vector::data::VertexData;
use crate::vector::group::{feature_at, DrawGroup, IdOffset};
use crate::vector::layer::{sort_by_draw_order, DrawOrder};
use crate::vector::signature::GroupUniforms;
use wgpu::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, CompareFunction, PrimitiveTopology,
    VertexBufferLayout, VertexStepMode,
};

const ADDITIVE: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};

/// Pipeline state a renderer needs to draw one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// `None` draws opaque.
    pub blend: Option<BlendState>,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub topology: PrimitiveTopology,
    /// One instance per vertex buffer entry (models).
    pub instanced: bool,
}

impl RenderState {
    pub fn for_uniforms(uniforms: &GroupUniforms) -> Self {
        let translucent = uniforms.opacity < 1.0
            || uniforms.fill.is_some_and(|c| c[3] < 1.0)
            || uniforms.stroke.is_some_and(|c| c[3] < 1.0);
        let blend = match uniforms.kind {
            PrimitiveKind::Heatmap => Some(ADDITIVE),
            // Antialiased edges
            PrimitiveKind::Text | PrimitiveKind::Icon | PrimitiveKind::Circle => {
                Some(BlendState::ALPHA_BLENDING)
            }
            _ if translucent => Some(BlendState::ALPHA_BLENDING),
            _ => None,
        };
        Self {
            blend,
            depth_write: uniforms.depth_test && blend.is_none(),
            depth_compare: if uniforms.depth_test {
                CompareFunction::LessEqual
            } else {
                CompareFunction::Always
            },
            topology: match uniforms.kind {
                PrimitiveKind::VerticalLine => PrimitiveTopology::LineList,
                _ => PrimitiveTopology::TriangleList,
            },
            instanced: uniforms.kind == PrimitiveKind::Model,
        }
    }
}

/// Session textures a group samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedTexture {
    Glyphs,
    Images,
    Dashes,
}

fn shared_textures(uniforms: &GroupUniforms) -> Vec<SharedTexture> {
    let mut textures = Vec::new();
    match uniforms.kind {
        PrimitiveKind::Text => textures.push(SharedTexture::Glyphs),
        PrimitiveKind::Icon => textures.push(SharedTexture::Images),
        _ => {}
    }
    if uniforms.dash.is_some() {
        textures.push(SharedTexture::Dashes);
    }
    if uniforms.dash_image.is_some() {
        textures.push(SharedTexture::Images);
    }
    textures
}

/// One finished draw group.
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    pub kind: PrimitiveKind,
    pub signature: String,
    pub uniforms: GroupUniforms,
    pub state: RenderState,
    /// Tile pixels per group unit.
    pub unit_scale: f32,
    pub textures: Vec<SharedTexture>,
    pub vertices: VertexData,
    pub indices: Vec<u32>,
    pub id_offsets: Vec<IdOffset>,
    pub order: DrawOrder,
}

impl CompiledGroup {
    fn new(group: DrawGroup, tile: &Tile) -> Self {
        let order = group.draw_order();
        let uniforms = group.uniforms;
        let unit_scale = match uniforms.unit {
            Unit::Pixel => 1.0,
            Unit::Meter => tile.pixels_per_meter() as f32,
        };
        Self {
            kind: uniforms.kind,
            signature: group.signature,
            state: RenderState::for_uniforms(&uniforms),
            textures: shared_textures(&uniforms),
            uniforms,
            unit_scale,
            vertices: group.vertices,
            indices: group.indices,
            id_offsets: group.id_offsets,
            order,
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        self.vertices.as_bytes()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_layout(&self) -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: self.vertices.stride() as u64,
            step_mode: if self.state.instanced {
                VertexStepMode::Instance
            } else {
                VertexStepMode::Vertex
            },
            attributes: self.vertices.attributes(),
        }
    }

    /// Indices drawn, or instances for models.
    pub fn element_count(&self) -> u32 {
        if self.state.instanced {
            self.vertices.len() as u32
        } else {
            self.indices.len() as u32
        }
    }

    /// Feature that produced the element at `element` (hit-testing).
    pub fn feature_at(&self, element: u32) -> Option<&FeatureId> {
        feature_at(&self.id_offsets, element)
    }
}

/// Output of a finished compile pass: groups in draw order.
#[derive(Debug, Clone)]
pub struct CompiledTile {
    pub key: TileKey,
    pub groups: Vec<CompiledGroup>,
    pub stats: CompileStats,
}

impl CompiledTile {
    pub fn group(&self, signature: &str) -> Option<&CompiledGroup> {
        self.groups.iter().find(|g| g.signature == signature)
    }

    pub fn groups_of(&self, kind: PrimitiveKind) -> impl Iterator<Item = &CompiledGroup> {
        self.groups.iter().filter(move |g| g.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Drop empty groups and sort the rest into draw order.
pub fn finalize(tile: &Tile, groups: Vec<DrawGroup>, stats: CompileStats) -> CompiledTile {
    let mut groups: Vec<CompiledGroup> = groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|g| CompiledGroup::new(g, tile))
        .collect();
    sort_by_draw_order(&mut groups, |g| g.order);
    CompiledTile {
        key: tile.key,
        groups,
        stats,
    }
}
