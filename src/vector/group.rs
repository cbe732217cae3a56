//! Draw groups: one vertex/index buffer per batching signature.

use crate::geo::FeatureId;
use crate::style::PrimitiveKind;
use crate::vector::data::{GroupVertex, VertexData};
use crate::vector::layer::DrawOrder;
use crate::vector::signature::GroupUniforms;
use std::collections::HashMap;

/// End of one feature's range in a group's element stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdOffset {
    /// Exclusive end, in indices (instances for models).
    pub end: u32,
    pub id: FeatureId,
}

/// A batching bucket created lazily during a compile pass.
#[derive(Debug, Clone)]
pub struct DrawGroup {
    pub signature: String,
    pub uniforms: GroupUniforms,
    /// Creation order within the pass.
    pub order: usize,
    pub vertices: VertexData,
    pub indices: Vec<u32>,
    pub id_offsets: Vec<IdOffset>,
}

pub(crate) fn empty_vertices(kind: PrimitiveKind) -> VertexData {
    match kind {
        PrimitiveKind::Text | PrimitiveKind::Icon => VertexData::Glyph(Vec::new()),
        PrimitiveKind::Circle
        | PrimitiveKind::Rect
        | PrimitiveKind::Sphere
        | PrimitiveKind::Heatmap => VertexData::Point(Vec::new()),
        PrimitiveKind::Line => VertexData::Line(Vec::new()),
        PrimitiveKind::Polygon | PrimitiveKind::VerticalLine => VertexData::Fill(Vec::new()),
        PrimitiveKind::Extrude => VertexData::Extrude(Vec::new()),
        PrimitiveKind::Box => VertexData::Shape(Vec::new()),
        PrimitiveKind::Model => VertexData::Model(Vec::new()),
    }
}

impl DrawGroup {
    pub fn new(signature: String, uniforms: GroupUniforms, order: usize) -> Self {
        Self {
            signature,
            vertices: empty_vertices(uniforms.kind),
            uniforms,
            order,
            indices: Vec::new(),
            id_offsets: Vec::new(),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.uniforms.kind
    }

    pub fn draw_order(&self) -> DrawOrder {
        DrawOrder {
            z_layer: self.uniforms.z_layer,
            z_index: self.uniforms.z_index,
            order: self.order,
        }
    }

    /// Typed vertex buffer and index buffer. `None` when `T` is not this
    /// group's vertex format.
    pub fn buffers<T: GroupVertex>(&mut self) -> Option<(&mut Vec<T>, &mut Vec<u32>)> {
        let vertices = T::buffer(&mut self.vertices)?;
        Some((vertices, &mut self.indices))
    }

    /// Elements drawn: indices, or instances for models.
    pub fn element_count(&self) -> u32 {
        match &self.vertices {
            VertexData::Model(instances) => instances.len() as u32,
            _ => self.indices.len() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// Close the current feature's range. Consecutive ranges of the same
    /// feature are merged; empty ranges are not recorded.
    pub fn record_feature(&mut self, id: &FeatureId) {
        let end = self.element_count();
        let start = self.id_offsets.last().map_or(0, |o| o.end);
        if end == start {
            return;
        }
        match self.id_offsets.last_mut() {
            Some(last) if last.id == *id => last.end = end,
            _ => self.id_offsets.push(IdOffset {
                end,
                id: id.clone(),
            }),
        }
    }

    /// Feature owning the element at `element` (index or instance position).
    pub fn feature_at(&self, element: u32) -> Option<&FeatureId> {
        feature_at(&self.id_offsets, element)
    }
}

pub fn feature_at(id_offsets: &[IdOffset], element: u32) -> Option<&FeatureId> {
    let idx = id_offsets.partition_point(|o| o.end <= element);
    id_offsets.get(idx).map(|o| &o.id)
}

/// Draw groups of one compile pass, keyed by signature.
#[derive(Debug, Default)]
pub struct DrawGroupTable {
    groups: Vec<DrawGroup>,
    index: HashMap<String, usize>,
}

impl DrawGroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the group for `uniforms`, creating it on first use.
    pub fn get_or_create(&mut self, uniforms: GroupUniforms) -> usize {
        let signature = uniforms.signature();
        if let Some(&idx) = self.index.get(&signature) {
            return idx;
        }
        let idx = self.groups.len();
        self.index.insert(signature.clone(), idx);
        self.groups.push(DrawGroup::new(signature, uniforms, idx));
        idx
    }

    pub fn get(&self, idx: usize) -> Option<&DrawGroup> {
        self.groups.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut DrawGroup> {
        self.groups.get_mut(idx)
    }

    pub fn by_signature(&self, signature: &str) -> Option<&DrawGroup> {
        self.index.get(signature).and_then(|&idx| self.groups.get(idx))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawGroup> {
        self.groups.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DrawGroup> {
        self.groups.iter_mut()
    }

    /// Record the end of `id`'s contribution in every group it touched.
    pub fn record_feature(&mut self, id: &FeatureId) {
        for group in &mut self.groups {
            group.record_feature(id);
        }
    }

    pub fn into_groups(self) -> Vec<DrawGroup> {
        self.groups
    }
}
