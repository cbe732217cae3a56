//! Render session: the shared atlases and registries of one map instance.
//!
//! A session is passed by reference into every compile task. Atlases are
//! append-only, so buffers compiled earlier keep valid texture coordinates
//! while later tiles grow them. Independent sessions never share state.

use crate::config::CompileConfig;
use crate::core::atlas::{AtlasRegion, DashAtlas, ImageAtlas};
use crate::core::resource::{
    LoadState, ResourceHandle, ResourceKind, ResourceRequest, ResourceStatus, ResourceTracker,
};
use crate::labels::atlas::{GlyphAtlas, GlyphRasterizer};
use std::collections::BTreeMap;

/// Metadata of a loaded 3-D model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInfo {
    pub vertex_count: u32,
    /// Bounding sphere radius in model units.
    pub radius: f32,
}

/// Reference to a registered model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRef {
    pub id: u32,
    pub info: ModelInfo,
}

/// Models delivered by the host, keyed by source name.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelRef>,
}

impl ModelRegistry {
    pub fn get(&self, name: &str) -> Option<ModelRef> {
        self.models.get(name).copied()
    }

    pub fn register(&mut self, name: &str, info: ModelInfo) -> ModelRef {
        let id = self.models.len() as u32;
        *self
            .models
            .entry(name.to_string())
            .or_insert(ModelRef { id, info })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Shared resources of one map instance.
#[derive(Debug)]
pub struct RenderSession {
    pub glyphs: GlyphAtlas,
    pub dashes: DashAtlas,
    pub images: ImageAtlas,
    pub models: ModelRegistry,
    resources: ResourceTracker,
}

fn atlas_key(kind: ResourceKind, name: &str) -> String {
    match kind {
        ResourceKind::DashImage => format!("dash:{name}"),
        _ => name.to_string(),
    }
}

impl RenderSession {
    pub fn new(config: &CompileConfig) -> Self {
        Self {
            glyphs: GlyphAtlas::default(),
            dashes: DashAtlas::new(),
            images: ImageAtlas::new(),
            models: ModelRegistry::default(),
            resources: ResourceTracker::new(config.max_resource_retries),
        }
    }

    pub fn with_rasterizer(config: &CompileConfig, rasterizer: Box<dyn GlyphRasterizer + Send>) -> Self {
        Self {
            glyphs: GlyphAtlas::new(rasterizer),
            ..Self::new(config)
        }
    }

    fn status<T>(&mut self, kind: ResourceKind, name: &str, ready: Option<T>) -> ResourceStatus<T> {
        if let Some(value) = ready {
            return ResourceStatus::Ready(value);
        }
        let handle = self.resources.request(kind, name);
        match self.resources.state(handle) {
            Some(LoadState::Failed(reason)) => ResourceStatus::Skipped(reason.clone()),
            Some(LoadState::Loaded) => {
                ResourceStatus::Skipped(format!("{} '{}' was not stored", kind.as_str(), name))
            }
            _ => ResourceStatus::Pending(handle),
        }
    }

    /// Icon image region, requesting the image on first use.
    pub fn image(&mut self, name: &str) -> ResourceStatus<AtlasRegion> {
        let ready = self.images.region(&atlas_key(ResourceKind::Image, name));
        self.status(ResourceKind::Image, name, ready)
    }

    /// Dash image region, requesting the image on first use.
    pub fn dash_image(&mut self, name: &str) -> ResourceStatus<AtlasRegion> {
        let ready = self.images.region(&atlas_key(ResourceKind::DashImage, name));
        self.status(ResourceKind::DashImage, name, ready)
    }

    pub fn model(&mut self, name: &str) -> ResourceStatus<ModelRef> {
        let ready = self.models.get(name);
        self.status(ResourceKind::Model, name, ready)
    }

    /// Deliver an RGBA8 image for an image or dash-image request. An image
    /// that does not fit the atlas counts as a failed load.
    pub fn provide_image(
        &mut self,
        handle: ResourceHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Option<AtlasRegion> {
        let kind = self.resources.kind(handle)?;
        let name = self.resources.name(handle)?.to_string();
        if kind == ResourceKind::Model {
            return None;
        }
        match self.images.insert(&atlas_key(kind, &name), width, height, rgba) {
            Some(region) => {
                self.resources.mark_loaded(handle);
                Some(region)
            }
            None => {
                self.resources
                    .mark_failed(handle, &format!("{width}x{height} image rejected by atlas"));
                None
            }
        }
    }

    pub fn provide_model(&mut self, handle: ResourceHandle, info: ModelInfo) -> Option<ModelRef> {
        if self.resources.kind(handle)? != ResourceKind::Model {
            return None;
        }
        let name = self.resources.name(handle)?.to_string();
        let model = self.models.register(&name, info);
        self.resources.mark_loaded(handle);
        Some(model)
    }

    /// Report a failed load. Returns true once the resource is skipped for
    /// good; otherwise a retry request is queued.
    pub fn fail_resource(&mut self, handle: ResourceHandle, reason: &str) -> bool {
        self.resources.mark_failed(handle, reason)
    }

    pub fn is_settled(&self, handle: ResourceHandle) -> bool {
        self.resources.is_settled(handle)
    }

    /// Loads the host still has to perform.
    pub fn take_requests(&mut self) -> Vec<ResourceRequest> {
        self.resources.take_requests()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RenderSession {
        RenderSession::new(&CompileConfig::default())
    }

    #[test]
    fn test_image_pending_then_ready() {
        let mut session = session();
        let ResourceStatus::Pending(handle) = session.image("pin") else {
            panic!("expected pending");
        };
        let requests = session.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "pin");

        let rgba = vec![255u8; 4 * 4 * 4];
        let region = session.provide_image(handle, 4, 4, &rgba).unwrap();
        assert!(session.is_settled(handle));
        assert_eq!(session.image("pin"), ResourceStatus::Ready(region));
        assert!(matches!(session.dash_image("pin"), ResourceStatus::Pending(_)));
    }

    #[test]
    fn test_failed_image_is_skipped_after_retries() {
        let config = CompileConfig {
            max_resource_retries: 2,
            ..CompileConfig::default()
        };
        let mut session = RenderSession::new(&config);
        let ResourceStatus::Pending(handle) = session.image("missing") else {
            panic!("expected pending");
        };
        assert!(!session.fail_resource(handle, "404"));
        assert!(matches!(session.image("missing"), ResourceStatus::Pending(_)));
        assert!(session.fail_resource(handle, "404"));
        assert_eq!(session.image("missing"), ResourceStatus::Skipped("404".to_string()));
    }

    #[test]
    fn test_models_register_once() {
        let mut session = session();
        let ResourceStatus::Pending(handle) = session.model("tree.glb") else {
            panic!("expected pending");
        };
        let info = ModelInfo {
            vertex_count: 120,
            radius: 2.0,
        };
        let model = session.provide_model(handle, info).unwrap();
        assert_eq!(session.model("tree.glb"), ResourceStatus::Ready(model));
        assert_eq!(session.models.len(), 1);
    }
}
