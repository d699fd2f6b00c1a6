use std::collections::HashMap;

use prism_core::Aabb;
use prism_engine::{
    Engine, Entity, Handle, IndexBuffer, IndexType, MaterialInstance, Texture, VertexAttribute,
    VertexBuffer,
};
use tracing::warn;

/// A skin of the asset: the entities standing in for its joints.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub name: Option<String>,
    pub joints: Vec<Entity>,
}

/// Links an engine vertex/index buffer pair back to the glTF primitive it
/// was created for, so its data can be uploaded later.
#[derive(Debug, Clone)]
pub(crate) struct PrimitiveBinding {
    pub mesh: usize,
    pub primitive: usize,
    pub vertex_buffer: Handle<VertexBuffer>,
    pub attributes: Vec<VertexAttribute>,
    pub index_buffer: Option<(Handle<IndexBuffer>, IndexType)>,
}

/// A material instance sampler waiting for a glTF texture.
#[derive(Debug, Clone)]
pub(crate) struct TextureBinding {
    pub instance: Handle<MaterialInstance>,
    pub parameter: &'static str,
    pub texture: usize,
}

/// The parsed document kept alive until the resources are loaded.
pub(crate) struct SourceData {
    pub gltf: gltf::Gltf,
    pub primitives: Vec<PrimitiveBinding>,
    pub textures: Vec<TextureBinding>,
    pub textures_loaded: bool,
}

/// A bundle of engine objects created from one glTF document.
///
/// Assets are owned by the caller and must be handed back to
/// [`AssetLoader::destroy_asset`](crate::AssetLoader::destroy_asset) to
/// release their engine objects.
pub struct Asset {
    pub(crate) root: Entity,
    pub(crate) entities: Vec<Entity>,
    pub(crate) renderables: Vec<Entity>,
    pub(crate) lights: Vec<Entity>,
    pub(crate) names: HashMap<Entity, String>,
    pub(crate) vertex_buffers: Vec<Handle<VertexBuffer>>,
    pub(crate) index_buffers: Vec<Handle<IndexBuffer>>,
    pub(crate) material_instances: Vec<Handle<MaterialInstance>>,
    pub(crate) textures: Vec<Handle<Texture>>,
    pub(crate) skins: Vec<Skin>,
    pub(crate) bounding_box: Aabb,
    pub(crate) resource_uris: Vec<String>,
    pub(crate) source: Option<SourceData>,
}

impl Asset {
    pub(crate) fn new(root: Entity) -> Self {
        Self {
            root,
            entities: Vec::new(),
            renderables: Vec::new(),
            lights: Vec::new(),
            names: HashMap::new(),
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
            material_instances: Vec::new(),
            textures: Vec::new(),
            skins: Vec::new(),
            bounding_box: Aabb::EMPTY,
            resource_uris: Vec::new(),
            source: None,
        }
    }

    /// Parent of every scene root. Transforming it moves the whole asset.
    pub fn root(&self) -> Entity {
        self.root
    }

    /// One entity per instantiated node, depth-first, excluding the root.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn renderables(&self) -> &[Entity] {
        &self.renderables
    }

    pub fn lights(&self) -> &[Entity] {
        &self.lights
    }

    pub fn vertex_buffers(&self) -> &[Handle<VertexBuffer>] {
        &self.vertex_buffers
    }

    pub fn index_buffers(&self) -> &[Handle<IndexBuffer>] {
        &self.index_buffers
    }

    pub fn material_instances(&self) -> &[Handle<MaterialInstance>] {
        &self.material_instances
    }

    /// Textures created by the resource loader.
    pub fn textures(&self) -> &[Handle<Texture>] {
        &self.textures
    }

    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    /// World-space bounds of every renderable, relative to the root.
    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    /// External buffer and image URIs, in document order.
    pub fn resource_uris(&self) -> &[String] {
        &self.resource_uris
    }

    /// Name of the node an entity was created for.
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.names.get(&entity).map(String::as_str)
    }

    pub fn first_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.entities
            .iter()
            .copied()
            .find(|e| self.name(*e) == Some(name))
    }

    pub fn has_source_data(&self) -> bool {
        self.source.is_some()
    }

    /// Drop the parsed document and binary chunk. Resources can no longer be
    /// loaded afterwards.
    pub fn release_source_data(&mut self) {
        self.source = None;
    }

    /// Destroy every engine object this asset created.
    pub(crate) fn destroy_objects(&mut self, engine: &dyn Engine) {
        for entity in self.entities.drain(..).rev() {
            engine.destroy_entity(entity);
        }
        engine.destroy_entity(self.root);

        for vb in self.vertex_buffers.drain(..) {
            if let Err(e) = engine.destroy_vertex_buffer(vb) {
                warn!("failed to destroy {vb}: {e}");
            }
        }
        for ib in self.index_buffers.drain(..) {
            if let Err(e) = engine.destroy_index_buffer(ib) {
                warn!("failed to destroy {ib}: {e}");
            }
        }
        for mi in self.material_instances.drain(..) {
            if let Err(e) = engine.destroy_material_instance(mi) {
                warn!("failed to destroy {mi}: {e}");
            }
        }
        for texture in self.textures.drain(..) {
            if let Err(e) = engine.destroy_texture(texture) {
                warn!("failed to destroy {texture}: {e}");
            }
        }
        self.renderables.clear();
        self.lights.clear();
        self.names.clear();
        self.skins.clear();
        self.source = None;
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("root", &self.root)
            .field("entities", &self.entities.len())
            .field("renderables", &self.renderables.len())
            .field("lights", &self.lights.len())
            .field("material_instances", &self.material_instances.len())
            .field("bounding_box", &self.bounding_box)
            .field("has_source_data", &self.has_source_data())
            .finish()
    }
}
