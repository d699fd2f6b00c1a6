use prism_core::Mat4;
use prism_ecs::Entity;

use crate::buffer::{IndexBuffer, IndexBufferDesc, VertexAttribute, VertexBuffer, VertexBufferDesc};
use crate::error::EngineError;
use crate::handle::Handle;
use crate::material::{Material, MaterialDesc, MaterialInstance, ParamValue};
use crate::scene::{Light, Renderable};
use crate::texture::{Texture, TextureDesc};

/// The rendering engine as seen by the asset loader.
///
/// Every method takes `&self`; backends are expected to guard their state
/// internally so one engine can be shared by several loaders. Objects are
/// owned by the engine until explicitly destroyed.
pub trait Engine: Send + Sync {
    // ---- Entities and components ----

    fn create_entity(&self) -> Entity;

    /// Destroy an entity together with all of its components.
    fn destroy_entity(&self, entity: Entity) -> bool;

    fn is_alive(&self, entity: Entity) -> bool;

    fn set_transform(
        &self,
        entity: Entity,
        local: Mat4,
        parent: Option<Entity>,
    ) -> Result<(), EngineError>;

    fn set_name(&self, entity: Entity, name: &str) -> Result<(), EngineError>;

    fn set_renderable(&self, entity: Entity, renderable: Renderable) -> Result<(), EngineError>;

    fn set_light(&self, entity: Entity, light: Light) -> Result<(), EngineError>;

    // ---- Geometry ----

    fn create_vertex_buffer(&self, desc: VertexBufferDesc) -> Handle<VertexBuffer>;

    /// Fill one attribute slot. `bytes` must match the slot size exactly.
    fn upload_vertex_attribute(
        &self,
        buffer: Handle<VertexBuffer>,
        attribute: VertexAttribute,
        bytes: &[u8],
    ) -> Result<(), EngineError>;

    fn destroy_vertex_buffer(&self, buffer: Handle<VertexBuffer>) -> Result<(), EngineError>;

    fn create_index_buffer(&self, desc: IndexBufferDesc) -> Handle<IndexBuffer>;

    fn upload_indices(&self, buffer: Handle<IndexBuffer>, bytes: &[u8])
        -> Result<(), EngineError>;

    fn destroy_index_buffer(&self, buffer: Handle<IndexBuffer>) -> Result<(), EngineError>;

    // ---- Materials ----

    fn create_material(&self, desc: MaterialDesc) -> Handle<Material>;

    /// Destroying a material leaves its existing instances usable.
    fn destroy_material(&self, material: Handle<Material>) -> Result<(), EngineError>;

    fn create_material_instance(
        &self,
        material: Handle<Material>,
    ) -> Result<Handle<MaterialInstance>, EngineError>;

    fn set_parameter(
        &self,
        instance: Handle<MaterialInstance>,
        name: &str,
        value: ParamValue,
    ) -> Result<(), EngineError>;

    fn destroy_material_instance(
        &self,
        instance: Handle<MaterialInstance>,
    ) -> Result<(), EngineError>;

    // ---- Textures ----

    fn create_texture(&self, desc: TextureDesc) -> Handle<Texture>;

    fn upload_texture(&self, texture: Handle<Texture>, pixels: &[u8]) -> Result<(), EngineError>;

    fn destroy_texture(&self, texture: Handle<Texture>) -> Result<(), EngineError>;
}
