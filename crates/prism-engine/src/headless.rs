use std::collections::HashMap;

use parking_lot::Mutex;
use prism_core::Mat4;
use prism_ecs::{Entity, World};
use serde::Serialize;
use tracing::debug;

use crate::buffer::{
    IndexBuffer, IndexBufferDesc, VertexAttribute, VertexBuffer, VertexBufferDesc,
};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::handle::Handle;
use crate::material::{Material, MaterialDesc, MaterialInstance, ParamValue, ParameterDesc};
use crate::scene::{Light, Name, Renderable, TransformComponent};
use crate::texture::{Texture, TextureDesc};

/// Object counts of a [`HeadlessEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub entities: usize,
    pub renderables: usize,
    pub lights: usize,
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub materials: usize,
    pub material_instances: usize,
    pub textures: usize,
}

struct VertexBufferObject {
    desc: VertexBufferDesc,
    slots: HashMap<VertexAttribute, Vec<u8>>,
}

struct IndexBufferObject {
    desc: IndexBufferDesc,
    data: Option<Vec<u8>>,
}

struct InstanceObject {
    material: Handle<Material>,
    schema: Vec<ParameterDesc>,
    values: HashMap<String, ParamValue>,
}

struct TextureObject {
    desc: TextureDesc,
    pixels: Option<Vec<u8>>,
}

#[derive(Default)]
struct EngineState {
    world: World,
    next_id: u64,
    vertex_buffers: HashMap<u64, VertexBufferObject>,
    index_buffers: HashMap<u64, IndexBufferObject>,
    materials: HashMap<u64, MaterialDesc>,
    instances: HashMap<u64, InstanceObject>,
    textures: HashMap<u64, TextureObject>,
}

impl EngineState {
    fn mint<T>(&mut self) -> Handle<T> {
        self.next_id += 1;
        Handle::from_raw(self.next_id)
    }

    fn require_alive(&self, entity: Entity) -> Result<(), EngineError> {
        if self.world.is_alive(entity) {
            Ok(())
        } else {
            Err(EngineError::DeadEntity(entity))
        }
    }
}

fn unknown<T>(kind: &'static str, handle: Handle<T>) -> EngineError {
    EngineError::UnknownHandle {
        kind,
        id: handle.id(),
    }
}

/// An engine backend with no GPU: it stores every object in memory so
/// callers can inspect exactly what was created.
#[derive(Default)]
pub struct HeadlessEngine {
    state: Mutex<EngineState>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            entities: state.world.entity_count(),
            renderables: state.world.count::<Renderable>(),
            lights: state.world.count::<Light>(),
            vertex_buffers: state.vertex_buffers.len(),
            index_buffers: state.index_buffers.len(),
            materials: state.materials.len(),
            material_instances: state.instances.len(),
            textures: state.textures.len(),
        }
    }

    pub fn renderable(&self, entity: Entity) -> Option<Renderable> {
        self.state.lock().world.get::<Renderable>(entity).cloned()
    }

    pub fn light(&self, entity: Entity) -> Option<Light> {
        self.state.lock().world.get::<Light>(entity).copied()
    }

    pub fn name(&self, entity: Entity) -> Option<String> {
        self.state
            .lock()
            .world
            .get::<Name>(entity)
            .map(|n| n.0.clone())
    }

    pub fn transform(&self, entity: Entity) -> Option<TransformComponent> {
        self.state
            .lock()
            .world
            .get::<TransformComponent>(entity)
            .copied()
    }

    /// Compose local transforms up the parent chain.
    pub fn world_transform(&self, entity: Entity) -> Option<Mat4> {
        let state = self.state.lock();
        let mut current = *state.world.get::<TransformComponent>(entity)?;
        let mut matrix = current.local;
        // A parent chain longer than the entity count means a cycle.
        let mut budget = state.world.entity_count();
        while let Some(parent) = current.parent {
            if budget == 0 {
                break;
            }
            budget -= 1;
            current = match state.world.get::<TransformComponent>(parent) {
                Some(t) => *t,
                None => break,
            };
            matrix = current.local * matrix;
        }
        Some(matrix)
    }

    /// Entities whose transform names `parent` as their parent.
    pub fn children(&self, parent: Entity) -> Vec<Entity> {
        let state = self.state.lock();
        let mut children: Vec<Entity> = state
            .world
            .iter::<TransformComponent>()
            .filter(|(_, t)| t.parent == Some(parent))
            .map(|(e, _)| e)
            .collect();
        children.sort();
        children
    }

    pub fn vertex_buffer_desc(&self, buffer: Handle<VertexBuffer>) -> Option<VertexBufferDesc> {
        self.state
            .lock()
            .vertex_buffers
            .get(&buffer.id())
            .map(|vb| vb.desc.clone())
    }

    /// Bytes uploaded to one vertex slot, if any.
    pub fn vertex_data(
        &self,
        buffer: Handle<VertexBuffer>,
        attribute: VertexAttribute,
    ) -> Option<Vec<u8>> {
        self.state
            .lock()
            .vertex_buffers
            .get(&buffer.id())?
            .slots
            .get(&attribute)
            .cloned()
    }

    pub fn index_buffer_desc(&self, buffer: Handle<IndexBuffer>) -> Option<IndexBufferDesc> {
        self.state
            .lock()
            .index_buffers
            .get(&buffer.id())
            .map(|ib| ib.desc)
    }

    pub fn index_data(&self, buffer: Handle<IndexBuffer>) -> Option<Vec<u8>> {
        self.state
            .lock()
            .index_buffers
            .get(&buffer.id())?
            .data
            .clone()
    }

    pub fn material_desc(&self, material: Handle<Material>) -> Option<MaterialDesc> {
        self.state.lock().materials.get(&material.id()).cloned()
    }

    pub fn material_exists(&self, material: Handle<Material>) -> bool {
        self.state.lock().materials.contains_key(&material.id())
    }

    pub fn material_instance_exists(&self, instance: Handle<MaterialInstance>) -> bool {
        self.state.lock().instances.contains_key(&instance.id())
    }

    /// The material an instance was created from.
    pub fn material_of(&self, instance: Handle<MaterialInstance>) -> Option<Handle<Material>> {
        self.state
            .lock()
            .instances
            .get(&instance.id())
            .map(|mi| mi.material)
    }

    pub fn parameter(&self, instance: Handle<MaterialInstance>, name: &str) -> Option<ParamValue> {
        self.state
            .lock()
            .instances
            .get(&instance.id())?
            .values
            .get(name)
            .copied()
    }

    pub fn texture_desc(&self, texture: Handle<Texture>) -> Option<TextureDesc> {
        self.state
            .lock()
            .textures
            .get(&texture.id())
            .map(|t| t.desc.clone())
    }

    pub fn texture_data(&self, texture: Handle<Texture>) -> Option<Vec<u8>> {
        self.state
            .lock()
            .textures
            .get(&texture.id())?
            .pixels
            .clone()
    }
}

impl Engine for HeadlessEngine {
    fn create_entity(&self) -> Entity {
        self.state.lock().world.spawn()
    }

    fn destroy_entity(&self, entity: Entity) -> bool {
        self.state.lock().world.despawn(entity)
    }

    fn is_alive(&self, entity: Entity) -> bool {
        self.state.lock().world.is_alive(entity)
    }

    fn set_transform(
        &self,
        entity: Entity,
        local: Mat4,
        parent: Option<Entity>,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.require_alive(entity)?;
        if let Some(parent) = parent {
            state.require_alive(parent)?;
        }
        state
            .world
            .insert(entity, TransformComponent { local, parent });
        Ok(())
    }

    fn set_name(&self, entity: Entity, name: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.require_alive(entity)?;
        state.world.insert(entity, Name(name.to_string()));
        Ok(())
    }

    fn set_renderable(&self, entity: Entity, renderable: Renderable) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.require_alive(entity)?;
        for primitive in &renderable.primitives {
            if !state
                .vertex_buffers
                .contains_key(&primitive.vertex_buffer.id())
            {
                return Err(unknown("vertex buffer", primitive.vertex_buffer));
            }
            if let Some(ib) = primitive.index_buffer {
                if !state.index_buffers.contains_key(&ib.id()) {
                    return Err(unknown("index buffer", ib));
                }
            }
            if !state
                .instances
                .contains_key(&primitive.material_instance.id())
            {
                return Err(unknown("material instance", primitive.material_instance));
            }
        }
        state.world.insert(entity, renderable);
        Ok(())
    }

    fn set_light(&self, entity: Entity, light: Light) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.require_alive(entity)?;
        state.world.insert(entity, light);
        Ok(())
    }

    fn create_vertex_buffer(&self, desc: VertexBufferDesc) -> Handle<VertexBuffer> {
        let mut state = self.state.lock();
        let handle = state.mint();
        debug!(
            "vertex buffer {handle}: {} vertices, {} slots",
            desc.vertex_count,
            desc.attributes.len()
        );
        state.vertex_buffers.insert(
            handle.id(),
            VertexBufferObject {
                desc,
                slots: HashMap::new(),
            },
        );
        handle
    }

    fn upload_vertex_attribute(
        &self,
        buffer: Handle<VertexBuffer>,
        attribute: VertexAttribute,
        bytes: &[u8],
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let vb = state
            .vertex_buffers
            .get_mut(&buffer.id())
            .ok_or_else(|| unknown("vertex buffer", buffer))?;
        let expected = vb
            .desc
            .slot_size(attribute)
            .ok_or(EngineError::MissingAttribute {
                buffer: buffer.id(),
                attribute,
            })?;
        if expected != bytes.len() {
            return Err(EngineError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        vb.slots.insert(attribute, bytes.to_vec());
        Ok(())
    }

    fn destroy_vertex_buffer(&self, buffer: Handle<VertexBuffer>) -> Result<(), EngineError> {
        self.state
            .lock()
            .vertex_buffers
            .remove(&buffer.id())
            .map(|_| ())
            .ok_or_else(|| unknown("vertex buffer", buffer))
    }

    fn create_index_buffer(&self, desc: IndexBufferDesc) -> Handle<IndexBuffer> {
        let mut state = self.state.lock();
        let handle = state.mint();
        state
            .index_buffers
            .insert(handle.id(), IndexBufferObject { desc, data: None });
        handle
    }

    fn upload_indices(
        &self,
        buffer: Handle<IndexBuffer>,
        bytes: &[u8],
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let ib = state
            .index_buffers
            .get_mut(&buffer.id())
            .ok_or_else(|| unknown("index buffer", buffer))?;
        let expected = ib.desc.byte_len();
        if expected != bytes.len() {
            return Err(EngineError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        ib.data = Some(bytes.to_vec());
        Ok(())
    }

    fn destroy_index_buffer(&self, buffer: Handle<IndexBuffer>) -> Result<(), EngineError> {
        self.state
            .lock()
            .index_buffers
            .remove(&buffer.id())
            .map(|_| ())
            .ok_or_else(|| unknown("index buffer", buffer))
    }

    fn create_material(&self, desc: MaterialDesc) -> Handle<Material> {
        let mut state = self.state.lock();
        let handle = state.mint();
        debug!("material {handle}: '{}'", desc.name);
        state.materials.insert(handle.id(), desc);
        handle
    }

    fn destroy_material(&self, material: Handle<Material>) -> Result<(), EngineError> {
        self.state
            .lock()
            .materials
            .remove(&material.id())
            .map(|_| ())
            .ok_or_else(|| unknown("material", material))
    }

    fn create_material_instance(
        &self,
        material: Handle<Material>,
    ) -> Result<Handle<MaterialInstance>, EngineError> {
        let mut state = self.state.lock();
        let schema = state
            .materials
            .get(&material.id())
            .ok_or_else(|| unknown("material", material))?
            .parameters
            .clone();
        let handle = state.mint();
        state.instances.insert(
            handle.id(),
            InstanceObject {
                material,
                schema,
                values: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn set_parameter(
        &self,
        instance: Handle<MaterialInstance>,
        name: &str,
        value: ParamValue,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let mi = state
            .instances
            .get_mut(&instance.id())
            .ok_or_else(|| unknown("material instance", instance))?;
        let param = mi
            .schema
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))?;
        if param.ty != value.ty() {
            return Err(EngineError::ParameterType {
                name: name.to_string(),
                expected: param.ty,
                actual: value.ty(),
            });
        }
        mi.values.insert(name.to_string(), value);
        Ok(())
    }

    fn destroy_material_instance(
        &self,
        instance: Handle<MaterialInstance>,
    ) -> Result<(), EngineError> {
        self.state
            .lock()
            .instances
            .remove(&instance.id())
            .map(|_| ())
            .ok_or_else(|| unknown("material instance", instance))
    }

    fn create_texture(&self, desc: TextureDesc) -> Handle<Texture> {
        let mut state = self.state.lock();
        let handle = state.mint();
        state
            .textures
            .insert(handle.id(), TextureObject { desc, pixels: None });
        handle
    }

    fn upload_texture(&self, texture: Handle<Texture>, pixels: &[u8]) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let tex = state
            .textures
            .get_mut(&texture.id())
            .ok_or_else(|| unknown("texture", texture))?;
        let expected = tex.desc.byte_len();
        if expected != pixels.len() {
            return Err(EngineError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        tex.pixels = Some(pixels.to_vec());
        Ok(())
    }

    fn destroy_texture(&self, texture: Handle<Texture>) -> Result<(), EngineError> {
        self.state
            .lock()
            .textures
            .remove(&texture.id())
            .map(|_| ())
            .ok_or_else(|| unknown("texture", texture))
    }
}
