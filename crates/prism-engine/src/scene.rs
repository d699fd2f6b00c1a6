//! Components the engine attaches to entities.

use prism_core::{Aabb, Color, Mat4};
use prism_ecs::Entity;
use serde::{Deserialize, Serialize};

use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::handle::Handle;
use crate::material::MaterialInstance;

/// Local transform plus an optional parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    pub local: Mat4,
    pub parent: Option<Entity>,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            local: Mat4::IDENTITY,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// One draw call of a renderable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPrimitive {
    pub topology: PrimitiveType,
    pub vertex_buffer: Handle<VertexBuffer>,
    pub index_buffer: Option<Handle<IndexBuffer>>,
    pub material_instance: Handle<MaterialInstance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinBinding {
    pub bone_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    /// Object-space bounds used for culling.
    pub aabb: Aabb,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub primitives: Vec<RenderPrimitive>,
    pub skin: Option<SkinBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    /// Cone angles in radians.
    Spot { inner_cone: f32, outer_cone: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    /// Distance at which the light stops contributing; `None` means infinite.
    pub falloff: Option<f32>,
    pub cast_shadows: bool,
}
