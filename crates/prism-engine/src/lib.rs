//! Prism Engine - Rendering engine object model
//!
//! The asset loader never owns the engine. It talks to it through the
//! [`Engine`] trait and refers to engine objects by typed [`Handle`]s.
//! [`HeadlessEngine`] is an in-memory backend that records every object it
//! is asked to create, for tools and tests.

mod buffer;
mod engine;
mod error;
mod handle;
mod headless;
mod material;
mod scene;
mod texture;

pub use buffer::{
    AttributeType, IndexBuffer, IndexBufferDesc, IndexType, VertexAttribute, VertexBuffer,
    VertexBufferDesc,
};
pub use engine::Engine;
pub use error::EngineError;
pub use handle::Handle;
pub use headless::{EngineStats, HeadlessEngine};
pub use material::{
    BlendingMode, Material, MaterialDesc, MaterialInstance, ParamValue, ParameterDesc,
    ParameterType, SamplerDesc, SamplerFilter, SamplerWrap, Shading,
};
pub use prism_ecs::Entity;
pub use scene::{Light, LightKind, Name, PrimitiveType, RenderPrimitive, Renderable, SkinBinding, TransformComponent};
pub use texture::{Texture, TextureDesc, TextureFormat};
