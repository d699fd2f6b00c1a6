//! Prism ECS - Entity and component storage
//!
//! Generational entity handles and per-type packed component columns. The
//! engine attaches transforms, renderables and lights to entities created
//! here.

mod component;
mod entity;
mod world;

pub use component::Component;
pub use entity::Entity;
pub use world::World;
