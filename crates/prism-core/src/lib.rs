//! Prism Core - Core types shared across the Prism crates
//!
//! This crate provides the foundational types used throughout the engine:
//! - Mathematical primitives (re-exported from glam)
//! - Transform decomposition for scene nodes
//! - Linear colors and axis-aligned bounding boxes

pub mod bounds;
pub mod types;

pub use bounds::Aabb;
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use types::{Color, Transform};
