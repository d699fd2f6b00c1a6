use prism_ecs::Entity;

use crate::buffer::VertexAttribute;
use crate::material::ParameterType;

/// Errors reported by an engine backend.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("unknown {kind} handle #{id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    #[error("vertex buffer #{buffer} has no {attribute:?} slot")]
    MissingAttribute {
        buffer: u64,
        attribute: VertexAttribute,
    },

    #[error("upload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("material has no parameter named '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' expects {expected:?}, got {actual:?}")]
    ParameterType {
        name: String,
        expected: ParameterType,
        actual: ParameterType,
    },
}
