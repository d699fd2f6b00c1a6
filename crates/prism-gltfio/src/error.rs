use std::path::PathBuf;

use prism_engine::{EngineError, VertexAttribute};

/// Errors that can occur while creating an asset or loading its resources.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("glTF content is empty")]
    Empty,

    #[error("content is a GLB container; use create_asset_from_binary")]
    UnexpectedGlb,

    #[error("content is not a GLB container (missing 'glTF' magic)")]
    NotGlb,

    #[error("failed to parse glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("scene {0} does not exist")]
    MissingScene(usize),

    #[error("node hierarchy contains a cycle through node {0}")]
    CyclicHierarchy(usize),

    #[error("node {0} has more than one parent")]
    SharedNode(usize),

    #[error("mesh {mesh} primitive {primitive} uses an accessor with no elements")]
    EmptyAccessor { mesh: usize, primitive: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("asset source data has been released")]
    SourceReleased,

    #[error("buffer {0} refers to the GLB binary chunk, which is missing")]
    MissingBlob(usize),

    #[error("buffer {index} holds {actual} bytes, expected at least {expected}")]
    BufferTooShort {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported data URI: {0}")]
    UnsupportedDataUri(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("external resource '{0}' cannot be resolved without a base path")]
    NoBasePath(String),

    #[error("I/O error loading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to decode image {0}: {1}")]
    ImageDecode(usize, #[source] image::ImageError),

    #[error("mesh {mesh} primitive {primitive} has no readable {attribute:?} data")]
    MissingAccessorData {
        mesh: usize,
        primitive: usize,
        attribute: VertexAttribute,
    },

    #[error("mesh {mesh} primitive {primitive} has no readable index data")]
    MissingIndexData { mesh: usize, primitive: usize },
}
