use serde::{Deserialize, Serialize};

use crate::buffer::VertexAttribute;
use crate::handle::Handle;
use crate::texture::Texture;

/// Marker type for material (shader template) handles.
#[derive(Debug)]
pub enum Material {}

/// Marker type for material instance handles.
#[derive(Debug)]
pub enum MaterialInstance {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shading {
    Lit,
    Unlit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendingMode {
    Opaque,
    /// Alpha-tested against a threshold.
    Masked,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Float,
    Float3,
    Float4,
    Sampler2d,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDesc {
    pub name: String,
    pub ty: ParameterType,
}

impl ParameterDesc {
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Everything needed to build a material: shading model, blending and the
/// parameter schema its instances expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: String,
    pub shading: Shading,
    pub blending: BlendingMode,
    pub double_sided: bool,
    pub parameters: Vec<ParameterDesc>,
    pub required_attributes: Vec<VertexAttribute>,
}

impl MaterialDesc {
    pub fn parameter(&self, name: &str) -> Option<&ParameterDesc> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplerDesc {
    pub wrap_s: SamplerWrap,
    pub wrap_t: SamplerWrap,
    pub mag_filter: SamplerFilter,
    pub min_filter: SamplerFilter,
    pub mipmaps: bool,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            wrap_s: SamplerWrap::Repeat,
            wrap_t: SamplerWrap::Repeat,
            mag_filter: SamplerFilter::Linear,
            min_filter: SamplerFilter::Linear,
            mipmaps: true,
        }
    }
}

/// A value assigned to a material instance parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Texture {
        texture: Handle<Texture>,
        sampler: SamplerDesc,
    },
}

impl ParamValue {
    pub fn ty(&self) -> ParameterType {
        match self {
            ParamValue::Float(_) => ParameterType::Float,
            ParamValue::Float3(_) => ParameterType::Float3,
            ParamValue::Float4(_) => ParameterType::Float4,
            ParamValue::Texture { .. } => ParameterType::Sampler2d,
        }
    }
}
