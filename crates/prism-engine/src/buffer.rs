use serde::{Deserialize, Serialize};

/// Marker type for vertex buffer handles.
#[derive(Debug)]
pub enum VertexBuffer {}

/// Marker type for index buffer handles.
#[derive(Debug)]
pub enum IndexBuffer {}

/// Semantic of a vertex buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexAttribute {
    Position,
    Normal,
    Tangent,
    Color,
    Uv0,
    Uv1,
    BoneIndices,
    BoneWeights,
}

/// Element layout of a vertex buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Float2,
    Float3,
    Float4,
    UShort4,
}

impl AttributeType {
    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            AttributeType::Float2 => 8,
            AttributeType::Float3 => 12,
            AttributeType::Float4 => 16,
            AttributeType::UShort4 => 8,
        }
    }
}

impl VertexAttribute {
    /// The layout the loader stores this attribute in.
    pub fn default_type(self) -> AttributeType {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => AttributeType::Float3,
            VertexAttribute::Tangent | VertexAttribute::Color | VertexAttribute::BoneWeights => {
                AttributeType::Float4
            }
            VertexAttribute::Uv0 | VertexAttribute::Uv1 => AttributeType::Float2,
            VertexAttribute::BoneIndices => AttributeType::UShort4,
        }
    }
}

/// Vertex buffer layout: one non-interleaved slot per attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexBufferDesc {
    pub vertex_count: u32,
    pub attributes: Vec<(VertexAttribute, AttributeType)>,
}

impl VertexBufferDesc {
    pub fn attribute_type(&self, attribute: VertexAttribute) -> Option<AttributeType> {
        self.attributes
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, ty)| *ty)
    }

    /// Expected byte length of one attribute slot.
    pub fn slot_size(&self, attribute: VertexAttribute) -> Option<usize> {
        self.attribute_type(attribute)
            .map(|ty| ty.size() * self.vertex_count as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBufferDesc {
    pub index_count: u32,
    pub index_type: IndexType,
}

impl IndexBufferDesc {
    pub fn byte_len(&self) -> usize {
        self.index_type.size() * self.index_count as usize
    }
}
