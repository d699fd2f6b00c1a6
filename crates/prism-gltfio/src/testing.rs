//! Small glTF documents shared by the unit tests.

use base64::Engine as _;
use serde_json::{json, Value};

pub(crate) const TRIANGLE_POSITIONS: [[f32; 3]; 3] =
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub(crate) const TRIANGLE_INDICES: [u16; 3] = [0, 1, 2];

/// Positions (36 bytes), indices (6 bytes) and 2 bytes of padding.
pub(crate) fn triangle_bin() -> Vec<u8> {
    let mut bytes = bytemuck::cast_slice::<[f32; 3], u8>(&TRIANGLE_POSITIONS).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&TRIANGLE_INDICES));
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

pub(crate) fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// A red triangle under a translated parent node. Without `buffer_uri` the
/// buffer refers to the GLB binary chunk.
pub(crate) fn triangle_json(buffer_uri: Option<String>) -> Value {
    let mut buffer = json!({ "byteLength": 44 });
    if let Some(uri) = buffer_uri {
        buffer["uri"] = json!(uri);
    }
    json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "parent", "translation": [1.0, 0.0, 0.0], "children": [1] },
            { "name": "triangle", "mesh": 0 }
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "name": "red",
            "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "buffers": [buffer]
    })
}

pub(crate) fn embedded_triangle() -> Value {
    triangle_json(Some(data_uri("application/octet-stream", &triangle_bin())))
}

pub(crate) fn to_bytes(json: &Value) -> Vec<u8> {
    serde_json::to_vec(json).unwrap()
}

pub(crate) fn push(array: &mut Value, value: Value) {
    array.as_array_mut().unwrap().push(value);
}

/// Pack a JSON document and binary chunk into a GLB container.
pub(crate) fn glb(json: &Value, bin: &[u8]) -> Vec<u8> {
    fn padded(mut chunk: Vec<u8>, fill: u8) -> Vec<u8> {
        while chunk.len() % 4 != 0 {
            chunk.push(fill);
        }
        chunk
    }
    let json = padded(to_bytes(json), b' ');
    let bin = padded(bin.to_vec(), 0);
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

/// A solid-color PNG.
pub(crate) fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
