//! Material templates shared across loads.
//!
//! glTF materials differ mostly in their factors, which live on material
//! instances. The shader template only depends on a handful of features
//! (shading model, blending, culling, vertex colors and which texture slots
//! are used with which UV set); those form the [`MaterialKey`] the cache is
//! keyed by.

use std::collections::HashMap;

use prism_engine::{
    BlendingMode, Engine, EngineError, Handle, Material, MaterialDesc, MaterialInstance,
    ParamValue, ParameterDesc, ParameterType, Shading, VertexAttribute,
};
use tracing::{debug, warn};

pub(crate) const BASE_COLOR_FACTOR: &str = "baseColorFactor";
pub(crate) const METALLIC_FACTOR: &str = "metallicFactor";
pub(crate) const ROUGHNESS_FACTOR: &str = "roughnessFactor";
pub(crate) const NORMAL_SCALE: &str = "normalScale";
pub(crate) const AO_STRENGTH: &str = "aoStrength";
pub(crate) const EMISSIVE_FACTOR: &str = "emissiveFactor";
pub(crate) const MASK_THRESHOLD: &str = "maskThreshold";

pub(crate) const BASE_COLOR_MAP: &str = "baseColorMap";
pub(crate) const METALLIC_ROUGHNESS_MAP: &str = "metallicRoughnessMap";
pub(crate) const NORMAL_MAP: &str = "normalMap";
pub(crate) const OCCLUSION_MAP: &str = "occlusionMap";
pub(crate) const EMISSIVE_MAP: &str = "emissiveMap";

/// Number of UV sets a material template can sample from.
const MAX_UV_SETS: u32 = 2;

/// Features of a glTF material that require a distinct shader template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub unlit: bool,
    pub double_sided: bool,
    pub blending: BlendingMode,
    pub vertex_colors: bool,
    pub base_color_uv: Option<u8>,
    pub metallic_roughness_uv: Option<u8>,
    pub normal_uv: Option<u8>,
    pub occlusion_uv: Option<u8>,
    pub emissive_uv: Option<u8>,
}

fn uv_set(slot: &str, tex_coord: u32) -> Option<u8> {
    if tex_coord < MAX_UV_SETS {
        Some(tex_coord as u8)
    } else {
        warn!("{slot} uses TEXCOORD_{tex_coord}; only {MAX_UV_SETS} UV sets are supported, ignoring texture");
        None
    }
}

impl MaterialKey {
    /// Derive the key of a glTF material as drawn by a primitive with or
    /// without a `COLOR_0` attribute.
    pub fn from_gltf(material: &gltf::Material<'_>, vertex_colors: bool) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let unlit = material.unlit();
        let blending = match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => BlendingMode::Opaque,
            gltf::material::AlphaMode::Mask => BlendingMode::Masked,
            gltf::material::AlphaMode::Blend => BlendingMode::Transparent,
        };

        let base_color_uv = pbr
            .base_color_texture()
            .and_then(|t| uv_set(BASE_COLOR_MAP, t.tex_coord()));
        let emissive_uv = material
            .emissive_texture()
            .and_then(|t| uv_set(EMISSIVE_MAP, t.tex_coord()));

        // Unlit shading ignores the lighting inputs entirely.
        let (metallic_roughness_uv, normal_uv, occlusion_uv) = if unlit {
            (None, None, None)
        } else {
            (
                pbr.metallic_roughness_texture()
                    .and_then(|t| uv_set(METALLIC_ROUGHNESS_MAP, t.tex_coord())),
                material
                    .normal_texture()
                    .and_then(|t| uv_set(NORMAL_MAP, t.tex_coord())),
                material
                    .occlusion_texture()
                    .and_then(|t| uv_set(OCCLUSION_MAP, t.tex_coord())),
            )
        };

        Self {
            unlit,
            double_sided: material.double_sided(),
            blending,
            vertex_colors,
            base_color_uv,
            metallic_roughness_uv,
            normal_uv,
            occlusion_uv,
            emissive_uv,
        }
    }

    fn samplers(&self) -> [(&'static str, Option<u8>); 5] {
        [
            (BASE_COLOR_MAP, self.base_color_uv),
            (METALLIC_ROUGHNESS_MAP, self.metallic_roughness_uv),
            (NORMAL_MAP, self.normal_uv),
            (OCCLUSION_MAP, self.occlusion_uv),
            (EMISSIVE_MAP, self.emissive_uv),
        ]
    }

    /// A stable, readable name such as `lit_opaque_vc_bc0_n1`.
    pub fn name(&self) -> String {
        let mut name = String::from(if self.unlit { "unlit" } else { "lit" });
        name.push_str(match self.blending {
            BlendingMode::Opaque => "_opaque",
            BlendingMode::Masked => "_masked",
            BlendingMode::Transparent => "_transparent",
        });
        if self.double_sided {
            name.push_str("_ds");
        }
        if self.vertex_colors {
            name.push_str("_vc");
        }
        let tags = ["bc", "mr", "n", "ao", "e"];
        for ((_, uv), tag) in self.samplers().iter().zip(tags) {
            if let Some(uv) = uv {
                name.push_str(&format!("_{tag}{uv}"));
            }
        }
        name
    }

    /// Build the template descriptor for this key.
    pub fn material_desc(&self) -> MaterialDesc {
        let mut parameters = vec![ParameterDesc::new(BASE_COLOR_FACTOR, ParameterType::Float4)];
        if !self.unlit {
            parameters.push(ParameterDesc::new(METALLIC_FACTOR, ParameterType::Float));
            parameters.push(ParameterDesc::new(ROUGHNESS_FACTOR, ParameterType::Float));
            if self.normal_uv.is_some() {
                parameters.push(ParameterDesc::new(NORMAL_SCALE, ParameterType::Float));
            }
            if self.occlusion_uv.is_some() {
                parameters.push(ParameterDesc::new(AO_STRENGTH, ParameterType::Float));
            }
        }
        parameters.push(ParameterDesc::new(EMISSIVE_FACTOR, ParameterType::Float3));
        if self.blending == BlendingMode::Masked {
            parameters.push(ParameterDesc::new(MASK_THRESHOLD, ParameterType::Float));
        }

        let mut required_attributes = vec![VertexAttribute::Position];
        if !self.unlit {
            required_attributes.push(VertexAttribute::Normal);
        }
        if self.normal_uv.is_some() {
            required_attributes.push(VertexAttribute::Tangent);
        }
        if self.vertex_colors {
            required_attributes.push(VertexAttribute::Color);
        }
        for (sampler, uv) in self.samplers() {
            let Some(uv) = uv else { continue };
            parameters.push(ParameterDesc::new(sampler, ParameterType::Sampler2d));
            let attribute = if uv == 0 {
                VertexAttribute::Uv0
            } else {
                VertexAttribute::Uv1
            };
            if !required_attributes.contains(&attribute) {
                required_attributes.push(attribute);
            }
        }

        MaterialDesc {
            name: self.name(),
            shading: if self.unlit {
                Shading::Unlit
            } else {
                Shading::Lit
            },
            blending: self.blending,
            double_sided: self.double_sided,
            parameters,
            required_attributes,
        }
    }

    /// Sampler parameters of this key paired with the glTF texture index
    /// each one samples.
    pub(crate) fn texture_bindings(&self, material: &gltf::Material<'_>) -> Vec<(&'static str, usize)> {
        let pbr = material.pbr_metallic_roughness();
        let mut bindings = Vec::new();
        if self.base_color_uv.is_some() {
            if let Some(info) = pbr.base_color_texture() {
                bindings.push((BASE_COLOR_MAP, info.texture().index()));
            }
        }
        if self.metallic_roughness_uv.is_some() {
            if let Some(info) = pbr.metallic_roughness_texture() {
                bindings.push((METALLIC_ROUGHNESS_MAP, info.texture().index()));
            }
        }
        if self.normal_uv.is_some() {
            if let Some(normal) = material.normal_texture() {
                bindings.push((NORMAL_MAP, normal.texture().index()));
            }
        }
        if self.occlusion_uv.is_some() {
            if let Some(occlusion) = material.occlusion_texture() {
                bindings.push((OCCLUSION_MAP, occlusion.texture().index()));
            }
        }
        if self.emissive_uv.is_some() {
            if let Some(info) = material.emissive_texture() {
                bindings.push((EMISSIVE_MAP, info.texture().index()));
            }
        }
        bindings
    }
}

/// Copy the glTF factors of `material` onto an instance of the template
/// built for `key`.
pub(crate) fn apply_factors(
    engine: &dyn Engine,
    instance: Handle<MaterialInstance>,
    material: &gltf::Material<'_>,
    key: &MaterialKey,
) -> Result<(), EngineError> {
    let pbr = material.pbr_metallic_roughness();
    engine.set_parameter(
        instance,
        BASE_COLOR_FACTOR,
        ParamValue::Float4(pbr.base_color_factor()),
    )?;
    if !key.unlit {
        engine.set_parameter(
            instance,
            METALLIC_FACTOR,
            ParamValue::Float(pbr.metallic_factor()),
        )?;
        engine.set_parameter(
            instance,
            ROUGHNESS_FACTOR,
            ParamValue::Float(pbr.roughness_factor()),
        )?;
        if key.normal_uv.is_some() {
            let scale = material.normal_texture().map_or(1.0, |t| t.scale());
            engine.set_parameter(instance, NORMAL_SCALE, ParamValue::Float(scale))?;
        }
        if key.occlusion_uv.is_some() {
            let strength = material.occlusion_texture().map_or(1.0, |t| t.strength());
            engine.set_parameter(instance, AO_STRENGTH, ParamValue::Float(strength))?;
        }
    }
    engine.set_parameter(
        instance,
        EMISSIVE_FACTOR,
        ParamValue::Float3(material.emissive_factor()),
    )?;
    if key.blending == BlendingMode::Masked {
        let cutoff = material.alpha_cutoff().unwrap_or(0.5);
        engine.set_parameter(instance, MASK_THRESHOLD, ParamValue::Float(cutoff))?;
    }
    Ok(())
}

/// Cache of material templates, reused by every asset a loader creates.
#[derive(Debug, Default)]
pub struct MaterialCache {
    by_key: HashMap<MaterialKey, Handle<Material>>,
    materials: Vec<Handle<Material>>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the template for `key`, creating it on first use.
    pub fn get_or_create(&mut self, engine: &dyn Engine, key: &MaterialKey) -> Handle<Material> {
        if let Some(&material) = self.by_key.get(key) {
            return material;
        }
        let material = engine.create_material(key.material_desc());
        debug!("cached material template '{}' as {material}", key.name());
        self.by_key.insert(*key, material);
        self.materials.push(material);
        material
    }

    /// Templates in creation order.
    pub fn materials(&self) -> &[Handle<Material>] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Destroy the templates created after the first `len`, keeping the
    /// older ones.
    pub fn truncate(&mut self, engine: &dyn Engine, len: usize) {
        if len >= self.materials.len() {
            return;
        }
        let dropped: Vec<_> = self.materials.drain(len..).collect();
        self.by_key.retain(|_, material| !dropped.contains(material));
        for material in dropped {
            if let Err(e) = engine.destroy_material(material) {
                warn!("failed to destroy cached material {material}: {e}");
            }
        }
    }

    /// Destroy every cached template. The cache is empty afterwards even if
    /// the engine rejected some of them.
    pub fn destroy_all(&mut self, engine: &dyn Engine) {
        for material in self.materials.drain(..) {
            if let Err(e) = engine.destroy_material(material) {
                warn!("failed to destroy cached material {material}: {e}");
            }
        }
        self.by_key.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_engine::HeadlessEngine;
    use serde_json::json;

    fn document(materials: serde_json::Value) -> gltf::Document {
        let json = json!({
            "asset": { "version": "2.0" },
            "images": [{ "uri": "checker.png" }],
            "textures": [{ "source": 0 }],
            "materials": materials,
        });
        gltf::Gltf::from_slice(json.to_string().as_bytes())
            .unwrap()
            .document
    }

    #[test]
    fn default_material_key() {
        let doc = document(json!([{}]));
        let material = doc.materials().next().unwrap();
        let key = MaterialKey::from_gltf(&material, false);
        assert!(!key.unlit);
        assert!(!key.double_sided);
        assert_eq!(key.blending, BlendingMode::Opaque);
        assert_eq!(key.base_color_uv, None);
        assert_eq!(key.name(), "lit_opaque");
    }

    #[test]
    fn key_captures_texture_slots() {
        let doc = document(json!([{
            "alphaMode": "MASK",
            "doubleSided": true,
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
            "normalTexture": { "index": 0, "texCoord": 1 },
            "emissiveTexture": { "index": 0, "texCoord": 3 }
        }]));
        let material = doc.materials().next().unwrap();
        let key = MaterialKey::from_gltf(&material, true);
        assert_eq!(key.blending, BlendingMode::Masked);
        assert_eq!(key.base_color_uv, Some(0));
        assert_eq!(key.normal_uv, Some(1));
        // TEXCOORD_3 is out of range and dropped.
        assert_eq!(key.emissive_uv, None);
        assert_eq!(key.name(), "lit_masked_ds_vc_bc0_n1");

        let desc = key.material_desc();
        assert!(desc.parameter(MASK_THRESHOLD).is_some());
        assert!(desc.parameter(NORMAL_SCALE).is_some());
        assert!(desc.parameter(BASE_COLOR_MAP).is_some());
        assert!(desc.parameter(EMISSIVE_MAP).is_none());
        assert!(desc.required_attributes.contains(&VertexAttribute::Uv1));
        assert!(desc.required_attributes.contains(&VertexAttribute::Tangent));
    }

    #[test]
    fn unlit_ignores_lighting_inputs() {
        let doc = document(json!([{
            "extensions": { "KHR_materials_unlit": {} },
            "normalTexture": { "index": 0 },
            "pbrMetallicRoughness": { "metallicRoughnessTexture": { "index": 0 } }
        }]));
        let material = doc.materials().next().unwrap();
        let key = MaterialKey::from_gltf(&material, false);
        assert!(key.unlit);
        assert_eq!(key.normal_uv, None);
        assert_eq!(key.metallic_roughness_uv, None);
        let desc = key.material_desc();
        assert_eq!(desc.shading, Shading::Unlit);
        assert!(desc.parameter(METALLIC_FACTOR).is_none());
    }

    #[test]
    fn cache_reuses_templates_per_key() {
        let engine = HeadlessEngine::new();
        let doc = document(json!([{}, { "doubleSided": true }, {}]));
        let keys: Vec<_> = doc
            .materials()
            .map(|m| MaterialKey::from_gltf(&m, false))
            .collect();

        let mut cache = MaterialCache::new();
        let a = cache.get_or_create(&engine, &keys[0]);
        let b = cache.get_or_create(&engine, &keys[1]);
        let c = cache.get_or_create(&engine, &keys[2]);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(cache.materials(), &[a, b]);
        assert_eq!(engine.stats().materials, 2);

        cache.destroy_all(&engine);
        assert!(cache.is_empty());
        assert_eq!(engine.stats().materials, 0);
        let again = cache.get_or_create(&engine, &keys[0]);
        assert_ne!(again, a);
    }

    #[test]
    fn truncate_drops_newer_templates() {
        let engine = HeadlessEngine::new();
        let doc = document(json!([{}, { "doubleSided": true }, { "alphaMode": "BLEND" }]));
        let keys: Vec<_> = doc
            .materials()
            .map(|m| MaterialKey::from_gltf(&m, false))
            .collect();

        let mut cache = MaterialCache::new();
        let kept = cache.get_or_create(&engine, &keys[0]);
        let dropped = cache.get_or_create(&engine, &keys[1]);
        cache.get_or_create(&engine, &keys[2]);

        cache.truncate(&engine, 1);
        assert_eq!(cache.materials(), &[kept]);
        assert!(engine.material_exists(kept));
        assert!(!engine.material_exists(dropped));
        assert_eq!(engine.stats().materials, 1);
        assert_eq!(cache.get_or_create(&engine, &keys[0]), kept);

        cache.truncate(&engine, 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn factors_are_applied() {
        let engine = HeadlessEngine::new();
        let doc = document(json!([{
            "alphaMode": "MASK",
            "alphaCutoff": 0.3,
            "emissiveFactor": [1.0, 0.5, 0.0],
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.1, 0.2, 0.3, 0.4],
                "metallicFactor": 0.0,
                "roughnessFactor": 0.75
            }
        }]));
        let material = doc.materials().next().unwrap();
        let key = MaterialKey::from_gltf(&material, false);
        let mut cache = MaterialCache::new();
        let template = cache.get_or_create(&engine, &key);
        let mi = engine.create_material_instance(template).unwrap();
        apply_factors(&engine, mi, &material, &key).unwrap();

        assert_eq!(
            engine.parameter(mi, BASE_COLOR_FACTOR),
            Some(ParamValue::Float4([0.1, 0.2, 0.3, 0.4]))
        );
        assert_eq!(engine.parameter(mi, ROUGHNESS_FACTOR), Some(ParamValue::Float(0.75)));
        assert_eq!(engine.parameter(mi, MASK_THRESHOLD), Some(ParamValue::Float(0.3)));
        assert_eq!(
            engine.parameter(mi, EMISSIVE_FACTOR),
            Some(ParamValue::Float3([1.0, 0.5, 0.0]))
        );
    }
}
