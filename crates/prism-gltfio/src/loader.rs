use std::collections::{HashMap, HashSet};

use gltf::khr_lights_punctual::Kind;
use gltf::mesh::Mode;
use gltf::Semantic;
use prism_core::{Aabb, Color, Mat4, Vec3};
use prism_engine::{
    Engine, Entity, Handle, IndexBufferDesc, IndexType, Light, LightKind, Material, PrimitiveType,
    RenderPrimitive, Renderable, SkinBinding, VertexAttribute, VertexBufferDesc,
};
use tracing::{debug, info, warn};

use crate::asset::{Asset, PrimitiveBinding, Skin, SourceData, TextureBinding};
use crate::config::LoaderConfig;
use crate::error::AssetError;
use crate::material::{self, MaterialCache, MaterialKey};

const GLB_MAGIC: &[u8] = b"glTF";

fn is_glb(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
}

/// Consumes glTF 2.0 content (JSON or GLB) and produces [`Asset`]s: bundles
/// of entities, renderables, material instances, vertex and index buffers,
/// and lights.
///
/// The engine is only borrowed: a loader can never outlive it. The loader
/// owns a cache of material templates that is shared by every asset it
/// creates and must be released explicitly with
/// [`destroy_materials`](Self::destroy_materials).
///
/// A loader cannot be duplicated:
///
/// ```compile_fail
/// use prism_engine::HeadlessEngine;
/// use prism_gltfio::AssetLoader;
///
/// let engine = HeadlessEngine::new();
/// let loader = AssetLoader::create(&engine);
/// let copy: AssetLoader = loader.clone();
/// ```
///
/// and is unusable once destroyed:
///
/// ```compile_fail
/// use prism_engine::HeadlessEngine;
/// use prism_gltfio::AssetLoader;
///
/// let engine = HeadlessEngine::new();
/// let loader = AssetLoader::create(&engine);
/// loader.destroy();
/// let _ = loader.materials_count();
/// ```
pub struct AssetLoader<'e> {
    engine: &'e dyn Engine,
    materials: MaterialCache,
    config: LoaderConfig,
}

impl<'e> AssetLoader<'e> {
    /// Create a loader and its (empty) material cache for `engine`.
    pub fn create(engine: &'e dyn Engine) -> Self {
        Self::with_config(engine, LoaderConfig::default())
    }

    pub fn with_config(engine: &'e dyn Engine, config: LoaderConfig) -> Self {
        debug!("asset loader created with {config:?}");
        Self {
            engine,
            materials: MaterialCache::new(),
            config,
        }
    }

    /// Free the loader. Cached materials are not destroyed; see
    /// [`destroy_materials`](Self::destroy_materials).
    pub fn destroy(self) {}

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Create an asset from the contents of a JSON `.gltf` file.
    ///
    /// External buffers and images are not read; they are listed in
    /// [`Asset::resource_uris`] for the [`ResourceLoader`](crate::ResourceLoader).
    pub fn create_asset_from_json(&mut self, bytes: &[u8]) -> Result<Asset, AssetError> {
        if bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        if is_glb(bytes) {
            return Err(AssetError::UnexpectedGlb);
        }
        let gltf = gltf::Gltf::from_slice(bytes)?;
        self.instantiate(gltf)
    }

    /// Create an asset from the contents of a binary `.glb` file.
    pub fn create_asset_from_binary(&mut self, bytes: &[u8]) -> Result<Asset, AssetError> {
        if bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        if !is_glb(bytes) {
            return Err(AssetError::NotGlb);
        }
        let gltf = gltf::Gltf::from_slice(bytes)?;
        self.instantiate(gltf)
    }

    /// Pick the entry point from the content: GLB when it starts with the
    /// container magic, JSON otherwise.
    pub fn create_asset(&mut self, bytes: &[u8]) -> Result<Asset, AssetError> {
        if is_glb(bytes) {
            self.create_asset_from_binary(bytes)
        } else {
            self.create_asset_from_json(bytes)
        }
    }

    /// Destroy every engine object of `asset`. Cached materials survive.
    pub fn destroy_asset(&mut self, mut asset: Asset) {
        let entities = asset.entity_count();
        asset.destroy_objects(self.engine);
        debug!("destroyed asset with {entities} entities");
    }

    /// Whether renderables of assets created from now on cast shadows.
    pub fn cast_shadows_by_default(&mut self, enable: bool) {
        self.config.cast_shadows = enable;
    }

    /// Whether renderables of assets created from now on receive shadows.
    pub fn receive_shadows_by_default(&mut self, enable: bool) {
        self.config.receive_shadows = enable;
    }

    pub fn materials_count(&self) -> usize {
        self.materials.len()
    }

    /// Cached material templates, used to create material instances.
    pub fn materials(&self) -> &[Handle<Material>] {
        self.materials.materials()
    }

    /// Destroy all cached materials. Existing assets keep their material
    /// instances.
    pub fn destroy_materials(&mut self) {
        let count = self.materials.len();
        self.materials.destroy_all(self.engine);
        debug!("destroyed {count} cached materials");
    }

    fn instantiate(&mut self, gltf: gltf::Gltf) -> Result<Asset, AssetError> {
        let roots = scene_roots(&gltf.document, self.config.scene)?;
        let root = self.engine.create_entity();
        let cached = self.materials.len();
        let mut builder = AssetBuilder {
            engine: self.engine,
            materials: &mut self.materials,
            config: &self.config,
            asset: Asset::new(root),
            primitives: Vec::new(),
            textures: Vec::new(),
            mesh_cache: HashMap::new(),
            node_entities: HashMap::new(),
        };

        if let Err(e) = builder.build(&gltf.document, &roots) {
            let mut asset = builder.asset;
            asset.destroy_objects(self.engine);
            self.materials.truncate(self.engine, cached);
            return Err(e);
        }

        let AssetBuilder {
            mut asset,
            primitives,
            textures,
            ..
        } = builder;
        info!(
            "created asset: {} entities, {} renderables, {} lights, {} cached materials",
            asset.entities.len(),
            asset.renderables.len(),
            asset.lights.len(),
            self.materials.len()
        );
        asset.source = Some(SourceData {
            gltf,
            primitives,
            textures,
            textures_loaded: false,
        });
        Ok(asset)
    }
}

impl Drop for AssetLoader<'_> {
    fn drop(&mut self) {
        if !self.materials.is_empty() {
            warn!(
                "asset loader dropped with {} cached materials; they stay alive in the engine",
                self.materials.len()
            );
        }
    }
}

/// Nodes to instantiate: the requested scene, the default scene, the first
/// scene, or every parentless node when the document has no scenes.
fn scene_roots(
    document: &gltf::Document,
    scene: Option<usize>,
) -> Result<Vec<gltf::Node<'_>>, AssetError> {
    if let Some(index) = scene {
        let scene = document
            .scenes()
            .nth(index)
            .ok_or(AssetError::MissingScene(index))?;
        return Ok(scene.nodes().collect());
    }
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        return Ok(scene.nodes().collect());
    }
    let children: HashSet<usize> = document
        .nodes()
        .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
        .collect();
    Ok(document
        .nodes()
        .filter(|n| !children.contains(&n.index()))
        .collect())
}

fn vertex_attribute(semantic: &Semantic) -> Option<VertexAttribute> {
    match semantic {
        Semantic::Positions => Some(VertexAttribute::Position),
        Semantic::Normals => Some(VertexAttribute::Normal),
        Semantic::Tangents => Some(VertexAttribute::Tangent),
        Semantic::Colors(0) => Some(VertexAttribute::Color),
        Semantic::TexCoords(0) => Some(VertexAttribute::Uv0),
        Semantic::TexCoords(1) => Some(VertexAttribute::Uv1),
        Semantic::Joints(0) => Some(VertexAttribute::BoneIndices),
        Semantic::Weights(0) => Some(VertexAttribute::BoneWeights),
        _ => None,
    }
}

fn topology(mode: Mode) -> PrimitiveType {
    match mode {
        Mode::Points => PrimitiveType::Points,
        Mode::Lines => PrimitiveType::Lines,
        Mode::LineLoop => PrimitiveType::LineLoop,
        Mode::LineStrip => PrimitiveType::LineStrip,
        Mode::Triangles => PrimitiveType::Triangles,
        Mode::TriangleStrip => PrimitiveType::TriangleStrip,
        Mode::TriangleFan => PrimitiveType::TriangleFan,
    }
}

/// Bounds from an accessor's `min`/`max` arrays.
fn accessor_bounds(accessor: &gltf::Accessor<'_>) -> Option<Aabb> {
    let min = accessor.min()?;
    let max = accessor.max()?;
    let (min, max) = (min.as_array()?, max.as_array()?);
    if min.len() != 3 || max.len() != 3 {
        return None;
    }
    let mut lo = [0.0f32; 3];
    let mut hi = [0.0f32; 3];
    for i in 0..3 {
        lo[i] = min[i].as_f64()? as f32;
        hi[i] = max[i].as_f64()? as f32;
    }
    Some(Aabb::from_min_max(Vec3::from(lo), Vec3::from(hi)))
}

fn light_component(light: &gltf::khr_lights_punctual::Light<'_>) -> Light {
    let kind = match light.kind() {
        Kind::Directional => LightKind::Directional,
        Kind::Point => LightKind::Point,
        Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => LightKind::Spot {
            inner_cone: inner_cone_angle,
            outer_cone: outer_cone_angle,
        },
    };
    Light {
        kind,
        color: Color::from_rgb_array(light.color()),
        intensity: light.intensity(),
        falloff: light.range(),
        cast_shadows: false,
    }
}

/// State of one `instantiate` call.
struct AssetBuilder<'a> {
    engine: &'a dyn Engine,
    materials: &'a mut MaterialCache,
    config: &'a LoaderConfig,
    asset: Asset,
    primitives: Vec<PrimitiveBinding>,
    textures: Vec<TextureBinding>,
    /// Mesh index -> primitives and local bounds, shared by every node
    /// instancing the mesh.
    mesh_cache: HashMap<usize, (Vec<RenderPrimitive>, Aabb)>,
    /// Node index -> entity created for it.
    node_entities: HashMap<usize, Entity>,
}

impl AssetBuilder<'_> {
    fn build(
        &mut self,
        document: &gltf::Document,
        roots: &[gltf::Node<'_>],
    ) -> Result<(), AssetError> {
        let root = self.asset.root;
        self.engine.set_transform(root, Mat4::IDENTITY, None)?;

        let mut stack: Vec<(gltf::Node<'_>, Entity, Mat4, usize)> = roots
            .iter()
            .rev()
            .map(|node| (node.clone(), root, Mat4::IDENTITY, 0))
            .collect();
        // Node indices from the scene root down to the node being visited.
        let mut path: Vec<usize> = Vec::new();

        while let Some((node, parent, parent_world, depth)) = stack.pop() {
            path.truncate(depth);
            if self.node_entities.contains_key(&node.index()) {
                return Err(if path.contains(&node.index()) {
                    AssetError::CyclicHierarchy(node.index())
                } else {
                    AssetError::SharedNode(node.index())
                });
            }
            path.push(node.index());
            let local = Mat4::from_cols_array_2d(&node.transform().matrix());
            let world = parent_world * local;

            let entity = self.engine.create_entity();
            self.asset.entities.push(entity);
            self.engine.set_transform(entity, local, Some(parent))?;
            self.node_entities.insert(node.index(), entity);

            if let Some(name) = node.name() {
                self.engine.set_name(entity, name)?;
                self.asset.names.insert(entity, name.to_string());
            }
            if let Some(mesh) = node.mesh() {
                self.add_renderable(entity, &node, &mesh, &world)?;
            }
            if let Some(light) = node.light() {
                self.engine.set_light(entity, light_component(&light))?;
                self.asset.lights.push(entity);
            }

            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, entity, world, depth + 1));
            }
        }

        self.collect_skins(document);
        self.collect_resource_uris(document);
        Ok(())
    }

    fn add_renderable(
        &mut self,
        entity: Entity,
        node: &gltf::Node<'_>,
        mesh: &gltf::Mesh<'_>,
        world: &Mat4,
    ) -> Result<(), AssetError> {
        let (primitives, aabb) = match self.mesh_cache.get(&mesh.index()) {
            Some(cached) => cached.clone(),
            None => {
                let created = self.create_primitives(mesh)?;
                self.mesh_cache.insert(mesh.index(), created.clone());
                created
            }
        };
        if primitives.is_empty() {
            warn!("mesh {} has no drawable primitives", mesh.index());
            return Ok(());
        }

        let skin = node.skin().map(|skin| SkinBinding {
            bone_count: skin.joints().count(),
        });
        self.engine.set_renderable(
            entity,
            Renderable {
                aabb,
                cast_shadows: self.config.cast_shadows,
                receive_shadows: self.config.receive_shadows,
                primitives,
                skin,
            },
        )?;
        self.asset.renderables.push(entity);
        self.asset.bounding_box = self.asset.bounding_box.union(&aabb.transform(world));
        Ok(())
    }

    fn create_primitives(
        &mut self,
        mesh: &gltf::Mesh<'_>,
    ) -> Result<(Vec<RenderPrimitive>, Aabb), AssetError> {
        let mut primitives = Vec::new();
        let mut bounds = Aabb::EMPTY;

        for primitive in mesh.primitives() {
            let Some(positions) = primitive.get(&Semantic::Positions) else {
                warn!(
                    "mesh {} primitive {} has no POSITION attribute, skipping",
                    mesh.index(),
                    primitive.index()
                );
                continue;
            };

            let used = primitive
                .attributes()
                .filter(|(semantic, _)| vertex_attribute(semantic).is_some())
                .map(|(_, accessor)| accessor)
                .chain(primitive.indices());
            for accessor in used {
                if accessor.count() == 0 {
                    return Err(AssetError::EmptyAccessor {
                        mesh: mesh.index(),
                        primitive: primitive.index(),
                    });
                }
            }

            let mut attributes: Vec<VertexAttribute> = primitive
                .attributes()
                .filter_map(|(semantic, _)| vertex_attribute(&semantic))
                .collect();
            attributes.sort();
            attributes.dedup();

            let vertex_buffer = self.engine.create_vertex_buffer(VertexBufferDesc {
                vertex_count: positions.count() as u32,
                attributes: attributes.iter().map(|a| (*a, a.default_type())).collect(),
            });
            self.asset.vertex_buffers.push(vertex_buffer);

            let index_buffer = primitive.indices().map(|accessor| {
                let index_type = match accessor.data_type() {
                    gltf::accessor::DataType::U32 => IndexType::U32,
                    _ => IndexType::U16,
                };
                let buffer = self.engine.create_index_buffer(IndexBufferDesc {
                    index_count: accessor.count() as u32,
                    index_type,
                });
                self.asset.index_buffers.push(buffer);
                (buffer, index_type)
            });

            let gltf_material = primitive.material();
            let key = MaterialKey::from_gltf(
                &gltf_material,
                attributes.contains(&VertexAttribute::Color),
            );
            let template = self.materials.get_or_create(self.engine, &key);
            let instance = self.engine.create_material_instance(template)?;
            self.asset.material_instances.push(instance);
            material::apply_factors(self.engine, instance, &gltf_material, &key)?;
            for (parameter, texture) in key.texture_bindings(&gltf_material) {
                self.textures.push(TextureBinding {
                    instance,
                    parameter,
                    texture,
                });
            }

            match accessor_bounds(&positions) {
                Some(aabb) => bounds = bounds.union(&aabb),
                None => warn!(
                    "mesh {} primitive {} has no POSITION bounds",
                    mesh.index(),
                    primitive.index()
                ),
            }

            self.primitives.push(PrimitiveBinding {
                mesh: mesh.index(),
                primitive: primitive.index(),
                vertex_buffer,
                attributes,
                index_buffer,
            });
            primitives.push(RenderPrimitive {
                topology: topology(primitive.mode()),
                vertex_buffer,
                index_buffer: index_buffer.map(|(buffer, _)| buffer),
                material_instance: instance,
            });
        }

        debug!(
            "mesh {} ('{}'): {} primitives",
            mesh.index(),
            mesh.name().unwrap_or("unnamed"),
            primitives.len()
        );
        Ok((primitives, bounds))
    }

    fn collect_skins(&mut self, document: &gltf::Document) {
        for skin in document.skins() {
            let joints = skin
                .joints()
                .filter_map(|joint| self.node_entities.get(&joint.index()).copied())
                .collect();
            self.asset.skins.push(Skin {
                name: skin.name().map(str::to_string),
                joints,
            });
        }
    }

    fn collect_resource_uris(&mut self, document: &gltf::Document) {
        let buffer_uris = document.buffers().filter_map(|buffer| match buffer.source() {
            gltf::buffer::Source::Uri(uri) => Some(uri.to_string()),
            gltf::buffer::Source::Bin => None,
        });
        let image_uris = document.images().filter_map(|image| match image.source() {
            gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
            gltf::image::Source::View { .. } => None,
        });
        for uri in buffer_uris.chain(image_uris) {
            if !uri.starts_with("data:") && !self.asset.resource_uris.contains(&uri) {
                self.asset.resource_uris.push(uri);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{embedded_triangle, glb, push, to_bytes, triangle_bin, triangle_json};
    use prism_engine::{EngineStats, HeadlessEngine, ParamValue};
    use serde_json::json;

    #[test]
    fn json_asset_builds_hierarchy() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let asset = loader
            .create_asset_from_json(&to_bytes(&embedded_triangle()))
            .unwrap();

        assert_eq!(asset.entity_count(), 2);
        let parent = asset.first_entity_by_name("parent").unwrap();
        let triangle = asset.first_entity_by_name("triangle").unwrap();
        assert_eq!(asset.entities(), &[parent, triangle]);
        assert_eq!(asset.renderables(), &[triangle]);
        assert_eq!(engine.transform(parent).unwrap().parent, Some(asset.root()));
        assert_eq!(engine.transform(triangle).unwrap().parent, Some(parent));
        assert_eq!(engine.name(triangle).as_deref(), Some("triangle"));

        let world = engine.world_transform(triangle).unwrap();
        assert_eq!(world.col(3).truncate(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(asset.bounding_box().min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(asset.bounding_box().max, Vec3::new(2.0, 1.0, 0.0));

        let renderable = engine.renderable(triangle).unwrap();
        assert_eq!(renderable.primitives.len(), 1);
        assert!(renderable.primitives[0].index_buffer.is_some());
        assert_eq!(renderable.primitives[0].topology, PrimitiveType::Triangles);
        assert!(renderable.cast_shadows && renderable.receive_shadows);

        let mi = renderable.primitives[0].material_instance;
        assert_eq!(
            engine.parameter(mi, "baseColorFactor"),
            Some(ParamValue::Float4([1.0, 0.0, 0.0, 1.0]))
        );
        assert!(asset.resource_uris().is_empty());
        assert!(asset.has_source_data());
    }

    #[test]
    fn binary_asset_loads() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let bytes = glb(&triangle_json(None), &triangle_bin());
        let asset = loader.create_asset_from_binary(&bytes).unwrap();
        assert_eq!(asset.entity_count(), 2);
        assert_eq!(asset.renderables().len(), 1);
        assert_eq!(asset.vertex_buffers().len(), 1);
        assert_eq!(asset.index_buffers().len(), 1);

        let auto = loader.create_asset(&bytes).unwrap();
        assert_eq!(auto.entity_count(), 2);
    }

    #[test]
    fn empty_input_fails() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        assert!(matches!(
            loader.create_asset_from_json(&[]),
            Err(AssetError::Empty)
        ));
        assert!(matches!(
            loader.create_asset_from_binary(&[]),
            Err(AssetError::Empty)
        ));
        assert_eq!(engine.stats(), EngineStats::default());
    }

    #[test]
    fn wrong_container_is_rejected() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let json = to_bytes(&embedded_triangle());
        let binary = glb(&triangle_json(None), &triangle_bin());
        assert!(matches!(
            loader.create_asset_from_json(&binary),
            Err(AssetError::UnexpectedGlb)
        ));
        assert!(matches!(
            loader.create_asset_from_binary(&json),
            Err(AssetError::NotGlb)
        ));
        assert_eq!(engine.stats(), EngineStats::default());
    }

    #[test]
    fn malformed_content_fails_without_leaking() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        assert!(matches!(
            loader.create_asset_from_json(b"{ not json"),
            Err(AssetError::Gltf(_))
        ));

        let mut broken = embedded_triangle();
        broken["nodes"][1]["mesh"] = json!(5);
        assert!(matches!(
            loader.create_asset_from_json(&to_bytes(&broken)),
            Err(AssetError::Gltf(_))
        ));

        let mut truncated = glb(&triangle_json(None), &triangle_bin());
        truncated.truncate(20);
        assert!(loader.create_asset_from_binary(&truncated).is_err());
        assert_eq!(engine.stats(), EngineStats::default());
    }

    #[test]
    fn shadow_defaults_apply_to_later_assets() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let bytes = to_bytes(&embedded_triangle());

        let before = loader.create_asset_from_json(&bytes).unwrap();
        loader.cast_shadows_by_default(false);
        loader.receive_shadows_by_default(false);
        let after = loader.create_asset_from_json(&bytes).unwrap();

        let old = engine.renderable(before.renderables()[0]).unwrap();
        let new = engine.renderable(after.renderables()[0]).unwrap();
        assert!(old.cast_shadows && old.receive_shadows);
        assert!(!new.cast_shadows && !new.receive_shadows);
    }

    #[test]
    fn materials_are_reused_across_loads() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let bytes = to_bytes(&embedded_triangle());
        let a = loader.create_asset_from_json(&bytes).unwrap();
        let b = loader.create_asset_from_json(&bytes).unwrap();

        assert_eq!(loader.materials_count(), 1);
        let (mi_a, mi_b) = (a.material_instances()[0], b.material_instances()[0]);
        assert_ne!(mi_a, mi_b);
        assert_eq!(engine.material_of(mi_a), Some(loader.materials()[0]));
        assert_eq!(engine.material_of(mi_b), Some(loader.materials()[0]));

        let mut double_sided = embedded_triangle();
        double_sided["materials"][0]["doubleSided"] = json!(true);
        loader
            .create_asset_from_json(&to_bytes(&double_sided))
            .unwrap();
        assert_eq!(loader.materials_count(), 2);
    }

    #[test]
    fn destroy_materials_keeps_assets_valid() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let bytes = to_bytes(&embedded_triangle());
        let asset = loader.create_asset_from_json(&bytes).unwrap();

        loader.destroy_materials();
        assert_eq!(loader.materials_count(), 0);
        assert_eq!(engine.stats().materials, 0);
        assert!(engine.material_instance_exists(asset.material_instances()[0]));
        assert!(engine.renderable(asset.renderables()[0]).is_some());

        let again = loader.create_asset_from_json(&bytes).unwrap();
        assert_eq!(loader.materials_count(), 1);
        loader.destroy_asset(asset);
        assert!(engine.renderable(again.renderables()[0]).is_some());
    }

    #[test]
    fn destroy_asset_releases_engine_objects() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let asset = loader
            .create_asset_from_json(&to_bytes(&embedded_triangle()))
            .unwrap();
        let instance = asset.material_instances()[0];
        loader.destroy_asset(asset);

        assert!(!engine.material_instance_exists(instance));
        assert_eq!(
            engine.stats(),
            EngineStats {
                materials: 1,
                ..EngineStats::default()
            }
        );
    }

    #[test]
    fn destroying_the_loader_keeps_cached_materials() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let asset = loader
            .create_asset_from_json(&to_bytes(&embedded_triangle()))
            .unwrap();
        let material = loader.materials()[0];
        loader.destroy_asset(asset);
        loader.destroy();
        assert!(engine.material_exists(material));
    }

    #[test]
    fn lights_are_created() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        doc["extensionsUsed"] = json!(["KHR_lights_punctual"]);
        doc["extensions"] = json!({
            "KHR_lights_punctual": {
                "lights": [{
                    "type": "spot",
                    "color": [1.0, 0.5, 0.25],
                    "intensity": 3.0,
                    "range": 10.0,
                    "spot": { "innerConeAngle": 0.25, "outerConeAngle": 0.5 }
                }]
            }
        });
        doc["nodes"][0]["extensions"] = json!({ "KHR_lights_punctual": { "light": 0 } });

        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        let lamp = asset.first_entity_by_name("parent").unwrap();
        assert_eq!(asset.lights(), &[lamp]);
        let light = engine.light(lamp).unwrap();
        assert_eq!(
            light.kind,
            LightKind::Spot {
                inner_cone: 0.25,
                outer_cone: 0.5
            }
        );
        assert_eq!(light.color, Color::rgb(1.0, 0.5, 0.25));
        assert_eq!(light.intensity, 3.0);
        assert_eq!(light.falloff, Some(10.0));
    }

    #[test]
    fn scene_selection() {
        let engine = HeadlessEngine::new();
        let mut doc = embedded_triangle();
        push(&mut doc["nodes"], json!({ "name": "other" }));
        push(&mut doc["scenes"], json!({ "nodes": [2] }));
        let bytes = to_bytes(&doc);

        let mut loader = AssetLoader::with_config(
            &engine,
            LoaderConfig {
                scene: Some(1),
                ..LoaderConfig::default()
            },
        );
        let asset = loader.create_asset_from_json(&bytes).unwrap();
        assert_eq!(asset.entity_count(), 1);
        assert!(asset.first_entity_by_name("other").is_some());
        loader.destroy_asset(asset);

        let mut missing = AssetLoader::with_config(
            &engine,
            LoaderConfig {
                scene: Some(7),
                ..LoaderConfig::default()
            },
        );
        assert!(matches!(
            missing.create_asset_from_json(&bytes),
            Err(AssetError::MissingScene(7))
        ));
        assert_eq!(engine.stats().entities, 0);
    }

    #[test]
    fn documents_without_scenes_use_parentless_nodes() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        let object = doc.as_object_mut().unwrap();
        object.remove("scene");
        object.remove("scenes");

        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        assert_eq!(asset.entity_count(), 2);
        assert_eq!(asset.name(asset.entities()[0]), Some("parent"));
    }

    #[test]
    fn shared_meshes_share_buffers() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        push(
            &mut doc["nodes"],
            json!({ "name": "copy", "mesh": 0, "translation": [0.0, 0.0, -5.0] }),
        );
        doc["scenes"][0]["nodes"] = json!([0, 2]);

        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        assert_eq!(asset.renderables().len(), 2);
        assert_eq!(asset.vertex_buffers().len(), 1);
        assert_eq!(asset.material_instances().len(), 1);
        assert_eq!(asset.bounding_box().min, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(asset.bounding_box().max, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn skins_map_joints_to_entities() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        doc["skins"] = json!([{ "name": "rig", "joints": [0] }]);
        doc["nodes"][1]["skin"] = json!(0);

        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        let parent = asset.first_entity_by_name("parent").unwrap();
        assert_eq!(
            asset.skins(),
            &[Skin {
                name: Some("rig".into()),
                joints: vec![parent],
            }]
        );
        let renderable = engine.renderable(asset.renderables()[0]).unwrap();
        assert_eq!(renderable.skin, Some(SkinBinding { bone_count: 1 }));
    }

    #[test]
    fn cyclic_hierarchy_fails_without_leaking() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        doc["nodes"][1]["children"] = json!([0]);

        assert!(matches!(
            loader.create_asset_from_json(&to_bytes(&doc)),
            Err(AssetError::CyclicHierarchy(0))
        ));
        assert_eq!(engine.stats(), EngineStats::default());
        assert_eq!(loader.materials_count(), 0);
    }

    #[test]
    fn failed_load_keeps_earlier_templates() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let asset = loader
            .create_asset_from_json(&to_bytes(&embedded_triangle()))
            .unwrap();
        let template = loader.materials()[0];

        let mut doc = embedded_triangle();
        doc["materials"][0]["doubleSided"] = json!(true);
        doc["nodes"][1]["children"] = json!([0]);
        assert!(loader.create_asset_from_json(&to_bytes(&doc)).is_err());

        assert_eq!(loader.materials(), &[template]);
        assert_eq!(engine.stats().materials, 1);
        assert!(engine.renderable(asset.renderables()[0]).is_some());
    }

    #[test]
    fn nodes_with_several_parents_are_rejected() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        push(&mut doc["nodes"], json!({ "name": "second parent", "children": [1] }));
        doc["scenes"][0]["nodes"] = json!([0, 2]);
        assert!(matches!(
            loader.create_asset_from_json(&to_bytes(&doc)),
            Err(AssetError::SharedNode(1))
        ));
        assert_eq!(engine.stats(), EngineStats::default());
    }

    #[test]
    fn duplicated_children_fail_before_fanning_out() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let nodes: Vec<_> = (0..40)
            .map(|i| {
                if i < 39 {
                    json!({ "children": [i + 1, i + 1] })
                } else {
                    json!({})
                }
            })
            .collect();
        let doc = json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": nodes
        });
        assert!(matches!(
            loader.create_asset_from_json(&to_bytes(&doc)),
            Err(AssetError::SharedNode(39))
        ));
        assert_eq!(engine.stats().entities, 0);
    }

    #[test]
    fn empty_accessors_are_rejected() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        for accessor in [0, 1] {
            let mut doc = embedded_triangle();
            doc["accessors"][accessor]["count"] = json!(0);
            assert!(matches!(
                loader.create_asset_from_json(&to_bytes(&doc)),
                Err(AssetError::EmptyAccessor {
                    mesh: 0,
                    primitive: 0
                })
            ));
        }
        assert_eq!(engine.stats(), EngineStats::default());
        assert_eq!(loader.materials_count(), 0);
    }

    #[test]
    fn primitives_without_positions_are_skipped() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = embedded_triangle();
        push(
            &mut doc["meshes"][0]["primitives"],
            json!({ "attributes": { "NORMAL": 0 } }),
        );
        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        assert_eq!(asset.vertex_buffers().len(), 1);
        let renderable = engine.renderable(asset.renderables()[0]).unwrap();
        assert_eq!(renderable.primitives.len(), 1);

        let mut normals_only = embedded_triangle();
        normals_only["meshes"][0]["primitives"] = json!([{ "attributes": { "NORMAL": 0 } }]);
        let asset = loader
            .create_asset_from_json(&to_bytes(&normals_only))
            .unwrap();
        assert_eq!(asset.entity_count(), 2);
        assert!(asset.renderables().is_empty());
        assert!(asset.vertex_buffers().is_empty());
    }

    #[test]
    fn external_resources_are_listed() {
        let engine = HeadlessEngine::new();
        let mut loader = AssetLoader::create(&engine);
        let mut doc = triangle_json(Some("triangle.bin".into()));
        doc["images"] = json!([
            { "uri": "albedo.png" },
            { "uri": "data:image/png;base64,AAAA" },
            { "uri": "triangle.bin" }
        ]);

        let asset = loader.create_asset_from_json(&to_bytes(&doc)).unwrap();
        assert_eq!(asset.resource_uris(), &["triangle.bin", "albedo.png"]);
    }
}
