//! What a loaded asset turned into, in a printable form.

use std::fmt;

use prism_core::Transform;
use prism_engine::{EngineStats, HeadlessEngine};
use prism_gltfio::{Asset, AssetLoader};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BoundsSummary {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub center: [f32; 3],
}

/// A direct child of the asset root.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: Option<String>,
    pub translation: [f32; 3],
    pub children: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub file: String,
    pub container: &'static str,
    pub entities: usize,
    pub renderables: usize,
    pub lights: usize,
    pub skins: usize,
    pub cached_materials: usize,
    pub material_instances: usize,
    pub textures: usize,
    pub bounding_box: Option<BoundsSummary>,
    pub resource_uris: Vec<String>,
    pub roots: Vec<NodeSummary>,
    pub engine: EngineStats,
}

impl AssetSummary {
    pub fn new(
        file: String,
        binary: bool,
        asset: &Asset,
        loader: &AssetLoader<'_>,
        engine: &HeadlessEngine,
    ) -> Self {
        let bounds = asset.bounding_box();
        let bounding_box = (!bounds.is_empty()).then(|| BoundsSummary {
            min: bounds.min.to_array(),
            max: bounds.max.to_array(),
            center: bounds.center().to_array(),
        });

        let roots = engine
            .children(asset.root())
            .into_iter()
            .map(|entity| NodeSummary {
                name: asset.name(entity).map(str::to_string),
                translation: engine
                    .transform(entity)
                    .map(|t| Transform::from_matrix(t.local).translation.to_array())
                    .unwrap_or_default(),
                children: engine.children(entity).len(),
            })
            .collect();

        Self {
            file,
            container: if binary { "glb" } else { "gltf" },
            entities: asset.entity_count(),
            renderables: asset.renderables().len(),
            lights: asset.lights().len(),
            skins: asset.skins().len(),
            cached_materials: loader.materials_count(),
            material_instances: asset.material_instances().len(),
            textures: asset.textures().len(),
            bounding_box,
            resource_uris: asset.resource_uris().to_vec(),
            roots,
            engine: engine.stats(),
        }
    }
}

impl fmt::Display for AssetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.file, self.container)?;
        writeln!(
            f,
            "  entities: {}  renderables: {}  lights: {}  skins: {}",
            self.entities, self.renderables, self.lights, self.skins
        )?;
        writeln!(
            f,
            "  materials: {} cached, {} instances  textures: {}",
            self.cached_materials, self.material_instances, self.textures
        )?;
        match &self.bounding_box {
            Some(b) => writeln!(f, "  bounds: {:?} .. {:?}", b.min, b.max)?,
            None => writeln!(f, "  bounds: empty")?,
        }
        for uri in &self.resource_uris {
            writeln!(f, "  resource: {uri}")?;
        }
        for root in &self.roots {
            writeln!(
                f,
                "  root '{}' at {:?} ({} children)",
                root.name.as_deref().unwrap_or("unnamed"),
                root.translation,
                root.children
            )?;
        }
        Ok(())
    }
}
