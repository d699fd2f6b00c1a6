//! Second loading phase: fill the buffers and textures created by the
//! [`AssetLoader`](crate::AssetLoader) with data.

use std::borrow::Cow;
use std::collections::HashMap;

use base64::Engine as _;
use gltf::mesh::Reader;
use gltf::texture::{MagFilter, MinFilter, WrappingMode};
use prism_engine::{
    Engine, Handle, IndexType, ParamValue, SamplerDesc, SamplerFilter, SamplerWrap, Texture,
    TextureDesc, TextureFormat, VertexAttribute,
};
use tracing::{debug, info};

use crate::asset::{Asset, PrimitiveBinding, SourceData};
use crate::config::ResourceConfig;
use crate::error::AssetError;

/// Uploads vertex, index and texture data of an [`Asset`].
///
/// Buffers come from the GLB binary chunk, from base64 `data:` URIs, or from
/// files relative to [`ResourceConfig::base_path`].
pub struct ResourceLoader<'e> {
    engine: &'e dyn Engine,
    config: ResourceConfig,
}

impl<'e> ResourceLoader<'e> {
    pub fn new(engine: &'e dyn Engine, config: ResourceConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Upload all geometry and, when enabled, decode and bind textures.
    ///
    /// Calling this again re-uploads geometry but never creates textures
    /// twice. Fails with [`AssetError::SourceReleased`] once
    /// [`Asset::release_source_data`] has been called.
    pub fn load_resources(&self, asset: &mut Asset) -> Result<(), AssetError> {
        let mut source = asset.source.take().ok_or(AssetError::SourceReleased)?;
        let result = self.load(&mut asset.textures, &mut source);
        asset.source = Some(source);
        result
    }

    fn load(
        &self,
        textures: &mut Vec<Handle<Texture>>,
        source: &mut SourceData,
    ) -> Result<(), AssetError> {
        let buffers = self.resolve_buffers(&source.gltf)?;

        for binding in &source.primitives {
            self.upload_primitive(&source.gltf.document, &buffers, binding)?;
        }

        let mut created = 0;
        if self.config.decode_images && !source.textures_loaded {
            created = self.load_textures(textures, source, &buffers)?;
            source.textures_loaded = true;
        }

        info!(
            "loaded resources: {} buffers, {} primitives, {} textures",
            buffers.len(),
            source.primitives.len(),
            created
        );
        Ok(())
    }

    fn resolve_buffers<'g>(&self, gltf: &'g gltf::Gltf) -> Result<Vec<Cow<'g, [u8]>>, AssetError> {
        let mut resolved = Vec::new();
        for buffer in gltf.document.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .as_deref()
                    .map(Cow::Borrowed)
                    .ok_or(AssetError::MissingBlob(buffer.index()))?,
                gltf::buffer::Source::Uri(uri) => Cow::Owned(self.read_uri(uri)?),
            };
            if data.len() < buffer.length() {
                return Err(AssetError::BufferTooShort {
                    index: buffer.index(),
                    expected: buffer.length(),
                    actual: data.len(),
                });
            }
            debug!("buffer {}: {} bytes", buffer.index(), data.len());
            resolved.push(data);
        }
        Ok(resolved)
    }

    /// Read a `data:` URI or a file relative to the base path.
    fn read_uri(&self, uri: &str) -> Result<Vec<u8>, AssetError> {
        if let Some(rest) = uri.strip_prefix("data:") {
            let (_mime, payload) = rest.split_once(";base64,").ok_or_else(|| {
                let header = rest.split(',').next().unwrap_or_default();
                AssetError::UnsupportedDataUri(format!("data:{header}"))
            })?;
            return Ok(base64::engine::general_purpose::STANDARD.decode(payload)?);
        }
        let base = self
            .config
            .base_path
            .as_ref()
            .ok_or_else(|| AssetError::NoBasePath(uri.to_string()))?;
        let path = base.join(uri);
        std::fs::read(&path).map_err(|e| AssetError::Io(path, e))
    }

    fn upload_primitive(
        &self,
        document: &gltf::Document,
        buffers: &[Cow<'_, [u8]>],
        binding: &PrimitiveBinding,
    ) -> Result<(), AssetError> {
        let missing = |attribute| AssetError::MissingAccessorData {
            mesh: binding.mesh,
            primitive: binding.primitive,
            attribute,
        };
        let primitive = document
            .meshes()
            .nth(binding.mesh)
            .and_then(|mesh| mesh.primitives().nth(binding.primitive))
            .ok_or_else(|| missing(VertexAttribute::Position))?;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b[..]));

        for &attribute in &binding.attributes {
            let bytes = read_attribute(&reader, attribute).ok_or_else(|| missing(attribute))?;
            self.engine
                .upload_vertex_attribute(binding.vertex_buffer, attribute, &bytes)?;
        }

        if let Some((buffer, index_type)) = binding.index_buffer {
            let indices: Vec<u32> = reader
                .read_indices()
                .ok_or(AssetError::MissingIndexData {
                    mesh: binding.mesh,
                    primitive: binding.primitive,
                })?
                .into_u32()
                .collect();
            let bytes = match index_type {
                IndexType::U16 => {
                    let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                    bytemuck::cast_slice(&narrow).to_vec()
                }
                IndexType::U32 => bytemuck::cast_slice(&indices).to_vec(),
            };
            self.engine.upload_indices(buffer, &bytes)?;
        }
        Ok(())
    }

    /// Decode every image referenced by a material binding, once per image,
    /// and assign it to its sampler parameter. Returns the number of
    /// textures created.
    fn load_textures(
        &self,
        textures: &mut Vec<Handle<Texture>>,
        source: &SourceData,
        buffers: &[Cow<'_, [u8]>],
    ) -> Result<usize, AssetError> {
        let mut by_image: HashMap<usize, Handle<Texture>> = HashMap::new();

        for binding in &source.textures {
            let Some(texture) = source.gltf.document.textures().nth(binding.texture) else {
                continue;
            };
            let image = texture.source();
            let handle = match by_image.get(&image.index()) {
                Some(&handle) => handle,
                None => {
                    let handle = self.create_texture(textures, &image, buffers)?;
                    by_image.insert(image.index(), handle);
                    handle
                }
            };
            self.engine.set_parameter(
                binding.instance,
                binding.parameter,
                ParamValue::Texture {
                    texture: handle,
                    sampler: sampler_desc(&texture.sampler()),
                },
            )?;
        }
        Ok(by_image.len())
    }

    fn create_texture(
        &self,
        textures: &mut Vec<Handle<Texture>>,
        image: &gltf::Image<'_>,
        buffers: &[Cow<'_, [u8]>],
    ) -> Result<Handle<Texture>, AssetError> {
        let encoded: Cow<'_, [u8]> = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let index = view.buffer().index();
                let buffer = buffers.get(index).map(|b| &b[..]).unwrap_or_default();
                let end = view.offset() + view.length();
                let bytes = buffer
                    .get(view.offset()..end)
                    .ok_or(AssetError::BufferTooShort {
                        index,
                        expected: end,
                        actual: buffer.len(),
                    })?;
                Cow::Borrowed(bytes)
            }
            gltf::image::Source::Uri { uri, .. } => Cow::Owned(self.read_uri(uri)?),
        };

        let pixels = ::image::load_from_memory(&encoded)
            .map_err(|e| AssetError::ImageDecode(image.index(), e))?
            .to_rgba8();
        let (width, height) = pixels.dimensions();
        let handle = self.engine.create_texture(TextureDesc {
            width,
            height,
            format: TextureFormat::Rgba8,
        });
        textures.push(handle);
        self.engine.upload_texture(handle, pixels.as_raw())?;
        debug!("image {} decoded as {width}x{height} {handle}", image.index());
        Ok(handle)
    }
}

fn read_attribute<'a, 's, F>(reader: &Reader<'a, 's, F>, attribute: VertexAttribute) -> Option<Vec<u8>>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let bytes = match attribute {
        VertexAttribute::Position => cast(reader.read_positions()?.collect::<Vec<_>>()),
        VertexAttribute::Normal => cast(reader.read_normals()?.collect::<Vec<_>>()),
        VertexAttribute::Tangent => cast(reader.read_tangents()?.collect::<Vec<_>>()),
        VertexAttribute::Color => cast(reader.read_colors(0)?.into_rgba_f32().collect::<Vec<_>>()),
        VertexAttribute::Uv0 => cast(reader.read_tex_coords(0)?.into_f32().collect::<Vec<_>>()),
        VertexAttribute::Uv1 => cast(reader.read_tex_coords(1)?.into_f32().collect::<Vec<_>>()),
        VertexAttribute::BoneIndices => cast(reader.read_joints(0)?.into_u16().collect::<Vec<_>>()),
        VertexAttribute::BoneWeights => cast(reader.read_weights(0)?.into_f32().collect::<Vec<_>>()),
    };
    Some(bytes)
}

fn cast<T: bytemuck::Pod>(values: Vec<T>) -> Vec<u8> {
    bytemuck::cast_slice(&values).to_vec()
}

fn sampler_desc(sampler: &gltf::texture::Sampler<'_>) -> SamplerDesc {
    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::Repeat => SamplerWrap::Repeat,
        WrappingMode::MirroredRepeat => SamplerWrap::MirroredRepeat,
        WrappingMode::ClampToEdge => SamplerWrap::ClampToEdge,
    };
    let mag_filter = match sampler.mag_filter() {
        Some(MagFilter::Nearest) => SamplerFilter::Nearest,
        Some(MagFilter::Linear) | None => SamplerFilter::Linear,
    };
    let (min_filter, mipmaps) = match sampler.min_filter() {
        None => (SamplerFilter::Linear, true),
        Some(MinFilter::Nearest) => (SamplerFilter::Nearest, false),
        Some(MinFilter::Linear) => (SamplerFilter::Linear, false),
        Some(MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear) => {
            (SamplerFilter::Nearest, true)
        }
        Some(MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear) => {
            (SamplerFilter::Linear, true)
        }
    };
    SamplerDesc {
        wrap_s: wrap(sampler.wrap_s()),
        wrap_t: wrap(sampler.wrap_t()),
        mag_filter,
        min_filter,
        mipmaps,
    }
}
