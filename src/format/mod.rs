//! Reader for gzip-compressed flatbuffer scene exports.
//!
//! Decoding is tolerant at the mesh level and strict at the document level: a
//! mesh with missing buffers, a missing vertex format or an unknown index type
//! is logged and dropped, while a scene without camera settings cannot be shown
//! at all and fails with [`DecodeError::MissingCamera`].

use std::io::Read;

use flate2::read::GzDecoder;

use crate::{
    data_structures::{
        buffer::ByteBuffer,
        document::{
            AnimatedTextureDescriptor, AnimationFrame, CameraSettings, ComponentType, IndexType,
            MaterialRecord, MeshRecord, SamplerRecord, SceneDocument, Transparency, VertexElement,
            VertexFormat, VertexUsage,
        },
    },
    error::DecodeError,
};

pub mod schema;

use schema::*;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Inflates a gzip stream. Bytes without the gzip magic are returned as they are,
/// since some transports already strip the content encoding.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        log::debug!("Scene payload is not gzip framed, reading it as is");
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Decompress(e.to_string()))?;
    Ok(out)
}

/// Decompresses and decodes a whole scene.
pub fn decode_scene(compressed: &[u8]) -> Result<SceneDocument, DecodeError> {
    let bytes = decompress(compressed)?;
    log::debug!(
        "Scene is {} bytes compressed, {} bytes uncompressed",
        compressed.len(),
        bytes.len()
    );
    decode_document(&bytes)
}

/// Decodes an already decompressed flatbuffer.
pub fn decode_document(bytes: &[u8]) -> Result<SceneDocument, DecodeError> {
    let scene = root_as_scene(bytes)?;

    let camera = scene.camera().ok_or(DecodeError::MissingCamera)?;
    let camera = CameraSettings {
        yaw: camera.yaw(),
        pitch: camera.pitch(),
        roll: camera.roll(),
        zoom: camera.zoom(),
    };

    let mut meshes = Vec::new();
    let mut skipped = 0;
    if let Some(exp_meshes) = scene.meshes() {
        for (i, exp_mesh) in exp_meshes.iter().enumerate() {
            match read_mesh(&exp_mesh) {
                Some(mesh) => meshes.push(mesh),
                None => {
                    log::warn!("Skipping mesh {i}");
                    skipped += 1;
                }
            }
        }
    }

    let animated_textures = scene
        .animated_textures()
        .map(|parts| parts.iter().filter_map(|part| read_animated_texture(&part)).collect())
        .unwrap_or_default();

    log::debug!("Decoded {} meshes, skipped {}", meshes.len(), skipped);

    Ok(SceneDocument {
        meshes,
        camera,
        animated_textures,
    })
}

fn read_mesh(exp_mesh: &ExpMesh) -> Option<MeshRecord> {
    let Some(vertex_buffer) = exp_mesh.vertex_buffer() else {
        log::warn!("Mesh has no vertex buffer");
        return None;
    };
    let Some(index_buffer) = exp_mesh.index_buffer() else {
        log::warn!("Mesh has no index buffer");
        return None;
    };
    let Some(exp_format) = exp_mesh.vertex_format() else {
        log::warn!("Mesh has no vertex format");
        return None;
    };
    let index_type = match exp_mesh.index_type() {
        INDEX_TYPE_UINT => IndexType::U32,
        INDEX_TYPE_USHORT => IndexType::U16,
        other => {
            log::warn!("Unsupported index type {other}");
            return None;
        }
    };

    let elements = exp_format
        .elements()
        .map(|elements| elements.iter().filter_map(|e| read_element(&e)).collect())
        .unwrap_or_default();

    let material = exp_mesh
        .material()
        .map(|m| read_material(&m))
        .unwrap_or_default();

    Some(MeshRecord {
        vertex_buffer: ByteBuffer::from_bytes(vertex_buffer.bytes()),
        index_buffer: ByteBuffer::from_bytes(index_buffer.bytes()),
        index_type,
        vertex_format: VertexFormat {
            elements,
            vertex_size: exp_format.vertex_size().max(0) as u32,
        },
        material,
    })
}

fn read_element(element: &ExpVertexFormatElement) -> Option<VertexElement> {
    if element.index() != 0 {
        return None;
    }
    let usage = match element.usage() {
        ELEMENT_USAGE_POSITION => VertexUsage::Position,
        ELEMENT_USAGE_NORMAL => VertexUsage::Normal,
        ELEMENT_USAGE_COLOR => VertexUsage::Color,
        ELEMENT_USAGE_UV => VertexUsage::Uv,
        other => {
            log::debug!("Ignoring vertex element with usage {other}");
            return None;
        }
    };
    let component_type = match element.type_() {
        ELEMENT_TYPE_FLOAT => ComponentType::F32,
        ELEMENT_TYPE_UBYTE => ComponentType::U8,
        ELEMENT_TYPE_BYTE => ComponentType::I8,
        ELEMENT_TYPE_USHORT => ComponentType::U16,
        ELEMENT_TYPE_SHORT => ComponentType::I16,
        ELEMENT_TYPE_UINT => ComponentType::U32,
        ELEMENT_TYPE_INT => ComponentType::I32,
        other => {
            log::warn!("Ignoring vertex element with type {other}");
            return None;
        }
    };
    Some(VertexElement {
        usage,
        component_type,
        count: element.count().max(0) as u32,
        offset: element.offset().max(0) as u32,
        normalized: element.normalized(),
        index: 0,
    })
}

fn read_material(material: &ExpMaterial) -> MaterialRecord {
    let transparency = match material.transparency() {
        TRANSPARENCY_DISABLED => Transparency::Disabled,
        TRANSPARENCY_ADDITIVE => Transparency::Additive,
        TRANSPARENCY_LIGHTNING => Transparency::Lightning,
        TRANSPARENCY_GLINT => Transparency::Glint,
        TRANSPARENCY_CRUMBLING => Transparency::Crumbling,
        TRANSPARENCY_TRANSLUCENT => Transparency::Translucent,
        other => {
            log::warn!("Unknown transparency {other}, drawing opaque");
            Transparency::Disabled
        }
    };
    let samplers = material
        .samplers()
        .map(|samplers| {
            samplers
                .iter()
                .map(|sampler| SamplerRecord {
                    texture: sampler.texture().map(str::to_string),
                    texture_id: sampler.texture_id().map(str::to_string),
                    linear_filtering: sampler.linear_filtering(),
                    use_mipmaps: sampler.use_mipmaps(),
                })
                .collect()
        })
        .unwrap_or_default();
    MaterialRecord {
        name: material.name().map(str::to_string),
        shader_name: material.shader_name().map(str::to_string),
        transparency,
        samplers,
    }
}

fn read_animated_texture(part: &ExpAnimatedTexturePart) -> Option<AnimatedTextureDescriptor> {
    let (Some(texture_id), Some(frames_path)) = (part.texture_id(), part.frames_path()) else {
        log::warn!("Animated texture without texture id or frames path");
        return None;
    };
    let frames = part
        .frames()
        .map(|frames| {
            frames
                .iter()
                .map(|f| AnimationFrame {
                    index: f.index().max(0) as u32,
                    time: f.time().max(0) as u32,
                })
                .collect()
        })
        .unwrap_or_default();
    Some(AnimatedTextureDescriptor {
        texture_id: texture_id.to_string(),
        frames_path: frames_path.to_string(),
        x: part.x().max(0) as u32,
        y: part.y().max(0) as u32,
        width: part.width().max(0) as u32,
        height: part.height().max(0) as u32,
        frame_count: part.frame_count().max(0) as u32,
        frames_per_row: part.frames_per_row().max(0) as u32,
        frames,
    })
}
