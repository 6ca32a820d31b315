//! Builds gzip-compressed scene exports in memory.

use std::io::Write;

use flate2::{Compression, write::GzEncoder};
use flatbuffers::{FlatBufferBuilder, TableFinishedWIPOffset, WIPOffset};
use guide_scene_viewer::format::schema::*;

pub struct ElementSpec {
    pub usage: u8,
    pub type_: u8,
    pub count: i32,
    pub offset: i32,
    pub normalized: bool,
}

pub struct SamplerSpec {
    pub texture: Option<String>,
    pub texture_id: Option<String>,
    pub linear_filtering: bool,
    pub use_mipmaps: bool,
}

impl SamplerSpec {
    pub fn new(texture: &str) -> Self {
        Self {
            texture: Some(texture.to_string()),
            texture_id: None,
            linear_filtering: false,
            use_mipmaps: false,
        }
    }

    pub fn grouped(mut self, texture_id: &str) -> Self {
        self.texture_id = Some(texture_id.to_string());
        self
    }
}

pub struct MaterialSpec {
    pub name: String,
    pub shader_name: String,
    pub transparency: u8,
    pub samplers: Vec<SamplerSpec>,
}

pub struct MeshSpec {
    pub vertex_buffer: Option<Vec<u8>>,
    pub index_buffer: Option<Vec<u8>>,
    pub index_type: u8,
    pub elements: Vec<ElementSpec>,
    pub vertex_size: i32,
    pub has_vertex_format: bool,
    pub material: Option<MaterialSpec>,
}

impl MeshSpec {
    /// A unit quad on the XY plane spanning `[x, x + 1] x [y, y + 1]` with
    /// position and uv attributes.
    pub fn quad_at(x: f32, y: f32, material: MaterialSpec) -> Self {
        let vertices: [[f32; 5]; 4] = [
            [x, y, 0.0, 0.0, 0.0],
            [x + 1.0, y, 0.0, 1.0, 0.0],
            [x + 1.0, y + 1.0, 0.0, 1.0, 1.0],
            [x, y + 1.0, 0.0, 0.0, 1.0],
        ];
        let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
        Self {
            vertex_buffer: Some(bytemuck::cast_slice(&vertices).to_vec()),
            index_buffer: Some(bytemuck::cast_slice(&indices).to_vec()),
            index_type: INDEX_TYPE_USHORT,
            elements: vec![
                ElementSpec {
                    usage: ELEMENT_USAGE_POSITION,
                    type_: ELEMENT_TYPE_FLOAT,
                    count: 3,
                    offset: 0,
                    normalized: false,
                },
                ElementSpec {
                    usage: ELEMENT_USAGE_UV,
                    type_: ELEMENT_TYPE_FLOAT,
                    count: 2,
                    offset: 12,
                    normalized: false,
                },
            ],
            vertex_size: 20,
            has_vertex_format: true,
            material: Some(material),
        }
    }

    pub fn quad(material: MaterialSpec) -> Self {
        Self::quad_at(0.0, 0.0, material)
    }
}

pub fn material(shader_name: &str, transparency: u8, samplers: Vec<SamplerSpec>) -> MaterialSpec {
    MaterialSpec {
        name: format!("{shader_name}-material"),
        shader_name: shader_name.to_string(),
        transparency,
        samplers,
    }
}

pub fn solid(texture: &str) -> MaterialSpec {
    material("rendertype_solid", TRANSPARENCY_DISABLED, vec![SamplerSpec::new(texture)])
}

pub struct AnimationSpec {
    pub texture_id: String,
    pub frames_path: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub frame_count: i32,
    pub frames_per_row: i32,
    pub frames: Vec<(i32, i32)>,
}

pub struct SceneSpec {
    pub meshes: Vec<MeshSpec>,
    /// `(yaw, pitch, roll, zoom)`; `None` omits the camera table.
    pub camera: Option<[f32; 4]>,
    pub animated_textures: Vec<AnimationSpec>,
}

impl SceneSpec {
    pub fn new(meshes: Vec<MeshSpec>) -> Self {
        Self {
            meshes,
            camera: Some([45.0, 30.0, 0.0, 1.0]),
            animated_textures: Vec::new(),
        }
    }

    /// The uncompressed flatbuffer.
    pub fn to_flatbuffer(&self) -> Vec<u8> {
        let mut fbb = FlatBufferBuilder::new();

        let meshes: Vec<_> = self.meshes.iter().map(|m| build_mesh(&mut fbb, m)).collect();
        let meshes = fbb.create_vector(&meshes);

        let animations: Vec<_> = self
            .animated_textures
            .iter()
            .map(|a| build_animation(&mut fbb, a))
            .collect();
        let animations = fbb.create_vector(&animations);

        let camera = self.camera.map(|[yaw, pitch, roll, zoom]| {
            let start = fbb.start_table();
            fbb.push_slot::<f32>(ExpCameraSettings::VT_YAW, yaw, 0.0);
            fbb.push_slot::<f32>(ExpCameraSettings::VT_PITCH, pitch, 0.0);
            fbb.push_slot::<f32>(ExpCameraSettings::VT_ROLL, roll, 0.0);
            fbb.push_slot::<f32>(ExpCameraSettings::VT_ZOOM, zoom, 1.0);
            fbb.end_table(start)
        });

        let start = fbb.start_table();
        fbb.push_slot_always(ExpScene::VT_MESHES, meshes);
        if let Some(camera) = camera {
            fbb.push_slot_always(ExpScene::VT_CAMERA, camera);
        }
        fbb.push_slot_always(ExpScene::VT_ANIMATED_TEXTURES, animations);
        let root = fbb.end_table(start);
        fbb.finish(root, None);
        fbb.finished_data().to_vec()
    }

    /// The scene as it is served: gzip framed.
    pub fn to_gzip(&self) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.to_flatbuffer()).unwrap();
        encoder.finish().unwrap()
    }
}

fn build_mesh<'a>(fbb: &mut FlatBufferBuilder<'a>, mesh: &MeshSpec) -> WIPOffset<TableFinishedWIPOffset> {
    let vertex_buffer = mesh.vertex_buffer.as_ref().map(|b| fbb.create_vector(b));
    let index_buffer = mesh.index_buffer.as_ref().map(|b| fbb.create_vector(b));

    let vertex_format = mesh.has_vertex_format.then(|| {
        let elements: Vec<_> = mesh
            .elements
            .iter()
            .map(|e| {
                let start = fbb.start_table();
                fbb.push_slot::<u8>(ExpVertexFormatElement::VT_USAGE, e.usage, 0);
                fbb.push_slot::<u8>(ExpVertexFormatElement::VT_TYPE_, e.type_, 0);
                fbb.push_slot::<i32>(ExpVertexFormatElement::VT_COUNT, e.count, 0);
                fbb.push_slot::<i32>(ExpVertexFormatElement::VT_OFFSET, e.offset, 0);
                fbb.push_slot::<bool>(ExpVertexFormatElement::VT_NORMALIZED, e.normalized, false);
                fbb.end_table(start)
            })
            .collect();
        let elements = fbb.create_vector(&elements);
        let start = fbb.start_table();
        fbb.push_slot_always(ExpVertexFormat::VT_ELEMENTS, elements);
        fbb.push_slot::<i32>(ExpVertexFormat::VT_VERTEX_SIZE, mesh.vertex_size, 0);
        fbb.end_table(start)
    });

    let material = mesh.material.as_ref().map(|m| build_material(fbb, m));

    let start = fbb.start_table();
    if let Some(vertex_buffer) = vertex_buffer {
        fbb.push_slot_always(ExpMesh::VT_VERTEX_BUFFER, vertex_buffer);
    }
    if let Some(index_buffer) = index_buffer {
        fbb.push_slot_always(ExpMesh::VT_INDEX_BUFFER, index_buffer);
    }
    fbb.push_slot::<u8>(ExpMesh::VT_INDEX_TYPE, mesh.index_type, 0);
    if let Some(vertex_format) = vertex_format {
        fbb.push_slot_always(ExpMesh::VT_VERTEX_FORMAT, vertex_format);
    }
    if let Some(material) = material {
        fbb.push_slot_always(ExpMesh::VT_MATERIAL, material);
    }
    fbb.end_table(start)
}

fn build_material<'a>(fbb: &mut FlatBufferBuilder<'a>, material: &MaterialSpec) -> WIPOffset<TableFinishedWIPOffset> {
    let samplers: Vec<_> = material
        .samplers
        .iter()
        .map(|s| {
            let texture = s.texture.as_deref().map(|t| fbb.create_string(t));
            let texture_id = s.texture_id.as_deref().map(|t| fbb.create_string(t));
            let start = fbb.start_table();
            if let Some(texture) = texture {
                fbb.push_slot_always(ExpSampler::VT_TEXTURE, texture);
            }
            if let Some(texture_id) = texture_id {
                fbb.push_slot_always(ExpSampler::VT_TEXTURE_ID, texture_id);
            }
            fbb.push_slot::<bool>(ExpSampler::VT_LINEAR_FILTERING, s.linear_filtering, false);
            fbb.push_slot::<bool>(ExpSampler::VT_USE_MIPMAPS, s.use_mipmaps, false);
            fbb.end_table(start)
        })
        .collect();
    let samplers = fbb.create_vector(&samplers);
    let name = fbb.create_string(&material.name);
    let shader_name = fbb.create_string(&material.shader_name);

    let start = fbb.start_table();
    fbb.push_slot_always(ExpMaterial::VT_NAME, name);
    fbb.push_slot_always(ExpMaterial::VT_SHADER_NAME, shader_name);
    fbb.push_slot::<u8>(ExpMaterial::VT_TRANSPARENCY, material.transparency, TRANSPARENCY_DISABLED);
    fbb.push_slot_always(ExpMaterial::VT_SAMPLERS, samplers);
    fbb.end_table(start)
}

fn build_animation<'a>(fbb: &mut FlatBufferBuilder<'a>, part: &AnimationSpec) -> WIPOffset<TableFinishedWIPOffset> {
    let frames: Vec<_> = part
        .frames
        .iter()
        .map(|&(index, time)| {
            let start = fbb.start_table();
            fbb.push_slot::<i32>(ExpAnimatedTexturePartFrame::VT_INDEX, index, 0);
            fbb.push_slot::<i32>(ExpAnimatedTexturePartFrame::VT_TIME, time, 0);
            fbb.end_table(start)
        })
        .collect();
    let frames = fbb.create_vector(&frames);
    let texture_id = fbb.create_string(&part.texture_id);
    let frames_path = fbb.create_string(&part.frames_path);

    let start = fbb.start_table();
    fbb.push_slot_always(ExpAnimatedTexturePart::VT_TEXTURE_ID, texture_id);
    fbb.push_slot_always(ExpAnimatedTexturePart::VT_FRAMES_PATH, frames_path);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_X, part.x, 0);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_Y, part.y, 0);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_WIDTH, part.width, 0);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_HEIGHT, part.height, 0);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_FRAME_COUNT, part.frame_count, 0);
    fbb.push_slot::<i32>(ExpAnimatedTexturePart::VT_FRAMES_PER_ROW, part.frames_per_row, 0);
    fbb.push_slot_always(ExpAnimatedTexturePart::VT_FRAMES, frames);
    fbb.end_table(start)
}

/// PNG bytes of a `width x height` image.
pub fn png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| image::Rgba(pixel(x, y)));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// 2x2 black and white checkerboard.
pub fn checkerboard() -> Vec<u8> {
    png(2, 2, |x, y| if (x + y) % 2 == 0 { [255; 4] } else { [0, 0, 0, 255] })
}
