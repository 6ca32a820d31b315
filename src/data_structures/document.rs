//! In-memory form of a decoded scene container.
//!
//! # Key types
//! - [`SceneDocument`]: meshes, camera and animated texture descriptors
//! - [`MeshRecord`]: raw vertex/index bytes plus their declared layout
//! - [`MaterialRecord`]: shader name, transparency mode and samplers
//!
//! A document is immutable once decoded and is consumed by the scene assembler.

use cgmath::{Deg, Quaternion, Rotation, Rotation3, Vector3};

use super::buffer::ByteBuffer;

#[derive(Clone, Debug)]
pub struct SceneDocument {
    pub meshes: Vec<MeshRecord>,
    pub camera: CameraSettings,
    pub animated_textures: Vec<AnimatedTextureDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn byte_width(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeshRecord {
    pub vertex_buffer: ByteBuffer,
    pub index_buffer: ByteBuffer,
    pub index_type: IndexType,
    pub vertex_format: VertexFormat,
    pub material: MaterialRecord,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexFormat {
    pub elements: Vec<VertexElement>,
    /// Stride of one vertex in bytes.
    pub vertex_size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexUsage {
    Position,
    Normal,
    Color,
    Uv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    F32,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl ComponentType {
    pub fn byte_width(self) -> u32 {
        match self {
            ComponentType::U8 | ComponentType::I8 => 1,
            ComponentType::U16 | ComponentType::I16 => 2,
            ComponentType::F32 | ComponentType::U32 | ComponentType::I32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexElement {
    pub usage: VertexUsage,
    pub component_type: ComponentType,
    pub count: u32,
    pub offset: u32,
    pub normalized: bool,
    /// Second and later channels of the same usage (e.g. lightmap UVs) are not used.
    pub index: u32,
}

/// Transparency modes of the exporting game, each tied to one fixed blend setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Transparency {
    #[default]
    Disabled,
    Additive,
    Lightning,
    Glint,
    Crumbling,
    Translucent,
}

impl Transparency {
    pub const ALL: [Transparency; 6] = [
        Transparency::Disabled,
        Transparency::Additive,
        Transparency::Lightning,
        Transparency::Glint,
        Transparency::Crumbling,
        Transparency::Translucent,
    ];
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialRecord {
    pub name: Option<String>,
    pub shader_name: Option<String>,
    pub transparency: Transparency,
    pub samplers: Vec<SamplerRecord>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SamplerRecord {
    pub texture: Option<String>,
    /// Shared texture group; animated parts locate their targets through it.
    pub texture_id: Option<String>,
    pub linear_filtering: bool,
    pub use_mipmaps: bool,
}

/// Viewpoint of the export, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub zoom: f32,
}

impl CameraSettings {
    /// The camera orbits a fixed subject, so the scene angles are applied negated:
    /// yaw outermost, then pitch, roll innermost.
    pub fn orbit_rotation(&self) -> Quaternion<f32> {
        let yaw = Quaternion::from_angle_y(Deg(-self.yaw));
        let pitch = Quaternion::from_angle_x(Deg(-self.pitch));
        let roll = Quaternion::from_angle_z(Deg(-self.roll));
        yaw * pitch * roll
    }

    /// Camera position for a subject centered at the origin.
    pub fn orbit_position(&self, distance: f32) -> Vector3<f32> {
        self.orbit_rotation()
            .rotate_vector(Vector3::new(0.0, 0.0, distance))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedTextureDescriptor {
    pub texture_id: String,
    pub frames_path: String,
    /// Target region origin inside the shared texture.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub frames_per_row: u32,
    pub frames: Vec<AnimationFrame>,
}

/// One playback step: which stored frame to show and for how many ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationFrame {
    pub index: u32,
    pub time: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn identity_camera_stays_on_z() {
        let camera = CameraSettings {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            zoom: 1.0,
        };
        let pos = camera.orbit_position(15.0);
        assert!(approx(pos.x, 0.0) && approx(pos.y, 0.0) && approx(pos.z, 15.0));
    }

    #[test]
    fn yaw_and_pitch_orbit_the_camera() {
        let camera = CameraSettings {
            yaw: 45.0,
            pitch: 30.0,
            roll: 0.0,
            zoom: 1.0,
        };
        let pos = camera.orbit_position(15.0);
        assert!(approx(pos.x, -9.1856), "{pos:?}");
        assert!(approx(pos.y, 7.5), "{pos:?}");
        assert!(approx(pos.z, 9.1856), "{pos:?}");
    }
}
