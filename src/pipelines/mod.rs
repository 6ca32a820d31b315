//! wgpu pipeline construction for scene drawing.
//!
//! Every drawable goes through the same WGSL module with three bind groups:
//!
//! - group 0: per-frame [`GlobalsUniform`] (camera matrices and lights)
//! - group 1: per-material [`MaterialUniform`] with its colour map and sampler
//! - group 2: per-draw [`ObjectUniform`] at a dynamic offset
//!
//! Pipelines differ only in topology, blend state and depth mode, see [`PipelineKey`].

use std::num::NonZeroU64;

use crate::{
    data_structures::material::{BlendComponent, BlendFactor, Blending, DepthMode},
    render::Primitive,
};

pub mod basic;

/// The canonical vertex every geometry is de-interleaved into before upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl SceneVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4, 3 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Directions towards the two key lights, `w` unused.
    pub light_dir: [[f32; 4]; 2],
    pub light_color: [[f32; 4]; 2],
    pub ambient: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear colour with opacity folded into alpha.
    pub color: [f32; 4],
    /// alpha test threshold, vertex colours, lit, has colour map.
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub translation: [f32; 4],
    /// Sprite size in view units, zero for meshes and lines.
    pub sprite_scale: [f32; 4],
}

/// Everything that forces a separate render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub primitive: Primitive,
    pub blending: Option<Blending>,
    pub depth: DepthMode,
}

/// Bind group layouts shared by every scene pipeline.
#[derive(Debug)]
pub struct SceneLayouts {
    pub globals: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, dynamic: bool, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let globals = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, false, std::mem::size_of::<GlobalsUniform>() as u64)],
            label: Some("globals_bind_group_layout"),
        });
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, false, std::mem::size_of::<MaterialUniform>() as u64),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("material_bind_group_layout"),
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, true, std::mem::size_of::<ObjectUniform>() as u64)],
            label: Some("object_bind_group_layout"),
        });
        Self {
            globals,
            material,
            object,
        }
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
    }
}

fn blend_component(component: BlendComponent) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor: blend_factor(component.src),
        dst_factor: blend_factor(component.dst),
        operation: wgpu::BlendOperation::Add,
    }
}

pub fn blend_state(blending: Option<Blending>) -> Option<wgpu::BlendState> {
    blending.map(|b| wgpu::BlendState {
        color: blend_component(b.color),
        alpha: blend_component(b.alpha),
    })
}

/// Depth comparison and write flag of a depth mode.
pub fn depth_state(mode: DepthMode) -> (wgpu::CompareFunction, bool) {
    match mode {
        DepthMode::Normal => (wgpu::CompareFunction::LessEqual, true),
        DepthMode::Occluded => (wgpu::CompareFunction::Greater, false),
        DepthMode::Always => (wgpu::CompareFunction::Always, false),
    }
}
