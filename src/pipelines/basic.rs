use crate::{
    data_structures::texture::GpuTexture,
    pipelines::{PipelineKey, SceneLayouts, SceneVertex, blend_state, depth_state},
    render::Primitive,
};

pub fn mk_scene_pipeline_layout(device: &wgpu::Device, layouts: &SceneLayouts) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.globals), Some(&layouts.material), Some(&layouts.object)],
        immediate_size: 0,
    })
}

pub fn scene_shader() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
    }
}

/**
 * Builds the pipeline for one combination of topology, blending and depth mode.
 *
 * Meshes cull back faces like the exported game does, lines and sprites are
 * never culled. Sprites use the `vs_sprite` entry point, which places the unit
 * quad in view space so it always faces the camera.
 */
pub fn mk_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let (topology, cull_mode, vs_entry) = match key.primitive {
        Primitive::Triangles => (wgpu::PrimitiveTopology::TriangleList, Some(wgpu::Face::Back), "vs_main"),
        Primitive::Lines => (wgpu::PrimitiveTopology::LineList, None, "vs_main"),
        Primitive::Sprite => (wgpu::PrimitiveTopology::TriangleList, None, "vs_sprite"),
    };
    let (depth_compare, depth_write_enabled) = depth_state(key.depth);
    mk_render_pipeline(
        device,
        layout,
        shader,
        RenderPipelineOptions {
            color_format,
            blend: blend_state(key.blending),
            depth_format: Some(GpuTexture::DEPTH_FORMAT),
            depth_compare,
            depth_write_enabled,
            topology,
            cull_mode,
            vs_entry,
        },
        &[SceneVertex::desc()],
    )
}

#[derive(Clone, Copy, Debug)]
pub struct RenderPipelineOptions<'a> {
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write_enabled: bool,
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub vs_entry: &'a str,
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    options: RenderPipelineOptions<'_>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(options.vs_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: options.color_format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: options.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: options.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(options.depth_write_enabled),
            depth_compare: Some(options.depth_compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
