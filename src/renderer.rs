//! The wgpu implementation of [`Renderer`].
//!
//! GPU objects are created lazily the first time a scene object is drawn and are
//! cached by the object's id: geometry buffers, uploaded textures, material bind
//! groups and render pipelines. A renderer belongs to one viewer session, so the
//! caches only ever grow until [`Renderer::dispose`] releases everything at once.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use cgmath::{Vector4, Zero};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::OrthographicCamera,
    context::GpuContext,
    data_structures::{
        annotation::Color,
        document::VertexUsage,
        geometry::Geometry,
        material::{Material, Shading},
        scene_graph::Scene,
        texture::{GpuTexture, ImageBitmap, SamplerConfig, Texture},
    },
    error::ViewerError,
    pipelines::{
        GlobalsUniform, MaterialUniform, ObjectUniform, PipelineKey, SceneLayouts, SceneVertex,
        basic::{mk_scene_pipeline, mk_scene_pipeline_layout, scene_shader},
    },
    render::{DrawItem, Renderer, SurfaceId, collect_draws, effective_blending},
};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

struct GpuMesh {
    vertex: wgpu::Buffer,
    index: Option<wgpu::Buffer>,
    count: u32,
}

impl GpuMesh {
    fn destroy(&self) {
        self.vertex.destroy();
        if let Some(index) = &self.index {
            index.destroy();
        }
    }
}

struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Per-draw uniforms, one slot per draw item at an aligned dynamic offset.
struct ObjectSlots {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
    stride: u64,
}

impl ObjectSlots {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let size = std::mem::size_of::<ObjectUniform>() as u64;
        let stride = size.div_ceil(alignment) * alignment;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object uniforms"),
            size: stride * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size),
                }),
            }],
            label: Some("object_bind_group"),
        });
        Self {
            buffer,
            bind_group,
            capacity: capacity.max(1),
            stride,
        }
    }
}

pub struct WgpuRenderer {
    ctx: GpuContext,
    id: SurfaceId,
    logical_size: [u32; 2],
    pixel_ratio: f32,
    background: Option<Color>,
    layouts: SceneLayouts,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    globals: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    objects: ObjectSlots,
    sprite_quad: GpuMesh,
    white: GpuTexture,
    meshes: HashMap<u64, Option<GpuMesh>>,
    textures: HashMap<u64, GpuTexture>,
    materials: HashMap<u64, GpuMaterial>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    disposed: bool,
}

impl WgpuRenderer {
    pub async fn for_window(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let ratio = window.scale_factor() as f32;
        let ctx = GpuContext::for_window(window).await?;
        let logical = [
            (size.width as f32 / ratio).round() as u32,
            (size.height as f32 / ratio).round() as u32,
        ];
        Ok(Self::new(ctx, logical, ratio))
    }

    /// Renders into an offscreen texture of `size` pixels; see [`read_pixels`](Self::read_pixels).
    pub async fn headless(size: [u32; 2]) -> anyhow::Result<Self> {
        let ctx = GpuContext::headless(size).await?;
        Ok(Self::new(ctx, size, 1.0))
    }

    fn new(ctx: GpuContext, logical_size: [u32; 2], pixel_ratio: f32) -> Self {
        let device = &ctx.device;
        let layouts = SceneLayouts::new(device);
        let shader = device.create_shader_module(scene_shader());
        let pipeline_layout = mk_scene_pipeline_layout(device, &layouts);

        let globals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[GlobalsUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.globals,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });
        let objects = ObjectSlots::new(device, &layouts.object, 64);

        let white = GpuTexture::from_texture(
            device,
            &ctx.queue,
            &Texture::new(
                "white",
                std::rc::Rc::new(ImageBitmap::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))),
                SamplerConfig::new(false, false),
            ),
        );
        let sprite_quad = upload_vertices(device, "sprite quad", &sprite_quad_vertices(), None);

        Self {
            ctx,
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            logical_size,
            pixel_ratio,
            background: None,
            layouts,
            shader,
            pipeline_layout,
            globals,
            globals_bind_group,
            objects,
            sprite_quad,
            white,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
            pipelines: HashMap::new(),
            disposed: false,
        }
    }

    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        self.ctx.read_pixels().await
    }

    fn physical_size(&self) -> [u32; 2] {
        [
            (self.logical_size[0] as f32 * self.pixel_ratio).round() as u32,
            (self.logical_size[1] as f32 * self.pixel_ratio).round() as u32,
        ]
    }

    fn upload_texture(&mut self, texture: &Texture) {
        if !self.textures.contains_key(&texture.id()) {
            log::debug!("Uploading texture {} ({}x{})", texture.label(), texture.width(), texture.height());
            let gpu = GpuTexture::from_texture(&self.ctx.device, &self.ctx.queue, texture);
            self.textures.insert(texture.id(), gpu);
        }
    }

    fn prepare(&mut self, item: &DrawItem<'_>) {
        if let Some(geometry) = item.geometry {
            self.meshes
                .entry(geometry.id())
                .or_insert_with(|| upload_geometry(&self.ctx.device, geometry));
        }

        let material = item.material;
        if let Some(map) = &material.map {
            self.upload_texture(map);
        }
        if !self.materials.contains_key(&material.id()) {
            let texture = material
                .map
                .as_ref()
                .and_then(|map| self.textures.get(&map.id()))
                .unwrap_or(&self.white);
            let gpu = create_material(&self.ctx.device, &self.layouts.material, material, texture);
            self.materials.insert(material.id(), gpu);
        }

        let key = PipelineKey {
            primitive: item.primitive,
            blending: effective_blending(material),
            depth: material.depth,
        };
        if !self.pipelines.contains_key(&key) {
            log::debug!("Creating pipeline {key:?}");
            let pipeline = mk_scene_pipeline(
                &self.ctx.device,
                &self.pipeline_layout,
                &self.shader,
                self.ctx.format,
                key,
            );
            self.pipelines.insert(key, pipeline);
        }
    }

    fn write_globals(&self, scene: &Scene, camera: &OrthographicCamera) {
        let lights = scene.lights();
        let mut uniform = GlobalsUniform {
            view: camera.view_matrix().into(),
            projection: camera.projection_matrix().into(),
            ambient: [lights.ambient[0], lights.ambient[1], lights.ambient[2], 0.0],
            ..Default::default()
        };
        for (i, (direction, color)) in lights.directional.iter().take(2).enumerate() {
            uniform.light_dir[i] = [direction.x, direction.y, direction.z, 0.0];
            uniform.light_color[i] = [color[0], color[1], color[2], 0.0];
        }
        self.ctx
            .queue
            .write_buffer(&self.globals, 0, bytemuck::cast_slice(&[uniform]));
    }

    fn write_objects(&mut self, draws: &[DrawItem<'_>]) {
        if draws.len() > self.objects.capacity {
            self.objects.buffer.destroy();
            self.objects = ObjectSlots::new(
                &self.ctx.device,
                &self.layouts.object,
                draws.len().next_power_of_two(),
            );
        }
        let stride = self.objects.stride as usize;
        let mut bytes = vec![0u8; stride * draws.len()];
        for (i, item) in draws.iter().enumerate() {
            let t = item.translation;
            let uniform = ObjectUniform {
                translation: [t.x, t.y, t.z, 1.0],
                sprite_scale: [item.sprite_scale[0], item.sprite_scale[1], 0.0, 0.0],
            };
            bytes[i * stride..i * stride + std::mem::size_of::<ObjectUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !bytes.is_empty() {
            self.ctx.queue.write_buffer(&self.objects.buffer, 0, &bytes);
        }
    }
}

impl Renderer for WgpuRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = [width, height];
        if !self.disposed {
            self.ctx.resize(self.physical_size());
        }
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = if ratio > 0.0 { ratio } else { 1.0 };
        if !self.disposed {
            self.ctx.resize(self.physical_size());
        }
    }

    fn set_background(&mut self, color: Option<Color>) {
        self.background = color;
    }

    fn render(&mut self, scene: &Scene, camera: &OrthographicCamera) -> Result<(), ViewerError> {
        if self.disposed {
            return Ok(());
        }
        let draws = collect_draws(scene, camera);
        for item in &draws {
            self.prepare(item);
        }
        self.write_globals(scene, camera);
        self.write_objects(&draws);

        let Some(frame) = self.ctx.acquire().map_err(ViewerError::renderer)? else {
            return Ok(());
        };
        let clear = match self.background {
            Some(c) => wgpu::Color {
                r: f64::from(c.r),
                g: f64::from(c.g),
                b: f64::from(c.b),
                a: f64::from(c.a),
            },
            None => wgpu::Color::TRANSPARENT,
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_bind_group(0, &self.globals_bind_group, &[]);

            for (i, item) in draws.iter().enumerate() {
                let mesh = match item.geometry {
                    Some(geometry) => self.meshes.get(&geometry.id()).and_then(Option::as_ref),
                    None => Some(&self.sprite_quad),
                };
                let (Some(mesh), Some(material)) = (mesh, self.materials.get(&item.material.id())) else {
                    continue;
                };
                let key = PipelineKey {
                    primitive: item.primitive,
                    blending: effective_blending(item.material),
                    depth: item.material.depth,
                };
                let Some(pipeline) = self.pipelines.get(&key) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &material.bind_group, &[]);
                pass.set_bind_group(2, &self.objects.bind_group, &[(i as u64 * self.objects.stride) as u32]);
                pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                match &mesh.index {
                    Some(index) => {
                        pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..mesh.count, 0, 0..1);
                    }
                    None => pass.draw(0..mesh.count, 0..1),
                }
            }
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn copy_texture_region(&mut self, source: &Texture, target: &Texture, x: u32, y: u32) {
        if self.disposed {
            return;
        }
        self.upload_texture(source);
        self.upload_texture(target);
        let (Some(src), Some(dst)) = (self.textures.get(&source.id()), self.textures.get(&target.id())) else {
            return;
        };
        // clip to the target, a copy overrunning it is a validation error
        let width = source.width().min(target.width().saturating_sub(x));
        let height = source.height().min(target.height().saturating_sub(y));
        if width == 0 || height == 0 {
            return;
        }
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blit Encoder"),
            });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &src.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &dst.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn surface(&self) -> SurfaceId {
        self.id
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        log::info!(
            "Disposing renderer {}: {} meshes, {} textures, {} materials, {} pipelines",
            self.id,
            self.meshes.len(),
            self.textures.len(),
            self.materials.len(),
            self.pipelines.len()
        );
        for mesh in self.meshes.drain().filter_map(|(_, mesh)| mesh) {
            mesh.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
        for (_, material) in self.materials.drain() {
            material.uniform.destroy();
        }
        self.pipelines.clear();
        self.sprite_quad.destroy();
        self.white.texture.destroy();
        self.objects.buffer.destroy();
        self.globals.destroy();
        self.ctx.destroy();
    }
}

fn upload_vertices(
    device: &wgpu::Device,
    label: &str,
    vertices: &[SceneVertex],
    indices: Option<&[u32]>,
) -> GpuMesh {
    let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index = indices.map(|indices| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        })
    });
    let count = indices.map_or(vertices.len(), <[u32]>::len) as u32;
    GpuMesh { vertex, index, count }
}

fn upload_geometry(device: &wgpu::Device, geometry: &Geometry) -> Option<GpuMesh> {
    let vertices = scene_vertices(geometry);
    if vertices.is_empty() {
        log::warn!("Geometry {} has no vertices", geometry.id());
        return None;
    }
    let indices: Option<Vec<u32>> = geometry.index.as_ref().map(|index| {
        index
            .iter()
            .filter(|i| (*i as usize) < vertices.len())
            .collect()
    });
    let label = format!("geometry {}", geometry.id());
    Some(upload_vertices(device, &label, &vertices, indices.as_deref()))
}

/// De-interleaves every attribute of `geometry` into canonical float vertices.
/// Missing colours are white, missing normals zero.
pub fn scene_vertices(geometry: &Geometry) -> Vec<SceneVertex> {
    let zero = Vector4::zero();
    let white = Vector4::new(1.0, 1.0, 1.0, 1.0);
    let read = |usage: VertexUsage, vertex: usize, fill: Vector4<f32>| {
        geometry
            .attribute(usage)
            .map_or(fill, |attr| attr.vec4(vertex, fill))
    };
    (0..geometry.vertex_count())
        .map(|v| {
            let p = read(VertexUsage::Position, v, zero);
            let n = read(VertexUsage::Normal, v, zero);
            let c = read(VertexUsage::Color, v, white);
            let uv = read(VertexUsage::Uv, v, zero);
            SceneVertex {
                position: [p.x, p.y, p.z],
                normal: [n.x, n.y, n.z],
                color: [c.x, c.y, c.z, c.w],
                uv: [uv.x, uv.y],
            }
        })
        .collect()
}

/// Unit quad centered on the origin. Built-in icons are stored flipped, so the
/// top edge samples `v = 1`.
fn sprite_quad_vertices() -> Vec<SceneVertex> {
    let corner = |x: f32, y: f32, u: f32, v: f32| SceneVertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        color: [1.0; 4],
        uv: [u, v],
    };
    vec![
        corner(-0.5, -0.5, 0.0, 0.0),
        corner(0.5, -0.5, 1.0, 0.0),
        corner(0.5, 0.5, 1.0, 1.0),
        corner(-0.5, -0.5, 0.0, 0.0),
        corner(0.5, 0.5, 1.0, 1.0),
        corner(-0.5, 0.5, 0.0, 1.0),
    ]
}

pub fn material_uniform(material: &Material) -> MaterialUniform {
    let mut color = material.color.to_array();
    color[3] *= material.opacity;
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    MaterialUniform {
        color,
        params: [
            material.alpha_test,
            flag(material.vertex_colors),
            flag(material.shading == Shading::Diffuse),
            flag(material.map.is_some()),
        ],
    }
}

fn create_material(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    material: &Material,
    texture: &GpuTexture,
) -> GpuMaterial {
    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("material uniform"),
        contents: bytemuck::cast_slice(&[material_uniform(material)]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        },
    ];
    if let Some(sampler) = &texture.sampler {
        entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &entries,
        label: material.name.as_deref(),
    });
    GpuMaterial { uniform, bind_group }
}
