//! GPU device setup and the render target.
//!
//! A [`GpuContext`] owns the wgpu device and queue plus whatever the frames are
//! drawn into: a window surface, or an offscreen texture for headless rendering
//! and snapshots.

use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use winit::window::Window;

use crate::data_structures::texture::GpuTexture;

#[derive(Debug)]
pub enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: GpuTexture,
    },
}

/// A frame being drawn: the view to render into and, for surfaces, the texture
/// to present afterwards.
pub struct Frame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl Frame {
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

#[derive(Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: RenderTarget,
    pub format: wgpu::TextureFormat,
    pub size: [u32; 2],
    pub depth: GpuTexture,
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::GL,
        ..wgpu::InstanceDescriptor::new_without_display_handle()
    })
}

async fn device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("no suitable GPU adapter")?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("scene viewer device"),
            // WebGL doesn't support all of wgpu's features
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await
        .context("failed to create the GPU device")?;
    Ok((adapter, device, queue))
}

impl GpuContext {
    /// Renders into a window surface. Colours are written unchanged, so a
    /// non-sRGB surface format is preferred.
    pub async fn for_window(window: Arc<Window>) -> anyhow::Result<Self> {
        let physical = window.inner_size();
        let size = [physical.width.max(1), physical.height.max(1)];
        let instance = instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| anyhow!("failed to create surface: {e}"))?;
        let (adapter, device, queue) = device(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == wgpu::CompositeAlphaMode::PreMultiplied || *m == wgpu::CompositeAlphaMode::PostMultiplied)
            .or_else(|| caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size[0],
            height: size[1],
            present_mode: caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth = GpuTexture::create_depth_texture(&device, size, "depth_texture");
        log::info!("Surface configured: {format:?} {}x{}", size[0], size[1]);

        Ok(Self {
            device,
            queue,
            target: RenderTarget::Surface { surface, config },
            format,
            size,
            depth,
        })
    }

    /// Renders into an offscreen texture that can be read back.
    pub async fn headless(size: [u32; 2]) -> anyhow::Result<Self> {
        let size = [size[0].max(1), size[1].max(1)];
        let instance = instance();
        let (_, device, queue) = device(&instance, None).await?;
        let format = GpuTexture::COLOR_FORMAT;
        let texture = GpuTexture::create_render_target(&device, size, format);
        let depth = GpuTexture::create_depth_texture(&device, size, "depth_texture");
        Ok(Self {
            device,
            queue,
            target: RenderTarget::Offscreen { texture },
            format,
            size,
            depth,
        })
    }

    pub fn resize(&mut self, size: [u32; 2]) {
        let size = [size[0].max(1), size[1].max(1)];
        if size == self.size {
            return;
        }
        self.size = size;
        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = size[0];
                config.height = size[1];
                surface.configure(&self.device, config);
            }
            RenderTarget::Offscreen { texture } => {
                texture.texture.destroy();
                *texture = GpuTexture::create_render_target(&self.device, size, self.format);
            }
        }
        self.depth.texture.destroy();
        self.depth = GpuTexture::create_depth_texture(&self.device, size, "depth_texture");
    }

    /// Acquires the next frame. `Ok(None)` means this frame should be skipped.
    pub fn acquire(&mut self) -> anyhow::Result<Option<Frame>> {
        match &self.target {
            RenderTarget::Offscreen { texture } => Ok(Some(Frame {
                view: texture.texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            })),
            RenderTarget::Surface { surface, config } => {
                let texture = match surface.get_current_texture() {
                    wgpu::CurrentSurfaceTexture::Success(t) => t,
                    wgpu::CurrentSurfaceTexture::Suboptimal(t) => {
                        surface.configure(&self.device, config);
                        t
                    }
                    wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                        return Ok(None);
                    }
                    wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                        log::error!("Surface outdated or lost, reconfiguring");
                        surface.configure(&self.device, config);
                        return Ok(None);
                    }
                    wgpu::CurrentSurfaceTexture::Validation => {
                        return Err(anyhow!("surface validation error"));
                    }
                };
                let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(Frame {
                    view,
                    surface_texture: Some(texture),
                }))
            }
        }
    }

    /// Copies the offscreen target back to the CPU. Fails for window surfaces.
    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        let RenderTarget::Offscreen { texture } = &self.target else {
            return Err(anyhow!("only offscreen targets can be read back"));
        };
        let [width, height] = self.size;
        let u32_size = std::mem::size_of::<u32>() as u32;
        // rows must be padded to 256 bytes
        let unpadded = u32_size * width;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(padded * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let submission = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|e| anyhow!("device poll failed: {e}"))?;
        rx.receive()
            .await
            .context("readback channel closed")?
            .map_err(|e| anyhow!("failed to map readback buffer: {e}"))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        buffer.destroy();
        image::RgbaImage::from_raw(width, height, pixels).context("readback size mismatch")
    }

    /// Releases the render target and depth buffer.
    pub fn destroy(&mut self) {
        if let RenderTarget::Offscreen { texture } = &self.target {
            texture.texture.destroy();
        }
        self.depth.texture.destroy();
    }
}
