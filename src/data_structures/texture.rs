//! Textures on both sides of the renderer seam.
//!
//! [`Texture`] is the renderer-independent handle produced by the texture manager:
//! a decoded image plus the sampler configuration it is drawn with. Handles compare
//! by identity; the renderer uploads each distinct handle once.
//!
//! [`GpuTexture`] wraps the wgpu objects created for a handle, for the depth buffer
//! and for offscreen render targets.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::FilterType;

/// A decoded RGBA8 image.
pub type ImageBitmap = image::RgbaImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerConfig {
    pub mag_filter: FilterMode,
    pub min_filter: MinFilter,
    pub generate_mipmaps: bool,
    pub wrap: WrapMode,
}

impl SamplerConfig {
    /// Magnification follows `linear` alone; minification also depends on `mipmaps`.
    pub fn new(linear: bool, mipmaps: bool) -> Self {
        let mag_filter = if linear {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        };
        let min_filter = match (mipmaps, linear) {
            (true, true) => MinFilter::LinearMipmapLinear,
            (true, false) => MinFilter::NearestMipmapNearest,
            (false, true) => MinFilter::Linear,
            (false, false) => MinFilter::Nearest,
        };
        Self {
            mag_filter,
            min_filter,
            generate_mipmaps: mipmaps,
            wrap: WrapMode::Repeat,
        }
    }

    pub fn with_wrap(self, wrap: WrapMode) -> Self {
        Self { wrap, ..self }
    }
}

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to an image drawn with a fixed sampler configuration.
#[derive(Clone)]
pub struct Texture {
    inner: Rc<TextureInner>,
}

struct TextureInner {
    id: u64,
    label: String,
    image: Rc<ImageBitmap>,
    config: SamplerConfig,
}

impl Texture {
    pub fn new(label: impl Into<String>, image: Rc<ImageBitmap>, config: SamplerConfig) -> Self {
        Self {
            inner: Rc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                label: label.into(),
                image,
                config,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn image(&self) -> &Rc<ImageBitmap> {
        &self.inner.image
    }

    pub fn config(&self) -> SamplerConfig {
        self.inner.config
    }

    pub fn width(&self) -> u32 {
        self.inner.image.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.image.height()
    }

    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this handle already covers `image` drawn with `config`.
    pub fn matches(&self, image: &Rc<ImageBitmap>, config: SamplerConfig) -> bool {
        Rc::ptr_eq(&self.inner.image, image) && self.inner.config == config
    }

    /// Full mip chain of the image, level 0 first, halving down to 1x1.
    pub fn mip_chain(&self) -> Vec<ImageBitmap> {
        let base = self.inner.image.as_ref();
        let mut levels = vec![base.clone()];
        if !self.inner.config.generate_mipmaps {
            return levels;
        }
        let (mut w, mut h) = base.dimensions();
        while w > 1 || h > 1 {
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            let level = image::imageops::resize(base, w, h, FilterType::Triangle);
            levels.push(level);
        }
        levels
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("size", &self.inner.image.dimensions())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// A wgpu texture with its view and sampler.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl GpuTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Depth attachment matching a surface of `size` pixels.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Colour target that can be copied back to the CPU, for headless rendering.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Uploads a texture handle with every mip level and a sampler built from its config.
    pub fn from_texture(device: &wgpu::Device, queue: &wgpu::Queue, source: &Texture) -> Self {
        let levels = source.mip_chain();
        let (width, height) = source.image().dimensions();
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(source.label()),
            size,
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            let (w, h) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                level.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_sampler(device, source.config()));
        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, config: SamplerConfig) -> wgpu::Sampler {
    let address_mode = match config.wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    };
    let filter = |mode: FilterMode| match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };
    let (min_filter, mipmap_filter) = match config.min_filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest => {
            (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest)
        }
        MinFilter::Linear | MinFilter::LinearMipmapLinear => {
            (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear)
        }
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter(config.mag_filter),
        min_filter,
        mipmap_filter,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_filter_follows_mipmaps_and_linear() {
        assert_eq!(SamplerConfig::new(true, true).min_filter, MinFilter::LinearMipmapLinear);
        assert_eq!(SamplerConfig::new(false, true).min_filter, MinFilter::NearestMipmapNearest);
        assert_eq!(SamplerConfig::new(true, false).min_filter, MinFilter::Linear);
        assert_eq!(SamplerConfig::new(false, false).min_filter, MinFilter::Nearest);
        assert_eq!(SamplerConfig::new(false, true).mag_filter, FilterMode::Nearest);
    }

    #[test]
    fn mip_chain_handles_non_power_of_two() {
        let image = Rc::new(ImageBitmap::new(6, 3));
        let texture = Texture::new("t", image, SamplerConfig::new(true, true));
        let sizes: Vec<_> = texture.mip_chain().iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(6, 3), (3, 1), (1, 1)]);
    }
}
