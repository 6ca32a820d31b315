//! Renderer-independent material description.

use std::sync::atomic::{AtomicU64, Ordering};

use super::annotation::Color;
use super::texture::Texture;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendComponent {
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

/// Additive blend equation with separate colour and alpha factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Blending {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl Blending {
    pub const fn uniform(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            color: BlendComponent::new(src, dst),
            alpha: BlendComponent::new(src, dst),
        }
    }

    pub const ALPHA: Blending = Blending::uniform(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    /// Standard blending of transparent materials that set no blend mode.
    pub const NORMAL: Blending = Blending {
        color: BlendComponent::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
        alpha: BlendComponent::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthMode {
    /// Depth tested and written.
    #[default]
    Normal,
    /// Only drawn where something nearer already covers the fragment, never written.
    Occluded,
    /// Neither tested nor written.
    Always,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Lighting is baked into vertex colours or not wanted at all.
    #[default]
    Unlit,
    /// Lambert shading from the scene's directional and ambient lights.
    Diffuse,
}

#[derive(Debug)]
pub struct Material {
    id: u64,
    pub name: Option<String>,
    pub shading: Shading,
    pub color: Color,
    pub opacity: f32,
    pub map: Option<Texture>,
    pub alpha_test: f32,
    pub vertex_colors: bool,
    pub blending: Option<Blending>,
    /// Drawn after opaque objects. Blending applies regardless of this flag.
    pub transparent: bool,
    pub depth: DepthMode,
    pub visible: bool,
}

impl Material {
    pub fn new(shading: Shading) -> Self {
        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            name: None,
            shading,
            color: Color::WHITE,
            opacity: 1.0,
            map: None,
            alpha_test: 0.0,
            vertex_colors: false,
            blending: None,
            transparent: false,
            depth: DepthMode::Normal,
            visible: true,
        }
    }

    /// Flat red, unlit. Marks meshes whose shader is not known.
    pub fn fallback() -> Self {
        Self {
            color: Color::RED,
            ..Self::new(Shading::Unlit)
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
