//! Maps exported materials onto the viewer's material model.
//!
//! The exporting game describes materials by shader name and transparency mode.
//! Shader names are looked up in a fixed profile table; transparency modes map
//! to a fixed blend table. Neither is configurable at runtime.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::{
    data_structures::{
        document::{MaterialRecord, Transparency},
        material::{BlendComponent, BlendFactor, Blending, Material, Shading},
        texture::Texture,
    },
    resources::texture::TextureManager,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightingMode {
    /// Lighting is baked into the vertex colours.
    Lightmap,
    Diffuse,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaderProfile {
    pub lighting: LightingMode,
    pub alpha_test: Option<f32>,
    pub vertex_color: bool,
    /// Whether sampler 0 is the colour map.
    pub textured: bool,
}

const fn profile(lighting: LightingMode, alpha_test: Option<f32>, textured: bool) -> ShaderProfile {
    ShaderProfile {
        lighting,
        alpha_test,
        vertex_color: true,
        textured,
    }
}

static SHADER_PROFILES: Lazy<HashMap<&'static str, ShaderProfile>> = Lazy::new(|| {
    use LightingMode as L;
    HashMap::from([
        ("rendertype_solid", profile(L::Lightmap, None, true)),
        ("rendertype_cutout", profile(L::Lightmap, Some(0.1), true)),
        ("rendertype_cutout_mipped", profile(L::Lightmap, Some(0.5), true)),
        ("rendertype_translucent", profile(L::Lightmap, None, true)),
        ("rendertype_entity_cutout", profile(L::Diffuse, Some(0.1), true)),
        ("position_color", profile(L::None, Some(0.0), false)),
        ("rendertype_entity_cutout_no_cull", profile(L::Diffuse, Some(0.1), true)),
        ("rendertype_entity_translucent_cull", profile(L::Diffuse, Some(0.1), true)),
        ("rendertype_text", profile(L::None, Some(0.1), true)),
    ])
});

pub fn shader_profile(name: &str) -> Option<&'static ShaderProfile> {
    SHADER_PROFILES.get(name)
}

/// Blend setup of each transparency mode.
pub fn blending_for(transparency: Transparency) -> Option<Blending> {
    use BlendFactor::*;
    match transparency {
        Transparency::Disabled => None,
        Transparency::Additive => Some(Blending::uniform(SrcAlpha, One)),
        Transparency::Lightning => Some(Blending::uniform(SrcAlpha, One)),
        Transparency::Glint => Some(Blending {
            color: BlendComponent::new(SrcColor, One),
            alpha: BlendComponent::new(Zero, One),
        }),
        Transparency::Crumbling => Some(Blending {
            color: BlendComponent::new(DstColor, SrcColor),
            alpha: BlendComponent::new(One, Zero),
        }),
        Transparency::Translucent => Some(Blending::ALPHA),
    }
}

/// Textures registered per shared texture group id, each handle at most once.
pub type TextureGroups = HashMap<String, Vec<Texture>>;

/// Resolves a material's samplers and derives its render settings.
///
/// Sampler slots keep their index even when a texture reference is missing, and
/// every texture carrying a group id is registered in `groups`.
pub async fn build_material(
    textures: &TextureManager,
    record: &MaterialRecord,
    groups: &mut TextureGroups,
) -> Material {
    let mut samplers: Vec<Option<Texture>> = Vec::with_capacity(record.samplers.len());
    for (slot, sampler) in record.samplers.iter().enumerate() {
        let Some(url) = &sampler.texture else {
            log::warn!("Sampler {slot} is missing its texture");
            samplers.push(None);
            continue;
        };
        let texture = textures
            .get(url, sampler.linear_filtering, sampler.use_mipmaps, false)
            .await;
        if let Some(group) = &sampler.texture_id {
            let members = groups.entry(group.clone()).or_default();
            if !members.iter().any(|t| t.ptr_eq(&texture)) {
                members.push(texture.clone());
            }
        }
        samplers.push(Some(texture));
    }

    let shader_name = record.shader_name.as_deref().unwrap_or("none");
    let Some(profile) = shader_profile(shader_name) else {
        log::warn!("Unknown shader: {shader_name}");
        let mut material = Material::fallback();
        material.name = record.name.clone();
        return material;
    };

    let shading = match profile.lighting {
        LightingMode::Lightmap | LightingMode::None => Shading::Unlit,
        LightingMode::Diffuse => Shading::Diffuse,
    };
    let mut material = Material::new(shading);
    material.name = record.name.clone();
    material.blending = blending_for(record.transparency);
    material.alpha_test = profile.alpha_test.unwrap_or(0.0);
    material.vertex_colors = profile.vertex_color;
    if profile.textured {
        material.map = samplers.into_iter().next().flatten();
    }
    material
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lightmap_profiles_are_unlit_and_textured() {
        let solid = shader_profile("rendertype_solid").unwrap();
        assert_eq!(solid.lighting, LightingMode::Lightmap);
        assert!(solid.textured && solid.vertex_color);
        assert_eq!(shader_profile("rendertype_cutout_mipped").unwrap().alpha_test, Some(0.5));
        assert!(!shader_profile("position_color").unwrap().textured);
        assert!(shader_profile("none").is_none());
    }
}
