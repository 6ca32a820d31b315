use std::rc::Rc;

use futures::executor::block_on;
use guide_scene_viewer::{
    data_structures::{
        annotation::Color,
        document::{MaterialRecord, SamplerRecord, Transparency},
        material::{BlendComponent, BlendFactor::*, Blending, Shading},
    },
    resources::{
        material::{TextureGroups, blending_for, build_material},
        texture::TextureManager,
    },
};

use crate::common::{fixture::checkerboard, test_utils::MemorySource};

mod common;

#[test]
fn every_transparency_mode_has_its_fixed_blend() {
    let table: Vec<(Transparency, Option<Blending>)> = Transparency::ALL
        .iter()
        .map(|&t| (t, blending_for(t)))
        .collect();

    assert_eq!(
        table,
        vec![
            (Transparency::Disabled, None),
            (Transparency::Additive, Some(Blending::uniform(SrcAlpha, One))),
            (Transparency::Lightning, Some(Blending::uniform(SrcAlpha, One))),
            (
                Transparency::Glint,
                Some(Blending {
                    color: BlendComponent::new(SrcColor, One),
                    alpha: BlendComponent::new(Zero, One),
                })
            ),
            (
                Transparency::Crumbling,
                Some(Blending {
                    color: BlendComponent::new(DstColor, SrcColor),
                    alpha: BlendComponent::new(One, Zero),
                })
            ),
            (Transparency::Translucent, Some(Blending::ALPHA)),
        ]
    );
}

fn sampler(texture: &str, linear: bool) -> SamplerRecord {
    SamplerRecord {
        texture: Some(texture.to_string()),
        texture_id: Some("minecraft:block_atlas".to_string()),
        linear_filtering: linear,
        use_mipmaps: false,
    }
}

fn record(shader: &str, samplers: Vec<SamplerRecord>) -> MaterialRecord {
    MaterialRecord {
        name: Some("m".into()),
        shader_name: Some(shader.into()),
        transparency: Transparency::Disabled,
        samplers,
    }
}

#[test]
fn textures_are_fetched_once_and_shared_per_sampler_config() {
    let source = MemorySource::new();
    source.insert("assets/atlas.png", checkerboard());
    let textures = TextureManager::new("assets", source.clone());
    let mut groups = TextureGroups::new();

    let (a, b, c) = block_on(async {
        let a = build_material(&textures, &record("rendertype_solid", vec![sampler("atlas.png", false)]), &mut groups).await;
        let b = build_material(&textures, &record("rendertype_cutout", vec![sampler("atlas.png", false)]), &mut groups).await;
        let c = build_material(&textures, &record("rendertype_solid", vec![sampler("atlas.png", true)]), &mut groups).await;
        (a, b, c)
    });

    assert_eq!(source.fetches("assets/atlas.png"), 1);
    assert_eq!(textures.texture_count(), 2);
    let (a, b, c) = (a.map.unwrap(), b.map.unwrap(), c.map.unwrap());
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));
    assert!(Rc::ptr_eq(a.image(), c.image()));
    assert_eq!(groups["minecraft:block_atlas"].len(), 2);
}

#[test]
fn concurrent_requests_share_one_fetch() {
    let source = MemorySource::new();
    source.insert("atlas.png", checkerboard());
    let gate = source.gate("atlas.png");
    let textures = TextureManager::new("", source.clone());

    let (a, b) = block_on(async {
        let first = textures.get("atlas.png", false, false, false);
        let second = textures.get("atlas.png", false, false, false);
        gate.set();
        futures::join!(first, second)
    });

    assert_eq!(source.total_fetches(), 1);
    assert!(a.ptr_eq(&b));
    assert_eq!((a.width(), a.height()), (2, 2));
}

#[test]
fn missing_image_becomes_magenta_pixel() {
    let source = MemorySource::new();
    let textures = TextureManager::new("", source);
    let texture = block_on(textures.get("nope.png", false, false, false));
    assert_eq!((texture.width(), texture.height()), (1, 1));
    assert_eq!(texture.image().get_pixel(0, 0).0, [255, 0, 255, 255]);
}

#[test]
fn unknown_shader_falls_back_to_red() {
    let source = MemorySource::new();
    source.insert("atlas.png", checkerboard());
    let textures = TextureManager::new("", source);
    let mut groups = TextureGroups::new();
    let material = block_on(build_material(
        &textures,
        &record("rendertype_mystery", vec![sampler("atlas.png", false)]),
        &mut groups,
    ));
    assert_eq!(material.color, Color::RED);
    assert_eq!(material.shading, Shading::Unlit);
    assert!(material.map.is_none());
}
