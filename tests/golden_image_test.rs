#![cfg(feature = "integration-tests")]

use std::rc::Rc;

use guide_scene_viewer::{
    config::ViewerConfig, data_structures::annotation::Color, flow::render_snapshot, viewer::ViewerParams,
};

use crate::common::{fixture::*, test_utils::MemorySource};

mod common;

fn red_quad_scene() -> Rc<MemorySource> {
    let mut quad = MeshSpec::quad(solid("red.png"));
    // Both windings, so the quad is visible from either side.
    let indices: [u16; 12] = [0, 1, 2, 2, 3, 0, 0, 2, 1, 2, 0, 3];
    quad.index_buffer = Some(bytemuck::cast_slice(&indices).to_vec());

    let source = MemorySource::new();
    source.insert("scene.bin.gz", SceneSpec::new(vec![quad]).to_gzip());
    source.insert("red.png", png(2, 2, |_, _| [255, 0, 0, 255]));
    source
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    let source = MemorySource::new();
    source.insert("scene.bin.gz", SceneSpec::new(vec![]).to_gzip());
    let mut params = ViewerParams::new("scene.bin.gz", 32, 32);
    params.background = Some(Color::WHITE);

    let image = futures::executor::block_on(render_snapshot(&ViewerConfig::default(), source, &params)).unwrap();

    assert_eq!(image.dimensions(), (32, 32));
    for pixel in image.pixels() {
        assert_eq!(pixel.0, [255, 255, 255, 255]);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_textured_quad_at_center() {
    let mut params = ViewerParams::new("scene.bin.gz", 64, 64);
    params.background = Some(Color::WHITE);

    let image =
        futures::executor::block_on(render_snapshot(&ViewerConfig::default(), red_quad_scene(), &params)).unwrap();

    let center = image.get_pixel(32, 32).0;
    assert!(center[0] > 200 && center[1] < 50 && center[2] < 50, "center is {center:?}");
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(image.get_pixel(63, 63).0, [255, 255, 255, 255]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn transparent_background_without_colour() {
    let params = ViewerParams::new("scene.bin.gz", 16, 16);
    let image =
        futures::executor::block_on(render_snapshot(&ViewerConfig::default(), red_quad_scene(), &params)).unwrap();
    assert_eq!(image.get_pixel(0, 0).0[3], 0);
}
