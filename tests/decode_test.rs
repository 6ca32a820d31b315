use guide_scene_viewer::{
    data_structures::document::{ComponentType, IndexType, Transparency, VertexUsage},
    error::DecodeError,
    format::{decode_scene, schema::*},
};

use crate::common::fixture::*;

mod common;

#[test]
fn decodes_mesh_material_and_camera() {
    let scene = SceneSpec::new(vec![MeshSpec::quad(material(
        "rendertype_translucent",
        TRANSPARENCY_TRANSLUCENT,
        vec![SamplerSpec::new("textures/atlas.png").grouped("minecraft:block_atlas")],
    ))]);

    let document = decode_scene(&scene.to_gzip()).unwrap();

    assert_eq!(document.meshes.len(), 1);
    let mesh = &document.meshes[0];
    assert_eq!(mesh.index_type, IndexType::U16);
    assert_eq!(mesh.vertex_buffer.len(), 4 * 20);
    assert_eq!(mesh.index_buffer.len(), 6 * 2);
    assert_eq!(mesh.vertex_format.vertex_size, 20);

    let uv = &mesh.vertex_format.elements[1];
    assert_eq!(uv.usage, VertexUsage::Uv);
    assert_eq!(uv.component_type, ComponentType::F32);
    assert_eq!((uv.count, uv.offset), (2, 12));

    assert_eq!(mesh.material.shader_name.as_deref(), Some("rendertype_translucent"));
    assert_eq!(mesh.material.transparency, Transparency::Translucent);
    let sampler = &mesh.material.samplers[0];
    assert_eq!(sampler.texture.as_deref(), Some("textures/atlas.png"));
    assert_eq!(sampler.texture_id.as_deref(), Some("minecraft:block_atlas"));

    assert_eq!(document.camera.yaw, 45.0);
    assert_eq!(document.camera.pitch, 30.0);
    assert_eq!(document.camera.zoom, 1.0);
}

#[test]
fn uncompressed_payload_is_accepted() {
    let scene = SceneSpec::new(vec![MeshSpec::quad(solid("a.png"))]);
    let document = decode_scene(&scene.to_flatbuffer()).unwrap();
    assert_eq!(document.meshes.len(), 1);
}

#[test]
fn broken_meshes_are_skipped_not_fatal() {
    let mut no_format = MeshSpec::quad(solid("a.png"));
    no_format.has_vertex_format = false;
    let mut no_indices = MeshSpec::quad(solid("a.png"));
    no_indices.index_buffer = None;
    let mut odd_index_type = MeshSpec::quad(solid("a.png"));
    odd_index_type.index_type = 7;

    let scene = SceneSpec::new(vec![
        no_format,
        MeshSpec::quad(solid("b.png")),
        no_indices,
        odd_index_type,
    ]);
    let document = decode_scene(&scene.to_gzip()).unwrap();

    assert_eq!(document.meshes.len(), 1);
    assert_eq!(
        document.meshes[0].material.samplers[0].texture.as_deref(),
        Some("b.png")
    );
}

#[test]
fn scene_without_camera_fails() {
    let mut scene = SceneSpec::new(vec![MeshSpec::quad(solid("a.png"))]);
    scene.camera = None;
    assert_eq!(decode_scene(&scene.to_gzip()).unwrap_err(), DecodeError::MissingCamera);
}

#[test]
fn animation_descriptors_are_read() {
    let mut scene = SceneSpec::new(vec![]);
    scene.animated_textures.push(AnimationSpec {
        texture_id: "minecraft:block_atlas".into(),
        frames_path: "fire.png".into(),
        x: 16,
        y: 32,
        width: 16,
        height: 16,
        frame_count: 2,
        frames_per_row: 1,
        frames: vec![(0, 2), (1, 3)],
    });
    let document = decode_scene(&scene.to_gzip()).unwrap();
    let part = &document.animated_textures[0];
    assert_eq!((part.x, part.y, part.width, part.height), (16, 32, 16, 16));
    assert_eq!(part.frames.len(), 2);
    assert_eq!((part.frames[1].index, part.frames[1].time), (1, 3));
}
