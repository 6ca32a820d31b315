//! Composes a decoded scene, annotations, helpers and lights into one scene
//! graph with its camera.

use std::rc::Rc;

use cgmath::{InnerSpace, Vector3};

use crate::{
    camera::{OrthographicCamera, update_viewport_size},
    cancel::AbortSignal,
    config::ViewerConfig,
    data_structures::{
        annotation::{Color, InWorldAnnotation, OverlayAnnotation},
        document::{CameraSettings, SceneDocument},
        geometry::{Aabb, Geometry, Topology},
        material::{DepthMode, Material, Shading},
        scene_graph::{Node, NodeKind, Scene},
    },
    error::ViewerError,
    resources::{
        animation::{AnimatedTexturePart, load_animated_parts},
        annotation::{build_in_world_annotation, build_overlay_annotation},
        build_model,
        texture::TextureManager,
    },
};

/// Strength of each of the two fixed key lights.
pub const LIGHT_POWER: f32 = 0.6;
pub const AMBIENT_LIGHT: f32 = 0.4;

/// Direction towards the first key light.
pub fn diffuse_light_0() -> Vector3<f32> {
    Vector3::new(0.2, 1.0, -0.7).normalize()
}

/// Direction towards the second key light, mirrored through the Y axis.
pub fn diffuse_light_1() -> Vector3<f32> {
    Vector3::new(-0.2, 1.0, 0.7).normalize()
}

pub const AXES_SIZE: f32 = 32.0;

/// Everything the assembler needs besides the document.
#[derive(Clone, Copy, Debug)]
pub struct AssembleParams<'a> {
    /// Current viewport size in pixels.
    pub viewport: [f32; 2],
    /// Width the embedding page declared for the viewer.
    pub original_width: f32,
    pub interactive: bool,
    pub in_world_annotations: &'a [InWorldAnnotation],
    pub overlay_annotations: &'a [OverlayAnnotation],
    pub config: &'a ViewerConfig,
}

#[derive(Debug)]
pub struct AssembledScene {
    pub scene: Scene,
    pub camera: OrthographicCamera,
    pub camera_settings: CameraSettings,
    pub animated_parts: Vec<AnimatedTexturePart>,
    /// Bounds of the model before centering.
    pub bounds: Aabb,
}

/// Builds the renderable scene. Consumes the document.
pub async fn assemble(
    textures: &TextureManager,
    document: SceneDocument,
    params: AssembleParams<'_>,
    signal: &AbortSignal,
) -> Result<AssembledScene, ViewerError> {
    let model = build_model(textures, &document, signal).await?;
    let mut group = model.group;

    let bounds = group.bounding_box();
    let center = bounds.center();
    group.translation = -center;

    if params.interactive {
        let size = bounds.size();
        let extent = size.x.max(size.z) + params.config.grid_margin;
        group.add_child(grid_helper(extent).with_translation(Vector3::new(center.x, 0.0, center.z)));
    }

    let mut scene = Scene::new();
    add_level_lighting(&mut scene);

    for annotation in params.in_world_annotations {
        group.add_child(build_in_world_annotation(annotation));
    }
    for annotation in params.overlay_annotations {
        group.add_child(build_overlay_annotation(textures, annotation, params.config).await);
        signal.check()?;
    }
    scene.add(group);

    let mut camera = OrthographicCamera::from_settings(&document.camera, params.config.camera_distance);
    update_viewport_size(
        &mut camera,
        params.viewport[0],
        params.viewport[1],
        params.original_width,
        &document.camera,
        params.config,
    );
    camera.look_at_origin();

    if params.config.show_axes {
        scene.add(axes_helper(AXES_SIZE));
    }

    let animated_parts =
        load_animated_parts(textures, &document.animated_textures, &model.texture_groups, signal).await?;
    signal.check()?;

    Ok(AssembledScene {
        scene,
        camera,
        camera_settings: document.camera,
        animated_parts,
        bounds,
    })
}

/// Two symmetric key lights and a flat ambient term, approximating the game's
/// lighting of dynamic objects.
pub fn add_level_lighting(scene: &mut Scene) {
    for (name, direction) in [("key-light-0", diffuse_light_0()), ("key-light-1", diffuse_light_1())] {
        scene.add(Node::new(
            name,
            NodeKind::DirectionalLight {
                direction,
                color: Color::WHITE,
                intensity: LIGHT_POWER,
            },
        ));
    }
    scene.add(Node::new(
        "ambient-light",
        NodeKind::AmbientLight {
            color: Color::WHITE,
            intensity: AMBIENT_LIGHT,
        },
    ));
}

/// Square grid on the XZ plane with one line per world unit.
pub fn grid_helper(size: f32) -> Node {
    let divisions = size.floor().max(1.0) as u32;
    let step = size / divisions as f32;
    let half = size / 2.0;
    let mut positions = Vec::with_capacity((divisions as usize + 1) * 4);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        positions.extend_from_slice(&[[-half, 0.0, k], [half, 0.0, k], [k, 0.0, -half], [k, 0.0, half]]);
    }
    let geometry = Geometry::from_arrays(Topology::Lines, &positions, None, None, None, None);

    let mut material = Material::new(Shading::Unlit);
    material.transparent = true;
    material.opacity = 0.5;
    Node::new(
        "grid",
        NodeKind::Lines {
            geometry: Rc::new(geometry),
            material: Rc::new(material),
        },
    )
}

/// RGB lines along +X, +Y and +Z, drawn over everything.
pub fn axes_helper(size: f32) -> Node {
    let positions = [
        [0.0, 0.0, 0.0],
        [size, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, size, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, 0.0, size],
    ];
    let colors = [
        [1.0, 0.0, 0.0],
        [1.0, 0.6, 0.0],
        [0.0, 1.0, 0.0],
        [0.6, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.6, 1.0],
    ];
    let geometry = Geometry::from_arrays(Topology::Lines, &positions, None, Some(&colors), None, None);
    let mut material = Material::new(Shading::Unlit);
    material.vertex_colors = true;
    material.depth = DepthMode::Always;
    Node::new(
        "axes",
        NodeKind::Lines {
            geometry: Rc::new(geometry),
            material: Rc::new(material),
        },
    )
}
