//! Scene nodes for in-world and overlay annotations.
//!
//! In-world annotations are drawn twice: a dimmed pass that only shows where the
//! marker is hidden behind geometry, and a bright pass drawn normally. Pinned
//! annotations get only the bright pass, drawn above everything. Annotations with content also get an
//! invisible hit proxy carrying a back-reference for tooltips.

use std::rc::Rc;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    config::ViewerConfig,
    data_structures::{
        annotation::{Annotation, InWorldAnnotation, OverlayAnnotation},
        geometry::{Geometry, Topology},
        material::{DepthMode, Material, Shading},
        scene_graph::{Node, NodeKind},
        texture::WrapMode,
    },
    resources::texture::TextureManager,
};

/// Strut thickness when an annotation does not set one: half a texel of a
/// 16-pixel block.
pub const DEFAULT_THICKNESS: f32 = 0.5 / 16.0;

/// Overlay markers are drawn after everything else.
pub const OVERLAY_RENDER_ORDER: i32 = 999_999;

const OVERLAY_SCALE: f32 = 0.25;

/// Accumulates indexed quads with per-vertex normals.
#[derive(Default)]
struct GeometryBuilder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl GeometryBuilder {
    fn quad(&mut self, normal: Vector3<f32>, corners: [Vector3<f32>; 4]) {
        let start = self.positions.len() as u32;
        for corner in corners {
            self.positions.push(corner.into());
            self.normals.push(normal.into());
        }
        self.indices
            .extend_from_slice(&[start, start + 1, start + 2, start + 2, start + 3, start]);
    }

    /// A square-section beam from `from` to `to`. Caps close the ends.
    fn strut(&mut self, from: Vector3<f32>, to: Vector3<f32>, thickness: f32, start_cap: bool, end_cap: bool) {
        let norm = safe_normalize(to - from);
        let preferred_up = if (from.x - to.x).abs() < 0.01 && (from.z - to.z).abs() < 0.01 {
            Vector3::unit_x()
        } else {
            Vector3::unit_y()
        };
        let right_norm = safe_normalize(norm.cross(preferred_up));
        let left_norm = -right_norm;
        let up_norm = safe_normalize(right_norm.cross(norm));
        let down_norm = -up_norm;

        let up = up_norm * (thickness / 2.0);
        let right = right_norm * (thickness / 2.0);

        if start_cap {
            self.quad(down_norm, [from + up - right, from - up - right, from - up + right, from + up + right]);
        }
        if end_cap {
            self.quad(norm, [to + up + right, to - up + right, to - up - right, to + up - right]);
        }
        self.quad(left_norm, [from - right + up, to - right + up, to - right - up, from - right - up]);
        self.quad(right_norm, [to + right - up, to + right + up, from + right + up, from + right - up]);
        self.quad(up_norm, [from + up - right, from + up + right, to + up + right, to + up - right]);
        self.quad(down_norm, [to - up - right, to - up + right, from - up + right, from - up - right]);
    }

    /// Twelve struts along the edges of an axis-aligned box. The X struts are
    /// capped and extended so the corners are closed; Y and Z struts are inset
    /// between them.
    fn box_outline(&mut self, min: Vector3<f32>, max: Vector3<f32>, thickness: f32) {
        let d = max - min;
        let u = Vector3::new(d.x, 0.0, 0.0);
        let v = Vector3::new(0.0, d.y, 0.0);
        let t = Vector3::new(0.0, 0.0, d.z);
        let u_norm = safe_normalize(u);
        let v_norm = safe_normalize(v);
        let t_norm = safe_normalize(t);
        let half = thickness / 2.0;

        let c = [min, min + u, min + v, min + t, max, max - u, max - v, max - t];

        for (a, b) in [(0, 1), (2, 7), (3, 6), (5, 4)] {
            self.strut(c[a] - u_norm * half, c[b] + u_norm * half, thickness, true, true);
        }
        for (a, b) in [(0, 2), (1, 7), (3, 5), (6, 4)] {
            self.strut(c[a] + v_norm * half, c[b] - v_norm * half, thickness, false, false);
        }
        for (a, b) in [(0, 3), (1, 6), (2, 5), (7, 4)] {
            self.strut(c[a] + t_norm * half, c[b] - t_norm * half, thickness, false, false);
        }
    }

    /// Closed box of the given size centered on the origin.
    fn solid_box(&mut self, size: Vector3<f32>) {
        let h = size * 0.5;
        let p = |x: f32, y: f32, z: f32| Vector3::new(x * h.x, y * h.y, z * h.z);
        self.quad(Vector3::unit_x(), [p(1., -1., 1.), p(1., -1., -1.), p(1., 1., -1.), p(1., 1., 1.)]);
        self.quad(-Vector3::unit_x(), [p(-1., -1., -1.), p(-1., -1., 1.), p(-1., 1., 1.), p(-1., 1., -1.)]);
        self.quad(Vector3::unit_y(), [p(-1., 1., 1.), p(1., 1., 1.), p(1., 1., -1.), p(-1., 1., -1.)]);
        self.quad(-Vector3::unit_y(), [p(-1., -1., -1.), p(1., -1., -1.), p(1., -1., 1.), p(-1., -1., 1.)]);
        self.quad(Vector3::unit_z(), [p(-1., -1., 1.), p(1., -1., 1.), p(1., 1., 1.), p(-1., 1., 1.)]);
        self.quad(-Vector3::unit_z(), [p(1., -1., -1.), p(-1., -1., -1.), p(-1., 1., -1.), p(1., 1., -1.)]);
    }

    fn build(self) -> Geometry {
        Geometry::from_arrays(
            Topology::Triangles,
            &self.positions,
            Some(&self.normals),
            None,
            None,
            Some(&self.indices),
        )
    }
}

fn safe_normalize(v: Vector3<f32>) -> Vector3<f32> {
    let len = v.magnitude();
    if len > f32::EPSILON { v / len } else { Vector3::zero() }
}

/// Render geometry of an in-world annotation. Box corners are normalized
/// first, so swapped corners build the same outline.
pub fn annotation_geometry(annotation: &InWorldAnnotation) -> Geometry {
    let annotation = annotation.normalized();
    let thickness = annotation.thickness().unwrap_or(DEFAULT_THICKNESS);
    let mut builder = GeometryBuilder::default();
    match &annotation {
        InWorldAnnotation::Box {
            min_corner,
            max_corner,
            ..
        } => builder.box_outline((*min_corner).into(), (*max_corner).into(), thickness),
        InWorldAnnotation::Line { from, to, .. } => {
            builder.strut((*from).into(), (*to).into(), thickness, true, true)
        }
    }
    builder.build()
}

/// Builds the node group of an in-world annotation. Pinned annotations skip
/// the occluded pass and draw their bright pass above everything.
pub fn build_in_world_annotation(annotation: &InWorldAnnotation) -> Node {
    let annotation = annotation.normalized();
    let geometry = Rc::new(annotation_geometry(&annotation));
    let color = annotation.color();

    let mut bright = Material::new(Shading::Diffuse);
    bright.color = color;
    bright.transparent = true;
    bright.depth = if annotation.always_on_top() {
        DepthMode::Always
    } else {
        DepthMode::Normal
    };

    let mut group = Node::group("annotation");
    if !annotation.always_on_top() {
        let mut occluded = Material::new(Shading::Diffuse);
        occluded.color = color.scaled(0.5);
        occluded.transparent = true;
        occluded.depth = DepthMode::Occluded;
        group.add_child(Node::mesh("annotation-occluded", geometry.clone(), Rc::new(occluded)));
    }
    group.add_child(Node::mesh("annotation", geometry.clone(), Rc::new(bright)));

    if !annotation.content().is_empty() {
        let mut material = Material::new(Shading::Unlit);
        material.visible = false;
        let material = Rc::new(material);
        let back_reference = Rc::new(Annotation::InWorld(annotation.clone()));
        let mut proxy = match &annotation {
            InWorldAnnotation::Box {
                min_corner,
                max_corner,
                ..
            } => {
                let min = Vector3::from(*min_corner);
                let max = Vector3::from(*max_corner);
                let mut builder = GeometryBuilder::default();
                builder.solid_box(max - min);
                Node::mesh("annotation-hit", Rc::new(builder.build()), material)
                    .with_translation((min + max) * 0.5)
            }
            InWorldAnnotation::Line { .. } => Node::mesh("annotation-hit", geometry, material),
        };
        proxy.visible = false;
        group.add_child(proxy.with_annotation(back_reference));
    }
    group
}

/// Builds the two marker sprites of an overlay annotation: an untinted outline
/// and a tinted fill, both drawn on top of everything.
pub async fn build_overlay_annotation(
    textures: &TextureManager,
    annotation: &OverlayAnnotation,
    config: &ViewerConfig,
) -> Node {
    let back_reference = Rc::new(Annotation::Overlay(annotation.clone()));
    let position = Vector3::from(annotation.position);

    let mut group = Node::group("overlay-annotation").with_translation(position);
    for (name, url, tinted) in [
        ("overlay-marker", config.marker_icon.as_str(), false),
        ("overlay-marker-tinted", config.marker_icon_tinted.as_str(), true),
    ] {
        let texture = textures
            .get_with_wrap(url, false, false, true, WrapMode::ClampToEdge)
            .await;
        let mut material = Material::new(Shading::Unlit);
        material.map = Some(texture);
        material.transparent = true;
        material.depth = DepthMode::Always;
        if tinted {
            material.color = annotation.color;
        }
        let mut sprite = Node::new(
            name,
            NodeKind::Sprite {
                material: Rc::new(material),
                scale: [OVERLAY_SCALE, OVERLAY_SCALE],
            },
        )
        .with_annotation(back_reference.clone());
        sprite.render_order = OVERLAY_RENDER_ORDER;
        group.add_child(sprite);
    }
    group
}
