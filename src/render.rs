//! The renderer seam and draw ordering.
//!
//! The controller only talks to a [`Renderer`]; [`WgpuRenderer`](crate::renderer::WgpuRenderer)
//! is the real one. Every renderer draws the items produced by [`collect_draws`]
//! in order:
//!
//! - opaque items by ascending render order, in scene order otherwise
//! - transparent items by ascending render order, then back to front
//!
//! Overlay sprites carry the largest render order and so always come last.
//!
//! # Key types
//!
//! - [`Renderer`] is the trait the viewport controller drives
//! - [`DrawItem`] is one visible mesh, line set or sprite with its world offset

use std::rc::Rc;

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::{
    camera::OrthographicCamera,
    data_structures::{
        annotation::Color,
        geometry::Geometry,
        material::{Blending, Material},
        scene_graph::{NodeKind, Scene},
        texture::Texture,
    },
    error::ViewerError,
};

/// Identifies the surface a renderer draws to, for attaching it to a host.
pub type SurfaceId = u64;

pub trait Renderer {
    /// Resizes the drawing surface, in logical pixels.
    fn set_size(&mut self, width: u32, height: u32);
    fn set_pixel_ratio(&mut self, ratio: f32);
    /// `None` clears to transparent.
    fn set_background(&mut self, color: Option<Color>);
    fn render(&mut self, scene: &Scene, camera: &OrthographicCamera) -> Result<(), ViewerError>;
    /// Copies all of `source` into `target` with its top left corner at `(x, y)`.
    fn copy_texture_region(&mut self, source: &Texture, target: &Texture, x: u32, y: u32);
    fn surface(&self) -> SurfaceId;
    /// Releases every GPU resource. Calling it again does nothing.
    fn dispose(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
    Sprite,
}

#[derive(Clone, Debug)]
pub struct DrawItem<'a> {
    pub primitive: Primitive,
    pub geometry: Option<&'a Rc<Geometry>>,
    pub material: &'a Rc<Material>,
    pub translation: Vector3<f32>,
    /// Sprite size in view units, `[0, 0]` for everything else.
    pub sprite_scale: [f32; 2],
    pub render_order: i32,
    /// Distance along the view direction, larger is farther away.
    pub depth: f32,
}

/// Three.js-style blend state: materials without an explicit blend mode blend
/// with standard alpha only when they are transparent.
pub fn effective_blending(material: &Material) -> Option<Blending> {
    material
        .blending
        .or(if material.transparent { Some(Blending::NORMAL) } else { None })
}

/// Visible drawables of `scene` in draw order.
pub fn collect_draws<'a>(scene: &'a Scene, camera: &OrthographicCamera) -> Vec<DrawItem<'a>> {
    let view = camera.view_matrix();
    let depth_of = |p: Vector3<f32>| -(view * Point3::from_vec(p).to_homogeneous()).z;

    let mut opaque = Vec::new();
    let mut transparent = Vec::new();
    scene.traverse_visible(&mut |node, world| {
        let (primitive, geometry, material, sprite_scale) = match &node.kind {
            NodeKind::Mesh { geometry, material } => (Primitive::Triangles, Some(geometry), material, [0.0; 2]),
            NodeKind::Lines { geometry, material } => (Primitive::Lines, Some(geometry), material, [0.0; 2]),
            NodeKind::Sprite { material, scale } => (Primitive::Sprite, None, material, *scale),
            _ => return,
        };
        if !material.visible {
            return;
        }
        let center = geometry.map(|g| g.bounding_box().center()).unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        let item = DrawItem {
            primitive,
            geometry,
            material,
            translation: world,
            sprite_scale,
            render_order: node.render_order,
            depth: depth_of(world + center),
        };
        if material.transparent {
            transparent.push(item);
        } else {
            opaque.push(item);
        }
    });

    opaque.sort_by_key(|item| item.render_order);
    transparent.sort_by(|a, b| {
        a.render_order
            .cmp(&b.render_order)
            .then(b.depth.total_cmp(&a.depth))
    });
    opaque.extend(transparent);
    opaque
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        geometry::Topology,
        material::{BlendFactor, Shading},
        scene_graph::Node,
    };

    fn mesh(name: &str, transparent: bool, z: f32, order: i32) -> Node {
        let geometry = Geometry::from_arrays(
            Topology::Triangles,
            &[[0.0, 0.0, z], [1.0, 0.0, z], [0.0, 1.0, z]],
            None,
            None,
            None,
            None,
        );
        let mut material = Material::new(Shading::Unlit);
        material.transparent = transparent;
        material.name = Some(name.to_string());
        let mut node = Node::mesh(name, Rc::new(geometry), Rc::new(material));
        node.render_order = order;
        node
    }

    #[test]
    fn transparent_sorted_back_to_front_after_opaque() {
        let mut scene = Scene::new();
        scene.add(mesh("near", true, 2.0, 0));
        scene.add(mesh("far", true, -2.0, 0));
        scene.add(mesh("solid", false, 0.0, 0));
        scene.add(mesh("overlay", true, 5.0, 999_999));
        let camera = OrthographicCamera {
            position: Point3::new(0.0, 0.0, 10.0),
            ..OrthographicCamera::default()
        };
        let names: Vec<_> = collect_draws(&scene, &camera)
            .iter()
            .map(|d| d.material.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["solid", "far", "near", "overlay"]);
    }

    #[test]
    fn hidden_nodes_are_not_drawn() {
        let mut scene = Scene::new();
        let mut hidden = mesh("hidden", false, 0.0, 0);
        hidden.visible = false;
        scene.add(hidden);
        assert!(collect_draws(&scene, &OrthographicCamera::default()).is_empty());
    }

    #[test]
    fn explicit_blending_applies_to_opaque_materials() {
        let mut material = Material::new(Shading::Unlit);
        assert_eq!(effective_blending(&material), None);
        material.transparent = true;
        assert_eq!(effective_blending(&material), Some(Blending::NORMAL));
        material.blending = Some(Blending::uniform(BlendFactor::SrcAlpha, BlendFactor::One));
        material.transparent = false;
        assert_eq!(
            effective_blending(&material).map(|b| b.color.dst),
            Some(BlendFactor::One)
        );
    }
}
