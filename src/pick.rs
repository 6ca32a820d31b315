//! Pointer hit testing against the scene graph.
//!
//! Picking is done on the CPU by casting a ray from the camera through the
//! pointer position:
//! 1. Every mesh node is tested triangle by triangle, including hidden hit
//!    proxies, since those exist only to be picked
//! 2. Sprites are tested as camera-facing rectangles in view space
//! 3. Hits are sorted front to back
//! 4. The nearest hit whose node carries an annotation with content wins
//!
//! Lines (grid, axes) are never picked.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector2, Vector3};

use crate::{
    camera::{OrthographicCamera, Ray},
    data_structures::{
        annotation::Annotation,
        scene_graph::{Node, NodeKind, Scene},
    },
};

const EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct Intersection<'a> {
    pub distance: f32,
    pub point: Point3<f32>,
    pub node: &'a Node,
}

/// Möller–Trumbore, accepting both windings. Returns the ray parameter.
pub fn ray_triangle(ray: &Ray, v0: Vector3<f32>, v1: Vector3<f32>, v2: Vector3<f32>) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }
    let f = 1.0 / a;
    let s = ray.origin.to_vec() - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

fn intersect_node<'a>(
    node: &'a Node,
    world: Vector3<f32>,
    ray: &Ray,
    camera: &OrthographicCamera,
    hits: &mut Vec<Intersection<'a>>,
) {
    match &node.kind {
        NodeKind::Mesh { geometry, .. } => {
            let positions = geometry.positions();
            let nearest = geometry
                .triangles()
                .into_iter()
                .filter_map(|[a, b, c]| {
                    let v0 = *positions.get(a as usize)? + world;
                    let v1 = *positions.get(b as usize)? + world;
                    let v2 = *positions.get(c as usize)? + world;
                    ray_triangle(ray, v0, v1, v2)
                })
                .min_by(f32::total_cmp);
            if let Some(t) = nearest {
                hits.push(Intersection {
                    distance: t,
                    point: ray.at(t),
                    node,
                });
            }
        }
        NodeKind::Sprite { scale, .. } => {
            let center = Point3::from_vec(world);
            let view_center = camera.to_view(center);
            let view_origin = camera.to_view(ray.origin);
            let offset = Vector2::new(view_origin.x - view_center.x, view_origin.y - view_center.y);
            if offset.x.abs() <= scale[0] / 2.0 && offset.y.abs() <= scale[1] / 2.0 {
                let t = (center - ray.origin).dot(ray.direction);
                if t > 0.0 {
                    hits.push(Intersection {
                        distance: t,
                        point: ray.at(t),
                        node,
                    });
                }
            }
        }
        _ => {}
    }
}

impl Scene {
    /// All hits along `ray`, nearest first. Hidden nodes are included.
    pub fn intersect<'a>(&'a self, ray: &Ray, camera: &OrthographicCamera) -> Vec<Intersection<'a>> {
        let mut hits = Vec::new();
        self.traverse(&mut |node, world| intersect_node(node, world, ray, camera, &mut hits));
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

/// Annotation of the nearest annotated hit under the pointer, if it has content.
pub fn annotation_at<'a>(
    scene: &'a Scene,
    camera: &OrthographicCamera,
    ndc: Vector2<f32>,
) -> Option<&'a Annotation> {
    let ray = camera.ray_from_ndc(ndc)?;
    scene
        .intersect(&ray, camera)
        .into_iter()
        .filter_map(|hit| hit.node.annotation.as_deref())
        .find(|annotation| annotation.has_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_triangles_from_both_sides() {
        let (v0, v1, v2) = (
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let front = Ray {
            origin: Point3::new(0.0, 0.0, 5.0),
            direction: -Vector3::unit_z(),
        };
        assert_eq!(ray_triangle(&front, v0, v1, v2), Some(5.0));
        let back = Ray {
            origin: Point3::new(0.0, 0.0, -2.0),
            direction: Vector3::unit_z(),
        };
        assert_eq!(ray_triangle(&back, v0, v1, v2), Some(2.0));
        let miss = Ray {
            origin: Point3::new(3.0, 0.0, 5.0),
            direction: -Vector3::unit_z(),
        };
        assert_eq!(ray_triangle(&miss, v0, v1, v2), None);
    }
}
