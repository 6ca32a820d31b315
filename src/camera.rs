//! Orthographic camera and orbit controls.
//!
//! The camera always looks at the origin of a centered model. Zoom is the only
//! scale control: the projection bounds are the viewport size in pixels and
//! `zoom` maps pixels to world units.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector2, Vector3, Vector4, Zero};

use crate::{config::ViewerConfig, data_structures::document::CameraSettings};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// World units per pixel at zoom 1 is `0.625 / 16`: one block is 16 texels and
/// a texel is drawn 1.6 pixels wide.
const BASE_ZOOM: f32 = 16.0 / 0.625;

pub const NEAR: f32 = 0.0;
pub const FAR: f32 = 30000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrthographicCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub zoom: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            zoom: 1.0,
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
            near: NEAR,
            far: FAR,
        }
    }
}

impl OrthographicCamera {
    /// Places the camera on its orbit for the exported viewpoint, looking at
    /// the origin.
    pub fn from_settings(settings: &CameraSettings, distance: f32) -> Self {
        Self {
            position: Point3::from_vec(settings.orbit_position(distance)),
            ..Self::default()
        }
    }

    pub fn look_at_origin(&mut self) {
        self.target = Point3::origin();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        OPENGL_TO_WGPU_MATRIX
            * cgmath::ortho(
                self.left / zoom,
                self.right / zoom,
                self.bottom / zoom,
                self.top / zoom,
                self.near,
                self.far,
            )
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vector3<f32> {
        let dir = self.target - self.position;
        if dir.magnitude2() > 0.0 {
            dir.normalize()
        } else {
            -Vector3::unit_z()
        }
    }

    /// Ray through a point in normalized device coordinates (`[-1, 1]`, y up).
    /// The origin lies on the near plane, the direction is the view direction.
    pub fn ray_from_ndc(&self, ndc: Vector2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().invert()?;
        let clip = inverse * Vector4::new(ndc.x, ndc.y, 0.0, 1.0);
        if clip.w.abs() < f32::EPSILON {
            return None;
        }
        Some(Ray {
            origin: Point3::from_homogeneous(clip),
            direction: self.forward(),
        })
    }

    /// Position in view space, as seen by sprites.
    pub fn to_view(&self, p: Point3<f32>) -> Point3<f32> {
        Point3::from_homogeneous(self.view_matrix() * p.to_homogeneous())
    }
}

/// Recomputes zoom and bounds for a new viewport size. Viewports narrower than
/// the declared width scaled by the divisor zoom out; larger ones never zoom in.
pub fn update_viewport_size(
    camera: &mut OrthographicCamera,
    width: f32,
    height: f32,
    original_width: f32,
    settings: &CameraSettings,
    config: &ViewerConfig,
) {
    let reference = original_width * config.viewport_scale_divisor;
    let scaling = if reference > 0.0 { (width / reference).min(1.0) } else { 1.0 };
    camera.zoom = BASE_ZOOM * settings.zoom * scaling;
    camera.left = -width / 2.0;
    camera.right = width / 2.0;
    camera.top = height / 2.0;
    camera.bottom = -height / 2.0;
}

/// Camera state restored by [`OrbitControls::reset`].
#[derive(Clone, Copy, Debug, PartialEq)]
struct SavedState {
    position: Point3<f32>,
    target: Point3<f32>,
    zoom: f32,
}

const MIN_POLAR: f32 = 1e-6;

/// Drag-to-orbit around the camera target.
///
/// Horizontal drags rotate around the world up axis, vertical drags tilt; a
/// full viewport height of drag is one full turn. Wheel zoom is ignored unless
/// `enable_zoom` is set.
#[derive(Debug)]
pub struct OrbitControls {
    pub enable_zoom: bool,
    pub zoom_speed: f32,
    /// `None` applies rotation immediately.
    pub damping: Option<f32>,
    viewport: [f32; 2],
    saved: SavedState,
    drag: Option<Vector2<f32>>,
    delta_theta: f32,
    delta_phi: f32,
    zoom_scale: f32,
}

impl OrbitControls {
    pub fn new(camera: &OrthographicCamera, viewport: [f32; 2], config: &ViewerConfig) -> Self {
        Self {
            enable_zoom: false,
            zoom_speed: config.zoom_speed,
            damping: config.damping.filter(|d| *d > 0.0 && *d <= 1.0),
            viewport,
            saved: SavedState {
                position: camera.position,
                target: camera.target,
                zoom: camera.zoom,
            },
            drag: None,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.drag = Some(Vector2::new(x, y));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some(last) = self.drag else {
            return;
        };
        let height = self.viewport[1].max(1.0);
        self.delta_theta -= 2.0 * PI * (x - last.x) / height;
        self.delta_phi -= 2.0 * PI * (y - last.y) / height;
        self.drag = Some(Vector2::new(x, y));
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// One wheel step. Negative `delta_y` zooms in.
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enable_zoom {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.zoom_scale /= step;
        } else if delta_y > 0.0 {
            self.zoom_scale *= step;
        }
    }

    /// Applies pending rotation and zoom. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut OrthographicCamera) -> bool {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        let mut moved = false;

        if radius > 0.0 {
            let mut theta = offset.x.atan2(offset.z);
            let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
            let (d_theta, d_phi) = match self.damping {
                Some(f) => (self.delta_theta * f, self.delta_phi * f),
                None => (self.delta_theta, self.delta_phi),
            };
            theta += d_theta;
            phi = (phi + d_phi).clamp(MIN_POLAR, PI - MIN_POLAR);

            let new_offset = Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
            moved |= (new_offset - offset).magnitude2() > 1e-12;
            camera.position = camera.target + new_offset;
        }

        match self.damping {
            Some(f) => {
                self.delta_theta *= 1.0 - f;
                self.delta_phi *= 1.0 - f;
                if self.delta_theta.abs() < 1e-6 {
                    self.delta_theta = 0.0;
                }
                if self.delta_phi.abs() < 1e-6 {
                    self.delta_phi = 0.0;
                }
            }
            None => {
                self.delta_theta = 0.0;
                self.delta_phi = 0.0;
            }
        }

        if self.zoom_scale != 1.0 {
            camera.zoom *= self.zoom_scale;
            self.zoom_scale = 1.0;
            moved = true;
        }
        camera.target = self.saved.target;
        moved
    }

    pub fn reset(&mut self, camera: &mut OrthographicCamera) {
        camera.position = self.saved.position;
        camera.target = self.saved.target;
        camera.zoom = self.saved.zoom;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.zoom_scale = 1.0;
        self.drag = None;
    }

    pub fn dispose(&mut self) {
        self.drag = None;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.zoom_scale = 1.0;
    }
}

/// Converts a pointer position in pixels (origin top left) to NDC.
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Vector2<f32> {
    if width <= 0.0 || height <= 0.0 {
        return Vector2::zero();
    }
    Vector2::new(x / width * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(zoom: f32) -> CameraSettings {
        CameraSettings {
            yaw: 45.0,
            pitch: 30.0,
            roll: 0.0,
            zoom,
        }
    }

    #[test]
    fn narrow_viewports_zoom_out_only() {
        let config = ViewerConfig::default();
        let mut camera = OrthographicCamera::default();
        update_viewport_size(&mut camera, 300.0, 200.0, 300.0, &settings(1.0), &config);
        assert!((camera.zoom - BASE_ZOOM / 3.0).abs() < 1e-4);
        assert_eq!((camera.left, camera.top), (-150.0, 100.0));
        update_viewport_size(&mut camera, 2000.0, 200.0, 300.0, &settings(2.0), &config);
        assert!((camera.zoom - BASE_ZOOM * 2.0).abs() < 1e-4);
    }

    #[test]
    fn origin_projects_to_center() {
        let mut camera = OrthographicCamera::from_settings(&settings(1.0), 15.0);
        update_viewport_size(&mut camera, 400.0, 300.0, 400.0, &settings(1.0), &ViewerConfig::default());
        let clip = camera.view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn center_ray_points_at_origin() {
        let camera = OrthographicCamera::from_settings(&settings(1.0), 15.0);
        let ray = camera.ray_from_ndc(Vector2::zero()).unwrap();
        let closest = ray.origin.to_vec() - ray.direction * ray.origin.to_vec().dot(ray.direction);
        assert!(closest.magnitude() < 1e-3);
    }

    #[test]
    fn drag_rotates_and_reset_restores() {
        let config = ViewerConfig::default();
        let mut camera = OrthographicCamera::from_settings(&settings(1.0), 15.0);
        let start = camera.position;
        let mut controls = OrbitControls::new(&camera, [400.0, 300.0], &config);
        controls.pointer_down(100.0, 100.0);
        controls.pointer_move(130.0, 100.0);
        controls.pointer_up();
        assert!(controls.update(&mut camera));
        assert!((camera.position - start).magnitude() > 0.1);
        assert!(((camera.position - Point3::origin()).magnitude() - 15.0).abs() < 1e-3);
        // height is preserved by a horizontal drag
        assert!((camera.position.y - start.y).abs() < 1e-3);
        controls.reset(&mut camera);
        assert_eq!(camera.position, start);
    }

    #[test]
    fn wheel_needs_enable_zoom() {
        let mut camera = OrthographicCamera::default();
        let mut controls = OrbitControls::new(&camera, [100.0, 100.0], &ViewerConfig::default());
        controls.wheel(-120.0);
        controls.update(&mut camera);
        assert_eq!(camera.zoom, 1.0);
        controls.enable_zoom = true;
        controls.wheel(-120.0);
        controls.update(&mut camera);
        assert!((camera.zoom - 1.0 / 0.95).abs() < 1e-5);
    }
}
