//! One mounted scene: renderer, scene graph, camera and the handles that must be
//! released when it is torn down.

use std::time::Duration;

use crate::{
    assemble::AssembledScene,
    camera::{OrbitControls, OrthographicCamera, pointer_to_ndc, update_viewport_size},
    config::ViewerConfig,
    data_structures::{annotation::Color, document::CameraSettings, scene_graph::Scene},
    error::ViewerError,
    pick::annotation_at,
    render::Renderer,
    resources::animation::{AnimatedTexturePart, AnimationClock},
    viewer::host::{ResizeObservation, ViewportHost},
};

pub struct Session {
    renderer: Box<dyn Renderer>,
    scene: Scene,
    camera: OrthographicCamera,
    camera_settings: CameraSettings,
    controls: Option<OrbitControls>,
    resize: Option<Box<dyn ResizeObservation>>,
    animated_parts: Vec<AnimatedTexturePart>,
    clock: AnimationClock,
    pointer: Option<[f32; 2]>,
    viewport: [u32; 2],
    original_width: f32,
    attached: bool,
}

impl Session {
    /// Wires an assembled scene to its renderer. Nothing is attached to the host yet.
    pub fn new(
        renderer: Box<dyn Renderer>,
        assembled: AssembledScene,
        viewport: [u32; 2],
        original_width: f32,
        interactive: bool,
        config: &ViewerConfig,
    ) -> Self {
        let AssembledScene {
            scene,
            camera,
            camera_settings,
            animated_parts,
            ..
        } = assembled;
        let controls = interactive
            .then(|| OrbitControls::new(&camera, [viewport[0] as f32, viewport[1] as f32], config));
        Self {
            renderer,
            scene,
            camera,
            camera_settings,
            controls,
            resize: None,
            animated_parts,
            clock: AnimationClock::new(config.tick_duration(), config.max_catch_up_ticks),
            pointer: None,
            viewport,
            original_width,
            attached: false,
        }
    }

    pub fn attach(&mut self, host: &dyn ViewportHost, background: Option<Color>) {
        self.renderer.set_pixel_ratio(host.pixel_ratio());
        self.renderer.set_size(self.viewport[0], self.viewport[1]);
        self.renderer.set_background(background);
        host.attach_surface(self.renderer.surface());
        self.attached = true;
    }

    pub fn set_resize_observation(&mut self, observation: Box<dyn ResizeObservation>) {
        self.resize = Some(observation);
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn animated_parts(&self) -> &[AnimatedTexturePart] {
        &self.animated_parts
    }

    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    /// Resizes the surface and recomputes the projection. Controls are rebuilt so
    /// drags are measured against the new size.
    pub fn resize(&mut self, width: u32, height: u32, config: &ViewerConfig) {
        self.viewport = [width, height];
        self.renderer.set_size(width, height);
        update_viewport_size(
            &mut self.camera,
            width as f32,
            height as f32,
            self.original_width,
            &self.camera_settings,
            config,
        );
        if let Some(controls) = &mut self.controls {
            controls.dispose();
            *controls = OrbitControls::new(&self.camera, [width as f32, height as f32], config);
        }
    }

    /// Runs one frame and returns the tooltip content under the pointer.
    pub fn frame(&mut self, now: Duration) -> Result<Option<String>, ViewerError> {
        if let Some(controls) = &mut self.controls {
            controls.update(&mut self.camera);
        }

        let ticks = self.clock.advance(now);
        for _ in 0..ticks {
            for part in &mut self.animated_parts {
                for blit in part.tick() {
                    self.renderer
                        .copy_texture_region(blit.frame, blit.target, blit.x, blit.y);
                }
            }
        }

        self.renderer.render(&self.scene, &self.camera)?;

        Ok(self.pointer.and_then(|[x, y]| {
            let ndc = pointer_to_ndc(x, y, self.viewport[0] as f32, self.viewport[1] as f32);
            annotation_at(&self.scene, &self.camera, ndc).map(|a| a.content().to_string())
        }))
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.pointer = Some([x, y]);
        if let Some(controls) = &mut self.controls {
            controls.pointer_move(x, y);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer = None;
        if let Some(controls) = &mut self.controls {
            controls.pointer_up();
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if let Some(controls) = &mut self.controls {
            controls.pointer_down(x, y);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(controls) = &mut self.controls {
            controls.pointer_up();
        }
    }

    /// Issues `steps` wheel steps of `delta` with wheel zoom enabled only around them.
    pub fn zoom(&mut self, steps: u32, delta: f32) {
        let Some(controls) = &mut self.controls else {
            return;
        };
        controls.enable_zoom = true;
        for _ in 0..steps {
            controls.wheel(delta);
        }
        controls.enable_zoom = false;
        controls.update(&mut self.camera);
    }

    pub fn reset_view(&mut self) {
        if let Some(controls) = &mut self.controls {
            controls.reset(&mut self.camera);
        }
    }

    /// Releases everything the session holds, in teardown order. Safe to call twice.
    pub fn dispose(&mut self, host: &dyn ViewportHost) {
        if let Some(mut observation) = self.resize.take() {
            observation.disconnect();
        }
        if std::mem::take(&mut self.attached) {
            host.detach_surface(self.renderer.surface());
        }
        self.renderer.dispose();
        if let Some(mut controls) = self.controls.take() {
            controls.dispose();
        }
        self.pointer = None;
    }
}
