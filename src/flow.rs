//! Native host and application event loop.
//!
//! The window plays the role of the viewport element: it is the
//! [`ViewportHost`] the controller mounts into, forwards resize and pointer
//! events, and drives one [`ModelViewer::animate`] per redraw. Loads are
//! polled on a [`LocalPool`] between frames.
//!
//! # Lifecycle Flow
//!
//! Each frame:
//! 1. Poll pending loads until they stall
//! 2. Animate the viewer (controls, animated textures, render, tooltip)
//! 3. Reflect the tooltip or error in the window title
//! 4. Request the next redraw

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::Arc,
};

use futures::{
    executor::LocalPool,
    future::LocalBoxFuture,
    task::LocalSpawn,
};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    assemble::{AssembleParams, assemble},
    cancel::AbortSignal,
    config::ViewerConfig,
    error::ViewerError,
    render::{Renderer, SurfaceId},
    renderer::WgpuRenderer,
    resources::{fetch::AssetSource, load_document, texture::TextureManager},
    viewer::{ModelViewer, ResizeObservation, ViewerParams, ViewerState, ViewportHost},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

type ResizeCallbacks = Rc<RefCell<Vec<(u64, Box<dyn FnMut(u32, u32)>)>>>;

/// A window acting as the viewport element.
pub struct WindowHost {
    window: Arc<Window>,
    callbacks: ResizeCallbacks,
    next_callback: Cell<u64>,
    attached: Cell<Option<SurfaceId>>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            callbacks: Rc::new(RefCell::new(Vec::new())),
            next_callback: Cell::new(0),
            attached: Cell::new(None),
        }
    }

    /// Delivers a new logical size to every connected observer.
    pub fn notify_resize(&self, width: u32, height: u32) {
        for (_, callback) in self.callbacks.borrow_mut().iter_mut() {
            callback(width, height);
        }
    }
}

impl ViewportHost for WindowHost {
    fn content_size(&self) -> [u32; 2] {
        let size: LogicalSize<u32> = self.window.inner_size().to_logical(self.window.scale_factor());
        [size.width, size.height]
    }

    fn pixel_ratio(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn create_renderer(&self) -> LocalBoxFuture<'static, anyhow::Result<Box<dyn Renderer>>> {
        let window = self.window.clone();
        Box::pin(async move {
            let renderer = WgpuRenderer::for_window(window).await?;
            Ok(Box::new(renderer) as Box<dyn Renderer>)
        })
    }

    fn attach_surface(&self, surface: SurfaceId) {
        log::debug!("Attaching surface {surface}");
        self.attached.set(Some(surface));
        self.window.request_redraw();
    }

    fn detach_surface(&self, surface: SurfaceId) {
        if self.attached.get() == Some(surface) {
            log::debug!("Detaching surface {surface}");
            self.attached.set(None);
        }
    }

    fn observe_resize(&self, callback: Box<dyn FnMut(u32, u32)>) -> Box<dyn ResizeObservation> {
        let id = self.next_callback.get();
        self.next_callback.set(id + 1);
        self.callbacks.borrow_mut().push((id, callback));
        Box::new(WindowResizeObservation {
            id,
            callbacks: Rc::downgrade(&self.callbacks),
        })
    }
}

struct WindowResizeObservation {
    id: u64,
    callbacks: std::rc::Weak<RefCell<Vec<(u64, Box<dyn FnMut(u32, u32)>)>>>,
}

impl ResizeObservation for WindowResizeObservation {
    fn disconnect(&mut self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            callbacks.borrow_mut().retain(|(id, _)| *id != self.id);
        }
        self.callbacks = std::rc::Weak::new();
    }
}

/// Spawns loads on the browser's microtask queue.
#[cfg(target_arch = "wasm32")]
pub struct WasmSpawner;

#[cfg(target_arch = "wasm32")]
impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(
        &self,
        future: futures::task::LocalFutureObj<'static, ()>,
    ) -> Result<(), futures::task::SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// What the window shows.
pub struct ViewOptions {
    pub config: ViewerConfig,
    pub source: Rc<dyn AssetSource>,
    pub params: ViewerParams,
}

struct AppState {
    window: Arc<Window>,
    host: Rc<WindowHost>,
    viewer: ModelViewer,
    cursor: Option<[f32; 2]>,
    title: String,
}

pub struct App {
    pool: LocalPool,
    options: Option<ViewOptions>,
    state: Option<AppState>,
    start: Instant,
}

impl App {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            pool: LocalPool::new(),
            options: Some(options),
            state: None,
            start: Instant::now(),
        }
    }

    fn spawner(&self) -> Rc<dyn LocalSpawn> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            Rc::new(self.pool.spawner())
        }
        #[cfg(target_arch = "wasm32")]
        {
            Rc::new(WasmSpawner)
        }
    }
}

fn window_title(state: &AppState, src: &str) -> String {
    match state.viewer.state() {
        ViewerState::Failed => format!(
            "{src}: {}",
            state.viewer.error().map(|e| e.to_string()).unwrap_or_default()
        ),
        ViewerState::Ready => match state.viewer.tooltip() {
            Some(tooltip) => format!("{src}: {tooltip}"),
            None => src.to_string(),
        },
        _ => format!("{src} (loading)"),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(options) = self.options.take() else {
            return;
        };
        let title = options.params.src.clone();
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(title.clone())
            .with_inner_size(LogicalSize::new(options.params.width, options.params.height));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        let host = Rc::new(WindowHost::new(window.clone()));
        let viewer = ModelViewer::new(options.config, options.source, host.clone(), self.spawner());
        viewer.start(options.params);
        window.request_redraw();

        self.state = Some(AppState {
            window,
            host,
            viewer,
            cursor: None,
            title,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        let scale = state.window.scale_factor();

        match event {
            WindowEvent::CloseRequested => {
                state.viewer.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let logical: LogicalSize<u32> = size.to_logical(scale);
                state.host.notify_resize(logical.width.max(1), logical.height.max(1));
            }
            WindowEvent::RedrawRequested => {
                self.pool.run_until_stalled();
                state.viewer.animate(self.start.elapsed());
                let title = window_title(state, &state.title);
                state.window.set_title(&title);
                state.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale);
                state.cursor = Some([logical.x, logical.y]);
                state.viewer.pointer_move(logical.x, logical.y);
            }
            WindowEvent::CursorLeft { .. } => {
                state.cursor = None;
                state.viewer.pointer_leave();
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => match (button_state, state.cursor) {
                (ElementState::Pressed, Some([x, y])) => state.viewer.pointer_down(x, y),
                (ElementState::Released, _) => state.viewer.pointer_up(),
                _ => (),
            },
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    Key::Character("+") | Key::Character("=") => state.viewer.zoom_in(),
                    Key::Character("-") => state.viewer.zoom_out(),
                    Key::Character("r") | Key::Character("R") => state.viewer.reset_view(),
                    Key::Named(NamedKey::Escape) => {
                        state.viewer.dispose();
                        event_loop.exit();
                    }
                    _ => (),
                }
            }
            _ => {}
        }
    }
}

/// Opens a window showing one scene until it is closed.
pub fn run(options: ViewOptions) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Loads and renders one frame of a scene offscreen, with no helpers or
/// controls, as a static snapshot.
pub async fn render_snapshot(
    config: &ViewerConfig,
    source: Rc<dyn AssetSource>,
    params: &ViewerParams,
) -> Result<image::RgbaImage, ViewerError> {
    let textures = TextureManager::new(config.asset_base_url.clone(), source);
    let signal = AbortSignal::never();
    let document = load_document(textures.source().as_ref(), textures.base_url(), &params.src, &signal).await?;
    let assembled = assemble(
        &textures,
        document,
        AssembleParams {
            viewport: [params.width as f32, params.height as f32],
            original_width: params.width as f32,
            interactive: false,
            in_world_annotations: &params.in_world_annotations,
            overlay_annotations: &params.overlay_annotations,
            config,
        },
        &signal,
    )
    .await?;

    let mut renderer = WgpuRenderer::headless([params.width, params.height])
        .await
        .map_err(ViewerError::renderer)?;
    renderer.set_background(params.background.or(config.background));
    renderer.render(&assembled.scene, &assembled.camera)?;
    let pixels = renderer.read_pixels().await.map_err(ViewerError::renderer);
    renderer.dispose();
    pixels
}
