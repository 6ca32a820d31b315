use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use futures::future::LocalBoxFuture;
use futures_intrusive::sync::LocalManualResetEvent;
use guide_scene_viewer::{
    camera::OrthographicCamera,
    data_structures::{annotation::Color, scene_graph::Scene, texture::Texture},
    error::{TransportError, ViewerError},
    render::{Renderer, SurfaceId},
    resources::fetch::AssetSource,
    viewer::{ResizeObservation, ViewportHost},
};

/// Serves resources from memory, counting fetches per URL. A gated URL does
/// not resolve until its gate is opened.
#[derive(Default)]
pub(crate) struct MemorySource {
    files: RefCell<HashMap<String, Vec<u8>>>,
    fetches: RefCell<HashMap<String, usize>>,
    gates: RefCell<HashMap<String, Rc<LocalManualResetEvent>>>,
}

impl MemorySource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(url.to_string(), bytes);
    }

    /// Holds fetches of `url` until the returned gate is set.
    pub fn gate(&self, url: &str) -> Rc<LocalManualResetEvent> {
        let gate = Rc::new(LocalManualResetEvent::new(false));
        self.gates.borrow_mut().insert(url.to_string(), gate.clone());
        gate
    }

    pub fn fetches(&self, url: &str) -> usize {
        self.fetches.borrow().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.borrow().values().sum()
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, TransportError>> {
        *self.fetches.borrow_mut().entry(url.to_string()).or_default() += 1;
        let result = self
            .files
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::new(url, "HTTP 404 Not Found"));
        let gate = self.gates.borrow().get(url).cloned();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.wait().await;
            }
            result
        })
    }
}

/// What a [`RecordingRenderer`] was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RendererLog {
    pub renders: usize,
    pub disposes: usize,
    pub size: [u32; 2],
    pub pixel_ratio: f32,
    pub background: Option<Color>,
    pub blits: Vec<(String, String, u32, u32)>,
    pub last_zoom: Option<f32>,
}

pub(crate) struct RecordingRenderer {
    id: SurfaceId,
    log: Rc<RefCell<RendererLog>>,
    disposed: bool,
}

impl Renderer for RecordingRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().size = [width, height];
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.log.borrow_mut().pixel_ratio = ratio;
    }

    fn set_background(&mut self, color: Option<Color>) {
        self.log.borrow_mut().background = color;
    }

    fn render(&mut self, _scene: &Scene, camera: &OrthographicCamera) -> Result<(), ViewerError> {
        let mut log = self.log.borrow_mut();
        log.renders += 1;
        log.last_zoom = Some(camera.zoom);
        Ok(())
    }

    fn copy_texture_region(&mut self, source: &Texture, target: &Texture, x: u32, y: u32) {
        self.log
            .borrow_mut()
            .blits
            .push((source.label().to_string(), target.label().to_string(), x, y));
    }

    fn surface(&self) -> SurfaceId {
        self.id
    }

    fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.log.borrow_mut().disposes += 1;
    }
}

type Callbacks = Rc<RefCell<Vec<(usize, Box<dyn FnMut(u32, u32)>)>>>;

/// A viewport element that hands out [`RecordingRenderer`]s.
pub(crate) struct FakeHost {
    size: Cell<[u32; 2]>,
    renderers: RefCell<Vec<Rc<RefCell<RendererLog>>>>,
    pub attached: RefCell<Vec<SurfaceId>>,
    pub detached: RefCell<Vec<SurfaceId>>,
    callbacks: Callbacks,
    next_callback: Cell<usize>,
    pub disconnects: Rc<Cell<usize>>,
}

impl FakeHost {
    pub fn new(width: u32, height: u32) -> Rc<Self> {
        Rc::new(Self {
            size: Cell::new([width, height]),
            renderers: RefCell::new(Vec::new()),
            attached: RefCell::new(Vec::new()),
            detached: RefCell::new(Vec::new()),
            callbacks: Rc::new(RefCell::new(Vec::new())),
            next_callback: Cell::new(0),
            disconnects: Rc::new(Cell::new(0)),
        })
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.borrow().len()
    }

    pub fn renderer(&self, i: usize) -> Rc<RefCell<RendererLog>> {
        self.renderers.borrow()[i].clone()
    }

    pub fn observers(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.size.set([width, height]);
        for (_, callback) in self.callbacks.borrow_mut().iter_mut() {
            callback(width, height);
        }
    }
}

impl ViewportHost for FakeHost {
    fn content_size(&self) -> [u32; 2] {
        self.size.get()
    }

    fn pixel_ratio(&self) -> f32 {
        2.0
    }

    fn create_renderer(&self) -> LocalBoxFuture<'static, anyhow::Result<Box<dyn Renderer>>> {
        let log = Rc::new(RefCell::new(RendererLog::default()));
        let mut renderers = self.renderers.borrow_mut();
        renderers.push(log.clone());
        let renderer = RecordingRenderer {
            id: renderers.len() as SurfaceId,
            log,
            disposed: false,
        };
        Box::pin(async move { Ok(Box::new(renderer) as Box<dyn Renderer>) })
    }

    fn attach_surface(&self, surface: SurfaceId) {
        self.attached.borrow_mut().push(surface);
    }

    fn detach_surface(&self, surface: SurfaceId) {
        self.detached.borrow_mut().push(surface);
    }

    fn observe_resize(&self, callback: Box<dyn FnMut(u32, u32)>) -> Box<dyn ResizeObservation> {
        let id = self.next_callback.get();
        self.next_callback.set(id + 1);
        self.callbacks.borrow_mut().push((id, callback));
        Box::new(FakeObservation {
            id,
            callbacks: Some(self.callbacks.clone()),
            disconnects: self.disconnects.clone(),
        })
    }
}

struct FakeObservation {
    id: usize,
    callbacks: Option<Callbacks>,
    disconnects: Rc<Cell<usize>>,
}

impl ResizeObservation for FakeObservation {
    fn disconnect(&mut self) {
        if let Some(callbacks) = self.callbacks.take() {
            callbacks.borrow_mut().retain(|(id, _)| *id != self.id);
            self.disconnects.set(self.disconnects.get() + 1);
        }
    }
}
