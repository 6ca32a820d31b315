//! The viewport controller.
//!
//! A [`ModelViewer`] is mounted into a [`ViewportHost`] and drives one
//! [`Session`] at a time:
//!
//! ```text
//! Uninitialized -> Loading -> Ready | Failed
//! Ready | Failed -> Loading          (inputs changed)
//! any            -> Disposed
//! ```
//!
//! Loads run on a caller supplied [`LocalSpawn`]. Every load gets a fresh epoch
//! and abort signal; a completion whose epoch is stale is released and dropped,
//! and an aborted load never surfaces an error.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    time::Duration,
};

use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::{
    assemble::{AssembleParams, assemble},
    cancel::{AbortController, AbortSignal},
    config::ViewerConfig,
    data_structures::annotation::{Color, InWorldAnnotation, OverlayAnnotation},
    error::ViewerError,
    resources::{fetch::AssetSource, load_document, texture::TextureManager},
};

pub mod host;
pub mod session;

pub use host::{ResizeObservation, ViewportHost};
pub use session::Session;

/// Inputs supplied by the embedding page.
#[derive(Clone, Debug)]
pub struct ViewerParams {
    /// Scene path relative to the asset base URL.
    pub src: String,
    /// Image shown until the scene is ready and whenever loading failed.
    pub placeholder: String,
    pub width: u32,
    pub height: u32,
    pub background: Option<Color>,
    pub interactive: bool,
    pub in_world_annotations: Rc<[InWorldAnnotation]>,
    pub overlay_annotations: Rc<[OverlayAnnotation]>,
}

impl ViewerParams {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            src: src.into(),
            placeholder: String::new(),
            width,
            height,
            background: None,
            interactive: true,
            in_world_annotations: Rc::from(Vec::new()),
            overlay_annotations: Rc::from(Vec::new()),
        }
    }

    /// Whether switching to `other` needs a new session. Annotation lists compare
    /// by identity.
    pub fn requires_reload(&self, other: &ViewerParams) -> bool {
        self.src != other.src
            || self.interactive != other.interactive
            || self.width != other.width
            || self.height != other.height
            || !Rc::ptr_eq(&self.in_world_annotations, &other.in_world_annotations)
            || !Rc::ptr_eq(&self.overlay_annotations, &other.overlay_annotations)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
    Disposed,
}

struct Inner {
    config: ViewerConfig,
    host: Rc<dyn ViewportHost>,
    textures: Rc<TextureManager>,
    state: ViewerState,
    params: Option<ViewerParams>,
    epoch: u64,
    abort: Option<AbortController>,
    session: Option<Session>,
    error: Option<ViewerError>,
    tooltip: Option<String>,
    pending_resize: Rc<Cell<Option<[u32; 2]>>>,
}

impl Inner {
    /// Tears down the current session and invalidates any load in flight.
    fn teardown(&mut self) {
        self.epoch += 1;
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        if let Some(mut session) = self.session.take() {
            log::info!("Disposing viewer session");
            session.dispose(self.host.as_ref());
        }
        self.pending_resize.set(None);
        self.tooltip = None;
    }

    fn apply_pending_resize(&mut self) {
        if let (Some([width, height]), Some(session)) = (self.pending_resize.take(), &mut self.session) {
            log::debug!("Viewport resized to {width}x{height}");
            session.resize(width, height, &self.config);
        }
    }
}

pub struct ModelViewer {
    inner: Rc<RefCell<Inner>>,
    spawner: Rc<dyn LocalSpawn>,
}

impl ModelViewer {
    pub fn new(
        config: ViewerConfig,
        source: Rc<dyn AssetSource>,
        host: Rc<dyn ViewportHost>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        let textures = Rc::new(TextureManager::new(config.asset_base_url.clone(), source));
        Self::with_textures(config, textures, host, spawner)
    }

    /// Shares `textures` with other viewers, so images decoded once are reused.
    pub fn with_textures(
        config: ViewerConfig,
        textures: Rc<TextureManager>,
        host: Rc<dyn ViewportHost>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                host,
                textures,
                state: ViewerState::Uninitialized,
                params: None,
                epoch: 0,
                abort: None,
                session: None,
                error: None,
                tooltip: None,
                pending_resize: Rc::new(Cell::new(None)),
            })),
            spawner,
        }
    }

    /// Starts loading `params`, replacing whatever was shown before.
    pub fn start(&self, params: ViewerParams) {
        let epoch = {
            let mut inner = self.inner.borrow_mut();
            inner.teardown();
            inner.state = ViewerState::Loading;
            inner.error = None;
            inner.params = Some(params.clone());
            inner.epoch
        };
        log::info!("Loading scene {} (epoch {epoch})", params.src);

        let (config, host, textures, mut abort) = {
            let inner = self.inner.borrow();
            (
                inner.config.clone(),
                inner.host.clone(),
                inner.textures.clone(),
                AbortController::new(),
            )
        };
        let signal = abort.signal();
        let load = abort.wrap(load_session(config, host, textures, params, signal));
        self.inner.borrow_mut().abort = Some(abort);

        let weak = Rc::downgrade(&self.inner);
        let task = async move {
            let result = load.await;
            finish_load(&weak, epoch, result);
        };
        if let Err(err) = self.spawner.spawn_local(task) {
            let mut inner = self.inner.borrow_mut();
            inner.state = ViewerState::Failed;
            inner.error = Some(ViewerError::renderer(format!("cannot spawn load: {err}")));
        }
    }

    /// Reloads only when one of the inputs that shape the scene changed. Returns
    /// whether a new load was started.
    pub fn update_if_changed(&self, params: ViewerParams) -> bool {
        let reload = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let (reload, background_changed) = match &inner.params {
                Some(current) if inner.state != ViewerState::Disposed => {
                    (current.requires_reload(&params), current.background != params.background)
                }
                _ => (true, false),
            };
            if !reload {
                if let (true, Some(session)) = (background_changed, &mut inner.session) {
                    session
                        .renderer_mut()
                        .set_background(params.background.or(inner.config.background));
                }
                inner.params = Some(params.clone());
            }
            reload
        };
        if reload {
            self.start(params);
        }
        reload
    }

    /// Tears everything down. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == ViewerState::Disposed {
            return;
        }
        inner.teardown();
        inner.state = ViewerState::Disposed;
        inner.error = None;
    }

    /// Runs one frame at time `now` since an arbitrary fixed start.
    pub fn animate(&self, now: Duration) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.state != ViewerState::Ready {
            return;
        }
        inner.apply_pending_resize();
        let Some(session) = &mut inner.session else {
            return;
        };
        match session.frame(now) {
            Ok(tooltip) => inner.tooltip = tooltip,
            Err(err) => log::error!("Frame failed: {err}"),
        }
    }

    pub fn pointer_move(&self, x: f32, y: f32) {
        if let Some(session) = &mut self.inner.borrow_mut().session {
            session.pointer_move(x, y);
        }
    }

    /// The pointer left the surface; the tooltip is cleared.
    pub fn pointer_leave(&self) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if let Some(session) = &mut inner.session {
            session.pointer_leave();
        }
        inner.tooltip = None;
    }

    pub fn pointer_down(&self, x: f32, y: f32) {
        if let Some(session) = &mut self.inner.borrow_mut().session {
            session.pointer_down(x, y);
        }
    }

    pub fn pointer_up(&self) {
        if let Some(session) = &mut self.inner.borrow_mut().session {
            session.pointer_up();
        }
    }

    pub fn zoom_in(&self) {
        self.zoom(-1.0);
    }

    pub fn zoom_out(&self) {
        self.zoom(1.0);
    }

    fn zoom(&self, direction: f32) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let (steps, delta) = (inner.config.zoom_steps, inner.config.zoom_wheel_delta);
        if let Some(session) = &mut inner.session {
            session.zoom(steps, direction * delta);
        }
    }

    pub fn reset_view(&self) {
        if let Some(session) = &mut self.inner.borrow_mut().session {
            session.reset_view();
        }
    }

    pub fn state(&self) -> ViewerState {
        self.inner.borrow().state
    }

    /// The error of a failed load, with its raw detail.
    pub fn error(&self) -> Option<ViewerError> {
        self.inner.borrow().error.clone()
    }

    pub fn tooltip(&self) -> Option<String> {
        self.inner.borrow().tooltip.clone()
    }

    /// Whether the placeholder image should be shown instead of the viewport.
    pub fn shows_placeholder(&self) -> bool {
        self.state() != ViewerState::Ready
    }

    pub fn placeholder(&self) -> Option<String> {
        self.inner.borrow().params.as_ref().map(|p| p.placeholder.clone())
    }

    pub fn textures(&self) -> Rc<TextureManager> {
        self.inner.borrow().textures.clone()
    }

    /// Runs `f` against the live session, if any.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
        self.inner.borrow().session.as_ref().map(f)
    }
}

impl Drop for ModelViewer {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            if inner.state != ViewerState::Disposed {
                inner.teardown();
                inner.state = ViewerState::Disposed;
            }
        }
    }
}

async fn load_session(
    config: ViewerConfig,
    host: Rc<dyn ViewportHost>,
    textures: Rc<TextureManager>,
    params: ViewerParams,
    signal: AbortSignal,
) -> Result<Session, ViewerError> {
    let document = load_document(textures.source().as_ref(), textures.base_url(), &params.src, &signal).await?;

    let [w, h] = host.content_size();
    let viewport = if w == 0 || h == 0 { [params.width, params.height] } else { [w, h] };
    let assembled = assemble(
        &textures,
        document,
        AssembleParams {
            viewport: [viewport[0] as f32, viewport[1] as f32],
            original_width: params.width as f32,
            interactive: params.interactive,
            in_world_annotations: &params.in_world_annotations,
            overlay_annotations: &params.overlay_annotations,
            config: &config,
        },
        &signal,
    )
    .await?;

    let mut renderer = host.create_renderer().await.map_err(ViewerError::renderer)?;
    if let Err(err) = signal.check() {
        renderer.dispose();
        return Err(err);
    }
    renderer.set_background(params.background.or(config.background));
    Ok(Session::new(
        renderer,
        assembled,
        viewport,
        params.width as f32,
        params.interactive,
        &config,
    ))
}

/// Installs the result of load `epoch`, unless a newer load or a teardown
/// superseded it, in which case whatever it acquired is released.
fn finish_load(weak: &Weak<RefCell<Inner>>, epoch: u64, result: Result<Session, ViewerError>) {
    let inner = match weak.upgrade() {
        Some(inner) => inner,
        None => {
            if let Ok(mut session) = result {
                session.renderer_mut().dispose();
            }
            return;
        }
    };
    let mut guard = inner.borrow_mut();
    if guard.epoch != epoch || guard.state != ViewerState::Loading {
        log::debug!("Discarding superseded load (epoch {epoch})");
        if let Ok(mut session) = result {
            session.renderer_mut().dispose();
        }
        return;
    }
    guard.abort = None;

    match result {
        Ok(mut session) => {
            let background = guard
                .params
                .as_ref()
                .and_then(|p| p.background)
                .or(guard.config.background);
            session.attach(guard.host.as_ref(), background);

            let pending = guard.pending_resize.clone();
            let weak = weak.clone();
            let observation = guard.host.observe_resize(Box::new(move |width, height| {
                pending.set(Some([width, height]));
                if let Some(inner) = weak.upgrade() {
                    if let Ok(mut inner) = inner.try_borrow_mut() {
                        inner.apply_pending_resize();
                    }
                }
            }));
            session.set_resize_observation(observation);

            guard.session = Some(session);
            guard.state = ViewerState::Ready;
            log::info!("Scene ready (epoch {epoch})");
        }
        Err(err) if err.is_abort() => {
            log::debug!("Load aborted (epoch {epoch})");
        }
        Err(err) => {
            log::error!("Failed to load scene: {err}");
            guard.state = ViewerState::Failed;
            guard.error = Some(err);
        }
    }
}
