//! The element a viewer is mounted into.
//!
//! On the web this is the viewport `div`; natively it is the window. The
//! controller never touches either directly, only this trait.

use futures::future::LocalBoxFuture;

use crate::render::{Renderer, SurfaceId};

pub trait ViewportHost {
    /// Content box size in logical pixels.
    fn content_size(&self) -> [u32; 2];
    fn pixel_ratio(&self) -> f32;
    fn create_renderer(&self) -> LocalBoxFuture<'static, anyhow::Result<Box<dyn Renderer>>>;
    fn attach_surface(&self, surface: SurfaceId);
    fn detach_surface(&self, surface: SurfaceId);
    /// Calls `callback` with the new content size whenever it changes.
    fn observe_resize(&self, callback: Box<dyn FnMut(u32, u32)>) -> Box<dyn ResizeObservation>;
}

/// Handle of a registered resize callback.
pub trait ResizeObservation {
    /// Stops delivering resize events. Calling it again does nothing.
    fn disconnect(&mut self);
}
