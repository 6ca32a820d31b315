//! guide-scene-viewer
//!
//! Decoder and interactive orthographic viewer for game scenes exported into
//! guidebook pages. A scene file is a gzip-compressed flatbuffer holding
//! interleaved vertex data, materials, samplers, an isometric camera setup and
//! animated texture descriptors. The viewer mounts it into a host element,
//! overlays page-authored annotations and lets the reader orbit and zoom.
//!
//! High-level modules
//! - `format`: gzip and flatbuffer decoding into a [`data_structures::document::SceneDocument`]
//! - `data_structures`: geometry, materials, textures, annotations and the scene graph
//! - `resources`: fetching, texture coalescing, material and annotation building, animation
//! - `assemble`: turns a document into a renderable scene with camera and helpers
//! - `camera`: orthographic camera, viewport fitting and orbit controls
//! - `pick`: annotation hit testing under the pointer
//! - `render`: the renderer abstraction and draw ordering
//! - `renderer`, `pipelines`, `context`: the wgpu implementation
//! - `viewer`: the controller owning load, mount and teardown of a scene
//! - `flow`: native window host and event loop
//!

pub mod assemble;
pub mod camera;
pub mod cancel;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod format;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use viewer::{ModelViewer, ViewerParams, ViewerState};
