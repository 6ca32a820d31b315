//! Viewer data structures: decoded documents, geometry, materials and the scene graph.
//!
//! - `buffer` holds aligned byte storage with zero-copy typed views
//! - `document` is the decoded scene container
//! - `geometry` contains interleaved attribute views and bounds
//! - `material` is the renderer-independent material model
//! - `texture` contains texture handles and their GPU counterpart
//! - `annotation` holds page-authored markers and colours
//! - `scene_graph` is the assembled, renderable tree

pub mod annotation;
pub mod buffer;
pub mod document;
pub mod geometry;
pub mod material;
pub mod scene_graph;
pub mod texture;
