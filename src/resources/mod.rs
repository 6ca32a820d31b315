//! Loading of exported scenes and the resources they reference.
//!
//! The pipeline is: fetch the compressed scene, decode it into a
//! [`SceneDocument`], then turn every mesh record into a scene node through the
//! geometry and material builders. Every stage checks the abort signal before
//! it touches shared state.

use std::rc::Rc;

use crate::{
    cancel::AbortSignal,
    data_structures::{document::SceneDocument, scene_graph::Node},
    error::ViewerError,
    format,
};

pub mod animation;
pub mod annotation;
pub mod fetch;
pub mod geometry;
pub mod material;
pub mod texture;

use fetch::{AssetSource, resolve_url};
use material::TextureGroups;
use texture::TextureManager;

/// Fetches and decodes the scene at `src`, relative to `base_url`.
pub async fn load_document(
    source: &dyn AssetSource,
    base_url: &str,
    src: &str,
    signal: &AbortSignal,
) -> Result<SceneDocument, ViewerError> {
    let url = resolve_url(base_url, src);
    log::info!("Loading scene {url}");
    signal.check()?;
    let compressed = source.fetch(&url).await?;
    signal.check()?;
    let document = format::decode_scene(&compressed)?;
    log::debug!(
        "Decoded {url}: {} compressed bytes, {} meshes, {} animated textures",
        compressed.len(),
        document.meshes.len(),
        document.animated_textures.len()
    );
    Ok(document)
}

/// The model group of a scene plus the texture groups its materials registered.
#[derive(Debug)]
pub struct BuiltModel {
    pub group: Node,
    pub texture_groups: TextureGroups,
    pub skipped_meshes: usize,
}

/// Builds one scene node per drawable mesh. Meshes without usable geometry are
/// skipped, never failing the scene.
pub async fn build_model(
    textures: &TextureManager,
    document: &SceneDocument,
    signal: &AbortSignal,
) -> Result<BuiltModel, ViewerError> {
    let mut group = Node::group("model");
    let mut texture_groups = TextureGroups::new();
    let mut skipped_meshes = 0;

    for (i, mesh) in document.meshes.iter().enumerate() {
        let Some(geometry) = geometry::build_geometry(mesh) else {
            log::warn!("Skipping mesh {i}");
            skipped_meshes += 1;
            continue;
        };
        let material = material::build_material(textures, &mesh.material, &mut texture_groups).await;
        signal.check()?;
        let name = mesh.material.name.clone().unwrap_or_else(|| format!("mesh{i}"));
        group.add_child(Node::mesh(name, Rc::new(geometry), Rc::new(material)));
    }

    log::info!(
        "Built {} meshes ({} skipped)",
        group.children.len(),
        skipped_meshes
    );
    Ok(BuiltModel {
        group,
        texture_groups,
        skipped_meshes,
    })
}
