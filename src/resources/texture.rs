//! Loading, caching and deduplication of textures.
//!
//! Images are fetched and decoded at most once per (url, built-in) pair for the
//! lifetime of a [`TextureManager`]; concurrent requests share one pending
//! operation. Texture handles are deduplicated by image identity and sampler
//! configuration, so meshes sharing an atlas share one GPU upload.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::data_structures::texture::{ImageBitmap, SamplerConfig, Texture, WrapMode};
use crate::resources::fetch::{AssetSource, built_in_asset, resolve_url};

type PendingImage = Shared<LocalBoxFuture<'static, Rc<ImageBitmap>>>;

pub struct TextureManager {
    base_url: String,
    source: Rc<dyn AssetSource>,
    images: RefCell<HashMap<(String, bool), PendingImage>>,
    textures: RefCell<Vec<Texture>>,
    fetches: Cell<usize>,
}

impl TextureManager {
    pub fn new(base_url: impl Into<String>, source: Rc<dyn AssetSource>) -> Self {
        Self {
            base_url: base_url.into(),
            source,
            images: RefCell::new(HashMap::new()),
            textures: RefCell::new(Vec::new()),
            fetches: Cell::new(0),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn source(&self) -> &Rc<dyn AssetSource> {
        &self.source
    }

    /// Returns a texture for `url`, never failing: unreadable images become a
    /// single magenta pixel.
    pub async fn get(&self, url: &str, linear_filtering: bool, use_mipmaps: bool, built_in: bool) -> Texture {
        self.get_with_wrap(url, linear_filtering, use_mipmaps, built_in, WrapMode::Repeat)
            .await
    }

    pub async fn get_with_wrap(
        &self,
        url: &str,
        linear_filtering: bool,
        use_mipmaps: bool,
        built_in: bool,
        wrap: WrapMode,
    ) -> Texture {
        let image = self.image(url, built_in).await;
        let config = SamplerConfig::new(linear_filtering, use_mipmaps).with_wrap(wrap);

        let mut textures = self.textures.borrow_mut();
        if let Some(existing) = textures.iter().find(|t| t.matches(&image, config)) {
            log::debug!("Reusing texture {url} ({config:?})");
            return existing.clone();
        }
        log::debug!("Creating texture {url} ({config:?})");
        let texture = Texture::new(url, image, config);
        textures.push(texture.clone());
        texture
    }

    fn image(&self, url: &str, built_in: bool) -> PendingImage {
        let key = (url.to_string(), built_in);
        if let Some(pending) = self.images.borrow().get(&key) {
            log::debug!("Reusing loaded image {url}");
            return pending.clone();
        }

        let full_url = if built_in {
            url.to_string()
        } else {
            resolve_url(&self.base_url, url)
        };
        log::debug!("Loading image {full_url}");

        let fetch = match built_in.then(|| built_in_asset(url)).flatten() {
            Some(bytes) => futures::future::ready(Ok(bytes.to_vec())).boxed_local(),
            None => {
                self.fetches.set(self.fetches.get() + 1);
                self.source.fetch(&full_url)
            }
        };
        let pending = async move {
            let decoded = match fetch.await {
                Ok(bytes) => decode_image(&bytes, built_in).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            Rc::new(decoded.unwrap_or_else(|e| {
                log::warn!("Failed to load image {full_url}: {e}");
                placeholder_image()
            }))
        }
        .boxed_local()
        .shared();
        self.images.borrow_mut().insert(key, pending.clone());
        pending
    }

    /// Number of image fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.borrow().len()
    }
}

/// Decodes image bytes to RGBA8. Built-in application assets are stored upside
/// down relative to exported game textures.
pub fn decode_image(bytes: &[u8], flip: bool) -> image::ImageResult<ImageBitmap> {
    let mut rgba = image::load_from_memory(bytes)?.to_rgba8();
    if flip {
        image::imageops::flip_vertical_in_place(&mut rgba);
    }
    Ok(rgba)
}

/// 1x1 magenta stand-in for an image that could not be loaded.
pub fn placeholder_image() -> ImageBitmap {
    ImageBitmap::from_pixel(1, 1, image::Rgba([255, 0, 255, 255]))
}
