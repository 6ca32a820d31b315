//! Byte transport for scene, texture and sprite-sheet resources.
//!
//! On the web every resource comes over HTTP; natively the same relative URLs
//! are looked up below a root directory.

use std::path::PathBuf;

use futures::future::LocalBoxFuture;

use crate::error::TransportError;

/// Where resource bytes come from. Implementations resolve nothing themselves:
/// callers pass fully resolved URLs (see [`resolve_url`]).
pub trait AssetSource {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, TransportError>>;
}

/// Joins `relative` onto `base` with exactly one separator. Absolute references
/// are returned unchanged.
pub fn resolve_url(base: &str, relative: &str) -> String {
    if base.is_empty()
        || relative.starts_with('/')
        || relative.starts_with("http://")
        || relative.starts_with("https://")
    {
        return relative.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches("./")
    )
}

/// Application icons compiled into the crate, keyed by their asset URL.
static BUILT_IN_ASSETS: [(&str, &[u8]); 2] = [
    (
        "assets/diamond.png",
        include_bytes!(concat!(env!("OUT_DIR"), "/assets/diamond.png")),
    ),
    (
        "assets/diamond_colored.png",
        include_bytes!(concat!(env!("OUT_DIR"), "/assets/diamond_colored.png")),
    ),
];

/// Bytes of a built-in asset, so marker icons never depend on the transport.
pub fn built_in_asset(url: &str) -> Option<&'static [u8]> {
    let url = url.trim_start_matches("./");
    BUILT_IN_ASSETS
        .iter()
        .find(|(name, _)| *name == url)
        .map(|(_, bytes)| *bytes)
}

/// Reads resources from the local filesystem, relative URLs below `root`.
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url);
        if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        }
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, TransportError>> {
        let path = self.path_for(url);
        let url = url.to_string();
        Box::pin(async move {
            std::fs::read(&path).map_err(|e| TransportError::new(url, e.to_string()))
        })
    }
}

/// Fetches resources over HTTP. The status is checked before the body is read.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug, Default)]
pub struct HttpSource;

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, TransportError>> {
        let url = url.to_string();
        Box::pin(async move {
            let absolute = absolute_url(&url).map_err(|e| TransportError::new(&url, e))?;
            let response = reqwest::get(absolute)
                .await
                .map_err(|e| TransportError::new(&url, e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::new(&url, format!("HTTP {status}")));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::new(&url, e.to_string()))?;
            Ok(bytes.to_vec())
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn absolute_url(url: &str) -> Result<reqwest::Url, String> {
    if let Ok(url) = reqwest::Url::parse(url) {
        return Ok(url);
    }
    let origin = web_sys::window()
        .ok_or("no window")?
        .location()
        .origin()
        .map_err(|_| "no origin")?;
    let base = reqwest::Url::parse(&format!("{origin}/")).map_err(|e| e.to_string())?;
    base.join(url).map_err(|e| e.to_string())
}
