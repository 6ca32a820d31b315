//! Error taxonomy of the viewer.
//!
//! Only [`TransportError`] and [`DecodeError`] ever reach the caller as a failed
//! load. Per-mesh skips and image decode failures are absorbed where they are
//! detected (logged and replaced), and [`ViewerError::Aborted`] marks a load that
//! was superseded and must stay silent.

use thiserror::Error;

/// Fetching scene or sprite-sheet bytes did not succeed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to fetch {url}: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

impl TransportError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// The scene container could not be turned into a document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("scene stream is not valid gzip: {0}")]
    Decompress(String),
    #[error("scene is not a valid flatbuffer: {0}")]
    InvalidFlatbuffer(String),
    #[error("scene has no camera settings")]
    MissingCamera,
}

impl From<flatbuffers::InvalidFlatbuffer> for DecodeError {
    fn from(err: flatbuffers::InvalidFlatbuffer) -> Self {
        DecodeError::InvalidFlatbuffer(err.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("load aborted")]
    Aborted,
    #[error("renderer failure: {0}")]
    Renderer(String),
}

impl ViewerError {
    /// Whether this error only reports that the work was superseded.
    pub fn is_abort(&self) -> bool {
        matches!(self, ViewerError::Aborted)
    }

    pub fn renderer(err: impl std::fmt::Display) -> Self {
        ViewerError::Renderer(err.to_string())
    }
}

impl From<futures::future::Aborted> for ViewerError {
    fn from(_: futures::future::Aborted) -> Self {
        ViewerError::Aborted
    }
}
