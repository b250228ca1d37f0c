//! Error types for the effects pipeline

use crate::media::MediaKind;
use thiserror::Error;

/// Errors surfaced by the effects pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// DSP-module or render-context setup failed. Fatal to that
    /// `initialize` call; never retried automatically, the caller may retry
    /// manually.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Control API used before `initialize` completed.
    #[error("effects manager accessed before initialization")]
    UninitializedAccess,

    /// Render surface or context unavailable. Fatal to that session's video
    /// path only; the audio path is unaffected.
    #[error("render surface unavailable: {0}")]
    RenderSurface(String),

    /// The stream carries no track of the required kind.
    #[error("stream has no {0} track")]
    MissingTrack(MediaKind),
}

/// Result type for effects pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
