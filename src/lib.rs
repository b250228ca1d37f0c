//! streamfx — real-time media effects pipeline
//!
//! Intercepts raw capture streams (microphone/camera) and transparently
//! routes them through pluggable audio/video transforms before delivery to
//! the consuming code. Effect parameters are adjustable while the pipeline
//! is live, without interrupting the stream.
//!
//! # Architecture
//!
//! - [`media`]: tracks, streams, and the raw block/frame types
//! - [`audio`]: the DSP execution context, processing graph, worklet
//!   modules, and live-parameter channels
//! - [`video`]: the render surface and the display-refresh frame-copy loop
//! - [`effects`]: the process-level context and the per-stream session
//!   manager
//! - [`capture`]: the acquisition seam, the interception decorator, and the
//!   shipped capture backends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamfx::capture::{self, InterceptedAcquirer, SyntheticAcquirer};
//! use streamfx::{EffectsConfig, EffectsContext, StreamConstraints};
//!
//! #[tokio::main]
//! async fn main() -> streamfx::Result<()> {
//!     let context = Arc::new(EffectsContext::new(EffectsConfig::default()));
//!     let manager = context.initialize().await?;
//!
//!     capture::install(Arc::new(InterceptedAcquirer::wrap(
//!         Arc::new(SyntheticAcquirer::default()),
//!         context.clone(),
//!     )));
//!
//!     manager.set_noise_suppression(0.7).await;
//!     let processed = capture::acquire(StreamConstraints::both()).await?;
//!     println!("processed stream: {:?}", processed.id());
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod capture;
pub mod config;
pub mod effects;
pub mod error;
pub mod media;
pub mod video;

pub use config::{AudioEffectsConfig, EffectsConfig, VideoEffectsConfig};
pub use effects::{ActiveEffect, EffectSession, EffectsContext, EffectsManager};
pub use error::{Error, Result};
pub use media::{
    AudioBlock, MediaKind, MediaStream, MediaTrack, StreamConstraints, StreamId, Timestamp,
    TrackId, VideoFrame,
};
