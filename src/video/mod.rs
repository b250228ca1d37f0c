//! Video processing
//!
//! The render surface, the frame-copy loop and its state machine, and the
//! graph tying them to a captured stream.

pub mod graph;
pub mod state;
pub mod surface;

pub use graph::{VideoEffectState, VideoGraph};
pub use state::{LoopState, SharedLoopState};
pub use surface::RenderSurface;
