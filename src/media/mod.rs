//! Media primitives
//!
//! The shared vocabulary between capture backends and the processing
//! graphs: raw block/frame types, identity-bearing tracks with an explicit
//! end signal, and streams bundling tracks per capture.

pub mod stream;
pub mod track;
pub mod types;

pub use stream::{MediaStream, StreamConstraints, StreamId};
pub use track::{MediaTrack, TrackId};
pub use types::{AudioBlock, MediaKind, Timestamp, VideoFrame};
