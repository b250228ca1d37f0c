//! Capture acquisition
//!
//! The acquisition seam (`StreamAcquirer`), the interception decorator and
//! its process-wide install-once hook, plus the shipped backends: the cpal
//! microphone and a deterministic synthetic source.

pub mod acquire;
pub mod device;
pub mod synthetic;

pub use acquire::{InterceptedAcquirer, StreamAcquirer, acquire, install};
pub use device::MicrophoneAcquirer;
pub use synthetic::SyntheticAcquirer;
