//! Audio processing
//!
//! The execution context (a dedicated real-time worker thread), the
//! processing graph wiring source → transform → sink per captured stream,
//! the DSP worklet modules themselves, and the live-parameter channels that
//! reach into a running transform.

pub mod graph;
pub mod params;
pub mod runtime;
pub mod worklet;

pub use graph::AudioGraph;
pub use params::{EffectParameter, LiveParam, ParamMessage, ParameterReceiver, ParameterSender, parameter_channel};
pub use runtime::AudioRuntime;
pub use worklet::{AudioTransform, NoiseSuppressor, NOISE_SUPPRESSOR_MODULE};
