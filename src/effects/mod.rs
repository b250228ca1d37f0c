//! Effect coordination
//!
//! The process-level context, the per-stream session manager, and the
//! registry answering which effects are currently active.

pub mod context;
pub mod manager;
pub mod registry;

pub use context::EffectsContext;
pub use manager::{EffectSession, EffectsManager};
pub use registry::{ActiveEffect, ActiveEffectsRegistry};
