//! Capture acquisition and interception
//!
//! [`StreamAcquirer`] is the platform's capture-acquisition entry point.
//! Interception is an explicit decorator composed around it, never a
//! runtime mutation of a shared global function: the original acquisition
//! always runs first with its arguments untouched, and the result is piped
//! through the effects manager only when effects are active.

use crate::effects::EffectsContext;
use crate::error::{Error, Result};
use crate::media::{MediaStream, StreamConstraints};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Asynchronous capture-acquisition entry point
#[async_trait]
pub trait StreamAcquirer: Send + Sync {
    /// Acquire a raw capture stream satisfying `constraints`
    async fn acquire(&self, constraints: StreamConstraints) -> Result<MediaStream>;
}

/// Decorator that routes acquired streams through the effects pipeline.
///
/// Transparent to the caller: with no active effects the originally
/// acquired stream is returned with the same identity, and acquisition
/// failures propagate unchanged.
pub struct InterceptedAcquirer {
    inner: Arc<dyn StreamAcquirer>,
    context: Arc<EffectsContext>,
}

impl InterceptedAcquirer {
    pub fn wrap(inner: Arc<dyn StreamAcquirer>, context: Arc<EffectsContext>) -> Self {
        Self { inner, context }
    }
}

#[async_trait]
impl StreamAcquirer for InterceptedAcquirer {
    async fn acquire(&self, constraints: StreamConstraints) -> Result<MediaStream> {
        // The original acquisition always runs first.
        let stream = self.inner.acquire(constraints).await?;

        if let Ok(manager) = self.context.manager() {
            if manager.has_active_effects() {
                debug!("routing {} through the effects pipeline", stream.id());
                return manager.process_stream(&stream, &constraints).await;
            }
        }
        Ok(stream)
    }
}

static INSTALLED: OnceCell<Arc<dyn StreamAcquirer>> = OnceCell::new();

/// Install the process-wide capture entry point.
///
/// At most one install takes effect per process lifetime: the first wins
/// and later calls return `false` without replacing anything.
pub fn install(acquirer: Arc<dyn StreamAcquirer>) -> bool {
    INSTALLED.set(acquirer).is_ok()
}

/// Acquire through the installed entry point
pub async fn acquire(constraints: StreamConstraints) -> Result<MediaStream> {
    let acquirer = INSTALLED.get().ok_or(Error::UninitializedAccess)?;
    acquirer.acquire(constraints).await
}
