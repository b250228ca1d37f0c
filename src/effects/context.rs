//! Process-level effects context
//!
//! Constructed once at process start and passed by reference to the
//! interceptor and any control surface; there is no implicit global
//! manager. Lifecycle is explicit: `initialize` brings both graphs up,
//! `manager` hands out the shared instance afterwards.

use crate::audio::AudioGraph;
use crate::config::EffectsConfig;
use crate::effects::manager::EffectsManager;
use crate::error::{Error, Result};
use crate::video::VideoGraph;
use log::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct EffectsContext {
    config: EffectsConfig,
    manager: OnceCell<Arc<EffectsManager>>,
}

impl EffectsContext {
    pub fn new(config: EffectsConfig) -> Self {
        Self {
            config: config.validated(),
            manager: OnceCell::new(),
        }
    }

    /// Initialize the audio and video graphs concurrently and publish the
    /// shared manager.
    ///
    /// Idempotent: once initialized, later calls return the existing
    /// instance. A failed attempt commits nothing — the context stays
    /// uninitialized for both graphs and the call may be retried.
    pub async fn initialize(&self) -> Result<Arc<EffectsManager>> {
        self.manager
            .get_or_try_init(|| async {
                let (audio, video) = tokio::try_join!(
                    AudioGraph::initialize(self.config.audio.clone()),
                    VideoGraph::initialize(self.config.video.clone()),
                )?;
                info!("effects pipeline initialized");
                Ok(Arc::new(EffectsManager::new(audio, video)))
            })
            .await
            .cloned()
    }

    /// Shared manager accessor; fails until `initialize` has completed
    pub fn manager(&self) -> Result<Arc<EffectsManager>> {
        self.manager.get().cloned().ok_or(Error::UninitializedAccess)
    }

    /// Flag read by external control surfaces
    pub fn is_initialized(&self) -> bool {
        self.manager.initialized()
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioEffectsConfig;

    #[tokio::test]
    async fn manager_before_initialize_fails() {
        let context = EffectsContext::new(EffectsConfig::default());
        assert!(!context.is_initialized());
        assert!(matches!(context.manager(), Err(Error::UninitializedAccess)));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let context = EffectsContext::new(EffectsConfig::default());
        let first = context.initialize().await.unwrap();
        let second = context.initialize().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(context.is_initialized());
    }

    #[tokio::test]
    async fn failed_initialize_commits_nothing_and_can_retry() {
        let context = EffectsContext::new(EffectsConfig {
            audio: AudioEffectsConfig {
                worklet_module: "worklets/missing".into(),
                ..AudioEffectsConfig::default()
            },
            ..EffectsConfig::default()
        });

        assert!(context.initialize().await.is_err());
        assert!(!context.is_initialized());
        assert!(matches!(context.manager(), Err(Error::UninitializedAccess)));

        // Still failing; the context never half-commits.
        assert!(context.initialize().await.is_err());
        assert!(!context.is_initialized());
    }

    #[tokio::test]
    async fn construction_validates_config() {
        let context = EffectsContext::new(EffectsConfig {
            audio: AudioEffectsConfig {
                default_suppression_level: 9.0,
                ..AudioEffectsConfig::default()
            },
            ..EffectsConfig::default()
        });
        assert_eq!(context.config().audio.default_suppression_level, 1.0);
    }
}
