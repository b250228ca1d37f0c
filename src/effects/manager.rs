//! Effects manager
//!
//! Coordinates the audio and video graphs into one logical session per
//! captured stream, tracks which effects are active, and exposes the
//! control API.

use crate::audio::AudioGraph;
use crate::effects::registry::{ActiveEffect, ActiveEffectsRegistry};
use crate::error::Result;
use crate::media::{MediaKind, MediaStream, MediaTrack, StreamConstraints, StreamId};
use crate::video::{VideoEffectState, VideoGraph};
use futures_util::future::join_all;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The per-stream unit of work: at most one audio and one video pipeline
/// bound to a single captured stream.
#[derive(Debug, Clone)]
pub struct EffectSession {
    pub source_id: StreamId,
    pub output: MediaStream,
    pub audio_processed: bool,
    pub video_processed: bool,
}

/// Coordinates audio and video processing per captured stream.
///
/// Obtained from [`crate::effects::EffectsContext::initialize`]; the same
/// shared instance is handed to every caller.
pub struct EffectsManager {
    audio: Mutex<AudioGraph>,
    video: Mutex<VideoGraph>,
    sessions: Arc<Mutex<HashMap<StreamId, EffectSession>>>,
    registry: ActiveEffectsRegistry,
}

impl EffectsManager {
    pub(crate) fn new(audio: AudioGraph, video: VideoGraph) -> Self {
        Self {
            audio: Mutex::new(audio),
            video: Mutex::new(video),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            registry: ActiveEffectsRegistry::new(),
        }
    }

    /// Route a captured stream through the graphs selected by
    /// `constraints`.
    ///
    /// Kinds that are not requested, or not present in the source, pass
    /// through with their original track handles. Calling again with the
    /// same source stream returns the same output stream rather than a
    /// rebuilt pipeline; the session is dropped once every source track has
    /// ended.
    pub async fn process_stream(
        &self,
        stream: &MediaStream,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream> {
        if let Some(session) = self.sessions.lock().await.get(&stream.id()) {
            return Ok(session.output.clone());
        }

        let mut tracks: Vec<MediaTrack> = Vec::new();
        let mut audio_processed = false;
        let mut video_processed = false;

        for track in stream.tracks() {
            match track.kind() {
                MediaKind::Audio if constraints.audio && !audio_processed => {
                    let processed = self.audio.lock().await.process(stream).await?;
                    if let Some(sink) = processed.audio_track() {
                        tracks.push(sink.clone());
                    }
                    audio_processed = true;
                }
                MediaKind::Video if constraints.video && !video_processed => {
                    let processed = self.video.lock().await.process(stream).await?;
                    if let Some(out) = processed.video_track() {
                        tracks.push(out.clone());
                    }
                    video_processed = true;
                }
                // Pass-through keeps the original track, same identity.
                _ => tracks.push(track.clone()),
            }
        }

        let output = MediaStream::new(tracks);
        let session = EffectSession {
            source_id: stream.id(),
            output: output.clone(),
            audio_processed,
            video_processed,
        };
        self.sessions.lock().await.insert(stream.id(), session);
        info!(
            "effect session created for {} (audio: {audio_processed}, video: {video_processed})",
            stream.id()
        );

        // The session lives until every source track has ended. That is the
        // normal teardown path, not a failure.
        let sessions = self.sessions.clone();
        let source_id = stream.id();
        let ended: Vec<_> = stream.tracks().iter().map(|t| t.ended()).collect();
        tokio::spawn(async move {
            join_all(ended).await;
            sessions.lock().await.remove(&source_id);
            debug!("effect session for {source_id} torn down");
        });

        Ok(output)
    }

    /// Set the live noise-suppression level.
    ///
    /// The value is clamped to [0, 1]; out-of-range input is not an error
    /// and this call never raises. The update reaches the running transform
    /// without interrupting audio flow.
    pub async fn set_noise_suppression(&self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.audio.lock().await.set_level(level);
        self.registry.record(ActiveEffect::NoiseSuppression { level });
    }

    /// Currently stored suppression level
    pub async fn noise_suppression_level(&self) -> f32 {
        self.audio.lock().await.level()
    }

    /// Record a background-blur request (extension hook; no compositing)
    pub async fn set_background_blur(&self, amount: f32) {
        self.video.lock().await.apply_background_blur(amount);
        self.registry.record(ActiveEffect::BackgroundBlur {
            amount: amount.max(0.0),
        });
    }

    /// Record a virtual-background request (extension hook; no compositing)
    pub async fn set_virtual_background(&self, source: impl Into<String>) {
        let source = source.into();
        self.video.lock().await.apply_virtual_background(source.clone());
        self.registry.record(ActiveEffect::VirtualBackground { source });
    }

    /// Opt-in color-matrix pass over the current video surface
    pub async fn apply_video_effects(&self) -> Result<()> {
        self.video.lock().await.apply_effects()
    }

    /// Requested-but-uncomposited video effect state, for observers
    pub async fn video_effect_state(&self) -> VideoEffectState {
        self.video.lock().await.effect_state().clone()
    }

    /// True iff any effect has been activated
    pub fn has_active_effects(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Snapshot of the active effects and their parameters
    pub fn active_effects(&self) -> Vec<(&'static str, ActiveEffect)> {
        self.registry.snapshot()
    }

    /// Look up the session for a source stream, if one is live
    pub async fn session(&self, id: StreamId) -> Option<EffectSession> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Sever per-stream wiring in both graphs; execution contexts stay up
    pub async fn cleanup(&self) {
        self.audio.lock().await.cleanup();
        self.video.lock().await.stop_processing();
    }

    /// Full teardown of both graphs and all sessions
    pub async fn close(&self) {
        self.audio.lock().await.close();
        self.video.lock().await.cleanup();
        self.sessions.lock().await.clear();
    }
}
