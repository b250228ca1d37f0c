//! Video processing graph
//!
//! Owns the off-screen render surface and the display-refresh-driven
//! frame-copy loop feeding the derived output track.

use crate::config::VideoEffectsConfig;
use crate::error::{Error, Result};
use crate::media::{MediaKind, MediaStream, MediaTrack, StreamId, VideoFrame};
use crate::video::state::{LoopState, SharedLoopState};
use crate::video::surface::RenderSurface;
use log::{debug, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Requested-but-uncomposited effect state, recorded for observers such as
/// a future compositor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoEffectState {
    pub background_blur: Option<f32>,
    pub virtual_background: Option<String>,
}

/// Holds the newest decoded frame from the source. The copy loop takes
/// whatever is ready at each tick and skips the tick otherwise.
struct DecodeTarget {
    latest: Arc<Mutex<Option<Arc<VideoFrame>>>>,
}

impl DecodeTarget {
    fn seed(first: Arc<VideoFrame>) -> Self {
        Self {
            latest: Arc::new(Mutex::new(Some(first))),
        }
    }

    fn release(&self) {
        self.latest.lock().unwrap().take();
    }
}

struct VideoPipeline {
    source_id: StreamId,
    output: MediaStream,
    output_track: MediaTrack,
    decode: DecodeTarget,
    loop_state: Arc<SharedLoopState>,
    cancel: CancellationToken,
}

/// Builds and maintains the render surface and frame-copy loop for one
/// captured stream.
pub struct VideoGraph {
    config: VideoEffectsConfig,
    surface: Option<Arc<Mutex<RenderSurface>>>,
    pipeline: Option<VideoPipeline>,
    effect_state: VideoEffectState,
}

impl VideoGraph {
    /// Lightweight: no render resources are allocated here. The surface is
    /// deferred to `process` because the source resolution is unknown until
    /// capture begins.
    pub async fn initialize(config: VideoEffectsConfig) -> Result<Self> {
        if config.refresh_rate == 0 {
            return Err(Error::Initialization(
                "video refresh rate must be positive".into(),
            ));
        }
        Ok(Self {
            config,
            surface: None,
            pipeline: None,
            effect_state: VideoEffectState::default(),
        })
    }

    /// Process a captured stream, returning a stream whose video track is
    /// derived from the render surface.
    ///
    /// If a processed output already exists for the current session it is
    /// returned unchanged. Otherwise this suspends until the first frame's
    /// metadata arrives, sizes the surface to the native resolution, starts
    /// the frame-copy loop, and registers a one-shot listener on the source
    /// track's end signal that stops both the loop and the output track.
    pub async fn process(&mut self, stream: &MediaStream) -> Result<MediaStream> {
        if let Some(pipeline) = &self.pipeline {
            return Ok(pipeline.output.clone());
        }

        let source = stream
            .video_track()
            .ok_or(Error::MissingTrack(MediaKind::Video))?
            .clone();
        let mut rx = source.subscribe_video().expect("source is a video track");

        // Suspend until the first frame's metadata arrives; only then is
        // the surface resolution known. A source that ends first can never
        // deliver metadata, so that session's video path fails cleanly.
        let first = tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(_)) => rx
                    .recv()
                    .await
                    .map_err(|_| Error::RenderSurface("video source closed before first frame".into()))?,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::RenderSurface("video source closed before first frame".into()));
                }
            },
            _ = source.ended() => {
                return Err(Error::RenderSurface("video source ended before first frame".into()));
            }
        };

        let surface = Arc::new(Mutex::new(RenderSurface::new(first.width, first.height)?));
        self.surface = Some(surface.clone());
        info!(
            "render surface sized to {}x{} for {}",
            first.width,
            first.height,
            stream.id()
        );

        let output_track = MediaTrack::video(format!("processed:{}", source.label()));
        let output = MediaStream::new(vec![output_track.clone()]);

        let decode = DecodeTarget::seed(first);
        let cancel = CancellationToken::new();
        let loop_state = Arc::new(SharedLoopState::new());

        // Decode pump: keeps the newest source frame ready for the copy
        // loop.
        let pump_latest = decode.latest.clone();
        let pump_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = pump_cancel.cancelled() => break,
                    frame = rx.recv() => match frame {
                        Ok(frame) => {
                            *pump_latest.lock().unwrap() = Some(frame);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("decode pump lagged, skipped {skipped} frames");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        // Frame-copy loop, aligned to the display refresh rate. Ticks with
        // no decoded frame ready are skipped, never errors.
        loop_state.transition(LoopState::Running);
        let tick = Duration::from_secs_f64(1.0 / self.config.refresh_rate as f64);
        let copy_cancel = cancel.clone();
        let copy_state = loop_state.clone();
        let copy_surface = surface;
        let copy_latest = decode.latest.clone();
        let copy_out = output_track.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = copy_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if !copy_state.is_running() {
                            break;
                        }
                        let ready = copy_latest.lock().unwrap().clone();
                        let Some(frame) = ready else { continue };
                        let snapshot = {
                            let mut surface = copy_surface.lock().unwrap();
                            surface.copy_frame(&frame);
                            surface.snapshot(frame.pts)
                        };
                        copy_out.push_video(snapshot);
                    }
                }
            }
            debug!("frame-copy loop exited");
        });

        // One-shot teardown on the source's end signal. This is the normal
        // lifecycle, not a failure. The listener itself unsubscribes when
        // the pipeline is cancelled first.
        let ended_cancel = cancel.clone();
        let ended_state = loop_state.clone();
        let ended_track = output_track.clone();
        let ended_wait = source.ended();
        tokio::spawn(async move {
            tokio::select! {
                _ = ended_wait => {
                    ended_state.transition(LoopState::Stopped);
                    ended_cancel.cancel();
                    ended_track.stop();
                    debug!("video source ended, frame loop stopped");
                }
                _ = ended_cancel.cancelled() => {}
            }
        });

        self.pipeline = Some(VideoPipeline {
            source_id: stream.id(),
            output: output.clone(),
            output_track,
            decode,
            loop_state,
            cancel,
        });
        Ok(output)
    }

    /// Explicit opt-in post-processing pass: rewrite the current surface
    /// contents through the tint matrix. Never invoked by the frame loop.
    pub fn apply_effects(&self) -> Result<()> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| Error::RenderSurface("no render surface allocated".into()))?;
        surface.lock().unwrap().apply_color_matrix();
        Ok(())
    }

    /// Record a background-blur request for observers. No compositing is
    /// performed.
    pub fn apply_background_blur(&mut self, amount: f32) {
        let amount = amount.max(0.0);
        info!("background blur recorded: {amount}");
        self.effect_state.background_blur = Some(amount);
    }

    /// Record a virtual-background request for observers. No compositing is
    /// performed.
    pub fn apply_virtual_background(&mut self, source: impl Into<String>) {
        let source = source.into();
        info!("virtual background recorded: {source}");
        self.effect_state.virtual_background = Some(source);
    }

    pub fn effect_state(&self) -> &VideoEffectState {
        &self.effect_state
    }

    /// Current frame-loop state
    pub fn loop_state(&self) -> LoopState {
        self.pipeline
            .as_ref()
            .map(|p| p.loop_state.get())
            .unwrap_or(LoopState::Idle)
    }

    /// Cancel the frame-copy loop, release the decode target, and clear the
    /// cached output. Idempotent: calling when already stopped is a no-op.
    pub fn stop_processing(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.loop_state.transition(LoopState::Stopped);
            pipeline.cancel.cancel();
            pipeline.decode.release();
            pipeline.output_track.stop();
            debug!("video processing stopped for {}", pipeline.source_id);
        }
    }

    /// Stop processing, then release the render surface itself
    pub fn cleanup(&mut self) {
        self.stop_processing();
        self.surface = None;
    }
}

impl std::fmt::Debug for VideoGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoGraph")
            .field("has_surface", &self.surface.is_some())
            .field("has_pipeline", &self.pipeline.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Timestamp;
    use bytes::Bytes;

    fn frame(width: u32, height: u32, micros: i64) -> VideoFrame {
        VideoFrame {
            data: Bytes::from(vec![128u8; (width * height * 4) as usize]),
            width,
            height,
            pts: Timestamp::from_micros(micros),
        }
    }

    #[tokio::test]
    async fn initialize_rejects_zero_refresh_rate() {
        let err = VideoGraph::initialize(VideoEffectsConfig { refresh_rate: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[tokio::test]
    async fn process_without_video_track_fails() {
        let mut graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        let stream = MediaStream::new(vec![MediaTrack::audio("mic")]);
        let err = graph.process(&stream).await.unwrap_err();
        assert!(matches!(err, Error::MissingTrack(MediaKind::Video)));
    }

    #[tokio::test]
    async fn process_ended_source_fails_video_path_only() {
        let mut graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        let track = MediaTrack::video("camera");
        track.stop();
        let stream = MediaStream::new(vec![track]);
        let err = graph.process(&stream).await.unwrap_err();
        assert!(matches!(err, Error::RenderSurface(_)));
    }

    #[tokio::test]
    async fn surface_matches_first_frame_metadata() {
        let mut graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        let track = MediaTrack::video("camera");
        let stream = MediaStream::new(vec![track.clone()]);

        let feeder = track.clone();
        let feed = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(5));
            for i in 0..50 {
                ticker.tick().await;
                if !feeder.push_video(frame(64, 48, i)) {
                    break;
                }
            }
        });

        let output = graph.process(&stream).await.unwrap();
        assert!(output.video_track().is_some());
        {
            let surface = graph.surface.as_ref().unwrap().lock().unwrap();
            assert_eq!((surface.width(), surface.height()), (64, 48));
        }
        assert_eq!(graph.loop_state(), LoopState::Running);

        track.stop();
        feed.await.unwrap();
        graph.cleanup();
    }

    #[tokio::test]
    async fn stop_processing_is_idempotent() {
        let mut graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        graph.stop_processing();
        graph.stop_processing();
        assert_eq!(graph.loop_state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn effect_stubs_record_state() {
        let mut graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        graph.apply_background_blur(12.0);
        graph.apply_virtual_background("backgrounds/office.png");

        assert_eq!(
            graph.effect_state(),
            &VideoEffectState {
                background_blur: Some(12.0),
                virtual_background: Some("backgrounds/office.png".into()),
            }
        );
    }

    #[tokio::test]
    async fn apply_effects_without_surface_fails() {
        let graph = VideoGraph::initialize(VideoEffectsConfig::default()).await.unwrap();
        assert!(matches!(graph.apply_effects(), Err(Error::RenderSurface(_))));
    }
}
