//! Integration tests for the effects pipeline
//!
//! Exercises real end-to-end scenarios: session reuse, interception
//! transparency, live parameter updates, and track-end teardown. End of
//! stream is driven deterministically through the tracks' explicit end
//! signal.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use streamfx::audio::AudioGraph;
use streamfx::capture::{InterceptedAcquirer, StreamAcquirer, SyntheticAcquirer};
use streamfx::media::{AudioBlock, MediaStream, MediaTrack, Timestamp, VideoFrame};
use streamfx::video::{LoopState, VideoGraph};
use streamfx::{
    ActiveEffect, AudioEffectsConfig, EffectsConfig, EffectsContext, Error, StreamConstraints,
    VideoEffectsConfig,
};

// ===== Test Helpers =====

async fn initialized_context() -> (Arc<EffectsContext>, Arc<streamfx::EffectsManager>) {
    let context = Arc::new(EffectsContext::new(EffectsConfig::default()));
    let manager = context.initialize().await.expect("initialize");
    (context, manager)
}

fn audio_video_stream() -> MediaStream {
    MediaStream::new(vec![MediaTrack::audio("mic"), MediaTrack::video("camera")])
}

fn test_frame(width: u32, height: u32, micros: i64) -> VideoFrame {
    VideoFrame {
        data: Bytes::from(vec![100u8; (width * height * 4) as usize]),
        width,
        height,
        pts: Timestamp::from_micros(micros),
    }
}

/// Keeps a video track fed so `process` can observe first-frame metadata.
fn feed_video(track: &MediaTrack, width: u32, height: u32) -> tokio::task::JoinHandle<()> {
    let feeder = track.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(5));
        let mut micros = 0;
        loop {
            ticker.tick().await;
            if !feeder.push_video(test_frame(width, height, micros)) {
                break;
            }
            micros += 5_000;
        }
    })
}

/// Acquirer that records the constraints it was called with and serves
/// premade streams.
struct RecordingAcquirer {
    stream: MediaStream,
    seen: Mutex<Vec<StreamConstraints>>,
}

impl RecordingAcquirer {
    fn new(stream: MediaStream) -> Self {
        Self {
            stream,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StreamAcquirer for RecordingAcquirer {
    async fn acquire(&self, constraints: StreamConstraints) -> streamfx::Result<MediaStream> {
        self.seen.lock().unwrap().push(constraints);
        Ok(self.stream.clone())
    }
}

// ===== Parameter clamping =====

#[tokio::test]
async fn suppression_level_clamps_above() {
    let (_context, manager) = initialized_context().await;
    manager.set_noise_suppression(1.5).await;
    assert_eq!(manager.noise_suppression_level().await, 1.0);
}

#[tokio::test]
async fn suppression_level_clamps_below() {
    let (_context, manager) = initialized_context().await;
    manager.set_noise_suppression(-0.3).await;
    assert_eq!(manager.noise_suppression_level().await, 0.0);
}

#[tokio::test]
async fn suppression_level_stores_in_range_values() {
    let (_context, manager) = initialized_context().await;
    manager.set_noise_suppression(0.42).await;
    assert_eq!(manager.noise_suppression_level().await, 0.42);
}

// ===== Active-effects registry =====

#[tokio::test]
async fn registry_reports_active_effects() {
    let (_context, manager) = initialized_context().await;
    assert!(!manager.has_active_effects());
    assert!(manager.active_effects().is_empty());

    manager.set_noise_suppression(0.8).await;
    assert!(manager.has_active_effects());

    let effects = manager.active_effects();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].0, "noiseSuppression");
    assert_eq!(effects[0].1, ActiveEffect::NoiseSuppression { level: 0.8 });
}

#[tokio::test]
async fn registry_overwrites_repeated_activations() {
    let (_context, manager) = initialized_context().await;
    manager.set_noise_suppression(0.2).await;
    manager.set_noise_suppression(0.9).await;

    let effects = manager.active_effects();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].1, ActiveEffect::NoiseSuppression { level: 0.9 });
}

#[tokio::test]
async fn video_effect_stubs_are_recorded() {
    let (_context, manager) = initialized_context().await;
    manager.set_background_blur(10.0).await;
    manager.set_virtual_background("backgrounds/beach.png").await;

    let state = manager.video_effect_state().await;
    assert_eq!(state.background_blur, Some(10.0));
    assert_eq!(state.virtual_background, Some("backgrounds/beach.png".into()));
    assert_eq!(manager.active_effects().len(), 2);
}

// ===== Initialization lifecycle =====

#[tokio::test]
async fn manager_accessor_before_initialize_fails() {
    let context = EffectsContext::new(EffectsConfig::default());
    assert!(matches!(context.manager(), Err(Error::UninitializedAccess)));
}

#[tokio::test]
async fn initialize_twice_shares_one_manager() {
    let context = EffectsContext::new(EffectsConfig::default());
    let first = context.initialize().await.unwrap();
    let second = context.initialize().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn bad_module_path_fails_initialize_without_commit() {
    let context = EffectsContext::new(EffectsConfig {
        audio: AudioEffectsConfig {
            worklet_module: "worklets/nope".into(),
            ..AudioEffectsConfig::default()
        },
        ..EffectsConfig::default()
    });

    assert!(matches!(
        context.initialize().await,
        Err(Error::Initialization(_))
    ));
    assert!(!context.is_initialized());
}

// ===== Session reuse =====

#[tokio::test(flavor = "multi_thread")]
async fn process_stream_is_idempotent_per_source() {
    let (_context, manager) = initialized_context().await;
    let source = audio_video_stream();
    let feed = feed_video(source.video_track().unwrap(), 32, 32);

    let constraints = StreamConstraints::both();
    let first = manager.process_stream(&source, &constraints).await.unwrap();
    let second = manager.process_stream(&source, &constraints).await.unwrap();
    assert_eq!(first, second);

    source.stop();
    feed.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn audio_graph_process_is_idempotent() {
    let mut graph = AudioGraph::initialize(AudioEffectsConfig::default())
        .await
        .unwrap();
    let stream = MediaStream::new(vec![MediaTrack::audio("mic")]);

    let first = graph.process(&stream).await.unwrap();
    let second = graph.process(&stream).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn session_is_removed_when_all_source_tracks_end() {
    let (_context, manager) = initialized_context().await;
    let source = audio_video_stream();
    let feed = feed_video(source.video_track().unwrap(), 32, 32);

    manager
        .process_stream(&source, &StreamConstraints::both())
        .await
        .unwrap();
    assert!(manager.session(source.id()).await.is_some());

    source.stop();
    feed.await.unwrap();

    // Teardown runs off the end signal; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.session(source.id()).await.is_none());
}

// ===== Kind selection and pass-through =====

#[tokio::test(flavor = "multi_thread")]
async fn audio_only_constraints_leave_video_untouched() {
    let (_context, manager) = initialized_context().await;
    let source = audio_video_stream();
    let original_video_id = source.video_track().unwrap().id();
    let original_audio_id = source.audio_track().unwrap().id();

    let processed = manager
        .process_stream(&source, &StreamConstraints::audio_only())
        .await
        .unwrap();

    // Video passes through with the original track handle; audio is the
    // transform sink.
    assert_eq!(processed.video_track().unwrap().id(), original_video_id);
    assert_ne!(processed.audio_track().unwrap().id(), original_audio_id);
}

#[tokio::test]
async fn empty_constraints_pass_everything_through() {
    let (_context, manager) = initialized_context().await;
    let source = audio_video_stream();

    let processed = manager
        .process_stream(&source, &StreamConstraints::default())
        .await
        .unwrap();

    assert_eq!(
        processed.audio_track().unwrap().id(),
        source.audio_track().unwrap().id()
    );
    assert_eq!(
        processed.video_track().unwrap().id(),
        source.video_track().unwrap().id()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn requested_kind_absent_passes_through() {
    let (_context, manager) = initialized_context().await;
    let source = MediaStream::new(vec![MediaTrack::audio("mic")]);

    // Video is requested but the source has none; nothing to process.
    let processed = manager
        .process_stream(&source, &StreamConstraints::both())
        .await
        .unwrap();
    assert!(processed.video_track().is_none());
    assert!(processed.audio_track().is_some());
}

// ===== Interception =====

#[tokio::test]
async fn interceptor_is_transparent_without_effects() {
    let (context, _manager) = initialized_context().await;
    let original = audio_video_stream();
    let inner = Arc::new(RecordingAcquirer::new(original.clone()));
    let intercepted = InterceptedAcquirer::wrap(inner.clone(), context);

    let constraints = StreamConstraints::both();
    let acquired = intercepted.acquire(constraints).await.unwrap();

    // Same stream identity, constraints passed through unchanged.
    assert_eq!(acquired, original);
    assert_eq!(inner.seen.lock().unwrap().as_slice(), &[constraints]);
}

#[tokio::test]
async fn interceptor_is_transparent_before_initialization() {
    let context = Arc::new(EffectsContext::new(EffectsConfig::default()));
    let original = MediaStream::new(vec![MediaTrack::audio("mic")]);
    let inner = Arc::new(RecordingAcquirer::new(original.clone()));
    let intercepted = InterceptedAcquirer::wrap(inner, context);

    let acquired = intercepted
        .acquire(StreamConstraints::audio_only())
        .await
        .unwrap();
    assert_eq!(acquired, original);
}

#[tokio::test]
async fn interceptor_install_is_first_wins() {
    let (context, _manager) = initialized_context().await;
    let original = MediaStream::new(vec![MediaTrack::audio("mic")]);
    let inner = Arc::new(RecordingAcquirer::new(original.clone()));

    assert!(streamfx::capture::install(Arc::new(InterceptedAcquirer::wrap(
        inner,
        context.clone(),
    ))));
    // The second install does not replace the first.
    assert!(!streamfx::capture::install(Arc::new(SyntheticAcquirer::default())));

    let acquired = streamfx::capture::acquire(StreamConstraints::default())
        .await
        .unwrap();
    assert_eq!(acquired, original);
}

#[tokio::test(flavor = "multi_thread")]
async fn interceptor_processes_when_effects_active() {
    let (context, manager) = initialized_context().await;
    let original = MediaStream::new(vec![MediaTrack::audio("mic")]);
    let inner = Arc::new(RecordingAcquirer::new(original.clone()));
    let intercepted = InterceptedAcquirer::wrap(inner, context);

    manager.set_noise_suppression(0.9).await;

    let acquired = intercepted
        .acquire(StreamConstraints::audio_only())
        .await
        .unwrap();
    assert_ne!(acquired, original);
    assert_ne!(
        acquired.audio_track().unwrap().id(),
        original.audio_track().unwrap().id()
    );
}

// ===== Audio processing behavior =====

#[tokio::test(flavor = "multi_thread")]
async fn level_zero_chain_is_bit_exact_passthrough() {
    let mut graph = AudioGraph::initialize(AudioEffectsConfig::default())
        .await
        .unwrap();
    graph.set_level(0.0);

    let source_track = MediaTrack::audio("mic");
    let stream = MediaStream::new(vec![source_track.clone()]);
    let output = graph.process(&stream).await.unwrap();
    let mut rx = output.audio_track().unwrap().subscribe_audio().unwrap();

    let samples: Vec<f32> = (0..480).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
    // Give the bridge a beat to subscribe before publishing.
    tokio::time::sleep(Duration::from_millis(20)).await;
    source_track.push_audio(AudioBlock::new(samples.clone(), 1, 48_000, Timestamp::default()));

    let processed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no processed audio")
        .unwrap();
    assert_eq!(processed.samples.as_ref(), samples.as_slice());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_level_attenuates_quiet_blocks() {
    let mut graph = AudioGraph::initialize(AudioEffectsConfig::default())
        .await
        .unwrap();
    graph.set_level(1.0);

    let source_track = MediaTrack::audio("mic");
    let stream = MediaStream::new(vec![source_track.clone()]);
    let output = graph.process(&stream).await.unwrap();
    let mut rx = output.audio_track().unwrap().subscribe_audio().unwrap();

    let quiet: Vec<f32> = (0..480).map(|i| (i as f32 * 0.05).sin() * 0.004).collect();
    let input_rms = rms(&quiet);

    tokio::time::sleep(Duration::from_millis(20)).await;
    for _ in 0..6 {
        source_track.push_audio(AudioBlock::new(quiet.clone(), 1, 48_000, Timestamp::default()));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut last = None;
    for _ in 0..6 {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Ok(block)) => last = Some(block),
            _ => break,
        }
    }

    let last = last.expect("no processed audio");
    assert!(
        rms(&last.samples) < input_rms * 0.5,
        "suppression did not attenuate the noise floor"
    );
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

// ===== Video frame loop =====

#[tokio::test(flavor = "multi_thread")]
async fn frame_loop_stops_after_source_ends() {
    let mut graph = VideoGraph::initialize(VideoEffectsConfig { refresh_rate: 100 })
        .await
        .unwrap();
    let source_track = MediaTrack::video("camera");
    let stream = MediaStream::new(vec![source_track.clone()]);
    let feed = feed_video(&source_track, 16, 16);

    let output = graph.process(&stream).await.unwrap();
    let output_track = output.video_track().unwrap().clone();
    let mut rx = output_track.subscribe_video().unwrap();

    // The loop is copying frames.
    let copied = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("frame loop produced nothing")
        .unwrap();
    assert_eq!((copied.width, copied.height), (16, 16));
    assert_eq!(graph.loop_state(), LoopState::Running);

    source_track.stop();
    feed.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The derived output track stopped with the source.
    assert!(!output_track.is_live());
    assert_eq!(graph.loop_state(), LoopState::Stopped);

    // No further copies occur once stopped.
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_processing_clears_cached_output() {
    let mut graph = VideoGraph::initialize(VideoEffectsConfig::default())
        .await
        .unwrap();
    let source_track = MediaTrack::video("camera");
    let stream = MediaStream::new(vec![source_track.clone()]);
    let feed = feed_video(&source_track, 16, 16);

    let first = graph.process(&stream).await.unwrap();
    graph.stop_processing();
    graph.stop_processing(); // idempotent

    // A new process call rebuilds rather than returning the stale output.
    let second = graph.process(&stream).await.unwrap();
    assert_ne!(first, second);

    source_track.stop();
    feed.await.unwrap();
    graph.cleanup();
}
