//! Microphone capture backend
//!
//! Acquires the default input device as a single live audio track. Raw f32
//! blocks leave the capture callback over a bounded sync channel and a
//! bridge thread publishes them onto the track; the thread owning the cpal
//! stream parks until the track's end signal fires.

use crate::capture::acquire::StreamAcquirer;
use crate::error::{Error, Result};
use crate::media::{AudioBlock, MediaKind, MediaStream, MediaTrack, StreamConstraints, Timestamp};
use async_trait::async_trait;
use cpal::SampleFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::thread;

/// Capture-callback queue depth
const CAPTURE_QUEUE_DEPTH: usize = 256;

/// Audio-only acquirer over the default input device.
///
/// A video constraint is ignored (no camera backend ships with this crate);
/// a request without audio cannot be satisfied at all.
pub struct MicrophoneAcquirer;

#[async_trait]
impl StreamAcquirer for MicrophoneAcquirer {
    async fn acquire(&self, constraints: StreamConstraints) -> Result<MediaStream> {
        if !constraints.audio {
            return Err(Error::MissingTrack(MediaKind::Audio));
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Initialization("no default input device found".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| Error::Initialization(format!("failed to get default input config: {e}")))?;
        info!("microphone capture config: {:?}", config);

        let label = device.name().unwrap_or_else(|_| "microphone".into());
        let track = MediaTrack::audio(label);
        let sample_rate = config.sample_rate();
        let channels = config.channels();

        // Synchronous channel: cpal callback → bridge thread.
        let (sync_tx, sync_rx) = std::sync::mpsc::sync_channel::<Vec<f32>>(CAPTURE_QUEUE_DEPTH);

        // Bridge thread: callback data → track subscribers.
        let bridge_track = track.clone();
        thread::spawn(move || {
            let mut frames_seen: u64 = 0;
            while let Ok(samples) = sync_rx.recv() {
                let pts =
                    Timestamp::from_micros((frames_seen * 1_000_000 / sample_rate as u64) as i64);
                frames_seen += (samples.len() / channels.max(1) as usize) as u64;
                if !bridge_track.push_audio(AudioBlock::new(samples, channels, sample_rate, pts)) {
                    break;
                }
            }
            info!("microphone bridge exited");
        });

        // Capture thread: cpal requires a dedicated thread; it holds the
        // stream open until the track ends.
        let handle = tokio::runtime::Handle::current();
        let capture_track = track.clone();
        thread::spawn(move || {
            let err_fn = |err| error!("microphone stream error: {err}");
            let stream_config: cpal::StreamConfig = config.clone().into();

            let built = match config.sample_format() {
                SampleFormat::F32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &_| {
                        let _ = sync_tx.try_send(data.to_vec());
                    },
                    err_fn,
                    None,
                ),
                SampleFormat::I16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &_| {
                        let _ = sync_tx
                            .try_send(data.iter().map(|s| *s as f32 / i16::MAX as f32).collect());
                    },
                    err_fn,
                    None,
                ),
                SampleFormat::I32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i32], _: &_| {
                        let _ = sync_tx
                            .try_send(data.iter().map(|s| *s as f32 / i32::MAX as f32).collect());
                    },
                    err_fn,
                    None,
                ),
                other => {
                    error!("unsupported sample format: {other:?}");
                    capture_track.stop();
                    return;
                }
            };

            let stream = match built {
                Ok(stream) => stream,
                Err(e) => {
                    error!("failed to build input stream: {e}");
                    capture_track.stop();
                    return;
                }
            };
            if let Err(e) = stream.play() {
                error!("failed to start microphone stream: {e}");
                capture_track.stop();
                return;
            }
            info!("microphone capture started");

            handle.block_on(capture_track.ended());

            let _ = stream.pause();
            info!("microphone capture stopped");
        });

        Ok(MediaStream::new(vec![track]))
    }
}
