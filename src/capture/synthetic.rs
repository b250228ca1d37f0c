//! Synthetic capture backend
//!
//! A deterministic source for demos and tests: a sine tone with a faint
//! noise floor on the audio track, a moving gradient on the video track.
//! Tracks produce until stopped.

use crate::capture::acquire::StreamAcquirer;
use crate::error::Result;
use crate::media::{AudioBlock, MediaStream, MediaTrack, StreamConstraints, Timestamp, VideoFrame};
use async_trait::async_trait;
use bytes::Bytes;
use std::f32::consts::PI;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyntheticAcquirer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames per audio block
    pub block_frames: usize,
    pub tone_hz: f32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for SyntheticAcquirer {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 1,
            block_frames: 480,
            tone_hz: 440.0,
            width: 320,
            height: 240,
            frame_rate: 30,
        }
    }
}

#[async_trait]
impl StreamAcquirer for SyntheticAcquirer {
    async fn acquire(&self, constraints: StreamConstraints) -> Result<MediaStream> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(self.spawn_audio());
        }
        if constraints.video {
            tracks.push(self.spawn_video());
        }
        Ok(MediaStream::new(tracks))
    }
}

impl SyntheticAcquirer {
    fn spawn_audio(&self) -> MediaTrack {
        let track = MediaTrack::audio("synthetic-mic");
        let cfg = self.clone();
        let producer = track.clone();
        tokio::spawn(async move {
            let block = Duration::from_secs_f64(cfg.block_frames as f64 / cfg.sample_rate as f64);
            let mut ticker = tokio::time::interval(block);
            let step = 2.0 * PI * cfg.tone_hz / cfg.sample_rate as f32;
            let mut phase: f32 = 0.0;
            let mut frames_seen: u64 = 0;
            loop {
                tokio::select! {
                    _ = producer.ended() => break,
                    _ = ticker.tick() => {
                        let mut samples = Vec::with_capacity(cfg.block_frames * cfg.channels as usize);
                        for _ in 0..cfg.block_frames {
                            phase = (phase + step) % (2.0 * PI);
                            // Tone plus a faint deterministic noise floor.
                            let sample = phase.sin() * 0.4 + (phase * 13.7).sin() * 0.002;
                            for _ in 0..cfg.channels {
                                samples.push(sample);
                            }
                        }
                        let pts = Timestamp::from_micros(
                            (frames_seen * 1_000_000 / cfg.sample_rate as u64) as i64,
                        );
                        frames_seen += cfg.block_frames as u64;
                        if !producer.push_audio(AudioBlock::new(
                            samples,
                            cfg.channels,
                            cfg.sample_rate,
                            pts,
                        )) {
                            break;
                        }
                    }
                }
            }
        });
        track
    }

    fn spawn_video(&self) -> MediaTrack {
        let track = MediaTrack::video("synthetic-camera");
        let cfg = self.clone();
        let producer = track.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs_f64(1.0 / cfg.frame_rate.max(1) as f64));
            let mut index: u64 = 0;
            loop {
                tokio::select! {
                    _ = producer.ended() => break,
                    _ = ticker.tick() => {
                        let frame = gradient_frame(cfg.width, cfg.height, index);
                        let pts = Timestamp::from_micros(
                            (index * 1_000_000 / cfg.frame_rate.max(1) as u64) as i64,
                        );
                        index += 1;
                        if !producer.push_video(VideoFrame {
                            data: frame,
                            width: cfg.width,
                            height: cfg.height,
                            pts,
                        }) {
                            break;
                        }
                    }
                }
            }
        });
        track
    }
}

fn gradient_frame(width: u32, height: u32, index: u64) -> Bytes {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(((x as u64 + index) % 256) as u8);
            data.push((y % 256) as u8);
            data.push(((x + y) % 256) as u8);
            data.push(255);
        }
    }
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn honors_constraints() {
        let acquirer = SyntheticAcquirer::default();

        let audio_only = acquirer.acquire(StreamConstraints::audio_only()).await.unwrap();
        assert!(audio_only.audio_track().is_some());
        assert!(audio_only.video_track().is_none());
        audio_only.stop();

        let both = acquirer.acquire(StreamConstraints::both()).await.unwrap();
        assert!(both.audio_track().is_some());
        assert!(both.video_track().is_some());
        both.stop();
    }

    #[tokio::test]
    async fn produces_audio_until_stopped() {
        let acquirer = SyntheticAcquirer::default();
        let stream = acquirer.acquire(StreamConstraints::audio_only()).await.unwrap();
        let track = stream.audio_track().unwrap();
        let mut rx = track.subscribe_audio().unwrap();

        let block = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no audio produced")
            .unwrap();
        assert_eq!(block.sample_rate, 48_000);
        assert_eq!(block.frames(), 480);

        stream.stop();
    }

    #[tokio::test]
    async fn frame_dimensions_match_config() {
        let acquirer = SyntheticAcquirer {
            width: 64,
            height: 32,
            ..SyntheticAcquirer::default()
        };
        let stream = acquirer.acquire(StreamConstraints::video_only()).await.unwrap();
        let mut rx = stream.video_track().unwrap().subscribe_video().unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no frame produced")
            .unwrap();
        assert_eq!((frame.width, frame.height), (64, 32));
        assert_eq!(frame.data.len(), 64 * 32 * 4);

        stream.stop();
    }
}
