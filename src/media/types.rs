//! Core types shared by the audio and video pipelines

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Kind of media data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio sample data
    Audio,
    /// Video frame data
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Presentation timestamp for media blocks and frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Microseconds since capture start
    pub micros: i64,
}

impl Timestamp {
    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from a duration since capture start
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            micros: duration.as_micros() as i64,
        }
    }

    /// Convert to duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }

    /// Add a duration to this timestamp
    pub fn add(&self, duration: Duration) -> Self {
        Self {
            micros: self.micros + duration.as_micros() as i64,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}µs", self.micros)
    }
}

/// A block of raw interleaved f32 audio samples.
///
/// The sample payload is shared so blocks can fan out to several observers
/// without copying.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    /// Interleaved samples (L, R, L, R, ... for stereo)
    pub samples: Arc<[f32]>,
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Presentation timestamp of the first sample
    pub pts: Timestamp,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32, pts: Timestamp) -> Self {
        Self {
            samples: samples.into(),
            channels,
            sample_rate,
            pts,
        }
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Wall-clock duration this block covers
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// A single decoded RGBA8 video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Tightly packed RGBA8 pixel data, row-major
    pub data: Bytes,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Presentation timestamp
    pub pts: Timestamp,
}

impl VideoFrame {
    /// Size of the pixel payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
