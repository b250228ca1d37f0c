//! Media tracks and their end-of-stream signal

use super::types::{AudioBlock, MediaKind, VideoFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Fan-out capacity per track. Slow subscribers lag and lose the oldest
/// entries rather than stalling the producer.
const TRACK_CHANNEL_CAPACITY: usize = 64;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique track identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl TrackId {
    fn next() -> Self {
        TrackId(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

enum TrackChannel {
    Audio(broadcast::Sender<AudioBlock>),
    Video(broadcast::Sender<Arc<VideoFrame>>),
}

struct TrackInner {
    id: TrackId,
    kind: MediaKind,
    label: String,
    channel: TrackChannel,
    ended: CancellationToken,
}

/// A live media track: a fan-out channel of raw media plus an end signal.
///
/// Handles are cheap to clone and share one underlying track, so the audio
/// and video graphs can observe the same source track independently, each
/// with its own subscription.
///
/// The end signal is explicit: `stop` is idempotent, and `ended` hands out
/// an awaitable subscription that resolves exactly once (immediately if the
/// track already ended). Dropping the future unsubscribes.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live audio track
    pub fn audio(label: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(TRACK_CHANNEL_CAPACITY);
        Self::new(MediaKind::Audio, label.into(), TrackChannel::Audio(tx))
    }

    /// Create a live video track
    pub fn video(label: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(TRACK_CHANNEL_CAPACITY);
        Self::new(MediaKind::Video, label.into(), TrackChannel::Video(tx))
    }

    fn new(kind: MediaKind, label: String, channel: TrackChannel) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::next(),
                kind,
                label,
                channel,
                ended: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the track is still producing media
    pub fn is_live(&self) -> bool {
        !self.inner.ended.is_cancelled()
    }

    /// End the track. Idempotent: repeated calls are no-ops and every ended
    /// subscription fires exactly once.
    pub fn stop(&self) {
        self.inner.ended.cancel();
    }

    /// Awaitable end-of-stream subscription
    pub fn ended(&self) -> WaitForCancellationFutureOwned {
        self.inner.ended.clone().cancelled_owned()
    }

    /// Subscribe to the track's audio blocks. `None` for video tracks.
    pub fn subscribe_audio(&self) -> Option<broadcast::Receiver<AudioBlock>> {
        match &self.inner.channel {
            TrackChannel::Audio(tx) => Some(tx.subscribe()),
            TrackChannel::Video(_) => None,
        }
    }

    /// Subscribe to the track's video frames. `None` for audio tracks.
    pub fn subscribe_video(&self) -> Option<broadcast::Receiver<Arc<VideoFrame>>> {
        match &self.inner.channel {
            TrackChannel::Video(tx) => Some(tx.subscribe()),
            TrackChannel::Audio(_) => None,
        }
    }

    /// Publish an audio block. Returns `false` once the track has ended;
    /// publishing with no subscribers is not an error.
    pub fn push_audio(&self, block: AudioBlock) -> bool {
        if !self.is_live() {
            return false;
        }
        if let TrackChannel::Audio(tx) = &self.inner.channel {
            let _ = tx.send(block);
        }
        true
    }

    /// Publish a video frame. Returns `false` once the track has ended.
    pub fn push_video(&self, frame: VideoFrame) -> bool {
        if !self.is_live() {
            return false;
        }
        if let TrackChannel::Video(tx) = &self.inner.channel {
            let _ = tx.send(Arc::new(frame));
        }
        true
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("live", &self.is_live())
            .finish()
    }
}
