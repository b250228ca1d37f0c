//! Media streams: identity-bearing bundles of tracks

use super::track::MediaTrack;
use super::types::MediaKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique stream identity. Effect sessions are keyed on this, so a
/// stream handle and all its clones resolve to the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

struct StreamInner {
    id: StreamId,
    tracks: Vec<MediaTrack>,
}

/// A captured media stream: an ordered set of tracks under one identity.
///
/// Cloning a stream clones the handle, not the media; clones compare equal
/// and share the underlying tracks.
#[derive(Clone)]
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: StreamId::next(),
                tracks,
            }),
        }
    }

    pub fn id(&self) -> StreamId {
        self.inner.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.inner.tracks
    }

    /// First audio track, if any
    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.track_of(MediaKind::Audio)
    }

    /// First video track, if any
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.track_of(MediaKind::Video)
    }

    fn track_of(&self, kind: MediaKind) -> Option<&MediaTrack> {
        self.inner.tracks.iter().find(|t| t.kind() == kind)
    }

    /// End every track in the stream
    pub fn stop(&self) {
        for track in &self.inner.tracks {
            track.stop();
        }
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaStream {}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.inner.id)
            .field("tracks", &self.inner.tracks)
            .finish()
    }
}

/// Which media kinds a capture request should yield and which the pipeline
/// should process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamConstraints {
    pub audio: bool,
    pub video: bool,
}

impl StreamConstraints {
    pub const fn new(audio: bool, video: bool) -> Self {
        Self { audio, video }
    }

    pub const fn audio_only() -> Self {
        Self::new(true, false)
    }

    pub const fn video_only() -> Self {
        Self::new(false, true)
    }

    pub const fn both() -> Self {
        Self::new(true, true)
    }
}
