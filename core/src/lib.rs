use serde::Serialize;

/// Where a listen is in its playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenStatus {
    /// Started or resumed, not yet counted as a listen
    Playing,
    /// Played far enough to count as a listen
    Scrobbled,
    /// Playback ended; nothing is submitted for it
    Stopped,
}

impl ListenStatus {
    /// Whether tracking services have an operation for this status
    pub fn is_submittable(self) -> bool { matches!(self, Self::Playing | Self::Scrobbled) }
}


/// Everything known about the played track. `None` always means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_mbid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_mbid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_mbid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_mbid: Option<String>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_duration: Option<u64>,
}


/// Canonical listen handed to every tracking service.
///
/// Only a [`ListenStatus::Scrobbled`] listen carries a `listened_at` timestamp; the
/// constructor enforces this so no consumer has to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenRecord {
    status: ListenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    listened_at: Option<i64>,
    #[serde(flatten)]
    track: TrackInfo,
}

impl ListenRecord {
    /// Builds a record for `status`, stamping it with `now` (unix seconds) when scrobbled
    pub fn new(status: ListenStatus, track: TrackInfo, now: i64) -> Self {
        Self {
            status,
            listened_at: (status == ListenStatus::Scrobbled).then_some(now),
            track,
        }
    }

    pub fn status(&self) -> ListenStatus { self.status }

    pub fn listened_at(&self) -> Option<i64> { self.listened_at }

    pub fn track(&self) -> &TrackInfo { &self.track }

    pub fn artist(&self) -> Option<&str> { self.track.artist.as_deref() }

    pub fn album(&self) -> Option<&str> { self.track.album.as_deref() }

    pub fn track_title(&self) -> Option<&str> { self.track.track_title.as_deref() }

    pub fn track_number(&self) -> Option<u32> { self.track.track_number }

    pub fn track_mbid(&self) -> Option<&str> { self.track.track_mbid.as_deref() }
}
