use psa_core::{
    ListenRecord,
    ListenStatus,
    TrackInfo,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::enrich::Enrichment;


/// Assembles the canonical listen from a classified status and everything extracted for it.
///
/// Enriched values only fill fields the webhook left unknown.
pub fn normalize(status: ListenStatus, track: TrackInfo, enrichment: Enrichment, now: OffsetDateTime) -> ListenRecord {
    let Enrichment {
        artist_mbid,
        album_mbid,
        recording_mbid,
        track_duration,
    } = enrichment;

    let track = TrackInfo {
        artist_mbid: track.artist_mbid.or(artist_mbid),
        album_mbid: track.album_mbid.or(album_mbid),
        recording_mbid: track.recording_mbid.or(recording_mbid),
        track_duration: track.track_duration.or(track_duration),
        ..track
    };

    let listen = ListenRecord::new(status, track, now.unix_timestamp());
    debug!(?listen, "Normalized listen");
    listen
}
