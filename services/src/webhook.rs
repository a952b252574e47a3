use psa_core::TrackInfo;
use serde_json::Value;
use tracing::info;

use crate::de::{
    first_mbid,
    lenient_u64,
};


/// A Plex webhook body.
///
/// Plex makes no promises about which keys are present, so every accessor is
/// independent: a missing or oddly shaped field yields `None` for that field alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Webhook(Value);

impl Webhook {
    /// Parses the JSON found in the `payload` form field
    pub fn parse(payload: &str) -> serde_json::Result<Self> { serde_json::from_str(payload).map(Self) }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    fn required_str(&self, field: &str, pointer: &str) -> Option<String> {
        let value = self.str_at(pointer).map(str::to_owned);
        if value.is_none() {
            info!("Failed getting {field} from webhook ({pointer} missing)");
        }
        value
    }

    /// Title of the Plex account that triggered the event
    pub fn account(&self) -> Option<&str> { self.str_at("/Account/title") }

    /// e.g. `media.play`, `media.scrobble`
    pub fn event(&self) -> Option<&str> { self.str_at("/event") }

    /// e.g. `track`, `episode`, `movie`
    pub fn media_type(&self) -> Option<&str> { self.str_at("/Metadata/type") }

    /// Plex guid of the item, used to confirm media server lookups
    pub fn guid(&self) -> Option<&str> { self.str_at("/Metadata/guid") }

    /// Media server path of the item, e.g. `/library/metadata/1234`
    pub fn key(&self) -> Option<&str> { self.str_at("/Metadata/key") }

    /// Track artist.
    ///
    /// Plex only sends `originalTitle` when the track artist differs from the album
    /// artist, so fall back to the album artist without complaint.
    pub fn artist(&self) -> Option<String> {
        self.str_at("/Metadata/originalTitle")
            .map(str::to_owned)
            .or_else(|| self.required_str("track artist", "/Metadata/grandparentTitle"))
    }

    pub fn album_artist(&self) -> Option<String> { self.required_str("album artist", "/Metadata/grandparentTitle") }

    pub fn album(&self) -> Option<String> { self.required_str("album", "/Metadata/parentTitle") }

    pub fn track_title(&self) -> Option<String> { self.required_str("track title", "/Metadata/title") }

    pub fn track_number(&self) -> Option<u32> {
        let number = self
            .0
            .pointer("/Metadata/index")
            .and_then(lenient_u64)
            .and_then(|n| u32::try_from(n).ok());
        if number.is_none() {
            info!("Failed getting the track number from webhook");
        }
        number
    }

    /// MusicBrainz id of the track, without its `mbid://` prefix
    pub fn track_mbid(&self) -> Option<String> {
        let mbid = self
            .0
            .pointer("/Metadata/Guid")
            .and_then(Value::as_array)
            .and_then(|guids| first_mbid(guids))
            .map(str::to_owned);
        if mbid.is_none() {
            info!("Failed to get the track MBID from webhook");
        }
        mbid
    }

    /// Every field this webhook can supply on its own
    pub fn track_info(&self) -> TrackInfo {
        TrackInfo {
            artist: self.artist(),
            album_artist: self.album_artist(),
            album: self.album(),
            track_title: self.track_title(),
            track_number: self.track_number(),
            track_mbid: self.track_mbid(),
            ..Default::default()
        }
    }
}

impl From<Value> for Webhook {
    fn from(value: Value) -> Self { Self(value) }
}


#[cfg(test)]
mod tests;
