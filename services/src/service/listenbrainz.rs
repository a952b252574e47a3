use ::listenbrainz::raw::request::ListenType;
use async_trait::async_trait;
use psa_core::{
    ListenRecord,
    ListenStatus,
};
use reqwest::{
    header::AUTHORIZATION,
    Client,
};
use serde::Serialize;
use tracing::debug;

use super::{
    ListenSink,
    SubmitError,
    MEDIA_PLAYER,
    SUBMISSION_CLIENT,
};

/// Root of the public ListenBrainz API, in the form `listenbrainz::raw::Client` expects
pub const DEFAULT_API_URL: &str = "https://api.listenbrainz.org/1/";


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenBrainzConfig {
    pub token: String,
    api_url: String,
    /// Include the identifiers and duration only extended mode can find
    pub extended: bool,
}

impl ListenBrainzConfig {
    /// `api_url` may leave out the `/1` version segment and the trailing slash
    pub fn new(token: String, api_url: &str, extended: bool) -> Self {
        let root = api_url.trim_end_matches('/');
        let api_url = if root.ends_with("/1") { format!("{root}/") } else { format!("{root}/1/") };
        Self {
            token,
            api_url,
            extended,
        }
    }

    /// Versioned API root ending in `/1/`, usable with `listenbrainz::raw::Client::new_with_url`
    pub fn api_url(&self) -> &str { &self.api_url }
}

/// `POST /1/submit-listens` body carrying exactly one listen
#[derive(Debug, Serialize)]
pub struct SubmitListens<'l> {
    listen_type: ListenType,
    payload: [Listen<'l>; 1],
}

#[derive(Debug, Serialize)]
struct Listen<'l> {
    #[serde(skip_serializing_if = "Option::is_none")]
    listened_at: Option<i64>,
    track_metadata: TrackMetadata<'l>,
}

#[derive(Debug, Serialize)]
struct TrackMetadata<'l> {
    #[serde(skip_serializing_if = "Option::is_none")]
    artist_name: Option<&'l str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_name: Option<&'l str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_name: Option<&'l str>,
    additional_info: AdditionalInfo<'l>,
}

#[derive(Debug, Serialize)]
struct AdditionalInfo<'l> {
    media_player: &'static str,
    submission_client: &'static str,
    submission_client_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracknumber: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_mbid: Option<&'l str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artist_mbids: Option<[&'l str; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_mbid: Option<&'l str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_mbid: Option<&'l str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

impl<'l> SubmitListens<'l> {
    /// Builds the submission for `listen`; unknown fields are left out entirely
    pub fn new(listen: &'l ListenRecord, extended: bool) -> Result<Self, SubmitError> {
        let listen_type = match listen.status() {
            ListenStatus::Playing => ListenType::PlayingNow,
            ListenStatus::Scrobbled => ListenType::Single,
            status => return Err(SubmitError::Unsubmittable(status)),
        };

        let track = listen.track();
        let extended_only = |v| if extended { v } else { None };
        let additional_info = AdditionalInfo {
            media_player: MEDIA_PLAYER,
            submission_client: SUBMISSION_CLIENT,
            submission_client_version: env!("CARGO_PKG_VERSION"),
            tracknumber: listen.track_number(),
            track_mbid: listen.track_mbid(),
            artist_mbids: extended_only(track.artist_mbid.as_deref()).map(|mbid| [mbid]),
            release_mbid: extended_only(track.album_mbid.as_deref()),
            recording_mbid: extended_only(track.recording_mbid.as_deref()),
            duration_ms: if extended { track.track_duration } else { None },
        };

        Ok(Self {
            listen_type,
            payload: [Listen {
                listened_at: listen.listened_at(),
                track_metadata: TrackMetadata {
                    artist_name: listen.artist(),
                    release_name: listen.album(),
                    track_name: listen.track_title(),
                    additional_info,
                },
            }],
        })
    }
}


/// Submits listens to a ListenBrainz compatible API
pub struct ListenBrainz {
    client: Client,
    config: ListenBrainzConfig,
}

impl ListenBrainz {
    pub fn new(client: Client, config: ListenBrainzConfig) -> Self { Self { client, config } }

    fn submit_url(&self) -> String { format!("{}submit-listens", self.config.api_url) }
}

#[async_trait]
impl ListenSink for ListenBrainz {
    fn name(&self) -> &'static str { "ListenBrainz" }

    async fn submit(&self, listen: &ListenRecord) -> Result<(), SubmitError> {
        let body = SubmitListens::new(listen, self.config.extended)?;
        debug!(?body, "ListenBrainz submission");

        let response = self
            .client
            .post(self.submit_url())
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SubmitError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
