//! Last.fm scrobbling API (`https://www.last.fm/api/scrobbling`)

use std::collections::BTreeMap;

use async_trait::async_trait;
use md5::{
    Digest,
    Md5,
};
use psa_core::{
    ListenRecord,
    ListenStatus,
};
use reqwest::{
    Client,
    StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{
    debug,
    info,
};

use super::{
    ListenSink,
    SubmitError,
};

pub const API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

type Params = BTreeMap<&'static str, String>;


/// Account credentials, exchanged for a session key once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct LastFmCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LastFmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmCredentials")
            .field("api_key", &self.api_key)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}


/// Signs calls with the account's API secret
#[derive(Clone)]
struct Signer {
    api_key: String,
    api_secret: String,
}

impl Signer {
    /// Adds `method`, `api_key`, `sk` and the resulting `api_sig` to `params`
    fn sign(&self, method: &str, mut params: Params, session_key: Option<&str>) -> Params {
        params.insert("method", method.to_owned());
        params.insert("api_key", self.api_key.clone());
        if let Some(sk) = session_key {
            params.insert("sk", sk.to_owned());
        }
        let signature = api_signature(&params, &self.api_secret);
        params.insert("api_sig", signature);
        params.insert("format", "json".to_owned());
        params
    }
}

/// md5 of every `key` + `value` pair in key order followed by the secret.
/// `format` and `callback` are not signed.
fn api_signature(params: &Params, secret: &str) -> String {
    let mut hasher = Md5::new();
    for (key, value) in params.iter().filter(|(k, _)| !matches!(**k, "format" | "callback")) {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Last.fm reports failures as `{ "error": code, "message": ... }`, sometimes with a 200
fn check_response(status: StatusCode, body: &str) -> Result<Value, SubmitError> {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    if let Some(code) = json.get("error").and_then(Value::as_i64) {
        let message = json.get("message").and_then(Value::as_str).unwrap_or_default();
        return Err(SubmitError::Api {
            code,
            message: message.to_owned(),
        });
    }
    if status.is_success() {
        Ok(json)
    } else {
        Err(SubmitError::Status {
            status,
            body: body.to_owned(),
        })
    }
}

/// Fields shared by now playing updates and scrobbles. Last.fm rejects calls without
/// an artist or a title, so those fail here instead.
fn track_params(listen: &ListenRecord) -> Result<Params, SubmitError> {
    let mut params = Params::new();
    params.insert("artist", listen.artist().ok_or(SubmitError::MissingField("artist"))?.to_owned());
    params.insert("track", listen.track_title().ok_or(SubmitError::MissingField("track_title"))?.to_owned());
    if let Some(album) = listen.album() {
        params.insert("album", album.to_owned());
    }
    if let Some(number) = listen.track_number() {
        params.insert("trackNumber", number.to_string());
    }
    if let Some(mbid) = listen.track_mbid() {
        params.insert("mbid", mbid.to_owned());
    }
    Ok(params)
}

#[derive(Deserialize)]
struct SessionResponse {
    session: Session,
}

#[derive(Deserialize)]
struct Session {
    name: String,
    key: String,
}


/// Signed in Last.fm account
pub struct LastFm {
    client: Client,
    api_url: String,
    signer: Signer,
    session_key: String,
}

impl LastFm {
    /// Exchanges `credentials` for a session key on the public API
    pub async fn sign_in(client: Client, credentials: &LastFmCredentials) -> Result<Self, SubmitError> {
        Self::sign_in_at(client, API_URL, credentials).await
    }

    pub async fn sign_in_at(client: Client, api_url: &str, credentials: &LastFmCredentials) -> Result<Self, SubmitError> {
        let signer = Signer {
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
        };
        let params = Params::from([
            ("username", credentials.username.clone()),
            ("password", credentials.password.clone()),
        ]);
        let params = signer.sign("auth.getMobileSession", params, None);

        let json = post(&client, api_url, &params).await?;
        let SessionResponse { session } =
            serde_json::from_value(json).map_err(|_| SubmitError::MissingField("session.key"))?;
        info!("Signed into Last.fm as {}", session.name);

        Ok(Self {
            client,
            api_url: api_url.to_owned(),
            signer,
            session_key: session.key,
        })
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value, SubmitError> {
        let params = self.signer.sign(method, params, Some(&self.session_key));
        debug!("Last.fm {method}");
        post(&self.client, &self.api_url, &params).await
    }

    pub async fn update_now_playing(&self, listen: &ListenRecord) -> Result<(), SubmitError> {
        self.call("track.updateNowPlaying", track_params(listen)?).await.map(drop)
    }

    pub async fn scrobble(&self, listen: &ListenRecord) -> Result<(), SubmitError> {
        let mut params = track_params(listen)?;
        let timestamp = listen
            .listened_at()
            .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
        params.insert("timestamp", timestamp.to_string());
        self.call("track.scrobble", params).await.map(drop)
    }
}

async fn post(client: &Client, url: &str, params: &Params) -> Result<Value, SubmitError> {
    let response = client.post(url).form(params).send().await?;
    let status = response.status();
    let body = response.text().await?;
    check_response(status, &body)
}

#[async_trait]
impl ListenSink for LastFm {
    fn name(&self) -> &'static str { "Last.fm" }

    async fn submit(&self, listen: &ListenRecord) -> Result<(), SubmitError> {
        match listen.status() {
            ListenStatus::Playing => self.update_now_playing(listen).await,
            ListenStatus::Scrobbled => self.scrobble(listen).await,
            status => Err(SubmitError::Unsubmittable(status)),
        }
    }
}
