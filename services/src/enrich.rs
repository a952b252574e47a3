//! Extended mode: details the webhook body leaves out, looked up on the Plex server itself.

use async_trait::async_trait;
use reqwest::{
    header::ACCEPT,
    Client,
    Response,
    StatusCode,
};
use serde::{
    de::DeserializeOwned,
    Deserialize,
};
use serde_json::Value;
use serde_with::{
    serde_as,
    DefaultOnError,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

use crate::{
    de::{
        first_mbid,
        opt_lenient_u64,
    },
    Webhook,
};

const PLEX_TV: &str = "https://plex.tv";
const TOKEN_HEADER: &str = "X-Plex-Token";
const CLIENT_ID_HEADER: &str = "X-Plex-Client-Identifier";
const PRODUCT_HEADER: &str = "X-Plex-Product";
const CLIENT_ID: &str = "plex-scrobble-app";
const PRODUCT: &str = "Plex_Scrobble_App";


/// Identifiers and duration only the media server knows about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub artist_mbid: Option<String>,
    pub album_mbid: Option<String>,
    pub recording_mbid: Option<String>,
    pub track_duration: Option<u64>,
}

/// Adds extra details to a webhook before it is normalized.
///
/// Enrichment is best-effort: implementations log what they could not find and return
/// whatever they did.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    async fn enrich(&self, webhook: &Webhook) -> Enrichment;
}

/// Basic mode
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

#[async_trait]
impl MetadataEnricher for NoEnrichment {
    async fn enrich(&self, _webhook: &Webhook) -> Enrichment { Enrichment::default() }
}


#[derive(Debug, thiserror::Error)]
pub enum PlexError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Plex responded with {0}")]
    Status(StatusCode),
    #[error("no item at {0}")]
    NotFound(String),
    #[error("no server named {0} on this account")]
    ServerNotFound(String),
    #[error("none of the connections to {0} answered")]
    Unreachable(String),
}

/// The two ways of reaching a Plex server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlexLogin {
    /// Direct server url with an `X-Plex-Token`
    UrlToken { url: String, token: String },
    /// plex.tv account credentials plus the name of the server to use
    UserPassServer {
        username: String,
        password: String,
        server_name: String,
    },
}


/// Looks up the played item on a Plex server
#[derive(Debug, Clone)]
pub struct PlexEnricher {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexEnricher {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        }
    }

    /// Resolves `login` to a reachable server
    pub async fn connect(client: Client, login: &PlexLogin) -> Result<Self, PlexError> {
        let (username, password, server_name) = match login {
            PlexLogin::UrlToken { url, token } => return Ok(Self::new(client, url, token)),
            PlexLogin::UserPassServer {
                username,
                password,
                server_name,
            } => (username, password, server_name),
        };

        let user_token = sign_in(&client, username, password).await?;
        let resources: Vec<PlexResource> = success(
            client
                .get(format!("{PLEX_TV}/api/v2/resources?includeHttps=1&includeRelay=1"))
                .header(TOKEN_HEADER, &user_token)
                .header(CLIENT_ID_HEADER, CLIENT_ID)
                .header(ACCEPT, "application/json")
                .send()
                .await?,
        )?
        .json()
        .await?;

        let server = select_server(&resources, server_name).ok_or_else(|| PlexError::ServerNotFound(server_name.clone()))?;
        let token = server.access_token.as_deref().unwrap_or(&user_token);
        for uri in server.connection_uris() {
            let candidate = Self::new(client.clone(), uri, token);
            match candidate.get("/identity").await {
                Ok(_) => {
                    info!("Connected to Plex server {server_name} at {uri}");
                    return Ok(candidate);
                },
                Err(e) => debug!("Plex connection {uri} failed: {e}"),
            }
        }
        Err(PlexError::Unreachable(server_name.clone()))
    }

    async fn get(&self, path: &str) -> Result<Response, PlexError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(TOKEN_HEADER, &self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        success(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlexError> {
        Ok(self.get(path).await?.json().await?)
    }

    async fn fetch_item(&self, key: &str) -> Result<PlexItem, PlexError> {
        let response: MetadataResponse = self.get_json(key).await?;
        response
            .container
            .metadata
            .into_iter()
            .next()
            .ok_or_else(|| PlexError::NotFound(key.to_owned()))
    }

    async fn related_mbid(&self, kind: &str, key: Option<&str>) -> Option<String> {
        let Some(key) = key else {
            info!("Failed to get the {kind} MBID: track has no {kind} key");
            return None;
        };
        match self.fetch_item(key).await {
            Ok(item) => {
                let mbid = item.mbid();
                if mbid.is_none() {
                    info!("Failed to get the {kind} MBID: {key} has no MusicBrainz guid");
                }
                mbid
            },
            Err(e) => {
                info!("Failed to get the {kind} MBID: {e}");
                None
            },
        }
    }
}

#[async_trait]
impl MetadataEnricher for PlexEnricher {
    async fn enrich(&self, webhook: &Webhook) -> Enrichment {
        let Some(key) = webhook.key() else {
            info!("Webhook has no Metadata.key, skipping media server lookup");
            return Enrichment::default();
        };

        let track = match self.fetch_item(key).await {
            Ok(track) => track,
            Err(e) => {
                error!("Failed to look up {key} on the Plex server: {e}");
                return Enrichment::default();
            },
        };
        if let (Some(expected), Some(found)) = (webhook.guid(), track.guid.as_deref()) {
            if expected != found {
                warn!("Plex item {key} is {found}, expected {expected}; skipping media server lookup");
                return Enrichment::default();
            }
        }

        let recording_mbid = track.mbid();
        if recording_mbid.is_none() {
            info!("Failed to get the recording MBID");
        }
        if track.duration.is_none() {
            info!("Failed to get the duration");
        }
        Enrichment {
            artist_mbid: self.related_mbid("artist", track.grandparent_key.as_deref()).await,
            album_mbid: self.related_mbid("album", track.parent_key.as_deref()).await,
            recording_mbid,
            track_duration: track.duration,
        }
    }
}


fn success(response: Response) -> Result<Response, PlexError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        status => Err(PlexError::Status(status)),
    }
}

async fn sign_in(client: &Client, username: &str, password: &str) -> Result<String, PlexError> {
    let response: SignInResponse = success(
        client
            .post(format!("{PLEX_TV}/users/sign_in.json"))
            .basic_auth(username, Some(password))
            .header(CLIENT_ID_HEADER, CLIENT_ID)
            .header(PRODUCT_HEADER, PRODUCT)
            .header(ACCEPT, "application/json")
            .send()
            .await?,
    )?
    .json()
    .await?;
    Ok(response.user.auth_token)
}

fn select_server<'r>(resources: &'r [PlexResource], name: &str) -> Option<&'r PlexResource> {
    resources
        .iter()
        .find(|r| r.name == name && r.provides.split(',').any(|p| p.trim() == "server"))
}


#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(rename = "MediaContainer")]
    container: MediaContainer,
}

#[derive(Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexItem>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlexItem {
    guid: Option<String>,
    #[serde(deserialize_with = "opt_lenient_u64")]
    duration: Option<u64>,
    parent_key: Option<String>,
    grandparent_key: Option<String>,
    #[serde(rename = "Guid")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    guids: Vec<Value>,
}

impl PlexItem {
    fn mbid(&self) -> Option<String> { first_mbid(&self.guids).map(str::to_owned) }
}

#[derive(Deserialize)]
struct SignInResponse {
    user: SignInUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInUser {
    auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexResource {
    name: String,
    #[serde(default)]
    provides: String,
    access_token: Option<String>,
    #[serde(default)]
    connections: Vec<PlexConnection>,
}

impl PlexResource {
    /// Direct connections first, relays as a last resort
    fn connection_uris(&self) -> impl Iterator<Item = &str> {
        let direct = self.connections.iter().filter(|c| !c.relay);
        let relayed = self.connections.iter().filter(|c| c.relay);
        direct.chain(relayed).map(|c| c.uri.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct PlexConnection {
    uri: String,
    #[serde(default)]
    relay: bool,
}
