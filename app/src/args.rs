use std::{
    convert::Infallible,
    net::IpAddr,
};

use clap::{
    ArgAction,
    Parser,
    ValueEnum,
};
use psa_services::{
    enrich::PlexLogin,
    service::{
        listenbrainz::DEFAULT_API_URL,
        LastFmCredentials,
    },
    RelayConfig,
};
use tracing::{
    error,
    level_filters::LevelFilter,
};
use uuid::Uuid;

/// Relay Plex webhook playback events to ListenBrainz and Last.fm
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Plex account whose listens are relayed, also the plex.tv login for USER_PASS_SERVER
    #[arg(long, env = "PLEX_USERNAME")]
    pub plex_username: String,

    /// ListenBrainz API token, ListenBrainz is skipped without one
    #[arg(long, env = "LB_API_TOKEN", hide_env_values = true)]
    pub lb_api_token: Option<Uuid>,

    /// Url of the listenbrainz compatible API to submit to
    #[arg(long, env = "LB_API_URL", default_value = DEFAULT_API_URL)]
    pub lb_api_url: String,

    /// Last.fm API key
    #[arg(long, env = "LFM_API_KEY")]
    pub lfm_api_key: Option<String>,

    /// Last.fm API secret
    #[arg(long, env = "LFM_API_SECRET", hide_env_values = true)]
    pub lfm_api_secret: Option<String>,

    /// Last.fm username
    #[arg(long, env = "LFM_USERNAME")]
    pub lfm_username: Option<String>,

    /// Last.fm password
    #[arg(long, env = "LFM_PASSWORD", hide_env_values = true)]
    pub lfm_password: Option<String>,

    /// Look up extra MusicBrainz ids and duration on the Plex server
    #[arg(long, env = "ADVANCED", default_value = "false", value_parser = parse_enabled, action = ArgAction::Set)]
    pub advanced: bool,

    /// How to reach the Plex server in advanced mode
    #[arg(long, env = "LOGIN_METHOD", value_enum)]
    pub login_method: Option<LoginMethod>,

    /// plex.tv password (USER_PASS_SERVER)
    #[arg(long, env = "PLEX_PASSWORD", hide_env_values = true)]
    pub plex_password: Option<String>,

    /// Name of the Plex server to connect to (USER_PASS_SERVER)
    #[arg(long, env = "SERVER_NAME")]
    pub server_name: Option<String>,

    /// Plex server url (URL_TOKEN)
    #[arg(long, env = "PLEX_URL")]
    pub plex_url: Option<String>,

    /// Plex server token (URL_TOKEN)
    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    pub plex_token: Option<String>,

    /// DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[arg(long, env = "LOGGING", default_value = "ERROR", value_parser = parse_log_level)]
    pub logging: LevelFilter,

    /// Address to listen on
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "LISTEN_PORT", default_value_t = 1841)]
    pub port: u16,

    /// Timeout in seconds for every request to Plex and the tracking services
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoginMethod {
    #[value(name = "USER_PASS_SERVER")]
    UserPassServer,
    #[value(name = "URL_TOKEN")]
    UrlToken,
}


impl Args {
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            tracked_user: self.plex_username.clone(),
        }
    }

    pub fn listenbrainz_token(&self) -> Option<String> {
        self.lb_api_token.map(|token| token.as_hyphenated().to_string())
    }

    /// Present only when every Last.fm value is set
    pub fn lastfm_credentials(&self) -> Option<LastFmCredentials> {
        Some(LastFmCredentials {
            api_key: self.lfm_api_key.clone()?,
            api_secret: self.lfm_api_secret.clone()?,
            username: self.lfm_username.clone()?,
            password: self.lfm_password.clone()?,
        })
    }

    /// How to reach Plex in advanced mode. Missing settings are logged and fall back
    /// to basic mode.
    pub fn plex_login(&self) -> Option<PlexLogin> {
        if !self.advanced {
            return None;
        }

        let (login, needs) = match self.login_method {
            None => {
                error!(
                    "ADVANCED is on but LOGIN_METHOD is not set. Your choices are USER_PASS_SERVER or URL_TOKEN. \
                     Continuing in standard mode..."
                );
                return None;
            },
            Some(LoginMethod::UrlToken) => {
                let login = self.plex_url.clone().zip(self.plex_token.clone());
                (login.map(|(url, token)| PlexLogin::UrlToken { url, token }), "PLEX_URL and PLEX_TOKEN")
            },
            Some(LoginMethod::UserPassServer) => {
                let login = self.plex_password.clone().zip(self.server_name.clone());
                let login = login.map(|(password, server_name)| PlexLogin::UserPassServer {
                    username: self.plex_username.clone(),
                    password,
                    server_name,
                });
                (login, "PLEX_PASSWORD and SERVER_NAME")
            },
        };

        if login.is_none() {
            error!("This LOGIN_METHOD needs {needs}. Continuing in standard mode...");
        }
        login
    }
}


/// Mirrors the environment check of `ADVANCED`: only a case-insensitive `true` enables it
fn parse_enabled(value: &str) -> Result<bool, Infallible> { Ok(value.trim().eq_ignore_ascii_case("true")) }

/// Unknown levels fall back to `ERROR`
fn parse_log_level(level: &str) -> Result<LevelFilter, Infallible> {
    Ok(match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARNING" | "WARN" => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    })
}
