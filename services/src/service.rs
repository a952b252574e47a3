use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use psa_core::{
    ListenRecord,
    ListenStatus,
};
use tracing::{
    debug,
    error,
    info,
};

pub mod lastfm;
pub mod listenbrainz;

pub use self::lastfm::{
    LastFm,
    LastFmCredentials,
};
pub use self::listenbrainz::{
    ListenBrainz,
    ListenBrainzConfig,
};

/// Name reported to tracking services as the submitting client
pub const SUBMISSION_CLIENT: &str = "Plex_Scrobble_App";
/// Name reported to tracking services as the media player
pub const MEDIA_PLAYER: &str = "Plex";


#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("service responded with {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("service error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("no submission exists for {0:?} listens")]
    Unsubmittable(ListenStatus),
}

/// A tracking service that accepts listens
#[async_trait]
pub trait ListenSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submits `listen` as now playing or as a scrobble, depending on its status
    async fn submit(&self, listen: &ListenRecord) -> Result<(), SubmitError>;
}


/// Which sinks took a listen and which did not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub submitted: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Fans a listen out to every configured sink.
///
/// Sinks run one after the other; an error or panic in one is logged and the
/// remaining sinks still run.
#[derive(Default)]
pub struct Dispatcher {
    sinks: Vec<Box<dyn ListenSink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Box<dyn ListenSink>>) -> Self { Self { sinks } }

    pub fn sink_names(&self) -> impl Iterator<Item = &'static str> + '_ { self.sinks.iter().map(|s| s.name()) }

    pub async fn dispatch(&self, listen: &ListenRecord) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !listen.status().is_submittable() {
            debug!("Nothing to submit for {:?} listen", listen.status());
            return report;
        }

        for sink in &self.sinks {
            let name = sink.name();
            info!("Submitting listen to {name}");
            match AssertUnwindSafe(sink.submit(listen)).catch_unwind().await {
                Ok(Ok(())) => report.submitted.push(name),
                Ok(Err(e)) => {
                    error!("Encountered an error while submitting to {name}: {e}");
                    report.failed.push(name);
                },
                Err(_) => {
                    error!("{name} panicked while submitting a listen");
                    report.failed.push(name);
                },
            }
        }
        report
    }
}


#[cfg(test)]
mod tests;
