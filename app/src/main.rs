use std::{
    net::SocketAddr,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use listenbrainz::raw::Client as ListenBrainzClient;
use psa_services::{
    enrich::{
        MetadataEnricher,
        NoEnrichment,
        PlexEnricher,
    },
    service::{
        Dispatcher,
        LastFm,
        ListenBrainz,
        ListenBrainzConfig,
        ListenSink,
    },
    Relay,
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

mod args;
use args::Args;

mod server;


/// Checks the token against the API the listens will go to. Only a definite
/// rejection disables ListenBrainz; an unreachable API is retried on every listen.
async fn validate_listenbrainz(config: &ListenBrainzConfig) -> bool {
    let api_url = config.api_url().to_owned();
    let token = config.token.clone();
    let validation =
        tokio::task::spawn_blocking(move || ListenBrainzClient::new_with_url(api_url).validate_token(token.as_str())).await;

    match validation {
        Ok(Ok(resp)) if resp.valid => {
            info!("ListenBrainz token accepted");
            true
        },
        Ok(Ok(_)) => {
            error!("ListenBrainz rejected LB_API_TOKEN, listens will not be submitted to ListenBrainz");
            false
        },
        Ok(Err(e)) => {
            warn!("Could not validate LB_API_TOKEN: {e}");
            true
        },
        Err(e) => {
            warn!("Could not validate LB_API_TOKEN: {e}");
            true
        },
    }
}

async fn make_enricher(args: &Args, client: &reqwest::Client) -> Option<PlexEnricher> {
    let login = args.plex_login()?;
    match PlexEnricher::connect(client.clone(), &login).await {
        Ok(plex) => {
            info!("Advanced mode on!");
            Some(plex)
        },
        Err(e) => {
            error!("Failed to connect to the Plex server: {e}. Continuing in standard mode...");
            None
        },
    }
}

async fn make_sinks(args: &Args, client: &reqwest::Client, extended: bool) -> Vec<Box<dyn ListenSink>> {
    let mut sinks: Vec<Box<dyn ListenSink>> = Vec::new();

    match args.listenbrainz_token() {
        Some(token) => {
            let config = ListenBrainzConfig::new(token, &args.lb_api_url, extended);
            if validate_listenbrainz(&config).await {
                sinks.push(Box::new(ListenBrainz::new(client.clone(), config)));
            }
        },
        None => info!("Looks like LB_API_TOKEN was not set! Listens will not be submitted to ListenBrainz"),
    }

    match args.lastfm_credentials() {
        Some(credentials) => match LastFm::sign_in(client.clone(), &credentials).await {
            Ok(lastfm) => sinks.push(Box::new(lastfm)),
            Err(e) => error!("Failed to sign into Last.fm! Please review your credentials: {e}"),
        },
        None => info!("Last.fm credentials are incomplete! Listens will not be submitted to Last.fm"),
    }

    sinks
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(args.logging.into())
                .from_env_lossy(),
        )
        .try_init()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout))
        .build()?;

    let plex = make_enricher(&args, &client).await;
    let sinks = make_sinks(&args, &client, plex.is_some()).await;
    if sinks.is_empty() {
        warn!("No tracking service is configured, webhooks will only be logged");
    }

    let enricher: Box<dyn MetadataEnricher> = match plex {
        Some(plex) => Box::new(plex),
        None => Box::new(NoEnrichment),
    };
    let relay = Relay::new(args.relay_config(), enricher, Dispatcher::new(sinks));
    info!(
        "Relaying listens of {} to [{}]",
        relay.config().tracked_user,
        relay.dispatcher().sink_names().collect::<Vec<_>>().join(", ")
    );

    server::run_server(relay, SocketAddr::new(args.host, args.port)).await
}
