use psa_core::ListenRecord;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    classify,
    enrich::{
        Enrichment,
        MetadataEnricher,
    },
    normalize,
    service::{
        DispatchReport,
        Dispatcher,
    },
    Classification,
    IgnoreReason,
    Webhook,
};


/// Settings the pipeline itself needs, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Plex account whose listens are relayed
    pub tracked_user: String,
}

/// What became of one webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Relayed { listen: ListenRecord, report: DispatchReport },
}

/// Webhook to tracking services: classify, extract, enrich, normalize, dispatch
pub struct Relay {
    config: RelayConfig,
    enricher: Box<dyn MetadataEnricher>,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(config: RelayConfig, enricher: Box<dyn MetadataEnricher>, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            enricher,
            dispatcher,
        }
    }

    pub fn config(&self) -> &RelayConfig { &self.config }

    pub fn dispatcher(&self) -> &Dispatcher { &self.dispatcher }

    /// Runs one webhook through the pipeline. Nothing in here fails the request;
    /// every problem is logged where it happens.
    pub async fn handle(&self, webhook: &Webhook) -> Outcome {
        let status = match classify(webhook, &self.config.tracked_user) {
            Classification::Listen(status) => status,
            Classification::Ignored(reason) => {
                info!("Ignoring webhook: {reason}");
                return Outcome::Ignored(reason);
            },
        };

        let track = webhook.track_info();
        let enrichment = if status.is_submittable() {
            self.enricher.enrich(webhook).await
        } else {
            Enrichment::default()
        };
        let listen = normalize(status, track, enrichment, OffsetDateTime::now_utc());

        let report = self.dispatcher.dispatch(&listen).await;
        Outcome::Relayed { listen, report }
    }
}
