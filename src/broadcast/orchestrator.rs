use std::sync::Arc;

use tracing::info;

use crate::{
    broadcast::transport::{Action, BroadcastTransport, channel_name},
    config::BroadcastOpts,
    foundation::clock::Clock,
    foundation::core::{ClientId, Point},
    foundation::error::CuecastResult,
    playback::payload::{BroadcastPayload, Outcome, TimingOverrides, VisualParams},
};

/// Cache key of a subject's effect sprite.
pub fn asset_key(subject: &str, effect: &str) -> String {
    format!("{subject}:{effect}")
}

/// Discrete event from a rule engine that should become a synchronized effect.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TriggerEvent {
    pub subject: String,
    /// Effect type; selects which of the subject's declared resources to show.
    pub effect: String,
    pub sfx_key: Option<String>,
    pub outcome: Option<Outcome>,
    pub target: Option<Point>,
    pub shake: Option<f64>,
    pub timings: TimingOverrides,
    /// Restrict delivery; everyone when `None`.
    pub recipients: Option<Vec<ClientId>>,
}

impl TriggerEvent {
    pub fn new(subject: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            effect: effect.into(),
            ..Self::default()
        }
    }

    pub fn asset_key(&self) -> String {
        asset_key(&self.subject, &self.effect)
    }
}

/// Sender side: stamps payloads with a shared start time and publishes them.
///
/// Holds no state beyond its collaborators.
pub struct Orchestrator {
    transport: Arc<dyn BroadcastTransport>,
    clock: Arc<dyn Clock>,
    opts: BroadcastOpts,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").field("opts", &self.opts).finish()
    }
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn BroadcastTransport>, clock: Arc<dyn Clock>, opts: BroadcastOpts) -> Self {
        Self {
            transport,
            clock,
            opts,
        }
    }

    pub fn opts(&self) -> &BroadcastOpts {
        &self.opts
    }

    /// `start = now + slack`, `expiry = start + ttl`.
    pub fn stamp(&self, mut payload: BroadcastPayload) -> BroadcastPayload {
        let start = self.clock.now().plus_ms(self.opts.slack_ms);
        payload.start_timestamp = start;
        payload.expiry_timestamp = start.plus_ms(self.opts.ttl_ms);
        payload
    }

    /// Unstamped payload for `event`.
    pub fn payload_for(&self, event: &TriggerEvent) -> BroadcastPayload {
        let visual = VisualParams {
            outcome: event.outcome,
            target: event.target,
            shake: event.shake,
            timings: event.timings.clone(),
        };
        let mut payload = BroadcastPayload::new(event.asset_key(), self.clock.now(), self.opts.ttl_ms)
            .with_visual(visual);
        payload.sfx_key = event.sfx_key.clone();
        payload.recipients = event.recipients.clone();
        payload
    }

    /// Stamp `payload` with a fresh start time and send it to every addressed client.
    #[tracing::instrument(skip(self, payload), fields(asset = %payload.asset_key))]
    pub async fn broadcast(&self, payload: BroadcastPayload) -> CuecastResult<BroadcastPayload> {
        let payload = self.stamp(payload);
        let message = Action::Play(payload.clone()).to_value()?;
        self.transport
            .publish(&channel_name(&self.opts.namespace, Action::PLAY), message)
            .await?;
        info!(start = payload.start_timestamp.0, "effect broadcast");
        Ok(payload)
    }

    pub async fn trigger(&self, event: &TriggerEvent) -> CuecastResult<BroadcastPayload> {
        self.broadcast(self.payload_for(event)).await
    }

    /// Ask every client to prefetch `locator` under `key`.
    pub async fn announce_preload(&self, key: &str, locator: &str) -> CuecastResult<()> {
        let message = Action::Preload {
            key: key.to_string(),
            locator: locator.to_string(),
        }
        .to_value()?;
        self.transport
            .publish(&channel_name(&self.opts.namespace, Action::PRELOAD), message)
            .await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/broadcast/orchestrator.rs"]
mod tests;
