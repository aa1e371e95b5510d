use crate::{
    animation::ease::Ease,
    foundation::core::{ClientId, Point, Timestamp},
    foundation::math::Fnv1a64,
};

/// Result flavor of the triggering event; may swap the audio cue.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Emphatic,
    Positive,
    Neutral,
    Negative,
}

/// Per-call overrides of [`PlaybackTimings`](crate::PlaybackTimings). `None` keeps the configured
/// value.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingOverrides {
    pub dim_in_ms: Option<u64>,
    pub dim_alpha: Option<f64>,
    pub flash_delay_ms: Option<u64>,
    pub flash_ms: Option<u64>,
    pub flash_peak: Option<f64>,
    pub slide_in_delay_ms: Option<u64>,
    pub slide_in_ms: Option<u64>,
    pub slide_ease: Option<Ease>,
    pub hold_ms: Option<u64>,
    pub slide_out_ms: Option<u64>,
    pub fade_out_ms: Option<u64>,
    pub dim_out_ms: Option<u64>,
}

/// How the effect should look on every client.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisualParams {
    pub outcome: Option<Outcome>,
    /// Resting position of the subject in simulation space; viewport anchor when `None`.
    pub target: Option<Point>,
    /// Screen shake intensity in `[0, 1]` when the subject lands.
    pub shake: Option<f64>,
    pub timings: TimingOverrides,
}

/// Immutable description of one effect play, as sent over the broadcast transport.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BroadcastPayload {
    /// Absolute time at which every client should start the effect.
    pub start_timestamp: Timestamp,
    /// Cache key of the subject sprite.
    pub asset_key: String,
    /// Cache key of the audio cue.
    #[serde(default)]
    pub sfx_key: Option<String>,
    #[serde(default)]
    pub visual: VisualParams,
    /// Restrict delivery to these clients; everyone when `None`.
    #[serde(default)]
    pub recipients: Option<Vec<ClientId>>,
    /// Drop the payload if it has not started by this time.
    pub expiry_timestamp: Timestamp,
}

impl BroadcastPayload {
    pub fn new(asset_key: impl Into<String>, start: Timestamp, ttl_ms: u64) -> Self {
        Self {
            start_timestamp: start,
            asset_key: asset_key.into(),
            sfx_key: None,
            visual: VisualParams::default(),
            recipients: None,
            expiry_timestamp: start.plus_ms(ttl_ms),
        }
    }

    pub fn with_sfx(mut self, sfx_key: impl Into<String>) -> Self {
        self.sfx_key = Some(sfx_key.into());
        self
    }

    pub fn with_visual(mut self, visual: VisualParams) -> Self {
        self.visual = visual;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<ClientId>) -> Self {
        self.recipients = Some(recipients);
        self
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expiry_timestamp
    }

    pub fn is_addressed_to(&self, client: &ClientId) -> bool {
        self.recipients
            .as_ref()
            .is_none_or(|list| list.iter().any(|c| c == client))
    }

    /// Move the start to `start`. The expiry stays put, so a late restamp can leave it stale.
    pub fn restamped(mut self, start: Timestamp) -> Self {
        self.start_timestamp = start;
        self
    }

    /// Stable identity of what the payload shows, ignoring when it shows it.
    ///
    /// `start_timestamp` and `expiry_timestamp` are excluded, so re-sent or re-triggered copies of
    /// the same effect share a signature.
    pub fn signature(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_str(&self.asset_key);
        match &self.sfx_key {
            Some(k) => {
                h.write_u8(1);
                h.write_str(k);
            }
            None => h.write_u8(0),
        }
        let visual = serde_json::to_vec(&self.visual).unwrap_or_default();
        h.write_bytes(&visual);
        match &self.recipients {
            Some(list) => {
                let mut ids: Vec<&str> = list.iter().map(|c| c.0.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                h.write_u8(1);
                for id in ids {
                    h.write_str(id);
                }
            }
            None => h.write_u8(0),
        }
        h.finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/payload.rs"]
mod tests;
