use std::{collections::BTreeMap, path::Path};

use anyhow::Context;

use crate::{
    animation::ease::Ease,
    foundation::core::Fps,
    foundation::error::{CuecastError, CuecastResult},
    playback::payload::{Outcome, TimingOverrides},
    render::overlay::OverlayStyle,
};

/// Durations (ms), alphas and easing of the playback stage pipeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlaybackTimings {
    pub dim_in_ms: u64,
    /// Dim layer alpha reached by dim-in.
    pub dim_alpha: f64,
    /// Delay of the flash pulse, measured from the end of dim-in.
    pub flash_delay_ms: u64,
    pub flash_ms: u64,
    pub flash_peak: f64,
    /// Delay of the slide-in, measured from the end of dim-in.
    pub slide_in_delay_ms: u64,
    pub slide_in_ms: u64,
    pub slide_ease: Ease,
    pub hold_ms: u64,
    pub slide_out_ms: u64,
    pub fade_out_ms: u64,
    pub dim_out_ms: u64,
    /// Resting position of the subject as a fraction of the viewport, used when the payload has
    /// no explicit target.
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            dim_in_ms: 180,
            dim_alpha: 0.55,
            flash_delay_ms: 60,
            flash_ms: 220,
            flash_peak: 0.85,
            slide_in_delay_ms: 170,
            slide_in_ms: 420,
            slide_ease: Ease::OutBack,
            hold_ms: 1_200,
            slide_out_ms: 320,
            fade_out_ms: 320,
            dim_out_ms: 200,
            anchor_x: 0.5,
            anchor_y: 0.45,
        }
    }
}

impl PlaybackTimings {
    /// Apply per-call overrides on top of these timings.
    pub fn merged(&self, o: &TimingOverrides) -> Self {
        Self {
            dim_in_ms: o.dim_in_ms.unwrap_or(self.dim_in_ms),
            dim_alpha: o.dim_alpha.unwrap_or(self.dim_alpha),
            flash_delay_ms: o.flash_delay_ms.unwrap_or(self.flash_delay_ms),
            flash_ms: o.flash_ms.unwrap_or(self.flash_ms),
            flash_peak: o.flash_peak.unwrap_or(self.flash_peak),
            slide_in_delay_ms: o.slide_in_delay_ms.unwrap_or(self.slide_in_delay_ms),
            slide_in_ms: o.slide_in_ms.unwrap_or(self.slide_in_ms),
            slide_ease: o.slide_ease.unwrap_or(self.slide_ease),
            hold_ms: o.hold_ms.unwrap_or(self.hold_ms),
            slide_out_ms: o.slide_out_ms.unwrap_or(self.slide_out_ms),
            fade_out_ms: o.fade_out_ms.unwrap_or(self.fade_out_ms),
            dim_out_ms: o.dim_out_ms.unwrap_or(self.dim_out_ms),
            anchor_x: self.anchor_x,
            anchor_y: self.anchor_y,
        }
    }

    /// Wall time of one full playback, from dim-in to the end of dim-out.
    pub fn total_ms(&self) -> u64 {
        let entrance = (self.flash_delay_ms + self.flash_ms).max(self.slide_in_delay_ms + self.slide_in_ms);
        let exit = self.slide_out_ms.max(self.fade_out_ms);
        self.dim_in_ms + entrance + self.hold_ms + exit + self.dim_out_ms
    }

    pub fn validate(&self) -> CuecastResult<()> {
        for (name, v) in [
            ("dim_alpha", self.dim_alpha),
            ("flash_peak", self.flash_peak),
            ("anchor_x", self.anchor_x),
            ("anchor_y", self.anchor_y),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CuecastError::validation(format!(
                    "timings.{name} must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Coalescing and re-stamping behavior of the play queue.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QueueOpts {
    /// Same-signature requests arriving within this window replace the pending entry.
    pub coalesce_window_ms: u64,
    /// Lead time given to a queued entry whose start went stale while it waited.
    pub restamp_delay_ms: u64,
}

impl Default for QueueOpts {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 350,
            restamp_delay_ms: 150,
        }
    }
}

/// Sender-side payload construction.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BroadcastOpts {
    /// Transport channel namespace.
    pub namespace: String,
    /// `start = now + slack_ms`; absorbs delivery and dispatch jitter.
    pub slack_ms: u64,
    /// `expiry = start + ttl_ms`.
    pub ttl_ms: u64,
}

impl Default for BroadcastOpts {
    fn default() -> Self {
        Self {
            namespace: "cuecast".to_string(),
            slack_ms: 200,
            ttl_ms: 4_000,
        }
    }
}

/// Complete presenter configuration. Every section is optional in JSON.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub timings: PlaybackTimings,
    pub queue: QueueOpts,
    pub broadcast: BroadcastOpts,
    /// Rate of the built-in frame ticker.
    pub frames: Fps,
    pub style: OverlayStyle,
    /// Audio cue substituted for the payload's own cue when the outcome matches.
    pub outcome_sfx: BTreeMap<Outcome, String>,
    /// Static correction applied to the local clock (positive runs ahead).
    pub clock_offset_ms: i64,
}

impl PresenterConfig {
    pub fn from_json_str(s: &str) -> CuecastResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CuecastResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read presenter config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> CuecastResult<()> {
        if self.frames.num == 0 || self.frames.den == 0 {
            return Err(CuecastError::validation(
                "frames must have num>0 and den>0",
            ));
        }
        if self.broadcast.namespace.trim().is_empty() {
            return Err(CuecastError::validation(
                "broadcast.namespace must be non-empty",
            ));
        }
        if self.broadcast.ttl_ms == 0 {
            return Err(CuecastError::validation("broadcast.ttl_ms must be > 0"));
        }
        self.timings.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
