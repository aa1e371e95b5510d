use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use tracing::{debug, info, warn};

use crate::{
    animation::ease::Ease,
    animation::tween::{FrameTicker, TweenReport, TweenSpec, TweenValue},
    assets::cache::AssetCache,
    assets::decode::{PreparedAsset, PreparedAudio},
    config::{PlaybackTimings, PresenterConfig},
    foundation::clock::{Clock, wait_until},
    foundation::core::{Point, Vec2},
    foundation::error::CuecastError,
    playback::payload::{BroadcastPayload, Outcome, VisualParams},
    render::addon::{AddonCapability, OverlayAddon},
    render::audio::AudioSink,
    render::host::{SpriteHandle, SurfaceHost, Viewport},
    render::overlay::{Overlay, OverlayProp, OverlayStyle},
};

/// Lifecycle of the single playback slot: `Idle -> Scheduled -> Running -> Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Waiting for the start timestamp.
    Scheduled,
    /// Animating. Always runs to completion.
    Running,
}

impl PlaybackState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Scheduled,
            2 => Self::Running,
            _ => Self::Idle,
        }
    }
}

/// Why a playback did not render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// Expired before or while waiting for its start.
    Stale,
    /// Sprite key absent from the cache or resolved to a miss.
    CacheMiss(String),
    /// Sprite key resolved to something that cannot be drawn (an audio cue).
    Unrenderable(String),
    /// The host has no drawable viewport.
    SurfaceUnavailable,
    /// The overlay could not be prepared.
    Stage(String),
}

/// Result of one playback hand-off. Never an error: failed effects just do not show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Aborted(AbortReason),
    /// Another playback was already in flight.
    Rejected,
}

/// Collaborators of a [`Sequencer`].
pub struct SequencerParts {
    pub cache: Arc<AssetCache>,
    pub host: Arc<dyn SurfaceHost>,
    pub audio: Arc<dyn AudioSink>,
    pub clock: Arc<dyn Clock>,
    pub ticker: Box<dyn FrameTicker>,
    pub addons: Vec<Arc<dyn OverlayAddon>>,
}

struct Rig {
    overlay: Option<Overlay>,
    ticker: Box<dyn FrameTicker>,
}

struct Cue {
    key: String,
    audio: PreparedAudio,
}

const SLIDE_IN_TRACK: usize = 1;

/// Drives one playback at a time against the persistent overlay.
///
/// Resources come only from [`AssetCache::get`]; nothing here fetches or decodes. The overlay is
/// attached on first use and hidden again after every playback, whatever the outcome.
pub struct Sequencer {
    state: AtomicU8,
    rig: tokio::sync::Mutex<Rig>,
    pending_viewport: parking_lot::Mutex<Option<Viewport>>,

    cache: Arc<AssetCache>,
    host: Arc<dyn SurfaceHost>,
    audio: Arc<dyn AudioSink>,
    clock: Arc<dyn Clock>,
    addons: Vec<Arc<dyn OverlayAddon>>,

    timings: PlaybackTimings,
    style: OverlayStyle,
    outcome_sfx: BTreeMap<Outcome, String>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("state", &self.state())
            .field("timings", &self.timings)
            .finish()
    }
}

/// Holds the playback slot; releases it on drop, including cancellation.
struct Flight<'a>(&'a AtomicU8);

impl<'a> Flight<'a> {
    fn acquire(state: &'a AtomicU8) -> Option<Self> {
        state
            .compare_exchange(
                PlaybackState::Idle as u8,
                PlaybackState::Scheduled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Self(state))
    }

    fn running(&self) {
        self.0.store(PlaybackState::Running as u8, Ordering::Release);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.0.store(PlaybackState::Idle as u8, Ordering::Release);
    }
}

/// Hides the overlay when dropped, so no exit path leaves it half visible.
struct ForceHide<'a>(&'a mut Overlay);

impl Drop for ForceHide<'_> {
    fn drop(&mut self) {
        self.0.hide_layer();
    }
}

impl Sequencer {
    pub fn new(parts: SequencerParts, config: &PresenterConfig) -> Self {
        Self {
            state: AtomicU8::new(PlaybackState::Idle as u8),
            rig: tokio::sync::Mutex::new(Rig {
                overlay: None,
                ticker: parts.ticker,
            }),
            pending_viewport: parking_lot::Mutex::new(None),
            cache: parts.cache,
            host: parts.host,
            audio: parts.audio,
            clock: parts.clock,
            addons: parts.addons,
            timings: config.timings.clone(),
            style: config.style,
            outcome_sfx: config.outcome_sfx.clone(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.state() == PlaybackState::Idle
    }

    /// Play `payload` once. Rejected without side effects while another playback is in flight.
    #[tracing::instrument(skip(self, payload), fields(asset = %payload.asset_key))]
    pub(crate) async fn play(&self, payload: BroadcastPayload) -> PlaybackOutcome {
        let Some(flight) = Flight::acquire(&self.state) else {
            debug!("playback already in flight; rejecting");
            return PlaybackOutcome::Rejected;
        };

        match self.run(&payload, &flight).await {
            Ok(report) => {
                info!(frames = report.frames, "playback completed");
                PlaybackOutcome::Completed
            }
            Err(reason) => {
                match &reason {
                    AbortReason::Stale => debug!("stale payload dropped"),
                    AbortReason::CacheMiss(key) => {
                        let err = CuecastError::cache_miss(key.as_str());
                        warn!(error = %err, "playback aborted");
                    }
                    AbortReason::SurfaceUnavailable => {
                        warn!(error = %CuecastError::SurfaceUnavailable, "playback skipped");
                    }
                    other => warn!(reason = ?other, "playback aborted"),
                }
                PlaybackOutcome::Aborted(reason)
            }
        }
    }

    async fn run(
        &self,
        payload: &BroadcastPayload,
        flight: &Flight<'_>,
    ) -> Result<TweenReport, AbortReason> {
        let clock = self.clock.as_ref();
        if payload.is_expired_at(clock.now()) {
            return Err(AbortReason::Stale);
        }
        let sprite = self.resolve_sprite(&payload.asset_key)?;
        let cue = self.resolve_cue(payload);

        wait_until(clock, payload.start_timestamp).await;
        if payload.is_expired_at(clock.now()) {
            return Err(AbortReason::Stale);
        }

        let mut rig = self.rig.lock().await;
        let Rig { overlay, ticker } = &mut *rig;
        let overlay = self.ready_overlay(overlay).map_err(|e| match e {
            CuecastError::SurfaceUnavailable => AbortReason::SurfaceUnavailable,
            other => AbortReason::Stage(other.to_string()),
        })?;

        flight.running();
        let shown = ForceHide(overlay);
        let report = self
            .run_stages(&mut *shown.0, &mut **ticker, sprite, cue, &payload.visual)
            .await;
        drop(shown);
        Ok(report)
    }

    fn resolve_sprite(&self, key: &str) -> Result<SpriteHandle, AbortReason> {
        let entry = self
            .cache
            .get(key)
            .filter(|e| e.is_resolved())
            .ok_or_else(|| AbortReason::CacheMiss(key.to_string()))?;
        let asset = entry
            .payload
            .clone()
            .ok_or_else(|| AbortReason::CacheMiss(key.to_string()))?;
        let size = asset
            .sprite_size()
            .ok_or_else(|| AbortReason::Unrenderable(key.to_string()))?;
        Ok(SpriteHandle {
            key: key.to_string(),
            asset,
            size,
        })
    }

    /// The outcome's substitute cue wins over the payload's own. A missing cue only mutes the
    /// effect.
    fn resolve_cue(&self, payload: &BroadcastPayload) -> Option<Cue> {
        let key = payload
            .visual
            .outcome
            .and_then(|o| self.outcome_sfx.get(&o))
            .or(payload.sfx_key.as_ref())?;

        let audio = self
            .cache
            .get(key)
            .and_then(|e| e.payload.as_ref().and_then(PreparedAsset::as_audio).cloned());
        match audio {
            Some(audio) => Some(Cue {
                key: key.clone(),
                audio,
            }),
            None => {
                warn!(sfx = %key, "audio cue not in cache; playing without sound");
                None
            }
        }
    }

    fn fire_cue(&self, cue: &Cue) {
        if let Err(e) = self.audio.play_cue(&cue.key, &cue.audio) {
            warn!(sfx = %cue.key, error = %e, "audio cue failed");
        }
    }

    fn ready_overlay<'a>(&self, slot: &'a mut Option<Overlay>) -> Result<&'a mut Overlay, CuecastError> {
        let viewport = self
            .host
            .viewport()
            .filter(Viewport::is_drawable)
            .ok_or(CuecastError::SurfaceUnavailable)?;
        if slot.is_none() {
            *slot = Some(Overlay::attach(
                Arc::clone(&self.host),
                self.addons.clone(),
                self.style,
            )?);
        }
        let Some(overlay) = slot.as_mut() else {
            return Err(CuecastError::SurfaceUnavailable);
        };
        if overlay.viewport() != viewport {
            overlay.resize(viewport);
        }
        self.pending_viewport.lock().take();
        Ok(overlay)
    }

    fn apply_pending_resize(&self, overlay: &mut Overlay) {
        if let Some(viewport) = self.pending_viewport.lock().take() {
            overlay.resize(viewport);
        }
    }

    async fn run_stages(
        &self,
        overlay: &mut Overlay,
        ticker: &mut dyn FrameTicker,
        sprite: SpriteHandle,
        cue: Option<Cue>,
        visual: &VisualParams,
    ) -> TweenReport {
        let t = self.timings.merged(&visual.timings);
        let clock = self.clock.as_ref();
        let mut report = TweenReport::default();

        overlay.set_sprite(sprite);
        let viewport = overlay.viewport();
        let size = overlay.sprite_display_size();
        let target = visual.target.map_or_else(
            || {
                Point::new(
                    viewport.size.width * t.anchor_x,
                    viewport.size.height * t.anchor_y,
                )
            },
            |sim| viewport.to_device(sim),
        );
        let enter = Vec2::new(-size.width / 2.0, target.y);
        let rest = target.to_vec2();
        let exit = Vec2::new(viewport.size.width + size.width / 2.0, target.y);

        overlay.set(OverlayProp::SpritePosition, TweenValue::Vector2(enter));
        overlay.show_layer();

        debug!(stage = "dim_in");
        let r = overlay
            .tween_scalar(
                ticker,
                clock,
                OverlayProp::DimAlpha,
                TweenSpec::new(0.0, t.dim_alpha, t.dim_in_ms, Ease::OutQuad),
            )
            .await;
        report.frames += r.frames;
        self.apply_pending_resize(overlay);

        debug!(stage = "entrance");
        let tracks = [
            (
                OverlayProp::FlashAlpha,
                TweenSpec::new(0.0, t.flash_peak, t.flash_ms, Ease::OutQuad)
                    .delayed(t.flash_delay_ms)
                    .pulse()
                    .into_track(),
            ),
            (
                OverlayProp::SpritePosition,
                TweenSpec::new(enter, rest, t.slide_in_ms, t.slide_ease)
                    .delayed(t.slide_in_delay_ms)
                    .into_track(),
            ),
        ];
        let r = overlay
            .animate(ticker, clock, &tracks, |_, index| {
                if index == SLIDE_IN_TRACK
                    && let Some(cue) = &cue
                {
                    self.fire_cue(cue);
                }
            })
            .await;
        report.frames += r.frames;

        let shake = visual.shake.filter(|i| *i > 0.0).map(|i| i.min(1.0));
        if let Some(intensity) = shake {
            overlay.drive_addons(AddonCapability::ScreenShake, intensity);
        }

        debug!(stage = "hold", hold_ms = t.hold_ms);
        wait_until(clock, clock.now().plus_ms(t.hold_ms)).await;
        if shake.is_some() {
            overlay.drive_addons(AddonCapability::ScreenShake, 0.0);
        }
        self.apply_pending_resize(overlay);

        debug!(stage = "exit");
        let tracks = [
            (
                OverlayProp::SpritePosition,
                TweenSpec::new(rest, exit, t.slide_out_ms, Ease::InCubic).into_track(),
            ),
            (
                OverlayProp::SpriteOpacity,
                TweenSpec::new(1.0, 0.0, t.fade_out_ms, Ease::Linear).into_track(),
            ),
        ];
        let r = overlay.animate(ticker, clock, &tracks, |_, _| {}).await;
        report.frames += r.frames;

        debug!(stage = "dim_out");
        let r = overlay
            .tween_scalar(
                ticker,
                clock,
                OverlayProp::DimAlpha,
                TweenSpec::new(t.dim_alpha, 0.0, t.dim_out_ms, Ease::InQuad),
            )
            .await;
        report.frames += r.frames;
        report
    }

    /// Relayout the overlay for a new host size. Applied between stages while a playback runs.
    pub fn viewport_changed(&self, viewport: Viewport) {
        match self.rig.try_lock() {
            Ok(mut rig) => {
                if let Some(overlay) = rig.overlay.as_mut() {
                    overlay.resize(viewport);
                }
            }
            Err(_) => *self.pending_viewport.lock() = Some(viewport),
        }
    }

    pub async fn has_overlay(&self) -> bool {
        self.rig.lock().await.overlay.is_some()
    }

    /// Release the overlay from the host. The next playback attaches a fresh one.
    pub async fn detach_overlay(&self) {
        if let Some(overlay) = self.rig.lock().await.overlay.take() {
            overlay.detach();
            debug!("overlay detached");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/sequencer.rs"]
mod tests;
