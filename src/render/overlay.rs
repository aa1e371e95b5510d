use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    animation::tween::{FrameTicker, TweenReport, TweenSpec, TweenTrack, TweenValue, tween_group},
    foundation::clock::Clock,
    foundation::core::{Point, Rect, Rgba8Premul, Size, Vec2},
    foundation::error::{CuecastError, CuecastResult},
    render::addon::{AddonCapability, OverlayAddon, Support},
    render::host::{LayerFrame, OverlayFrame, SpriteFrame, SpriteHandle, SurfaceHost, Viewport},
};

/// Animatable overlay properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayProp {
    DimAlpha,
    FlashAlpha,
    SpriteOpacity,
    /// Sprite center in device pixels.
    SpritePosition,
}

/// Look of the overlay's layers.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub dim_color: Rgba8Premul,
    pub flash_color: Rgba8Premul,
    /// Largest sprite height as a fraction of the viewport height.
    pub sprite_max_height: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            dim_color: Rgba8Premul::from_straight_rgba(0, 0, 0, 255),
            flash_color: Rgba8Premul::from_straight_rgba(255, 255, 255, 255),
            sprite_max_height: 0.6,
        }
    }
}

/// Persistent dim/flash/sprite overlay attached to the host surface.
///
/// Created once on first need and then reused by every playback. Between plays it is hidden, not
/// dropped.
pub struct Overlay {
    host: Arc<dyn SurfaceHost>,
    addons: Vec<Arc<dyn OverlayAddon>>,
    style: OverlayStyle,
    viewport: Viewport,

    visible: bool,
    dim_alpha: f64,
    flash_alpha: f64,
    sprite: Option<SpriteHandle>,
    sprite_center: Point,
    sprite_opacity: f64,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("viewport", &self.viewport)
            .field("visible", &self.visible)
            .field("dim_alpha", &self.dim_alpha)
            .field("flash_alpha", &self.flash_alpha)
            .field("sprite", &self.sprite.as_ref().map(|s| s.key.as_str()))
            .field("addons", &self.addons.len())
            .finish()
    }
}

impl Overlay {
    /// Attach the overlay's layers to `host`. Fails with
    /// [`CuecastError::SurfaceUnavailable`] while the host has no drawable viewport.
    pub fn attach(
        host: Arc<dyn SurfaceHost>,
        addons: Vec<Arc<dyn OverlayAddon>>,
        style: OverlayStyle,
    ) -> CuecastResult<Self> {
        let viewport = host
            .viewport()
            .filter(Viewport::is_drawable)
            .ok_or(CuecastError::SurfaceUnavailable)?;
        host.attach_overlay()?;
        debug!(width = viewport.size.width, height = viewport.size.height, "overlay attached");

        Ok(Self {
            host,
            addons,
            style,
            viewport,
            visible: false,
            dim_alpha: 0.0,
            flash_alpha: 0.0,
            sprite: None,
            sprite_center: Point::ORIGIN,
            sprite_opacity: 0.0,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show_layer(&mut self) {
        self.visible = true;
        self.present();
    }

    /// Hide and reset every layer, including add-on effects.
    pub fn hide_layer(&mut self) {
        self.visible = false;
        self.dim_alpha = 0.0;
        self.flash_alpha = 0.0;
        self.sprite_opacity = 0.0;
        self.sprite = None;
        for cap in [AddonCapability::FlashBloom, AddonCapability::ScreenShake] {
            self.drive_addons(cap, 0.0);
        }
        self.present();
    }

    pub fn set_sprite(&mut self, handle: SpriteHandle) {
        self.sprite = Some(handle);
        self.sprite_opacity = 1.0;
    }

    /// Display size of the current sprite after fitting it to the viewport.
    pub fn sprite_display_size(&self) -> Size {
        let Some(sprite) = &self.sprite else {
            return Size::ZERO;
        };
        let max_h = self.viewport.size.height * self.style.sprite_max_height;
        let scale = if sprite.size.height > max_h && sprite.size.height > 0.0 {
            max_h / sprite.size.height
        } else {
            1.0
        };
        Size::new(sprite.size.width * scale, sprite.size.height * scale)
    }

    /// Relayout for a new host size. Redraws immediately when visible.
    pub fn resize(&mut self, viewport: Viewport) {
        if !viewport.is_drawable() {
            warn!("ignoring resize to an empty viewport");
            return;
        }
        self.viewport = viewport;
        if self.visible {
            self.present();
        }
    }

    pub fn set(&mut self, prop: OverlayProp, value: TweenValue) {
        match (prop, value) {
            (OverlayProp::DimAlpha, TweenValue::Scalar(v)) => self.dim_alpha = v.clamp(0.0, 1.0),
            (OverlayProp::FlashAlpha, TweenValue::Scalar(v)) => {
                self.flash_alpha = v.clamp(0.0, 1.0);
                self.drive_addons(AddonCapability::FlashBloom, self.flash_alpha);
            }
            (OverlayProp::SpriteOpacity, TweenValue::Scalar(v)) => {
                self.sprite_opacity = v.clamp(0.0, 1.0);
            }
            (OverlayProp::SpritePosition, TweenValue::Vector2(v)) => {
                self.sprite_center = v.to_point();
            }
            (prop, value) => debug!(?prop, ?value, "ignoring mismatched overlay property"),
        }
    }

    /// Trigger a capability on every add-on that supports it.
    pub fn drive_addons(&self, capability: AddonCapability, intensity: f64) {
        for addon in &self.addons {
            if addon.supports(capability) == Support::Unsupported {
                continue;
            }
            if let Err(e) = addon.apply(capability, intensity) {
                warn!(addon = addon.name(), ?capability, error = %e, "overlay add-on failed");
            }
        }
    }

    pub fn frame(&self) -> OverlayFrame {
        let bounds = self.viewport.bounds();
        let sprite = self.sprite.as_ref().map(|handle| {
            let size = self.sprite_display_size();
            SpriteFrame {
                handle: handle.clone(),
                rect: Rect::from_center_size(self.sprite_center, size),
                opacity: self.sprite_opacity,
            }
        });
        OverlayFrame {
            visible: self.visible,
            dim: LayerFrame {
                rect: bounds,
                color: self.style.dim_color.with_opacity(self.dim_alpha),
                alpha: self.dim_alpha,
            },
            flash: LayerFrame {
                rect: bounds,
                color: self.style.flash_color.with_opacity(self.flash_alpha),
                alpha: self.flash_alpha,
            },
            sprite,
        }
    }

    pub fn present(&self) {
        self.host.present(&self.frame());
    }

    /// Run property tweens together, presenting once per frame. `on_start` receives the index of
    /// each track on its first frame.
    pub async fn animate<F>(
        &mut self,
        ticker: &mut dyn FrameTicker,
        clock: &dyn Clock,
        tracks: &[(OverlayProp, TweenTrack)],
        mut on_start: F,
    ) -> TweenReport
    where
        F: FnMut(&mut Self, usize),
    {
        let specs: Vec<TweenTrack> = tracks.iter().map(|(_, t)| *t).collect();
        tween_group(ticker, clock, &specs, |samples| {
            for s in samples {
                if s.just_started {
                    on_start(&mut *self, s.index);
                }
                self.set(tracks[s.index].0, s.value);
            }
            self.present();
        })
        .await
    }

    pub async fn tween_scalar(
        &mut self,
        ticker: &mut dyn FrameTicker,
        clock: &dyn Clock,
        prop: OverlayProp,
        spec: TweenSpec<f64>,
    ) -> TweenReport {
        self.animate(ticker, clock, &[(prop, spec.into_track())], |_, _| {})
            .await
    }

    pub async fn tween_vector2(
        &mut self,
        ticker: &mut dyn FrameTicker,
        clock: &dyn Clock,
        prop: OverlayProp,
        spec: TweenSpec<Vec2>,
    ) -> TweenReport {
        self.animate(ticker, clock, &[(prop, spec.into_track())], |_, _| {})
            .await
    }

    /// Release the overlay's layers on the host.
    pub fn detach(self) {
        self.host.detach_overlay();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
