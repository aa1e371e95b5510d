use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::*;
use crate::animation::ease::Ease;
use crate::animation::tween::IntervalTicker;
use crate::assets::decode::{PreparedAsset, PreparedImage};
use crate::foundation::clock::SystemClock;
use crate::foundation::core::Fps;

#[derive(Default)]
struct Host {
    viewport: Mutex<Option<Viewport>>,
    attached: AtomicU32,
    detached: AtomicU32,
    frames: Mutex<Vec<OverlayFrame>>,
}

impl Host {
    fn ready(w: f64, h: f64) -> Arc<Self> {
        let host = Self::default();
        *host.viewport.lock() = Some(Viewport::new(w, h));
        Arc::new(host)
    }

    fn last(&self) -> OverlayFrame {
        self.frames.lock().last().cloned().unwrap()
    }
}

impl SurfaceHost for Host {
    fn viewport(&self) -> Option<Viewport> {
        *self.viewport.lock()
    }

    fn attach_overlay(&self) -> CuecastResult<()> {
        self.attached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn present(&self, frame: &OverlayFrame) {
        self.frames.lock().push(frame.clone());
    }

    fn detach_overlay(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}

struct Bloom {
    seen: Mutex<Vec<f64>>,
}

impl OverlayAddon for Bloom {
    fn name(&self) -> &str {
        "bloom"
    }

    fn supports(&self, capability: AddonCapability) -> Support {
        match capability {
            AddonCapability::FlashBloom => Support::Supported,
            AddonCapability::ScreenShake => Support::Unsupported,
        }
    }

    fn apply(&self, capability: AddonCapability, intensity: f64) -> CuecastResult<()> {
        assert_eq!(capability, AddonCapability::FlashBloom);
        self.seen.lock().push(intensity);
        Ok(())
    }
}

fn sprite(w: u32, h: u32) -> SpriteHandle {
    SpriteHandle {
        key: "hero:triumph".to_string(),
        asset: PreparedAsset::Image(PreparedImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(vec![0; (w * h * 4) as usize]),
        }),
        size: Size::new(f64::from(w), f64::from(h)),
    }
}

#[test]
fn attach_requires_a_drawable_viewport() {
    let host = Arc::new(Host::default());
    let err = Overlay::attach(host.clone(), vec![], OverlayStyle::default()).unwrap_err();
    assert!(matches!(err, CuecastError::SurfaceUnavailable));
    assert_eq!(host.attached.load(Ordering::SeqCst), 0);

    *host.viewport.lock() = Some(Viewport::new(0.0, 600.0));
    assert!(Overlay::attach(host.clone(), vec![], OverlayStyle::default()).is_err());
}

#[test]
fn hide_resets_every_layer() {
    let host = Host::ready(800.0, 600.0);
    let mut overlay = Overlay::attach(host.clone(), vec![], OverlayStyle::default()).unwrap();
    overlay.set_sprite(sprite(100, 100));
    overlay.show_layer();
    overlay.set(OverlayProp::DimAlpha, TweenValue::Scalar(0.7));
    overlay.set(OverlayProp::FlashAlpha, TweenValue::Scalar(0.9));
    overlay.present();
    assert!(host.last().visible);
    assert_eq!(host.last().dim.alpha, 0.7);

    overlay.hide_layer();
    let f = host.last();
    assert!(!f.visible);
    assert_eq!(f.dim.alpha, 0.0);
    assert_eq!(f.flash.alpha, 0.0);
    assert!(f.sprite.is_none());
    assert_eq!(host.attached.load(Ordering::SeqCst), 1);
}

#[test]
fn tall_sprites_are_fitted_to_the_viewport() {
    let host = Host::ready(800.0, 500.0);
    let mut overlay = Overlay::attach(host, vec![], OverlayStyle::default()).unwrap();
    overlay.set_sprite(sprite(200, 600));
    let size = overlay.sprite_display_size();
    assert_eq!(size.height, 300.0);
    assert_eq!(size.width, 100.0);

    overlay.set_sprite(sprite(50, 40));
    assert_eq!(overlay.sprite_display_size(), Size::new(50.0, 40.0));
}

#[test]
fn resize_redraws_only_when_visible() {
    let host = Host::ready(800.0, 600.0);
    let mut overlay = Overlay::attach(host.clone(), vec![], OverlayStyle::default()).unwrap();
    overlay.resize(Viewport::new(1024.0, 768.0));
    assert!(host.frames.lock().is_empty());

    overlay.show_layer();
    overlay.resize(Viewport::new(640.0, 480.0));
    assert_eq!(host.last().dim.rect, Rect::new(0.0, 0.0, 640.0, 480.0));

    overlay.resize(Viewport::new(0.0, 0.0));
    assert_eq!(overlay.viewport().size, Size::new(640.0, 480.0));
}

#[test]
fn unsupported_capabilities_are_skipped() {
    let host = Host::ready(800.0, 600.0);
    let bloom = Arc::new(Bloom {
        seen: Mutex::new(Vec::new()),
    });
    let addons: Vec<Arc<dyn OverlayAddon>> = vec![bloom.clone()];
    let mut overlay = Overlay::attach(host, addons, OverlayStyle::default()).unwrap();

    overlay.set(OverlayProp::FlashAlpha, TweenValue::Scalar(0.5));
    overlay.drive_addons(AddonCapability::ScreenShake, 1.0);
    overlay.hide_layer();
    assert_eq!(*bloom.seen.lock(), vec![0.5, 0.0]);
}

#[tokio::test(start_paused = true)]
async fn animate_presents_each_frame_and_lands_on_targets() {
    let host = Host::ready(800.0, 600.0);
    let mut overlay = Overlay::attach(host.clone(), vec![], OverlayStyle::default()).unwrap();
    let clock = SystemClock::new();
    let mut ticker = IntervalTicker::new(Fps::new(50, 1).unwrap());
    overlay.set_sprite(sprite(100, 100));
    overlay.show_layer();

    let mut started = Vec::new();
    overlay
        .animate(
            &mut ticker,
            &clock,
            &[
                (
                    OverlayProp::DimAlpha,
                    TweenSpec::new(0.0, 0.6, 100, Ease::Linear).into_track(),
                ),
                (
                    OverlayProp::SpritePosition,
                    TweenSpec::new(Vec2::new(-50.0, 300.0), Vec2::new(400.0, 300.0), 200, Ease::OutBack)
                        .delayed(100)
                        .into_track(),
                ),
            ],
            |_, index| started.push(index),
        )
        .await;

    assert_eq!(started, vec![0, 1]);
    let f = host.last();
    assert_eq!(f.dim.alpha, 0.6);
    let rect = f.sprite.unwrap().rect;
    assert_eq!(rect.center(), Point::new(400.0, 300.0));
    assert!(host.frames.lock().len() > 10);

    overlay.detach();
    assert_eq!(host.detached.load(Ordering::SeqCst), 1);
}
