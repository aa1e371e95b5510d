use super::*;
use crate::assets::fetch::StaticFetcher;
use crate::broadcast::transport::LocalBus;
use crate::foundation::error::CuecastError;
use crate::render::audio::NullAudioSink;
use crate::render::host::OverlayFrame;

struct Headless;

impl SurfaceHost for Headless {
    fn viewport(&self) -> Option<Viewport> {
        None
    }

    fn attach_overlay(&self) -> CuecastResult<()> {
        Ok(())
    }

    fn present(&self, _frame: &OverlayFrame) {}

    fn detach_overlay(&self) {}
}

fn deps(bus: Arc<LocalBus>) -> PresenterDeps {
    PresenterDeps {
        client_id: ClientId::new("alice"),
        fetcher: Arc::new(StaticFetcher::new()),
        transport: bus,
        host: Arc::new(Headless),
        audio: Arc::new(NullAudioSink),
        addons: Vec::new(),
        clock: None,
        ticker: None,
    }
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = PresenterConfig::default();
    config.broadcast.namespace = String::new();
    let err = Presenter::new(config, deps(Arc::new(LocalBus::default()))).unwrap_err();
    assert!(matches!(err, CuecastError::Validation(_)));
}

#[tokio::test]
async fn start_is_idempotent_and_shutdown_unsubscribes() {
    let bus = Arc::new(LocalBus::default());
    let presenter = Presenter::new(PresenterConfig::default(), deps(bus.clone())).unwrap();
    assert_eq!(presenter.playback_state(), PlaybackState::Idle);

    presenter.start().unwrap();
    presenter.start().unwrap();
    assert_eq!(bus.subscriber_count("cuecast.play"), 1);
    assert_eq!(bus.subscriber_count("cuecast.preload"), 1);

    presenter.shutdown().await;
    assert_eq!(bus.subscriber_count("cuecast.play"), 0);

    presenter.start().unwrap();
    assert_eq!(bus.subscriber_count("cuecast.play"), 1);
    presenter.shutdown().await;
}

#[tokio::test]
async fn misses_show_up_in_cache_info_until_invalidated() {
    let presenter =
        Presenter::new(PresenterConfig::default(), deps(Arc::new(LocalBus::default()))).unwrap();
    let entry = presenter.preload("hero:triumph", "hero.png").await;
    assert!(!entry.is_resolved());

    let info = presenter.cache_info();
    assert_eq!(info.size, 1);
    assert_eq!(info.misses, 1);

    assert!(presenter.invalidate("hero:triumph"));
    assert!(!presenter.invalidate("hero:triumph"));
    assert_eq!(presenter.cache_info().size, 0);
}

#[tokio::test]
async fn config_offset_drives_the_default_clock() {
    let mut config = PresenterConfig::default();
    config.clock_offset_ms = 60_000;
    let ahead = Presenter::new(config, deps(Arc::new(LocalBus::default()))).unwrap();
    let plain =
        Presenter::new(PresenterConfig::default(), deps(Arc::new(LocalBus::default()))).unwrap();
    let skew = plain.clock().now().ms_until(ahead.clock().now());
    assert!((59_000..=61_000).contains(&skew));
}
