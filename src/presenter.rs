use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    animation::tween::{FrameTicker, IntervalTicker},
    assets::cache::{AssetCache, CacheEntry, CacheInfo},
    assets::fetch::AssetFetcher,
    broadcast::orchestrator::{Orchestrator, TriggerEvent},
    broadcast::transport::{Action, BroadcastTransport, Subscription, channel_name},
    config::PresenterConfig,
    foundation::clock::{Clock, SystemClock},
    foundation::core::ClientId,
    foundation::error::CuecastResult,
    playback::payload::BroadcastPayload,
    playback::queue::{PlayQueue, PlaybackRecord, SubmitOutcome},
    playback::sequencer::{PlaybackState, Sequencer, SequencerParts},
    render::addon::OverlayAddon,
    render::audio::AudioSink,
    render::host::{SurfaceHost, Viewport},
    session::lifecycle::{SessionEvent, SessionLifecycle, SessionReport},
};

/// Everything a [`Presenter`] talks to.
pub struct PresenterDeps {
    pub client_id: ClientId,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub transport: Arc<dyn BroadcastTransport>,
    pub host: Arc<dyn SurfaceHost>,
    pub audio: Arc<dyn AudioSink>,
    pub addons: Vec<Arc<dyn OverlayAddon>>,
    /// Defaults to a [`SystemClock`] with the configured offset.
    pub clock: Option<Arc<dyn Clock>>,
    /// Defaults to an [`IntervalTicker`] at the configured frame rate.
    pub ticker: Option<Box<dyn FrameTicker>>,
}

/// One client's presentation engine: cache, playback, queue, transport and session handling
/// behind an explicit [`start`](Self::start)/[`shutdown`](Self::shutdown) lifecycle.
pub struct Presenter {
    config: PresenterConfig,
    client_id: ClientId,
    clock: Arc<dyn Clock>,
    cache: Arc<AssetCache>,
    sequencer: Arc<Sequencer>,
    queue: Arc<PlayQueue>,
    orchestrator: Orchestrator,
    sessions: SessionLifecycle,
    transport: Arc<dyn BroadcastTransport>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("client_id", &self.client_id)
            .field("queue", &self.queue)
            .field("running", &!self.tasks.lock().is_empty())
            .finish()
    }
}

impl Presenter {
    /// Wire up a presenter. Must run inside a tokio runtime when the default ticker is used.
    pub fn new(config: PresenterConfig, deps: PresenterDeps) -> CuecastResult<Self> {
        config.validate()?;

        let clock: Arc<dyn Clock> = match deps.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock::with_offset(config.clock_offset_ms)),
        };
        let ticker: Box<dyn FrameTicker> = match deps.ticker {
            Some(ticker) => ticker,
            None => Box::new(IntervalTicker::new(config.frames)),
        };
        let cache = Arc::new(AssetCache::new(deps.fetcher, Arc::clone(&clock)));
        let sequencer = Arc::new(Sequencer::new(
            SequencerParts {
                cache: Arc::clone(&cache),
                host: deps.host,
                audio: deps.audio,
                clock: Arc::clone(&clock),
                ticker,
                addons: deps.addons,
            },
            &config,
        ));
        let queue = Arc::new(PlayQueue::new(
            Arc::clone(&sequencer),
            Arc::clone(&clock),
            config.queue.clone(),
        ));
        let orchestrator = Orchestrator::new(
            Arc::clone(&deps.transport),
            Arc::clone(&clock),
            config.broadcast.clone(),
        );

        Ok(Self {
            sessions: SessionLifecycle::new(Arc::clone(&cache)),
            config,
            client_id: deps.client_id,
            clock,
            cache,
            sequencer,
            queue,
            orchestrator,
            transport: deps.transport,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to the transport and start the queue worker. Must run inside a tokio runtime.
    /// Calling it again while started is a no-op.
    pub fn start(&self) -> CuecastResult<()> {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return Ok(());
        }

        let ns = &self.config.broadcast.namespace;
        let plays = self.transport.subscribe(&channel_name(ns, Action::PLAY))?;
        let preloads = self.transport.subscribe(&channel_name(ns, Action::PRELOAD))?;

        tasks.push(tokio::spawn(Arc::clone(&self.queue).run()));
        tasks.push(tokio::spawn(receive_plays(
            plays,
            self.client_id.clone(),
            Arc::clone(&self.queue),
        )));
        tasks.push(tokio::spawn(receive_preloads(
            preloads,
            Arc::clone(&self.cache),
        )));
        info!(client = %self.client_id.0, namespace = %ns, "presenter started");
        Ok(())
    }

    /// Stop receiving and playing, then release the overlay from the host.
    pub async fn shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        self.sequencer.detach_overlay().await;
        info!(client = %self.client_id.0, "presenter shut down");
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    /// Fetch and decode `locator` under `key`. Resolves once the key is resolved or a miss.
    pub async fn preload(&self, key: &str, locator: &str) -> Arc<CacheEntry> {
        self.cache.preload(key, locator, None).await
    }

    /// Play on this client only, without the transport. A start that is already due is held back
    /// by the queue's restamp delay so a quick repeat can still coalesce with it.
    pub fn play(&self, payload: BroadcastPayload) -> SubmitOutcome {
        self.queue.submit_local(payload)
    }

    /// Send `payload` to every addressed client, this one included, with a fresh start time.
    pub async fn broadcast(&self, payload: BroadcastPayload) -> CuecastResult<BroadcastPayload> {
        self.orchestrator.broadcast(payload).await
    }

    pub async fn trigger(&self, event: &TriggerEvent) -> CuecastResult<BroadcastPayload> {
        self.orchestrator.trigger(event).await
    }

    /// Ask every client to prefetch `locator` under `key`.
    pub async fn announce_preload(&self, key: &str, locator: &str) -> CuecastResult<()> {
        self.orchestrator.announce_preload(key, locator).await
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }

    /// Forget `key` (resolved or miss) so the next preload fetches it again.
    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    pub async fn handle_session_event(&self, event: SessionEvent) -> SessionReport {
        self.sessions.handle(event).await
    }

    pub fn viewport_changed(&self, viewport: Viewport) {
        self.sequencer.viewport_changed(viewport);
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    pub fn pending_plays(&self) -> usize {
        self.queue.len()
    }

    /// Finished playbacks on this client.
    pub fn playbacks(&self) -> broadcast::Receiver<PlaybackRecord> {
        self.queue.subscribe()
    }
}

async fn receive_plays(mut sub: Subscription, client: ClientId, queue: Arc<PlayQueue>) {
    while let Some(message) = sub.recv().await {
        let payload = match Action::from_value(message) {
            Ok(Action::Play(payload)) => payload,
            Ok(other) => {
                debug!(action = other.name(), "unexpected action on play channel");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "discarding malformed play message");
                continue;
            }
        };
        if !payload.is_addressed_to(&client) {
            debug!(asset = %payload.asset_key, "payload not addressed to this client");
            continue;
        }
        queue.submit(payload);
    }
}

async fn receive_preloads(mut sub: Subscription, cache: Arc<AssetCache>) {
    while let Some(message) = sub.recv().await {
        match Action::from_value(message) {
            Ok(Action::Preload { key, locator }) => {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache.preload(&key, &locator, None).await;
                });
            }
            Ok(other) => debug!(action = other.name(), "unexpected action on preload channel"),
            Err(e) => warn!(error = %e, "discarding malformed preload message"),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/presenter.rs"]
mod tests;
