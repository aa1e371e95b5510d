//! Cuecast plays short, synchronized audiovisual effects on every client of a shared session.
//!
//! A trigger on one client becomes a [`BroadcastPayload`] carrying an absolute start time. Each
//! receiving client waits for that moment on its own clock and runs the same overlay animation
//! (dim, flash, subject slide-in with an audio cue, hold, slide-out), so small delivery delays are
//! absorbed by the wait instead of showing up as drift.
//!
//! # Flow
//!
//! 1. **Session start**: declared resources are fetched and decoded into the [`AssetCache`].
//! 2. **Trigger**: the [`Orchestrator`] stamps `start = now + slack` and publishes the payload.
//! 3. **Receive**: the [`PlayQueue`] admits, coalesces or queues it.
//! 4. **Play**: the [`Sequencer`] waits for the start time and animates the persistent
//!    [`Overlay`] from cached resources only.
//! 5. **Session end**: the session's own cache entries are evicted.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **No IO during playback**: fetch and decode happen in preload; playback only reads the cache.
//! - **Single flight**: at most one playback runs per client; everything else waits in the queue.
//! - **Failures stay cosmetic**: a missing resource or surface skips the effect and logs.
//!
//! [`Presenter`] wires all of it behind one `start`/`shutdown` lifecycle.
#![forbid(unsafe_code)]

mod animation;
mod assets;
mod broadcast;
mod config;
mod foundation;
mod playback;
mod presenter;
mod render;
mod session;

pub use animation::ease::Ease;
pub use animation::tween::{
    FrameTicker, IntervalTicker, Lerp, TrackSample, TweenReport, TweenSpec, TweenTrack,
    TweenValue, tween_group, tween_scalar, tween_vector2,
};
pub use assets::cache::{AssetCache, CacheEntry, CacheInfo, EntryKind, PreloadRequest};
pub use assets::decode::{
    AssetKind, AudioFormat, PreparedAsset, PreparedAudio, PreparedImage, PreparedSvg,
    decode_asset, decode_image, parse_svg, sniff_audio,
};
pub use assets::fetch::{AssetFetcher, FsFetcher, StaticFetcher, normalize_rel_path};
pub use assets::scope::SessionScope;
pub use broadcast::orchestrator::{Orchestrator, TriggerEvent, asset_key};
pub use broadcast::transport::{Action, BroadcastTransport, LocalBus, Subscription, channel_name};
pub use config::{BroadcastOpts, PlaybackTimings, PresenterConfig, QueueOpts};
pub use foundation::clock::{Clock, SystemClock, wait_until};
pub use foundation::core::{
    Affine, ClientId, Fps, Point, Rect, Rgba8Premul, SessionId, Size, Timestamp, Vec2,
};
pub use foundation::error::{CuecastError, CuecastResult};
pub use playback::payload::{BroadcastPayload, Outcome, TimingOverrides, VisualParams};
pub use playback::queue::{PlayQueue, PlaybackRecord, SubmitOutcome, signature};
pub use playback::sequencer::{
    AbortReason, PlaybackOutcome, PlaybackState, Sequencer, SequencerParts,
};
pub use presenter::{Presenter, PresenterDeps};
pub use render::addon::{AddonCapability, OverlayAddon, Support};
pub use render::audio::{AudioSink, NullAudioSink};
pub use render::host::{
    LayerFrame, OverlayFrame, SpriteFrame, SpriteHandle, SurfaceHost, Viewport,
};
pub use render::overlay::{Overlay, OverlayProp, OverlayStyle};
pub use session::lifecycle::{
    EndReason, SessionEvent, SessionLifecycle, SessionReport, SessionStart, Subject,
};
