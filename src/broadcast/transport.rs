//! Namespaced publish/subscribe delivery between clients.
//!
//! Delivery is at-least-once and unordered across channels. Messages are plain JSON values so any
//! transport can carry them; [`Action`] is the typed view both ends agree on.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    foundation::error::{CuecastError, CuecastResult},
    playback::payload::BroadcastPayload,
};

/// A message understood by presenters. Each variant travels on its own channel.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum Action {
    /// Play an effect on every addressed client.
    Play(BroadcastPayload),
    /// Ask every client to prefetch a resource declared after the session started.
    Preload { key: String, locator: String },
}

impl Action {
    pub const PLAY: &'static str = "play";
    pub const PRELOAD: &'static str = "preload";

    pub fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => Self::PLAY,
            Self::Preload { .. } => Self::PRELOAD,
        }
    }

    pub fn to_value(&self) -> CuecastResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: serde_json::Value) -> CuecastResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Channel name of `action` under `namespace`.
pub fn channel_name(namespace: &str, action: &str) -> String {
    format!("{namespace}.{action}")
}

/// Stream of messages from one channel.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<serde_json::Value>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, rx: broadcast::Receiver<serde_json::Value>) -> Self {
        Self {
            channel: channel.into(),
            rx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next message, or `None` once the transport has shut the channel.
    ///
    /// A slow subscriber skips what it missed rather than failing.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "subscriber lagged; messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(channel = %self.channel, "channel closed");
                    return None;
                }
            }
        }
    }
}

/// Pub/sub delivery to all connected clients.
#[async_trait::async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// Deliver `message` to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, message: serde_json::Value) -> CuecastResult<()>;

    /// Start receiving `channel`. Only messages published afterwards are delivered.
    fn subscribe(&self, channel: &str) -> CuecastResult<Subscription>;
}

/// In-process transport: every presenter sharing one `LocalBus` sees the others' messages.
#[derive(Debug)]
pub struct LocalBus {
    channels: Mutex<HashMap<String, broadcast::Sender<serde_json::Value>>>,
    capacity: usize,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<serde_json::Value> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop every channel; subscribers observe the end of their stream.
    pub fn close(&self) {
        self.channels.lock().clear();
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for LocalBus {
    async fn publish(&self, channel: &str, message: serde_json::Value) -> CuecastResult<()> {
        if channel.trim().is_empty() {
            return Err(CuecastError::transport("channel name must be non-empty"));
        }
        match self.sender(channel).send(message) {
            Ok(receivers) => debug!(channel, receivers, "message published"),
            Err(_) => debug!(channel, "message published with no subscribers"),
        }
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> CuecastResult<Subscription> {
        if channel.trim().is_empty() {
            return Err(CuecastError::transport("channel name must be non-empty"));
        }
        Ok(Subscription::new(channel, self.sender(channel).subscribe()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/broadcast/transport.rs"]
mod tests;
