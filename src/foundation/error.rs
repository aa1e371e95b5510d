/// Convenience result type used across cuecast.
pub type CuecastResult<T> = Result<T, CuecastError>;

/// Top-level error taxonomy used by the presentation engine.
///
/// Most of these never reach a caller of the public async operations: preload failures become
/// [`Miss`](crate::EntryKind::Miss) entries and playback failures become
/// [`PlaybackOutcome::Aborted`](crate::PlaybackOutcome::Aborted). They exist so internal stages can
/// use `?` and so the outcome carries a readable reason.
#[derive(thiserror::Error, Debug)]
pub enum CuecastError {
    /// Invalid caller-provided data (locators, payloads, configuration).
    #[error("validation error: {0}")]
    Validation(String),

    /// A resource could not be fetched or decoded during preload.
    #[error("resource load failure for '{key}': {reason}")]
    ResourceLoad {
        /// Cache key being loaded.
        key: String,
        /// Human readable cause.
        reason: String,
    },

    /// A key was absent or resolved to a miss when playback needed it.
    #[error("cache miss at playback: '{0}'")]
    CacheMiss(String),

    /// The payload expired before it could start.
    #[error("stale message")]
    Stale,

    /// A playback is already in flight on this client.
    #[error("concurrent playback rejected")]
    ConcurrentPlayback,

    /// The host has no usable viewport yet.
    #[error("rendering surface unavailable")]
    SurfaceUnavailable,

    /// Errors from the broadcast transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CuecastError {
    /// Build a [`CuecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CuecastError::ResourceLoad`] value.
    pub fn resource_load(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceLoad {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`CuecastError::CacheMiss`] value.
    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::CacheMiss(key.into())
    }

    /// Build a [`CuecastError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`CuecastError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CuecastError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
