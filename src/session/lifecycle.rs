use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    assets::cache::{AssetCache, EntryKind, PreloadRequest},
    broadcast::orchestrator::asset_key,
    foundation::core::SessionId,
};

/// A participant whose effects may be shown during a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subject {
    pub id: String,
    /// Resource locator per effect type.
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resources: BTreeMap::new(),
        }
    }

    pub fn with_resource(mut self, effect: impl Into<String>, locator: impl Into<String>) -> Self {
        self.resources.insert(effect.into(), locator.into());
        self
    }
}

/// Declaration sent when a session begins.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionStart {
    pub session_id: SessionId,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Resources shared across sessions (sound cues, common sprites), keyed by cache key. These
    /// survive session eviction.
    #[serde(default)]
    pub shared: BTreeMap<String, String>,
}

impl SessionStart {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_shared(mut self, key: impl Into<String>, locator: impl Into<String>) -> Self {
        self.shared.insert(key.into(), locator.into());
        self
    }

    /// Keys owned by this session, one per declared subject resource.
    pub fn session_requests(&self) -> Vec<PreloadRequest> {
        self.subjects
            .iter()
            .flat_map(|s| {
                s.resources
                    .iter()
                    .map(|(effect, locator)| PreloadRequest::new(asset_key(&s.id, effect), locator))
            })
            .collect()
    }

    pub fn shared_requests(&self) -> Vec<PreloadRequest> {
        self.shared
            .iter()
            .map(|(key, locator)| PreloadRequest::new(key, locator))
            .collect()
    }
}

/// Why a session ended. Every reason leads to the same eviction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Ended,
    Deleted,
    Deactivated,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started(SessionStart),
    Ended {
        session_id: SessionId,
        reason: EndReason,
    },
}

/// What handling a [`SessionEvent`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionReport {
    Started {
        session_id: SessionId,
        resolved: usize,
        misses: usize,
        /// Entries released from a previous session that was still open.
        evicted: usize,
    },
    Ended {
        session_id: SessionId,
        released: usize,
    },
}

/// Binds cache contents to the one active session.
pub struct SessionLifecycle {
    cache: Arc<AssetCache>,
    active: Mutex<Option<SessionId>>,
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("active", &*self.active.lock())
            .finish()
    }
}

impl SessionLifecycle {
    pub fn new(cache: Arc<AssetCache>) -> Self {
        Self {
            cache,
            active: Mutex::new(None),
        }
    }

    pub fn active(&self) -> Option<SessionId> {
        self.active.lock().clone()
    }

    pub async fn handle(&self, event: SessionEvent) -> SessionReport {
        match event {
            SessionEvent::Started(start) => self.start(start).await,
            SessionEvent::Ended { session_id, reason } => {
                let released = self.end(&session_id, reason);
                SessionReport::Ended {
                    session_id,
                    released,
                }
            }
        }
    }

    /// Open the session's scope and preload everything it declares. Resolves once every key is
    /// either resolved or a miss.
    #[tracing::instrument(skip(self, start), fields(session = %start.session_id.0))]
    pub async fn start(&self, start: SessionStart) -> SessionReport {
        let previous = self.active.lock().replace(start.session_id.clone());
        let evicted = match previous {
            Some(prev) if prev != start.session_id => {
                info!(previous = %prev.0, "evicting session that never ended");
                self.cache.evict_session(&prev)
            }
            _ => 0,
        };

        self.cache.open_session(&start.session_id);
        let owned = start.session_requests();
        for req in &owned {
            self.cache.register_to_session(&start.session_id, &req.key);
        }
        let shared = start.shared_requests();
        for req in &shared {
            self.cache.pin(&req.key);
        }

        let mut requests = owned;
        requests.extend(shared);
        let entries = self.cache.preload_all(requests).await;
        let misses = entries.iter().filter(|e| e.kind == EntryKind::Miss).count();
        let resolved = entries.len() - misses;
        info!(resolved, misses, "session assets ready");

        SessionReport::Started {
            session_id: start.session_id,
            resolved,
            misses,
            evicted,
        }
    }

    /// Evict the session's exclusively owned keys. Safe to call for any reason, any number of
    /// times.
    pub fn end(&self, session_id: &SessionId, reason: EndReason) -> usize {
        {
            let mut active = self.active.lock();
            if active.as_ref() == Some(session_id) {
                *active = None;
            }
        }
        debug!(session = %session_id.0, ?reason, "session end signal");
        self.cache.evict_session(session_id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/lifecycle.rs"]
mod tests;
