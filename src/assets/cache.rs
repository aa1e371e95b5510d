use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    assets::decode::{AssetKind, PreparedAsset, decode_asset},
    assets::fetch::AssetFetcher,
    assets::scope::{SessionScope, SessionScopes},
    foundation::clock::Clock,
    foundation::core::{SessionId, Timestamp},
    foundation::error::{CuecastError, CuecastResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Resolution state of a cache entry. A miss is a cached outcome, not an absence.
pub enum EntryKind {
    Resolved,
    Miss,
}

#[derive(Clone, Debug)]
/// One resolved cache slot.
pub struct CacheEntry {
    pub key: String,
    pub kind: EntryKind,
    /// Decoded resource; `None` for misses.
    pub payload: Option<PreparedAsset>,
    pub source_locator: String,
    pub cached_at: Timestamp,
    /// Why the key resolved to a miss.
    pub failure: Option<String>,
}

impl CacheEntry {
    pub fn is_resolved(&self) -> bool {
        self.kind == EntryKind::Resolved
    }
}

/// Work item for [`AssetCache::preload_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreloadRequest {
    pub key: String,
    pub locator: String,
    /// Explicit kind; inferred from the locator's extension when `None`.
    pub kind: Option<AssetKind>,
}

impl PreloadRequest {
    pub fn new(key: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            locator: locator.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: AssetKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Diagnostic snapshot of the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheInfo {
    /// Number of settled entries (resolved or miss).
    pub size: usize,
    /// Sorted keys of settled entries.
    pub keys: Vec<String>,
    /// How many of `keys` are misses.
    pub misses: usize,
    /// Approximate decoded bytes held.
    pub bytes: usize,
}

type Slot = Arc<OnceCell<Arc<CacheEntry>>>;

/// Keyed store of decoded resources and negative results, scoped to sessions.
///
/// All network and decode work happens in [`AssetCache::preload`]. [`AssetCache::get`] is
/// synchronous and only ever reads, which is what keeps playback free of IO.
pub struct AssetCache {
    slots: Mutex<HashMap<String, Slot>>,
    scopes: Mutex<SessionScopes>,
    fetcher: Arc<dyn AssetFetcher>,
    clock: Arc<dyn Clock>,
    decodes: AtomicU64,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("slots", &self.slots.lock().len())
            .field("decodes", &self.decodes.load(Ordering::Relaxed))
            .finish()
    }
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            scopes: Mutex::new(SessionScopes::default()),
            fetcher,
            clock,
            decodes: AtomicU64::new(0),
        }
    }

    /// Fetch and decode `locator` once for `key`.
    ///
    /// Concurrent callers for the same key share a single fetch/decode and observe the same entry.
    /// Failures are recorded as [`EntryKind::Miss`] and never retried until
    /// [`invalidate`](Self::invalidate) is called.
    #[tracing::instrument(skip(self, kind))]
    pub async fn preload(
        &self,
        key: &str,
        locator: &str,
        kind: Option<AssetKind>,
    ) -> Arc<CacheEntry> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(existing) = slot.get() {
            if existing.source_locator != locator {
                debug!(
                    existing = %existing.source_locator,
                    requested = %locator,
                    "key already resolved from another locator; keeping existing entry"
                );
            }
            return existing.clone();
        }

        slot.get_or_init(|| self.resolve(key, locator, kind))
            .await
            .clone()
    }

    /// Preload a batch concurrently. One failing key never prevents its siblings from resolving.
    pub async fn preload_all(self: &Arc<Self>, requests: Vec<PreloadRequest>) -> Vec<Arc<CacheEntry>> {
        let mut set = tokio::task::JoinSet::new();
        for req in requests {
            let cache = Arc::clone(self);
            set.spawn(async move { cache.preload(&req.key, &req.locator, req.kind).await });
        }

        let mut out = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(error = %e, "preload task failed"),
            }
        }
        out
    }

    async fn resolve(&self, key: &str, locator: &str, kind: Option<AssetKind>) -> Arc<CacheEntry> {
        let cached_at = self.clock.now();
        let (kind, payload, failure) = match self.load(locator, kind).await {
            Ok(asset) => {
                info!(key, locator, bytes = asset.byte_len(), "asset preloaded");
                (EntryKind::Resolved, Some(asset), None)
            }
            Err(e) => {
                let err = CuecastError::resource_load(key, e.to_string());
                warn!(key, locator, error = %err, "asset preload failed; caching miss");
                (EntryKind::Miss, None, Some(e.to_string()))
            }
        };

        Arc::new(CacheEntry {
            key: key.to_string(),
            kind,
            payload,
            source_locator: locator.to_string(),
            cached_at,
            failure,
        })
    }

    async fn load(&self, locator: &str, kind: Option<AssetKind>) -> CuecastResult<PreparedAsset> {
        let kind = kind
            .or_else(|| AssetKind::from_locator(locator))
            .ok_or_else(|| {
                CuecastError::validation(format!("cannot infer asset kind of '{locator}'"))
            })?;
        let bytes = self.fetcher.fetch(locator).await?;
        if bytes.is_empty() {
            return Err(CuecastError::validation("resource is empty"));
        }

        self.decodes.fetch_add(1, Ordering::Relaxed);
        tokio::task::spawn_blocking(move || decode_asset(kind, &bytes))
            .await
            .map_err(|e| CuecastError::Other(anyhow::anyhow!("decode task failed: {e}")))?
    }

    /// Synchronous lookup. Never fetches or decodes; `None` for absent or still-pending keys.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.slots.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Drop one entry (resolved or miss) so the next preload fetches again.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.slots.lock().remove(key).is_some();
        if removed {
            debug!(key, "cache entry invalidated");
        }
        removed
    }

    pub fn open_session(&self, session: &SessionId) -> bool {
        self.scopes.lock().open(session)
    }

    pub fn register_to_session(&self, session: &SessionId, key: &str) {
        self.scopes.lock().register(session, key);
    }

    /// Mark a key as global: session eviction never removes it.
    pub fn pin(&self, key: &str) {
        self.scopes.lock().pin(key);
    }

    pub fn session_scope(&self, session: &SessionId) -> Option<SessionScope> {
        self.scopes.lock().get(session).cloned()
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.scopes.lock().active_sessions()
    }

    /// Remove every key owned exclusively by `session`. Repeated calls are no-ops.
    ///
    /// Returns how many entries were released.
    #[tracing::instrument(skip(self, session), fields(session = %session.0))]
    pub fn evict_session(&self, session: &SessionId) -> usize {
        let Some(owned) = self.scopes.lock().close(session) else {
            debug!("session already evicted");
            return 0;
        };

        let mut slots = self.slots.lock();
        let released = owned.iter().filter(|k| slots.remove(*k).is_some()).count();
        info!(released, "session evicted");
        released
    }

    pub fn info(&self) -> CacheInfo {
        let slots = self.slots.lock();
        let mut info = CacheInfo::default();
        for (key, slot) in slots.iter() {
            let Some(entry) = slot.get() else {
                continue;
            };
            info.keys.push(key.clone());
            if entry.kind == EntryKind::Miss {
                info.misses += 1;
            }
            info.bytes += entry.payload.as_ref().map_or(0, PreparedAsset::byte_len);
        }
        info.keys.sort();
        info.size = info.keys.len();
        info
    }

    /// Number of decode operations performed since construction.
    pub fn decode_count(&self) -> u64 {
        self.decodes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
