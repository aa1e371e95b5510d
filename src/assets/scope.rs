use std::collections::{BTreeSet, HashMap, HashSet};

use crate::foundation::core::SessionId;

/// Cache keys bound to one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionScope {
    pub session_id: SessionId,
    pub keys: BTreeSet<String>,
}

/// Tracks which cache keys belong to which session, and which keys are global.
///
/// A key referenced by more than one live scope, or pinned, is shared and survives eviction of any
/// single session.
#[derive(Debug, Default)]
pub(crate) struct SessionScopes {
    scopes: HashMap<SessionId, SessionScope>,
    pinned: HashSet<String>,
}

impl SessionScopes {
    /// Create an empty scope. Returns `false` if it already existed.
    pub(crate) fn open(&mut self, id: &SessionId) -> bool {
        if self.scopes.contains_key(id) {
            return false;
        }
        self.scopes.insert(
            id.clone(),
            SessionScope {
                session_id: id.clone(),
                keys: BTreeSet::new(),
            },
        );
        true
    }

    pub(crate) fn register(&mut self, id: &SessionId, key: &str) {
        self.open(id);
        if let Some(scope) = self.scopes.get_mut(id) {
            scope.keys.insert(key.to_string());
        }
    }

    pub(crate) fn pin(&mut self, key: &str) {
        self.pinned.insert(key.to_string());
    }

    pub(crate) fn is_pinned(&self, key: &str) -> bool {
        self.pinned.contains(key)
    }

    /// Destroy the scope and return the keys it owned exclusively.
    ///
    /// Unknown sessions yield `None`, so a repeated close is a no-op.
    pub(crate) fn close(&mut self, id: &SessionId) -> Option<Vec<String>> {
        let scope = self.scopes.remove(id)?;
        let owned = scope
            .keys
            .into_iter()
            .filter(|k| !self.is_pinned(k))
            .filter(|k| !self.scopes.values().any(|s| s.keys.contains(k)))
            .collect();
        Some(owned)
    }

    pub(crate) fn get(&self, id: &SessionId) -> Option<&SessionScope> {
        self.scopes.get(id)
    }

    pub(crate) fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.scopes.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/scope.rs"]
mod tests;
