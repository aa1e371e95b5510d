use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use parking_lot::Mutex;

use crate::foundation::error::{CuecastError, CuecastResult};

/// Resolves a resource locator to raw bytes.
///
/// Only the cache's preload path calls a fetcher; playback never does.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> CuecastResult<Vec<u8>>;
}

/// Reads locators as paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait::async_trait]
impl AssetFetcher for FsFetcher {
    async fn fetch(&self, locator: &str) -> CuecastResult<Vec<u8>> {
        let rel = normalize_rel_path(locator)?;
        let path = self.root.join(Path::new(&rel));
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("read asset bytes from '{}'", path.display()))
            .map_err(CuecastError::from)
    }
}

/// In-memory fetcher serving registered bytes. Counts fetches per locator.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    inner: Mutex<StaticInner>,
    latency: Duration,
}

#[derive(Debug, Default)]
struct StaticInner {
    blobs: HashMap<String, Vec<u8>>,
    fetches: HashMap<String, u32>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate network latency on every fetch.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn insert(&self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.inner.lock().blobs.insert(locator.into(), bytes);
    }

    pub fn remove(&self, locator: &str) {
        self.inner.lock().blobs.remove(locator);
    }

    pub fn fetch_count(&self, locator: &str) -> u32 {
        self.inner.lock().fetches.get(locator).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, locator: &str) -> CuecastResult<Vec<u8>> {
        {
            let mut inner = self.inner.lock();
            *inner.fetches.entry(locator.to_string()).or_default() += 1;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.inner
            .lock()
            .blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| CuecastError::validation(format!("no resource at '{locator}'")))
    }
}

/// Normalize and validate root-relative locators.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> CuecastResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(CuecastError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(CuecastError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CuecastError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CuecastError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
