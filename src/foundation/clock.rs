use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::foundation::core::Timestamp;

/// Source of wall-clock time for scheduling decisions.
///
/// Implementations must be cheap to call; the sequencer reads the clock on every frame.
pub trait Clock: Send + Sync {
    /// Current local time, including any configured correction.
    fn now(&self) -> Timestamp;
}

/// Wall clock anchored once to `SystemTime`, then advanced with the tokio monotonic clock.
///
/// Anchoring to tokio's `Instant` keeps the clock monotonic across system clock adjustments and
/// lets tests drive it deterministically with a paused runtime.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor_epoch_ms: u64,
    anchor: tokio::time::Instant,
    offset_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Clock shifted by a static correction in milliseconds (positive runs ahead).
    pub fn with_offset(offset_ms: i64) -> Self {
        let anchor_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            anchor_epoch_ms,
            anchor: tokio::time::Instant::now(),
            offset_ms,
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.anchor.elapsed().as_millis() as u64;
        Timestamp(self.anchor_epoch_ms.saturating_add(elapsed)).shift(self.offset_ms)
    }
}

/// Suspend until `clock` reaches `target`. Returns immediately when already due.
pub async fn wait_until(clock: &dyn Clock, target: Timestamp) {
    loop {
        let remaining = clock.now().ms_until(target);
        if remaining == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(remaining)).await;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/clock.rs"]
mod tests;
