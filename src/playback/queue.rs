use std::{collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use tracing::{debug, info};

use crate::{
    config::QueueOpts,
    foundation::clock::Clock,
    foundation::core::Timestamp,
    playback::payload::BroadcastPayload,
    playback::sequencer::{PlaybackOutcome, Sequencer},
};

/// What [`PlayQueue::submit`] did with a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queue was idle; this entry is next and waits only for its start time.
    Scheduled,
    /// Appended behind other pending or running work.
    Queued,
    /// Replaced a pending entry with the same signature.
    Coalesced,
    /// Already expired on arrival.
    Dropped,
}

/// One finished hand-off to the sequencer.
#[derive(Clone, Debug)]
pub struct PlaybackRecord {
    pub payload: BroadcastPayload,
    pub outcome: PlaybackOutcome,
    pub finished_at: Timestamp,
}

/// Pending payload plus its dedup signature.
#[derive(Clone, Debug)]
struct QueueEntry {
    payload: BroadcastPayload,
    signature: u64,
    received_at: Timestamp,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueueEntry>,
    running: bool,
}

/// Frees the running slot when dropped, including when the worker is aborted mid-playback.
struct RunningSlot<'a>(&'a Mutex<QueueState>);

impl Drop for RunningSlot<'_> {
    fn drop(&mut self) {
        self.0.lock().running = false;
    }
}

/// Dedup signature of a payload: every field except its timing.
pub fn signature(payload: &BroadcastPayload) -> u64 {
    payload.signature()
}

/// Single entry point to the [`Sequencer`]: admits, coalesces and serializes play requests.
///
/// A worker task ([`PlayQueue::run`]) holds the head entry until its start time, then plays it.
/// Until that moment the head can still be replaced by a same-signature request.
pub struct PlayQueue {
    state: Mutex<QueueState>,
    wake: Notify,
    sequencer: Arc<Sequencer>,
    clock: Arc<dyn Clock>,
    opts: QueueOpts,
    records: broadcast::Sender<PlaybackRecord>,
}

impl std::fmt::Debug for PlayQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PlayQueue")
            .field("pending", &state.pending.len())
            .field("running", &state.running)
            .field("opts", &self.opts)
            .finish()
    }
}

impl PlayQueue {
    pub fn new(sequencer: Arc<Sequencer>, clock: Arc<dyn Clock>, opts: QueueOpts) -> Self {
        let (records, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            sequencer,
            clock,
            opts,
            records,
        }
    }

    /// Admit a payload.
    pub fn submit(&self, payload: BroadcastPayload) -> SubmitOutcome {
        let now = self.clock.now();
        if payload.is_expired_at(now) {
            debug!(asset = %payload.asset_key, "dropping expired payload");
            return SubmitOutcome::Dropped;
        }

        let signature = payload.signature();
        let mut state = self.state.lock();
        let window = self.opts.coalesce_window_ms;
        if let Some(entry) = state
            .pending
            .iter_mut()
            .find(|e| e.signature == signature && e.received_at.ms_until(now) <= window)
        {
            debug!(asset = %payload.asset_key, "coalescing with pending entry");
            entry.payload = payload;
            entry.received_at = now;
            drop(state);
            self.wake.notify_one();
            return SubmitOutcome::Coalesced;
        }

        let outcome = if state.pending.is_empty() && !state.running {
            SubmitOutcome::Scheduled
        } else {
            SubmitOutcome::Queued
        };
        debug!(asset = %payload.asset_key, ?outcome, depth = state.pending.len(), "payload admitted");
        state.pending.push_back(QueueEntry {
            payload,
            signature,
            received_at: now,
        });
        drop(state);
        self.wake.notify_one();
        outcome
    }

    /// Admit a locally originated payload.
    ///
    /// A start earlier than `now + restamp_delay_ms` is pushed to that instant, so an immediate
    /// request stays pending long enough for a repeat inside the coalesce window to replace it.
    pub fn submit_local(&self, mut payload: BroadcastPayload) -> SubmitOutcome {
        let now = self.clock.now();
        if payload.is_expired_at(now) {
            return self.submit(payload);
        }
        let earliest = now.plus_ms(self.opts.restamp_delay_ms);
        if payload.start_timestamp < earliest {
            payload.start_timestamp = earliest;
            payload.expiry_timestamp = payload.expiry_timestamp.max(earliest);
        }
        self.submit(payload)
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Completed hand-offs, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackRecord> {
        self.records.subscribe()
    }

    /// Drive the queue forever. Spawn once per queue.
    pub async fn run(self: Arc<Self>) {
        loop {
            let entry = self.next_due().await;
            let slot = RunningSlot(&self.state);
            let outcome = self.sequencer.play(entry.payload.clone()).await;
            let finished_at = self.clock.now();
            drop(slot);
            self.finish();
            let _ = self.records.send(PlaybackRecord {
                payload: entry.payload,
                outcome,
                finished_at,
            });
        }
    }

    /// Wait until the head entry is due, then take it. A coalesced replacement re-targets the wait.
    async fn next_due(&self) -> QueueEntry {
        loop {
            let head_start = self.state.lock().pending.front().map(|e| e.payload.start_timestamp);
            let Some(start) = head_start else {
                self.wake.notified().await;
                continue;
            };

            let remaining = self.clock.now().ms_until(start);
            if remaining == 0 {
                let mut state = self.state.lock();
                if let Some(entry) = state.pending.pop_front() {
                    state.running = true;
                    return entry;
                }
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(remaining)) => {}
                _ = self.wake.notified() => {}
            }
        }
    }

    /// Give a stale head a fresh near-future start. Its expiry is left alone, so an entry that
    /// outlived its window is dropped by the sequencer instead of rendered late.
    fn finish(&self) {
        let now = self.clock.now();
        let fresh = now.plus_ms(self.opts.restamp_delay_ms);
        let mut state = self.state.lock();
        if let Some(next) = state.pending.front_mut()
            && next.payload.start_timestamp < fresh
        {
            let payload = next.payload.clone().restamped(fresh);
            info!(asset = %payload.asset_key, start = payload.start_timestamp.0, "restamped queued payload");
            next.payload = payload;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/queue.rs"]
mod tests;
