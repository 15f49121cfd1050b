//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated on the ingestion path.
#[derive(Debug, Default)]
pub struct GrabStats {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    frames_failed: AtomicU64,
    records_decoded: AtomicU64,
    records_failed: AtomicU64,
    duplicates: AtomicU64,
    events_emitted: AtomicU64,
}

/// Point-in-time copy of [`GrabStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    /// Frames discarded by policy (filter, magic byte, missing header).
    pub frames_dropped: u64,
    /// Frames lost to envelope or inflate errors.
    pub frames_failed: u64,
    pub records_decoded: u64,
    pub records_failed: u64,
    pub duplicates: u64,
    pub events_emitted: u64,
}

impl GrabStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.records_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
        }
    }
}
