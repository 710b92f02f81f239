//! Running counters for a mirror run.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::{DownloadAction, DownloadOutcome};

/// Statistics from a mirror run.
///
/// Uses atomic counters so concurrent release tasks can update it without
/// locking.
#[derive(Debug, Default)]
pub struct MirrorStats {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    bytes_downloaded: AtomicU64,
    icons_downloaded: AtomicUsize,
    icons_skipped: AtomicUsize,
    icons_failed: AtomicUsize,
}

impl MirrorStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of artifacts fetched.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Returns the number of artifacts already present.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of artifacts that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of artifacts processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded() + self.skipped() + self.failed()
    }

    /// Returns the bytes written for fetched artifacts.
    #[must_use]
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// Returns the number of icons fetched.
    #[must_use]
    pub fn icons_downloaded(&self) -> usize {
        self.icons_downloaded.load(Ordering::SeqCst)
    }

    /// Returns the number of icons already present.
    #[must_use]
    pub fn icons_skipped(&self) -> usize {
        self.icons_skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of icons that failed.
    #[must_use]
    pub fn icons_failed(&self) -> usize {
        self.icons_failed.load(Ordering::SeqCst)
    }

    /// Zeroes every counter at the start of a run.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.downloaded,
            &self.skipped,
            &self.failed,
            &self.icons_downloaded,
            &self.icons_skipped,
            &self.icons_failed,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.bytes_downloaded.store(0, Ordering::SeqCst);
    }

    pub(crate) fn record(&self, outcome: &DownloadOutcome) {
        let counter = match outcome.action() {
            Some(DownloadAction::Downloaded) => &self.downloaded,
            Some(DownloadAction::Skipped) => &self.skipped,
            None => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_icon(&self, outcome: &DownloadOutcome) {
        let counter = match outcome.action() {
            Some(DownloadAction::Downloaded) => &self.icons_downloaded,
            Some(DownloadAction::Skipped) => &self.icons_skipped,
            None => &self.icons_failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }
}
