//! Visited-URL store
//!
//! Maps a normalized URL to the last HTTP status it answered with. Entries
//! are never removed during a crawl. Two workers racing on the same URL may
//! both fetch it and both store a status; once either store lands, every
//! later lookup sees the URL as cached.

use crate::store::ConcurrentStore;

#[derive(Debug, Default)]
pub struct VisitedStore {
    statuses: ConcurrentStore<u16>,
}

impl VisitedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_status(&self, url: &str) -> Option<u16> {
        self.statuses.load(url)
    }

    pub fn store(&self, url: &str, status: u16) {
        self.statuses.store(url, status);
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
