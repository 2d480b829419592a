//! Process-lifetime list of recent searches, most recent first.

use serde::{Deserialize, Serialize};
use valuation_core::RecentSearchEntry;

pub const RECENT_SEARCH_CAPACITY: usize = 10;

fn ticker_key(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Caller-owned recent-search list, keyed by ticker and capped in size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSearches")]
pub struct RecentSearches {
    entries: Vec<RecentSearchEntry>,
    capacity: usize,
}

/// Wire shape of [`RecentSearches`]; converting back re-applies the capacity rules.
#[derive(Deserialize)]
struct StoredSearches {
    entries: Vec<RecentSearchEntry>,
    capacity: usize,
}

impl From<StoredSearches> for RecentSearches {
    fn from(stored: StoredSearches) -> Self {
        let mut list = Self::with_capacity(stored.capacity);
        for entry in stored.entries {
            let key = ticker_key(&entry.ticker);
            if list.len() < list.capacity && list.get(&key).is_none() {
                list.entries.push(RecentSearchEntry { ticker: key, ..entry });
            }
        }
        list
    }
}

impl RecentSearches {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_SEARCH_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Put `entry` at the front, dropping any older entry for the same
    /// ticker and anything beyond capacity.
    pub fn upsert(&mut self, mut entry: RecentSearchEntry) {
        entry.ticker = ticker_key(&entry.ticker);
        self.entries.retain(|e| e.ticker != entry.ticker);
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn get(&self, ticker: &str) -> Option<&RecentSearchEntry> {
        let key = ticker_key(ticker);
        self.entries.iter().find(|e| e.ticker == key)
    }

    pub fn entries(&self) -> &[RecentSearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecentSearches {
    fn default() -> Self {
        Self::new()
    }
}

/// Value-style upsert: takes the list, returns the updated list.
pub fn upsert_recent_search(mut list: RecentSearches, entry: RecentSearchEntry) -> RecentSearches {
    list.upsert(entry);
    list
}
