//! Navigation history ledger.
//!
//! [`History`] is the router's own record of logical navigation depth. Index 0
//! is the entry page, the last entry is the current page. Its length may exceed
//! the host's physical page-stack depth once a push has been turned into a
//! relaunch.
//!
//! The ledger is only mutated by the router, and only after a navigation has
//! been allowed and the host has reported its outcome. A [`HistorySnapshot`]
//! taken before every mutating call lets a failed call put the ledger back
//! exactly as it was.

use crate::host::PageDescriptor;
use crate::request::NavigationRequest;

/// Ordered log of normalized navigation requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<NavigationRequest>,
}

/// Structurally independent copy of a [`History`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    entries: Vec<NavigationRequest>,
}

impl HistorySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl History {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding `entries`, oldest first.
    pub fn from_entries(entries: Vec<NavigationRequest>) -> Self {
        Self { entries }
    }

    /// Logical navigation depth.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[NavigationRequest] {
        &self.entries
    }

    /// Entry at `index` (0 = entry page).
    pub fn get(&self, index: usize) -> Option<&NavigationRequest> {
        self.entries.get(index)
    }

    /// The current page.
    pub fn last(&self) -> Option<&NavigationRequest> {
        self.entries.last()
    }

    /// The entry `delta` steps behind the current page.
    pub fn peek_back(&self, delta: usize) -> Option<&NavigationRequest> {
        let index = self.entries.len().checked_sub(delta)?.checked_sub(1)?;
        self.entries.get(index)
    }

    /// Urls of all entries, oldest first.
    pub fn urls(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.url.as_str()).collect()
    }

    /// Push an entry at the tail.
    pub fn append(&mut self, entry: NavigationRequest) {
        self.entries.push(entry);
    }

    /// Overwrite the tail entry; on an empty ledger this appends.
    pub fn replace_last(&mut self, entry: NavigationRequest) {
        match self.entries.last_mut() {
            Some(last) => *last = entry,
            None => self.entries.push(entry),
        }
    }

    /// Collapse the ledger to a single entry.
    pub fn reset_to(&mut self, entry: NavigationRequest) {
        self.entries.clear();
        self.entries.push(entry);
    }

    /// Drop the last `n` entries. Dropping more than exist empties the ledger.
    pub fn truncate_last(&mut self, n: usize) {
        let keep = self.entries.len().saturating_sub(n);
        self.entries.truncate(keep);
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Capture a copy for rollback.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            entries: self.entries.clone(),
        }
    }

    /// Put the ledger back to a previously captured state.
    pub fn restore(&mut self, snapshot: HistorySnapshot) {
        self.entries = snapshot.entries;
    }

    /// Seed an empty ledger from the bottom of the host's page stack.
    ///
    /// Returns `true` if an entry was added. A non-empty ledger, or an empty
    /// page stack, leaves the ledger untouched.
    pub fn seed_from_host(&mut self, pages: &[PageDescriptor]) -> bool {
        if !self.entries.is_empty() {
            return false;
        }
        match pages.first() {
            Some(page) => {
                self.entries.push(page.to_request());
                true
            }
            None => false,
        }
    }
}
