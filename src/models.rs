use serde_json::{Map, Value};

/// Opaque store-item identifier (a numeric string). Only ever used to
/// build store-page URLs.
pub type AppId = String;

/// One page of the paginated wishlist-data response, exactly as the
/// endpoint returned it. The metadata values are opaque; only the keys
/// matter to the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct WishlistPage {
    /// Zero-based page index.
    pub index: usize,
    /// Item id mapped to its (uninterpreted) metadata object, in the
    /// order the endpoint emitted the keys.
    pub items: Map<String, Value>,
}

/// Result of processing a single app id in the replication loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The add action was triggered.
    Added,
    /// The wishlist-action element was hidden: the item is already on
    /// the target wishlist.
    AlreadyPresent,
    /// The wishlist-action element never appeared within the wait.
    ButtonMissing,
}

/// Running counters for one replication run. Owned by the caller so an
/// interrupted run still reports truthful partial totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub added: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ReplicationReport {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Added => self.added += 1,
            Outcome::AlreadyPresent => self.skipped += 1,
            Outcome::ButtonMissing => self.errors += 1,
        }
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn total(&self) -> usize {
        self.added + self.skipped + self.errors
    }
}
