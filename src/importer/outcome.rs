//! Import result types

use std::fmt;

// ============================================================================
// Entry Outcome
// ============================================================================

/// What happened to a single descriptor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Persisted under the given id
    Imported(String),
    /// Blank input
    Empty,
    /// No codec for the scheme, or the codec rejected the descriptor
    Unsupported,
    /// Remarks did not match the subscription filter
    Filtered,
    /// The subscription filter is not a valid regular expression
    InvalidFilter,
    /// The store refused the write
    StorageFailure,
}

impl EntryOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, EntryOutcome::Imported(_))
    }
}

impl fmt::Display for EntryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryOutcome::Imported(id) => write!(f, "imported as {}", id),
            EntryOutcome::Empty => write!(f, "empty input"),
            EntryOutcome::Unsupported => write!(f, "unsupported or malformed descriptor"),
            EntryOutcome::Filtered => write!(f, "skipped by subscription filter"),
            EntryOutcome::InvalidFilter => write!(f, "subscription filter is not a valid regex"),
            EntryOutcome::StorageFailure => write!(f, "failed to persist profile"),
        }
    }
}

// ============================================================================
// Batch Report
// ============================================================================

/// Per-line tally of one batch import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids of persisted profiles, in processing order
    pub imported_ids: Vec<String>,
    pub filtered: usize,
    pub unsupported: usize,
    /// Storage failures and entries rejected by an invalid filter
    pub failed: usize,
}

impl BatchReport {
    /// Number of persisted profiles
    pub fn imported(&self) -> usize {
        self.imported_ids.len()
    }

    /// Counts every imported entry as failed, after the store rolled them back
    pub fn roll_back(&mut self) {
        self.failed += self.imported_ids.len();
        self.imported_ids.clear();
    }

    pub fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Imported(id) => self.imported_ids.push(id),
            EntryOutcome::Empty => {}
            EntryOutcome::Unsupported => self.unsupported += 1,
            EntryOutcome::Filtered => self.filtered += 1,
            EntryOutcome::InvalidFilter | EntryOutcome::StorageFailure => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported, {} filtered, {} unsupported, {} failed",
            self.imported(),
            self.filtered,
            self.unsupported,
            self.failed
        )
    }
}

// ============================================================================
// Decode Strategy
// ============================================================================

/// Which interpretation of a blob produced profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Whole blob was Base64 wrapping a descriptor list
    Base64Batch,
    /// Blob was a plain descriptor list
    RawBatch,
    /// First line held a single configuration
    SingleCustom,
    /// Nothing could be imported
    None,
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStrategy::Base64Batch => write!(f, "Base64 batch"),
            DecodeStrategy::RawBatch => write!(f, "raw batch"),
            DecodeStrategy::SingleCustom => write!(f, "single custom config"),
            DecodeStrategy::None => write!(f, "none"),
        }
    }
}

/// Result of running the decoding strategies over one blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveReport {
    pub strategy: DecodeStrategy,
    pub imported: usize,
}

impl ResolveReport {
    pub fn none() -> Self {
        Self {
            strategy: DecodeStrategy::None,
            imported: 0,
        }
    }
}

// ============================================================================
// Import Outcome
// ============================================================================

/// Counts returned by a pasted-text import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Profiles persisted
    pub configs: usize,
    /// Subscription URLs added
    pub subscriptions: usize,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} configs, {} subscriptions",
            self.configs, self.subscriptions
        )
    }
}
