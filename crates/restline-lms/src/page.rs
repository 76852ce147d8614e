//! Page requests, results, and the per-run call counter

use std::sync::atomic::{AtomicUsize, Ordering};

/// One extracted row: an opaque JSON object
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A request for one page. Page indices are 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
    pub continuation: Option<String>,
}

impl PageRequest {
    pub fn offset(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            continuation: None,
        }
    }

    pub fn token(page: usize, page_size: usize, continuation: Option<String>) -> Self {
        Self {
            page,
            page_size,
            continuation,
        }
    }
}

/// Records returned by exactly one fetch
#[derive(Clone, Debug, Default)]
pub struct PageResult {
    pub page: usize,
    pub records: Vec<Record>,
    pub has_more: bool,
}

/// Outcome of a lenient page fetch.
///
/// `Skipped` is the collector's absorb-and-continue policy made explicit: a
/// failed page contributes no records and does not extend pagination.
#[derive(Debug)]
pub enum PageOutcome {
    Success(PageResult),
    Skipped { page: usize, reason: String },
}

impl PageOutcome {
    pub fn page(&self) -> usize {
        match self {
            Self::Success(r) => r.page,
            Self::Skipped { page, .. } => *page,
        }
    }

    pub fn has_more(&self) -> bool {
        match self {
            Self::Success(r) => r.has_more,
            Self::Skipped { .. } => false,
        }
    }
}

/// HTTP calls issued during one run, shared by all page workers
#[derive(Debug, Default)]
pub struct CallCounter(AtomicUsize);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}
