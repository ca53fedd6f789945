use std::io;

use thiserror::Error;

use crate::view::{ListFilter, PageKind};

/// Rejected view-state transitions. Out-of-range pages are clamped instead
/// and never show up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Unknown trust threshold: {0}")]
    UnknownTrustThreshold(String),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Filter '{filter}' is not offered on the {page} page")]
    UnsupportedFilter { page: PageKind, filter: ListFilter },

    #[error("The {0} page has no trust filter")]
    TrustNotSupported(PageKind),
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON serialize error: {0}")]
    JsonError(#[from] serde_json::Error),
}
