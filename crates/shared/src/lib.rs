//! Data model and list logic for the coin-watch dashboard.
//!
//! Everything in here is synchronous and free of network I/O; the server
//! crate fetches upstream data and drives these types.

pub mod cache;
pub mod controller;
pub mod debounce;
pub mod entity;
pub mod error;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod sequence;
pub mod sparkline;
pub mod theme;
pub mod types;
pub mod view;

pub use cache::{CacheEntry, CacheLookup, DataCache};
pub use controller::PageController;
pub use debounce::{DebounceToken, Debouncer};
pub use entity::Listable;
pub use error::{PreferenceError, ViewError};
pub use pipeline::{DisplayPage, PageInfo};
pub use sequence::{lock_or_recover, FetchSequencer, FetchTicket, InFlight, InFlightGuard};
pub use theme::{Theme, ThemeStore};
pub use types::*;
pub use view::{ListFilter, PageKind, TrustThreshold, ViewState};
