use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use log::debug;

use crate::debounce::{DebounceToken, Debouncer};
use crate::entity::{sort_by_rank, Listable};
use crate::error::ViewError;
use crate::pipeline::{self, DisplayPage, PageInfo};
use crate::view::{ListFilter, PageKind, TrustThreshold, ViewState};

/// One list page: its upstream snapshot, its view state and its pending
/// search input.
#[derive(Debug)]
pub struct PageController<E> {
    kind: PageKind,
    entities: Vec<E>,
    view: ViewState,
    search: Debouncer<String>,
}

impl<E: Listable + Clone> PageController<E> {
    pub fn new(kind: PageKind, page_size: NonZeroUsize, debounce: Duration) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            view: ViewState::new(page_size),
            search: Debouncer::new(debounce),
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn search_delay(&self) -> Duration {
        self.search.delay()
    }

    /// Swaps in a new upstream snapshot, sorted by rank. The view state is
    /// kept; `display` clamps the page if the list shrank.
    pub fn replace_entities(&mut self, mut entities: Vec<E>) {
        sort_by_rank(&mut entities);
        debug!("{} page holds {} entities", self.kind, entities.len());
        self.entities = entities;
    }

    /// Records a keystroke. The term only takes effect once `settle_search`
    /// is called with the returned token after the debounce delay.
    pub fn input_search(&mut self, term: impl Into<String>, now: Instant) -> DebounceToken {
        self.search.push(term.into(), now)
    }

    /// Applies the pending term if `token` is still the latest input.
    pub fn settle_search(&mut self, token: DebounceToken, now: Instant) -> bool {
        match self.search.settle(token, now) {
            Some(term) => {
                self.apply_search(term);
                true
            }
            None => false,
        }
    }

    /// Applies a term right away, dropping any pending input.
    pub fn apply_search(&mut self, term: impl Into<String>) {
        self.search.cancel();
        self.view.search_term = term.into();
        self.view.current_page = 1;
    }

    pub fn select_filter(&mut self, filter: ListFilter) -> Result<(), ViewError> {
        if !self.kind.supports_filter(filter) {
            return Err(ViewError::UnsupportedFilter {
                page: self.kind,
                filter,
            });
        }
        self.view.active_filter = filter;
        self.view.current_page = 1;
        Ok(())
    }

    pub fn set_trust_threshold(&mut self, threshold: TrustThreshold) -> Result<(), ViewError> {
        if !self.kind.supports_trust_threshold() {
            return Err(ViewError::TrustNotSupported(self.kind));
        }
        self.view.trust_threshold = threshold;
        self.view.current_page = 1;
        Ok(())
    }

    /// Moves forward one page. Returns false, leaving the view untouched,
    /// on the last page.
    pub fn next_page(&mut self) -> bool {
        let info = self.page_info();
        if !info.has_next {
            return false;
        }
        self.view.current_page = info.current_page + 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        let info = self.page_info();
        if !info.has_prev {
            return false;
        }
        self.view.current_page = info.current_page - 1;
        true
    }

    /// Runs the pipeline and stores the clamped page number back.
    pub fn display(&mut self) -> DisplayPage<E> {
        let page = pipeline::apply(&self.entities, &self.view);
        self.view.current_page = page.page_info.current_page;
        page
    }

    fn page_info(&self) -> PageInfo {
        let total = pipeline::filter_entities(&self.entities, &self.view).len();
        PageInfo::compute(total, self.view.current_page, self.view.page_size)
    }
}
