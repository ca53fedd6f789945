use std::cmp::Ordering;
use std::num::NonZeroUsize;

use serde::Serialize;

use crate::entity::Listable;
use crate::view::{ListFilter, ViewState, TOP_N};

/// Pagination metadata handed to the renderer alongside the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Entities left after filtering, across all pages.
    pub total_items: usize,
    /// Zero-based position of the first row, for row numbering.
    pub offset: usize,
}

impl PageInfo {
    /// Clamps `requested_page` into `[1, total_pages]`.
    pub fn compute(total_items: usize, requested_page: usize, page_size: NonZeroUsize) -> Self {
        let total_pages = total_items.div_ceil(page_size.get()).max(1);
        let current_page = requested_page.clamp(1, total_pages);

        Self {
            current_page,
            total_pages,
            has_prev: current_page > 1,
            has_next: current_page < total_pages,
            total_items,
            offset: (current_page - 1) * page_size.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPage<E> {
    pub items: Vec<E>,
    pub page_info: PageInfo,
}

/// Search, trust threshold and category filter, in that order.
///
/// `top 10` therefore takes the first ten of the already searched list, and
/// only `gainers`/`losers` reorder the upstream snapshot.
pub fn filter_entities<'a, E: Listable>(entities: &'a [E], view: &ViewState) -> Vec<&'a E> {
    let needle = view.search_term.to_lowercase();

    let mut filtered: Vec<&E> = entities
        .iter()
        .filter(|entity| entity.matches_search(&needle))
        .filter(|entity| view.trust_threshold.admits(entity.trust_score()))
        .collect();

    match view.active_filter {
        ListFilter::All => {}
        ListFilter::Top10 => filtered.truncate(TOP_N),
        ListFilter::Gainers => {
            filtered.sort_by(|a, b| compare_change(a.change_24h(), b.change_24h(), true))
        }
        ListFilter::Losers => {
            filtered.sort_by(|a, b| compare_change(a.change_24h(), b.change_24h(), false))
        }
        ListFilter::Spot => filtered.retain(|entity| entity.has_trading_incentive() == Some(false)),
        ListFilter::Derivatives => {
            filtered.retain(|entity| entity.has_trading_incentive() == Some(true))
        }
    }

    filtered
}

// Entities without a usable change sort after every ranked one.
fn compare_change(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    let a = a.filter(|value| value.is_finite());
    let b = b.filter(|value| value.is_finite());

    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Reduces a full entity list to the page the view state asks for.
///
/// Pure: the same inputs always give the same page. An out-of-range page is
/// clamped and reported back through `page_info.current_page`.
pub fn apply<E: Listable + Clone>(entities: &[E], view: &ViewState) -> DisplayPage<E> {
    let filtered = filter_entities(entities, view);
    let page_info = PageInfo::compute(filtered.len(), view.current_page, view.page_size);

    let items = filtered
        .into_iter()
        .skip(page_info.offset)
        .take(view.page_size.get())
        .cloned()
        .collect();

    DisplayPage { items, page_info }
}
