use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ViewError;

/// Rows per page on every list page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

/// How many entities the `top 10` filter keeps.
pub const TOP_N: usize = 10;

/// Category tags offered by the filter buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    #[default]
    All,
    Top10,
    Gainers,
    Losers,
    Spot,
    Derivatives,
}

impl ListFilter {
    pub fn label(&self) -> &'static str {
        match self {
            ListFilter::All => "all",
            ListFilter::Top10 => "top 10",
            ListFilter::Gainers => "gainers",
            ListFilter::Losers => "losers",
            ListFilter::Spot => "spot",
            ListFilter::Derivatives => "derivatives",
        }
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ListFilter {
    type Err = ViewError;

    // Accepts the button labels as well as the serialized names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ListFilter::All),
            "top 10" | "top10" => Ok(ListFilter::Top10),
            "gainers" => Ok(ListFilter::Gainers),
            "losers" => Ok(ListFilter::Losers),
            "spot" => Ok(ListFilter::Spot),
            "derivatives" => Ok(ListFilter::Derivatives),
            _ => Err(ViewError::UnknownFilter(s.to_string())),
        }
    }
}

/// Lower bound on an exchange's trust score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrustThreshold {
    /// Unrestricted; exchanges without a score pass too. Elsewhere a zero
    /// score counts as no score.
    #[default]
    All,
    AtLeast(u8),
}

impl TrustThreshold {
    pub fn admits(&self, trust_score: Option<f64>) -> bool {
        match self {
            TrustThreshold::All => true,
            TrustThreshold::AtLeast(min) => {
                trust_score.is_some_and(|score| score > 0.0 && score >= f64::from(*min))
            }
        }
    }
}

impl fmt::Display for TrustThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustThreshold::All => f.write_str("all"),
            TrustThreshold::AtLeast(min) => write!(f, "{}", min),
        }
    }
}

impl FromStr for TrustThreshold {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(TrustThreshold::All);
        }
        value
            .parse::<u8>()
            .map(TrustThreshold::AtLeast)
            .map_err(|_| ViewError::UnknownTrustThreshold(s.to_string()))
    }
}

impl Serialize for TrustThreshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The list pages that run through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Coins,
    Exchanges,
    Nfts,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Coins => "coins",
            PageKind::Exchanges => "exchanges",
            PageKind::Nfts => "nfts",
        }
    }

    /// Filter buttons shown on this page, in display order.
    pub fn filters(&self) -> &'static [ListFilter] {
        match self {
            PageKind::Coins => &[
                ListFilter::All,
                ListFilter::Top10,
                ListFilter::Gainers,
                ListFilter::Losers,
            ],
            PageKind::Exchanges => &[
                ListFilter::All,
                ListFilter::Top10,
                ListFilter::Spot,
                ListFilter::Derivatives,
            ],
            PageKind::Nfts => &[ListFilter::All],
        }
    }

    pub fn supports_filter(&self, filter: ListFilter) -> bool {
        self.filters().contains(&filter)
    }

    pub fn supports_trust_threshold(&self) -> bool {
        matches!(self, PageKind::Exchanges)
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coins" => Ok(PageKind::Coins),
            "exchanges" => Ok(PageKind::Exchanges),
            "nfts" => Ok(PageKind::Nfts),
            _ => Err(ViewError::UnknownPage(s.to_string())),
        }
    }
}

/// User-controlled parameters for one list page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub search_term: String,
    pub active_filter: ListFilter,
    pub trust_threshold: TrustThreshold,
    pub current_page: usize,
    pub page_size: NonZeroUsize,
}

impl ViewState {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            search_term: String::new(),
            active_filter: ListFilter::All,
            trust_threshold: TrustThreshold::All,
            current_page: 1,
            page_size,
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.active_filter = filter;
        self
    }

    pub fn with_trust_threshold(mut self, threshold: TrustThreshold) -> Self {
        self.trust_threshold = threshold;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.current_page = page;
        self
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
