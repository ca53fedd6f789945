use crate::types::{Coin, Exchange, NftCollection};

/// The per-domain fields the list pipeline reads.
///
/// Each page plugs its entity type in here instead of carrying its own copy
/// of the search/filter/sort code.
pub trait Listable {
    /// Stable identifier.
    fn id(&self) -> &str;

    /// Display name, matched by search.
    fn name(&self) -> &str;

    /// Secondary search field (ticker symbol, exchange slug).
    fn code(&self) -> Option<&str>;

    /// Upstream rank, lower is better.
    fn rank(&self) -> Option<u32> {
        None
    }

    fn change_24h(&self) -> Option<f64> {
        None
    }

    fn trust_score(&self) -> Option<f64> {
        None
    }

    fn has_trading_incentive(&self) -> Option<bool> {
        None
    }

    /// Case-insensitive substring match; `needle` must already be lowercase.
    fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.name().to_lowercase().contains(needle)
            || self
                .code()
                .is_some_and(|code| code.to_lowercase().contains(needle))
    }
}

impl Listable for Coin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        Some(&self.symbol)
    }

    fn rank(&self) -> Option<u32> {
        self.market_cap_rank
    }

    fn change_24h(&self) -> Option<f64> {
        self.price_change_percentage_24h
    }
}

impl Listable for Exchange {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn rank(&self) -> Option<u32> {
        self.trust_score_rank
    }

    fn trust_score(&self) -> Option<f64> {
        self.trust_score
    }

    fn has_trading_incentive(&self) -> Option<bool> {
        self.has_trading_incentive
    }
}

impl Listable for NftCollection {
    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        Some(&self.symbol)
    }

    fn change_24h(&self) -> Option<f64> {
        Some(self.day_change)
    }
}

/// Ingestion order: ascending rank, unranked entities last. Stable, so
/// ties keep their upstream order.
pub fn sort_by_rank<E: Listable>(entities: &mut [E]) {
    entities.sort_by_key(|entity| entity.rank().unwrap_or(u32::MAX));
}
