use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Shared data structures for the dashboard pages. Field names follow the
// upstream JSON so the rendering side sees the same names it always has.

/// Number of trailing 7-day sparkline samples kept as the 24h sparkline.
pub const RECENT_SPARKLINE_SAMPLES: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

/// One row of the CoinGecko `/coins/markets` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,
    #[serde(default)]
    pub sparkline_in_24h: Option<Sparkline>,
}

impl Coin {
    /// Derives the 24h sparkline from the tail of the 7-day one.
    pub fn with_recent_sparkline(mut self) -> Self {
        let recent = self
            .sparkline_in_7d
            .as_ref()
            .map(|sparkline| {
                let skip = sparkline.price.len().saturating_sub(RECENT_SPARKLINE_SAMPLES);
                sparkline.price[skip..].to_vec()
            })
            .unwrap_or_default();
        self.sparkline_in_24h = Some(Sparkline { price: recent });
        self
    }
}

/// One row of the CoinGecko `/exchanges` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year_established: Option<u32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub trust_score: Option<f64>,
    #[serde(default)]
    pub trust_score_rank: Option<u32>,
    #[serde(default)]
    pub trade_volume_24h_btc: Option<f64>,
    #[serde(default)]
    pub trade_volume_24h_btc_normalized: Option<f64>,
    #[serde(default)]
    pub has_trading_incentive: Option<bool>,
    #[serde(default)]
    pub open_interest_btc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftCollection {
    pub name: String,
    pub symbol: String,
    pub floor_price: f64,
    pub day_change: f64,
    pub week_change: f64,
    pub total_supply: u64,
    pub volume_24h: f64,
    pub owners: u64,
    pub image: String,
}

/// Aggregates shown above the NFT table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NftMarketStats {
    pub total_collections: usize,
    pub total_volume: f64,
    pub total_owners: u64,
    pub floor_cap: f64,
}

impl NftMarketStats {
    pub fn from_collections(collections: &[NftCollection]) -> Self {
        Self {
            total_collections: collections.len(),
            total_volume: collections.iter().map(|c| c.volume_24h).sum(),
            total_owners: collections.iter().map(|c| c.owners).sum(),
            floor_cap: collections
                .iter()
                .map(|c| c.floor_price * c.total_supply as f64)
                .sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// One article from the NewsAPI `everything` search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: NewsSource,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsdAmount {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DominanceShare {
    #[serde(default)]
    pub btc: Option<f64>,
}

/// Payload of the CoinGecko `/global` endpoint (the inner `data` object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarketStats {
    #[serde(default)]
    pub active_cryptocurrencies: Option<u64>,
    #[serde(default)]
    pub markets: Option<u64>,
    #[serde(default)]
    pub total_market_cap: UsdAmount,
    #[serde(default)]
    pub total_volume: UsdAmount,
    #[serde(default)]
    pub market_cap_percentage: DominanceShare,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_coin(id: &str, rank: Option<u32>) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: id[..3.min(id.len())].to_string(),
            name: id.to_uppercase(),
            image: None,
            current_price: Some(50000.0),
            market_cap: Some(900000000000.0),
            market_cap_rank: rank,
            total_volume: Some(50000000000.0),
            price_change_percentage_24h: Some(2.5),
            price_change_percentage_7d_in_currency: Some(10.0),
            sparkline_in_7d: None,
            sparkline_in_24h: None,
        }
    }

    #[test]
    fn test_coin_deserialization() {
        let json = r#"{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
            "current_price": 50000.0,
            "market_cap": 900000000000,
            "market_cap_rank": 1,
            "total_volume": 50000000000,
            "price_change_percentage_24h": 2.5,
            "price_change_percentage_7d_in_currency": 10.0,
            "sparkline_in_7d": { "price": [1.0, 2.0, 3.0] },
            "ath": 69000.0
        }"#;

        let coin: Coin = serde_json::from_str(json).unwrap();

        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.symbol, "btc");
        assert_eq!(coin.market_cap_rank, Some(1));
        assert_eq!(coin.current_price, Some(50000.0));
        assert_eq!(coin.sparkline_in_7d.unwrap().price, vec![1.0, 2.0, 3.0]);
        assert!(coin.sparkline_in_24h.is_none());
    }

    #[test]
    fn test_coin_null_fields_are_unknown() {
        let json = r#"{
            "id": "newcoin",
            "symbol": "new",
            "name": "New Coin",
            "current_price": null,
            "market_cap_rank": null,
            "price_change_percentage_24h": null
        }"#;

        let coin: Coin = serde_json::from_str(json).unwrap();

        assert!(coin.current_price.is_none());
        assert!(coin.market_cap_rank.is_none());
        assert!(coin.price_change_percentage_24h.is_none());
    }

    #[test]
    fn test_recent_sparkline_keeps_last_24_samples() {
        let mut coin = create_test_coin("bitcoin", Some(1));
        coin.sparkline_in_7d = Some(Sparkline {
            price: (0..168).map(|i| i as f64).collect(),
        });

        let coin = coin.with_recent_sparkline();
        let recent = coin.sparkline_in_24h.unwrap().price;

        assert_eq!(recent.len(), 24);
        assert_eq!(recent[0], 144.0);
        assert_eq!(recent[23], 167.0);
    }

    #[test]
    fn test_recent_sparkline_short_and_missing() {
        let mut coin = create_test_coin("ethereum", Some(2));
        coin.sparkline_in_7d = Some(Sparkline { price: vec![1.0, 2.0] });
        assert_eq!(coin.with_recent_sparkline().sparkline_in_24h.unwrap().price, vec![1.0, 2.0]);

        let coin = create_test_coin("ethereum", Some(2)).with_recent_sparkline();
        assert!(coin.sparkline_in_24h.unwrap().price.is_empty());
    }

    #[test]
    fn test_exchange_deserialization() {
        let json = r#"{
            "id": "binance",
            "name": "Binance",
            "year_established": 2017,
            "country": "Cayman Islands",
            "image": "https://assets.coingecko.com/markets/images/52/small/binance.jpg",
            "trust_score": 10,
            "trust_score_rank": 1,
            "trade_volume_24h_btc": 500000.5,
            "trade_volume_24h_btc_normalized": 400000.0,
            "has_trading_incentive": false
        }"#;

        let exchange: Exchange = serde_json::from_str(json).unwrap();

        assert_eq!(exchange.id, "binance");
        assert_eq!(exchange.trust_score, Some(10.0));
        assert_eq!(exchange.trust_score_rank, Some(1));
        assert_eq!(exchange.has_trading_incentive, Some(false));
        assert!(exchange.open_interest_btc.is_none());
    }

    #[test]
    fn test_nft_collection_uses_camel_case() {
        let collection = NftCollection {
            name: "Azuki".to_string(),
            symbol: "AZUKI".to_string(),
            floor_price: 15.8,
            day_change: -1.25,
            week_change: 3.5,
            total_supply: 10000,
            volume_24h: 120.5,
            owners: 5000,
            image: "https://via.placeholder.com/40?text=AZUKI".to_string(),
        };

        let json = serde_json::to_string(&collection).unwrap();

        assert!(json.contains("\"floorPrice\":15.8"));
        assert!(json.contains("\"dayChange\":-1.25"));
        assert!(json.contains("\"totalSupply\":10000"));
        assert!(json.contains("\"volume24h\":120.5"));
    }

    #[test]
    fn test_nft_market_stats() {
        let make = |floor: f64, supply: u64, volume: f64, owners: u64| NftCollection {
            name: "x".to_string(),
            symbol: "X".to_string(),
            floor_price: floor,
            day_change: 0.0,
            week_change: 0.0,
            total_supply: supply,
            volume_24h: volume,
            owners,
            image: String::new(),
        };
        let collections = vec![make(2.0, 100, 10.0, 50), make(0.5, 1000, 5.5, 25)];

        let stats = NftMarketStats::from_collections(&collections);

        assert_eq!(stats.total_collections, 2);
        assert_eq!(stats.total_volume, 15.5);
        assert_eq!(stats.total_owners, 75);
        assert_eq!(stats.floor_cap, 700.0);
        assert_eq!(NftMarketStats::from_collections(&[]), NftMarketStats::default());
    }

    #[test]
    fn test_news_article_deserialization() {
        let json = r#"{
            "source": { "id": null, "name": "CoinDesk" },
            "author": "Someone",
            "title": "Bitcoin ETF flows",
            "description": "Crypto funds saw inflows",
            "url": "https://www.coindesk.com/markets/etf",
            "urlToImage": null,
            "publishedAt": "2024-01-01T12:30:00Z",
            "content": "..."
        }"#;

        let article: NewsArticle = serde_json::from_str(json).unwrap();

        assert_eq!(article.source.name, "CoinDesk");
        assert_eq!(article.title.as_deref(), Some("Bitcoin ETF flows"));
        assert!(article.url_to_image.is_none());
        assert_eq!(
            article.published_at.unwrap().to_rfc3339(),
            "2024-01-01T12:30:00+00:00"
        );
    }

    #[test]
    fn test_global_market_stats_deserialization() {
        let json = r#"{
            "active_cryptocurrencies": 13500,
            "markets": 1050,
            "total_market_cap": { "usd": 2400000000000.0, "eur": 2200000000000.0 },
            "total_volume": { "usd": 95000000000.0 },
            "market_cap_percentage": { "btc": 52.34, "eth": 16.1 },
            "updated_at": 1704067200
        }"#;

        let stats: GlobalMarketStats = serde_json::from_str(json).unwrap();

        assert_eq!(stats.active_cryptocurrencies, Some(13500));
        assert_eq!(stats.markets, Some(1050));
        assert_eq!(stats.total_market_cap.usd, Some(2400000000000.0));
        assert_eq!(stats.total_volume.usd, Some(95000000000.0));
        assert_eq!(stats.market_cap_percentage.btc, Some(52.34));
    }
}
