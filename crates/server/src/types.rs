use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use shared::format::{
    format_compact_number, format_dominance, format_grouped,
    format_optional_compact, format_optional_currency, format_percent_change, format_trust_score,
    Trend, TrustLevel, NOT_AVAILABLE,
};
use shared::sparkline::{sparkline_area_path, sparkline_path, SPARKLINE_HEIGHT, SPARKLINE_WIDTH};
use shared::{
    Coin, DataCache, Exchange, FetchSequencer, GlobalMarketStats, InFlight, ListFilter,
    NewsArticle, NftCollection, NftMarketStats, PageController, PageInfo, PageKind, ThemeStore,
    ViewState,
};

use crate::client::CoinGeckoClient;
use crate::config::ServerConfig;
use crate::news::{NewsClient, NewsFeed};

/// Envelope of the CoinGecko `/global` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalResponse {
    pub data: GlobalMarketStats,
}

pub struct AppState {
    pub coingecko: CoinGeckoClient,
    pub news_client: NewsClient,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub global_cache: Mutex<DataCache<GlobalMarketStats>>,
    pub coin_cache: Mutex<DataCache<Vec<Coin>>>,
    pub exchange_cache: Mutex<DataCache<Vec<Exchange>>>,
    pub news_cache: Mutex<DataCache<Vec<NewsArticle>>>,
    pub in_flight: InFlight,
    pub sequencer: Mutex<FetchSequencer>,
    pub coins: Mutex<PageController<Coin>>,
    pub exchanges: Mutex<PageController<Exchange>>,
    pub nfts: Mutex<PageController<NftCollection>>,
    pub news: Mutex<NewsFeed>,
    pub themes: ThemeStore,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let http = Client::new();
        let settings = &config.dashboard;

        Self {
            coingecko: CoinGeckoClient::new(
                http.clone(),
                config.coingecko_base_url.clone(),
                config.coingecko_api_key.clone(),
            ),
            news_client: NewsClient::new(
                http,
                config.news_base_url.clone(),
                config.news_api_key.clone(),
                settings.news_domains.clone(),
            ),
            cache_ttl: config.cache_ttl,
            refresh_interval: config.refresh_interval,
            global_cache: Mutex::new(DataCache::new()),
            coin_cache: Mutex::new(DataCache::new()),
            exchange_cache: Mutex::new(DataCache::new()),
            news_cache: Mutex::new(DataCache::new()),
            in_flight: InFlight::new(),
            sequencer: Mutex::new(FetchSequencer::new()),
            coins: Mutex::new(PageController::new(
                PageKind::Coins,
                settings.coins_page_size,
                config.search_debounce,
            )),
            exchanges: Mutex::new(PageController::new(
                PageKind::Exchanges,
                settings.exchanges_page_size,
                config.search_debounce,
            )),
            nfts: Mutex::new(PageController::new(
                PageKind::Nfts,
                settings.nfts_page_size,
                config.search_debounce,
            )),
            news: Mutex::new(NewsFeed::new()),
            themes: ThemeStore::new(config.theme_store_path.clone()),
        }
    }
}

// Request bodies

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct TrustRequest {
    pub threshold: String,
}

// Responses

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Where served data came from and how old it is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Freshness {
    pub last_updated: Option<String>,
    pub stale: bool,
    pub error: Option<String>,
}

impl Freshness {
    pub fn new(fetched_at: Option<SystemTime>, stale: bool, error: Option<String>) -> Self {
        Self {
            last_updated: fetched_at.map(|at| DateTime::<Utc>::from(at).to_rfc3339()),
            stale,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalStatsView {
    pub total_coins: String,
    pub total_exchanges: String,
    pub total_market_cap: String,
    pub total_volume: String,
    pub btc_dominance: String,
    pub raw: GlobalMarketStats,
}

impl GlobalStatsView {
    pub fn from_stats(stats: &GlobalMarketStats) -> Self {
        let count = |value: Option<u64>| {
            value
                .map(|v| format_grouped(v as f64))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        let dollars = |value: Option<f64>| {
            value
                .map(|v| format!("${}", format_compact_number(v)))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        Self {
            total_coins: count(stats.active_cryptocurrencies),
            total_exchanges: count(stats.markets),
            total_market_cap: dollars(stats.total_market_cap.usd),
            total_volume: dollars(stats.total_volume.usd),
            btc_dominance: stats
                .market_cap_percentage
                .btc
                .map(format_dominance)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            raw: stats.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalResponseView {
    pub stats: Option<GlobalStatsView>,
    #[serde(flatten)]
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinRow {
    #[serde(flatten)]
    pub coin: Coin,
    pub price: String,
    pub change_24h: String,
    pub change_7d: String,
    pub market_cap_display: String,
    pub volume_display: String,
    pub trend: Trend,
    pub sparkline_path: Option<String>,
    pub sparkline_area: Option<String>,
}

impl From<Coin> for CoinRow {
    fn from(coin: Coin) -> Self {
        let recent: &[f64] = coin
            .sparkline_in_24h
            .as_ref()
            .map(|s| s.price.as_slice())
            .unwrap_or(&[]);

        Self {
            price: format_optional_currency(coin.current_price),
            change_24h: format_percent_change(coin.price_change_percentage_24h),
            change_7d: format_percent_change(coin.price_change_percentage_7d_in_currency),
            market_cap_display: format_optional_currency(coin.market_cap),
            volume_display: format_optional_currency(coin.total_volume),
            trend: Trend::from_change(coin.price_change_percentage_24h),
            sparkline_path: sparkline_path(recent, SPARKLINE_WIDTH, SPARKLINE_HEIGHT),
            sparkline_area: sparkline_area_path(recent, SPARKLINE_WIDTH, SPARKLINE_HEIGHT),
            coin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRow {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub row_number: usize,
    pub trust_display: String,
    pub trust_level: Option<TrustLevel>,
    pub volume_display: String,
    pub normalized_volume_display: String,
    pub open_interest_display: String,
    pub market_type: &'static str,
    pub country_display: String,
    pub year_display: String,
}

impl ExchangeRow {
    pub fn new(exchange: Exchange, row_number: usize) -> Self {
        Self {
            row_number,
            trust_display: format_trust_score(exchange.trust_score),
            trust_level: TrustLevel::from_score(exchange.trust_score),
            volume_display: format!(
                "${} BTC",
                format_optional_compact(exchange.trade_volume_24h_btc)
            ),
            normalized_volume_display: format_optional_compact(
                exchange.trade_volume_24h_btc_normalized.filter(|v| *v != 0.0),
            ),
            open_interest_display: format_optional_compact(
                exchange.open_interest_btc.filter(|v| *v != 0.0),
            ),
            market_type: if exchange.has_trading_incentive == Some(true) {
                "Derivatives"
            } else {
                "Spot"
            },
            country_display: exchange
                .country
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            year_display: exchange
                .year_established
                .map(|year| year.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            exchange,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NftRow {
    #[serde(flatten)]
    pub collection: NftCollection,
    pub row_number: usize,
    pub floor_display: String,
    pub day_change_display: String,
    pub week_change_display: String,
    pub supply_display: String,
    pub volume_display: String,
    pub owners_display: String,
    pub trend: Trend,
}

impl NftRow {
    pub fn new(collection: NftCollection, row_number: usize) -> Self {
        Self {
            row_number,
            floor_display: format!("{:.1} ETH", collection.floor_price),
            day_change_display: format_percent_change(Some(collection.day_change)),
            week_change_display: format_percent_change(Some(collection.week_change)),
            supply_display: format_grouped(collection.total_supply as f64),
            volume_display: format!("{:.1}K ETH", collection.volume_24h / 1000.0),
            owners_display: format_grouped(collection.owners as f64),
            trend: Trend::from_change(Some(collection.day_change)),
            collection,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeSummary {
    pub total_exchanges: String,
    pub total_volume: String,
    pub btc_dominance: String,
    pub top_exchange: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NftSummary {
    pub total_collections: String,
    pub total_volume: String,
    pub total_owners: String,
    pub floor_cap: String,
    pub raw: NftMarketStats,
}

impl From<NftMarketStats> for NftSummary {
    fn from(stats: NftMarketStats) -> Self {
        Self {
            total_collections: format_grouped(stats.total_collections as f64),
            total_volume: format!("{:.1}K", stats.total_volume / 1000.0),
            total_owners: format_grouped(stats.total_owners as f64),
            floor_cap: format!("{:.1}K", stats.floor_cap / 1000.0),
            raw: stats,
        }
    }
}

/// Stats block shown above a list.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PageSummary {
    Market(GlobalStatsView),
    Exchanges(ExchangeSummary),
    Nfts(NftSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<R> {
    pub page: PageKind,
    pub rows: Vec<R>,
    pub page_info: PageInfo,
    pub view: ViewState,
    pub filters: Vec<ListFilter>,
    pub summary: Option<PageSummary>,
    /// Why the summary could not be refreshed on this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
    #[serde(flatten)]
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsResponseView {
    #[serde(flatten)]
    pub feed: NewsFeed,
    #[serde(flatten)]
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeResponse {
    pub theme: shared::Theme,
    pub icon: &'static str,
}

impl From<shared::Theme> for ThemeResponse {
    fn from(theme: shared::Theme) -> Self {
        Self {
            theme,
            icon: theme.icon_class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{DominanceShare, Sparkline, UsdAmount};

    fn sample_coin() -> Coin {
        Coin {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            image: None,
            current_price: Some(64_250.5),
            market_cap: Some(1_200_000_000_000.0),
            market_cap_rank: Some(1),
            total_volume: None,
            price_change_percentage_24h: Some(-1.5),
            price_change_percentage_7d_in_currency: Some(3.0),
            sparkline_in_7d: None,
            sparkline_in_24h: Some(Sparkline {
                price: vec![1.0, 2.0],
            }),
        }
    }

    #[test]
    fn test_global_response_deserialization() {
        let json = r#"{
            "data": {
                "active_cryptocurrencies": 13000,
                "markets": 1100,
                "total_market_cap": {"usd": 2500000000000.0, "eur": 1.0},
                "total_volume": {"usd": 95000000000.0},
                "market_cap_percentage": {"btc": 52.34, "eth": 16.8}
            }
        }"#;

        let response: GlobalResponse = serde_json::from_str(json).unwrap();
        let view = GlobalStatsView::from_stats(&response.data);

        assert_eq!(view.total_coins, "13,000");
        assert_eq!(view.total_exchanges, "1,100");
        assert_eq!(view.total_market_cap, "$2500.0B");
        assert_eq!(view.total_volume, "$95.0B");
        assert_eq!(view.btc_dominance, "52.3%");
    }

    #[test]
    fn test_global_view_missing_fields() {
        let stats = GlobalMarketStats {
            active_cryptocurrencies: None,
            markets: Some(10),
            total_market_cap: UsdAmount { usd: None },
            total_volume: UsdAmount { usd: Some(1_500.0) },
            market_cap_percentage: DominanceShare { btc: None },
        };

        let view = GlobalStatsView::from_stats(&stats);

        assert_eq!(view.total_coins, "N/A");
        assert_eq!(view.total_market_cap, "N/A");
        assert_eq!(view.total_volume, "$1.5K");
        assert_eq!(view.btc_dominance, "N/A");
    }

    #[test]
    fn test_coin_row_display_fields() {
        let row = CoinRow::from(sample_coin());

        assert_eq!(row.price, "$64,250.50");
        assert_eq!(row.change_24h, "-1.50%");
        assert_eq!(row.change_7d, "+3.00%");
        assert_eq!(row.volume_display, "N/A");
        assert_eq!(row.trend, Trend::Down);
        assert_eq!(row.sparkline_path.as_deref(), Some("M 0 40 L 100 2"));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "bitcoin");
        assert_eq!(json["trend"], "down");
    }

    #[test]
    fn test_exchange_row_sentinels() {
        let exchange = Exchange {
            id: "binance".to_string(),
            name: "Binance".to_string(),
            year_established: None,
            country: Some("Cayman Islands".to_string()),
            image: None,
            trust_score: Some(10.0),
            trust_score_rank: Some(1),
            trade_volume_24h_btc: Some(250_000.0),
            trade_volume_24h_btc_normalized: None,
            has_trading_incentive: Some(false),
            open_interest_btc: None,
        };

        let row = ExchangeRow::new(exchange, 21);

        assert_eq!(row.row_number, 21);
        assert_eq!(row.trust_display, "10/10");
        assert_eq!(row.trust_level, Some(TrustLevel::High));
        assert_eq!(row.volume_display, "$250.0K BTC");
        assert_eq!(row.normalized_volume_display, "N/A");
        assert_eq!(row.open_interest_display, "N/A");
        assert_eq!(row.market_type, "Spot");
        assert_eq!(row.year_display, "N/A");
    }

    #[test]
    fn test_nft_summary_formatting() {
        let summary = NftSummary::from(NftMarketStats {
            total_collections: 100,
            total_volume: 25_340.0,
            total_owners: 412_345,
            floor_cap: 3_100_000.0,
        });

        assert_eq!(summary.total_collections, "100");
        assert_eq!(summary.total_volume, "25.3K");
        assert_eq!(summary.total_owners, "412,345");
        assert_eq!(summary.floor_cap, "3100.0K");
    }
}
