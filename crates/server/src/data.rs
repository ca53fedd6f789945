use actix_web::web;
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tokio::time;

use shared::{
    lock_or_recover, CacheLookup, Coin, DataCache, Exchange, GlobalMarketStats, InFlight,
    NewsArticle,
};

use crate::error::FetchError;
use crate::nft::generate_collections;
use crate::types::{AppState, Freshness};

pub const GLOBAL_KEY: &str = "global-market-stats";
pub const COINS_KEY: &str = "coins-page-1";
pub const EXCHANGES_KEY: &str = "exchanges";
pub const NEWS_SLOT: &str = "news";

pub fn news_key(query: &str, page: u32) -> String {
    format!("news:{}:{}", query, page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Fresh cache entry, no request made.
    Cache,
    Network,
    /// The refresh failed or was already running; last good entry served.
    StaleCache,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Loaded<P> {
    pub payload: Option<P>,
    pub fetched_at: Option<SystemTime>,
    pub source: DataSource,
    pub error: Option<String>,
}

impl<P> Loaded<P> {
    pub fn is_stale(&self) -> bool {
        matches!(self.source, DataSource::StaleCache | DataSource::Unavailable)
    }

    pub fn freshness(&self) -> Freshness {
        Freshness::new(self.fetched_at, self.is_stale(), self.error.clone())
    }
}

/// Serves `key` from cache while fresh, otherwise fetches it.
///
/// A failed fetch never touches the cache: the previous entry, if any, is
/// served and flagged stale. While another fetch for the same key runs,
/// whatever the cache holds is served instead of starting a second one.
pub async fn load_through_cache<P, F, Fut>(
    cache: &Mutex<DataCache<P>>,
    in_flight: &InFlight,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Loaded<P>
where
    P: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P, FetchError>>,
{
    {
        let cache = lock_or_recover(cache);
        if let CacheLookup::Fresh(entry) = cache.lookup(key, ttl, SystemTime::now()) {
            debug!("Cache hit for {}", key);
            return Loaded {
                payload: Some(entry.payload.clone()),
                fetched_at: Some(entry.fetched_at),
                source: DataSource::Cache,
                error: None,
            };
        }
    }

    let Some(_guard) = in_flight.try_acquire(key) else {
        return fall_back(cache, key, None);
    };

    match fetch().await {
        Ok(payload) => {
            let now = SystemTime::now();
            lock_or_recover(cache).put(key, payload.clone(), now);
            info!("Refreshed {}", key);
            Loaded {
                payload: Some(payload),
                fetched_at: Some(now),
                source: DataSource::Network,
                error: None,
            }
        }
        Err(e) => {
            warn!("Failed to refresh {}: {}", key, e);
            fall_back(cache, key, Some(e.to_string()))
        }
    }
}

fn fall_back<P: Clone>(
    cache: &Mutex<DataCache<P>>,
    key: &str,
    error: Option<String>,
) -> Loaded<P> {
    match lock_or_recover(cache).get(key) {
        Some(entry) => {
            debug!("Serving cached {} from {:?}", key, entry.fetched_at);
            Loaded {
                payload: Some(entry.payload.clone()),
                fetched_at: Some(entry.fetched_at),
                source: DataSource::StaleCache,
                error,
            }
        }
        None => Loaded {
            payload: None,
            fetched_at: None,
            source: DataSource::Unavailable,
            error: Some(error.unwrap_or_else(|| format!("{} is still loading", key))),
        },
    }
}

pub async fn load_global(state: &AppState, ttl: Duration) -> Loaded<GlobalMarketStats> {
    load_through_cache(&state.global_cache, &state.in_flight, GLOBAL_KEY, ttl, || {
        state.coingecko.fetch_global()
    })
    .await
}

/// Loads the coin snapshot and hands a newly fetched one to the page.
pub async fn load_coins(state: &AppState, ttl: Duration) -> Loaded<Vec<Coin>> {
    let loaded = load_through_cache(&state.coin_cache, &state.in_flight, COINS_KEY, ttl, || {
        state.coingecko.fetch_coin_markets()
    })
    .await;

    if loaded.source == DataSource::Network {
        if let Some(coins) = &loaded.payload {
            lock_or_recover(&state.coins).replace_entities(coins.clone());
        }
    }
    loaded
}

pub async fn load_exchanges(state: &AppState, ttl: Duration) -> Loaded<Vec<Exchange>> {
    let loaded = load_through_cache(
        &state.exchange_cache,
        &state.in_flight,
        EXCHANGES_KEY,
        ttl,
        || state.coingecko.fetch_exchanges(),
    )
    .await;

    if loaded.source == DataSource::Network {
        if let Some(exchanges) = &loaded.payload {
            lock_or_recover(&state.exchanges).replace_entities(exchanges.clone());
        }
    }
    loaded
}

/// What the news page asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsRequest {
    /// Show the feed, loading the first page if nothing is loaded yet.
    Current,
    /// New query; the feed starts over at page 1.
    Query(String),
    /// Append the next page of the current query.
    More,
}

/// Loads a news page and merges it into the feed, unless a later request
/// has started in the meantime.
pub async fn refresh_news(state: &AppState, request: NewsRequest) -> Freshness {
    let (ticket, query, page) = {
        let mut feed = lock_or_recover(&state.news);
        match request {
            NewsRequest::Current if feed.page() > 0 => return Freshness::default(),
            NewsRequest::Query(query) => feed.set_query(query),
            NewsRequest::Current | NewsRequest::More => {}
        }
        let ticket = lock_or_recover(&state.sequencer).begin(NEWS_SLOT);
        (ticket, feed.query().to_string(), feed.next_page())
    };

    let loaded: Loaded<Vec<NewsArticle>> = load_through_cache(
        &state.news_cache,
        &state.in_flight,
        &news_key(&query, page),
        state.cache_ttl,
        || state.news_client.fetch_page(&query, page),
    )
    .await;

    let current = lock_or_recover(&state.sequencer).complete(&ticket);
    let mut feed = lock_or_recover(&state.news);
    let awaited = feed.awaits(&query, page);

    // A later request for the same page may hold the newer ticket while
    // waiting on this fetch, so the feed's target decides, not the ticket alone.
    if !current && !awaited {
        return Freshness::new(loaded.fetched_at, false, Some(FetchError::Superseded.to_string()));
    }

    if awaited {
        if let Some(articles) = &loaded.payload {
            feed.apply_page(page, articles.clone());
        }
    }
    loaded.freshness()
}

/// Fills the NFT page; there is no upstream to refresh it from.
pub fn seed_nfts<R: Rng + ?Sized>(state: &AppState, rng: &mut R) {
    let collections = generate_collections(rng);
    info!("Generated {} NFT collections", collections.len());
    lock_or_recover(&state.nfts).replace_entities(collections);
}

/// Re-fetches global stats, coins and exchanges on a fixed interval,
/// bypassing the freshness check.
pub async fn refresh_periodically(state: web::Data<AppState>) {
    let period = state.refresh_interval.max(Duration::from_secs(1));
    let mut interval = time::interval(period);

    loop {
        interval.tick().await;

        info!("Refreshing market data");
        let global = load_global(&state, Duration::ZERO).await;
        let coins = load_coins(&state, Duration::ZERO).await;
        let exchanges = load_exchanges(&state, Duration::ZERO).await;

        info!(
            "Refresh done: global {:?}, {} coins ({:?}), {} exchanges ({:?})",
            global.source,
            coins.payload.as_ref().map_or(0, Vec::len),
            coins.source,
            exchanges.payload.as_ref().map_or(0, Vec::len),
            exchanges.source
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_state() -> AppState {
        AppState::new(&ServerConfig {
            coingecko_base_url: "http://127.0.0.1:9".to_string(),
            news_base_url: "http://127.0.0.1:9".to_string(),
            ..ServerConfig::default()
        })
    }

    /// NewsAPI stand-in that answers every request after `delay`.
    async fn slow_news_server(count: usize, delay: Duration) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let articles: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "source": {"name": "CoinDesk"},
                    "title": format!("Crypto market update {}", i),
                    "url": format!("https://coindesk.com/markets/{}", i),
                })
            })
            .collect();
        let body = serde_json::json!({"status": "ok", "totalResults": count, "articles": articles}).to_string();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = body.clone();
                tokio::spawn(async move {
                    let mut request = [0u8; 4096];
                    let _ = socket.read(&mut request).await;
                    time::sleep(delay).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn news_state(base_url: String) -> AppState {
        AppState::new(&ServerConfig {
            coingecko_base_url: "http://127.0.0.1:9".to_string(),
            news_base_url: base_url,
            news_api_key: Some("test-key".to_string()),
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_overlapping_news_loads_fill_feed_once() {
        let (base_url, hits) = slow_news_server(20, Duration::from_millis(300)).await;
        let state = news_state(base_url);

        let (first, second) = tokio::join!(refresh_news(&state, NewsRequest::Current), async {
            time::sleep(Duration::from_millis(50)).await;
            refresh_news(&state, NewsRequest::Current).await
        });

        assert!(first.error.is_none(), "first load: {:?}", first.error);
        assert!(second.stale);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let feed = state.news.lock().unwrap();
        assert_eq!(feed.page(), 1);
        assert_eq!(feed.articles().len(), 20);
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn test_repeated_load_more_appends_one_page() {
        let (base_url, hits) = slow_news_server(20, Duration::from_millis(200)).await;
        let state = news_state(base_url);
        refresh_news(&state, NewsRequest::Current).await;

        let (first, second) = tokio::join!(refresh_news(&state, NewsRequest::More), async {
            time::sleep(Duration::from_millis(50)).await;
            refresh_news(&state, NewsRequest::More).await
        });

        assert!(first.error.is_none(), "first load: {:?}", first.error);
        assert!(second.stale);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        let feed = state.news.lock().unwrap();
        assert_eq!(feed.page(), 2);
        assert_eq!(feed.articles().len(), 40);
    }

    #[tokio::test]
    async fn test_news_response_for_old_query_is_dropped() {
        let (base_url, _hits) = slow_news_server(20, Duration::from_millis(300)).await;
        let state = news_state(base_url);
        let ethereum = crate::news::filter_query("ethereum");
        let article: NewsArticle = serde_json::from_str(
            r#"{"source": {"name": "Decrypt"}, "title": "Ethereum crypto upgrade", "url": "https://decrypt.co/e"}"#,
        )
        .unwrap();
        state
            .news_cache
            .lock()
            .unwrap()
            .put(news_key(&ethereum, 1), vec![article], SystemTime::now());

        let (old, new) = tokio::join!(refresh_news(&state, NewsRequest::Current), async {
            time::sleep(Duration::from_millis(50)).await;
            refresh_news(&state, NewsRequest::Query(ethereum.clone())).await
        });

        assert_eq!(old.error.as_deref(), Some(FetchError::Superseded.to_string().as_str()));
        assert!(new.error.is_none());
        let feed = state.news.lock().unwrap();
        assert_eq!(feed.query(), ethereum);
        assert_eq!(feed.articles().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let cache = Mutex::new(DataCache::new());
        cache.lock().unwrap().put("exchanges", vec![1], SystemTime::now());
        let calls = AtomicUsize::new(0);

        let loaded = load_through_cache(&cache, &InFlight::new(), "exchanges", Duration::from_secs(60), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![2]) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.payload, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let cache = Mutex::new(DataCache::new());
        cache.lock().unwrap().put("exchanges", vec![1], SystemTime::now());

        let loaded = load_through_cache(&cache, &InFlight::new(), "exchanges", Duration::ZERO, || async {
            Ok(vec![2])
        })
        .await;

        assert_eq!(loaded.source, DataSource::Network);
        assert!(!loaded.is_stale());
        assert_eq!(cache.lock().unwrap().get("exchanges").unwrap().payload, vec![2]);
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_previous_entry() {
        let cache = Mutex::new(DataCache::new());
        cache.lock().unwrap().put("coins-page-1", vec![1], SystemTime::now());

        let loaded = load_through_cache(&cache, &InFlight::new(), "coins-page-1", Duration::ZERO, || async {
            Err::<Vec<i32>, _>(FetchError::Timeout)
        })
        .await;

        assert_eq!(loaded.source, DataSource::StaleCache);
        assert_eq!(loaded.payload, Some(vec![1]));
        assert_eq!(loaded.error.as_deref(), Some("Request timed out"));
        assert!(loaded.freshness().stale);
        assert_eq!(cache.lock().unwrap().get("coins-page-1").unwrap().payload, vec![1]);
    }

    #[tokio::test]
    async fn test_failed_fetch_without_entry_is_unavailable() {
        let cache: Mutex<DataCache<Vec<i32>>> = Mutex::new(DataCache::new());

        let loaded = load_through_cache(&cache, &InFlight::new(), "global-market-stats", Duration::ZERO, || async {
            Err(FetchError::Status(503))
        })
        .await;

        assert_eq!(loaded.source, DataSource::Unavailable);
        assert!(loaded.payload.is_none());
        assert!(cache.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_key_serves_cache_without_fetching() {
        let cache = Mutex::new(DataCache::new());
        cache.lock().unwrap().put("exchanges", vec![1], SystemTime::UNIX_EPOCH);
        let in_flight = InFlight::new();
        let _running = in_flight.try_acquire("exchanges").unwrap();
        let calls = AtomicUsize::new(0);

        let loaded = load_through_cache(&cache, &in_flight, "exchanges", Duration::from_secs(60), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![2]) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(loaded.source, DataSource::StaleCache);
        assert_eq!(loaded.payload, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_keeps_pages_empty() {
        let state = test_state();

        let coins = load_coins(&state, state.cache_ttl).await;
        let global = load_global(&state, state.cache_ttl).await;

        assert_eq!(coins.source, DataSource::Unavailable);
        assert!(coins.error.is_some());
        assert_eq!(global.source, DataSource::Unavailable);
        assert!(state.coins.lock().unwrap().entities().is_empty());
    }

    #[tokio::test]
    async fn test_news_without_key_reports_error() {
        let state = test_state();

        let freshness = refresh_news(&state, NewsRequest::Current).await;

        assert!(freshness.stale);
        assert!(freshness.error.unwrap().contains("NEWS_API_KEY"));
        assert!(state.news.lock().unwrap().articles().is_empty());
    }

    #[tokio::test]
    async fn test_news_query_resets_feed_and_uses_cache() {
        let state = test_state();
        let query = crate::news::filter_query("bitcoin");
        let article: NewsArticle = serde_json::from_str(
            r#"{"source": {"name": "Decrypt"}, "title": "Bitcoin crypto rally", "url": "https://decrypt.co/a"}"#,
        )
        .unwrap();
        state
            .news_cache
            .lock()
            .unwrap()
            .put(news_key(&query, 1), vec![article], SystemTime::now());

        let freshness = refresh_news(&state, NewsRequest::Query(query.clone())).await;

        assert!(!freshness.stale);
        let feed = state.news.lock().unwrap();
        assert_eq!(feed.query(), query);
        assert_eq!(feed.page(), 1);
        assert_eq!(feed.articles().len(), 1);
        assert!(!feed.has_more());
    }

    #[test]
    fn test_seed_nfts_fills_page() {
        let state = test_state();

        seed_nfts(&state, &mut StdRng::seed_from_u64(3));

        assert_eq!(state.nfts.lock().unwrap().entities().len(), 100);
    }

    #[test]
    fn test_news_key_format() {
        assert_eq!(news_key("crypto", 2), "news:crypto:2");
    }
}
