use actix_web::{get, post, web, HttpResponse, Responder};
use log::{info, warn};
use std::time::{Instant, SystemTime};

use shared::{lock_or_recover, Exchange, ListFilter, PageKind, TrustThreshold, ViewError};

use crate::data::{
    load_coins, load_exchanges, load_global, refresh_news, NewsRequest, EXCHANGES_KEY, COINS_KEY,
};
use crate::news::{filter_query, search_query};
use crate::types::{
    AppState, CoinRow, ErrorResponse, ExchangeRow, ExchangeSummary, FilterRequest, Freshness,
    GlobalResponseView, GlobalStatsView, ListResponse, NewsResponseView, NftRow, NftSummary,
    PageSummary, SearchRequest, ThemeResponse, TrustRequest,
};

/// Runs `$body` against the page controller for `$kind`, with the lock
/// held only for the body.
macro_rules! with_controller {
    ($state:expr, $kind:expr, |$controller:ident| $body:expr) => {
        match $kind {
            PageKind::Coins => {
                let mut $controller = lock_or_recover(&$state.coins);
                $body
            }
            PageKind::Exchanges => {
                let mut $controller = lock_or_recover(&$state.exchanges);
                $body
            }
            PageKind::Nfts => {
                let mut $controller = lock_or_recover(&$state.nfts);
                $body
            }
        }
    };
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    web::Json(serde_json::json!({
        "status": "ok",
        "timestamp": SystemTime::now()
    }))
}

#[get("/api/global")]
pub async fn get_global(data: web::Data<AppState>) -> impl Responder {
    let loaded = load_global(&data, data.cache_ttl).await;
    web::Json(GlobalResponseView {
        stats: loaded.payload.as_ref().map(GlobalStatsView::from_stats),
        freshness: loaded.freshness(),
    })
}

#[get("/api/theme")]
pub async fn get_theme(data: web::Data<AppState>) -> impl Responder {
    web::Json(ThemeResponse::from(data.themes.load()))
}

#[post("/api/theme/toggle")]
pub async fn toggle_theme(data: web::Data<AppState>) -> HttpResponse {
    match data.themes.toggle() {
        Ok(theme) => {
            info!("Theme switched to {}", theme);
            HttpResponse::Ok().json(ThemeResponse::from(theme))
        }
        Err(e) => {
            warn!("Failed to save theme preference: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

#[get("/api/news")]
pub async fn get_news(data: web::Data<AppState>) -> impl Responder {
    let freshness = refresh_news(&data, NewsRequest::Current).await;
    web::Json(news_view(&data, freshness))
}

#[post("/api/news/search")]
pub async fn search_news(
    data: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> impl Responder {
    let query = search_query(&body.term, data.news_client.domains());
    let freshness = refresh_news(&data, NewsRequest::Query(query)).await;
    web::Json(news_view(&data, freshness))
}

#[post("/api/news/filter")]
pub async fn filter_news(
    data: web::Data<AppState>,
    body: web::Json<FilterRequest>,
) -> impl Responder {
    let freshness = refresh_news(&data, NewsRequest::Query(filter_query(&body.filter))).await;
    web::Json(news_view(&data, freshness))
}

#[post("/api/news/more")]
pub async fn more_news(data: web::Data<AppState>) -> impl Responder {
    let freshness = refresh_news(&data, NewsRequest::More).await;
    web::Json(news_view(&data, freshness))
}

#[get("/api/{page}")]
pub async fn get_page(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let (freshness, summary_error) = match kind {
        PageKind::Coins => {
            let summary_error = refresh_summary(&data, kind).await;
            (load_coins(&data, data.cache_ttl).await.freshness(), summary_error)
        }
        PageKind::Exchanges => {
            let summary_error = refresh_summary(&data, kind).await;
            (load_exchanges(&data, data.cache_ttl).await.freshness(), summary_error)
        }
        PageKind::Nfts => (Freshness::default(), None),
    };
    render_page(&data, kind, freshness, summary_error)
}

/// Global stats feed the coins and exchanges summary cards.
async fn refresh_summary(data: &AppState, kind: PageKind) -> Option<String> {
    let global = load_global(data, data.cache_ttl).await;
    if let Some(e) = &global.error {
        warn!("Global stats for the {} summary not refreshed: {}", kind, e);
    }
    global.error
}

#[post("/api/{page}/search")]
pub async fn search_page(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SearchRequest>,
) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let term = body.into_inner().term;
    let (token, delay) = with_controller!(data, kind, |controller| {
        (controller.input_search(term, Instant::now()), controller.search_delay())
    });

    // Only the last keystroke of a burst gets applied.
    tokio::time::sleep(delay).await;
    let applied = with_controller!(data, kind, |controller| controller
        .settle_search(token, Instant::now()));
    if !applied {
        info!("Search on {} page superseded by newer input", kind);
    }

    render_page(&data, kind, cached_freshness(&data, kind), None)
}

#[post("/api/{page}/filter")]
pub async fn filter_page(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<FilterRequest>,
) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let result = body
        .filter
        .parse::<ListFilter>()
        .and_then(|filter| with_controller!(data, kind, |controller| controller.select_filter(filter)));
    match result {
        Ok(()) => render_page(&data, kind, cached_freshness(&data, kind), None),
        Err(e) => bad_request(e),
    }
}

#[post("/api/{page}/trust")]
pub async fn set_trust(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<TrustRequest>,
) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let result = body.threshold.parse::<TrustThreshold>().and_then(|threshold| {
        with_controller!(data, kind, |controller| controller.set_trust_threshold(threshold))
    });
    match result {
        Ok(()) => render_page(&data, kind, cached_freshness(&data, kind), None),
        Err(e) => bad_request(e),
    }
}

#[post("/api/{page}/next")]
pub async fn next_page(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    with_controller!(data, kind, |controller| controller.next_page());
    render_page(&data, kind, cached_freshness(&data, kind), None)
}

#[post("/api/{page}/prev")]
pub async fn prev_page(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let kind = match parse_page(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    with_controller!(data, kind, |controller| controller.prev_page());
    render_page(&data, kind, cached_freshness(&data, kind), None)
}

/// Registers every route. The fixed paths go first so `/api/{page}` does
/// not swallow them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(get_global)
        .service(get_theme)
        .service(toggle_theme)
        .service(get_news)
        .service(search_news)
        .service(filter_news)
        .service(more_news)
        .service(get_page)
        .service(search_page)
        .service(filter_page)
        .service(set_trust)
        .service(next_page)
        .service(prev_page);
}

fn parse_page(raw: &str) -> Result<PageKind, HttpResponse> {
    raw.parse::<PageKind>().map_err(|e| {
        HttpResponse::NotFound().json(ErrorResponse {
            error: e.to_string(),
        })
    })
}

fn bad_request(e: ViewError) -> HttpResponse {
    info!("Rejected view change: {}", e);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: e.to_string(),
    })
}

/// Age of the snapshot behind a page, without fetching anything.
fn cached_freshness(state: &AppState, kind: PageKind) -> Freshness {
    let now = SystemTime::now();
    let entry_freshness = |fetched_at: Option<SystemTime>| {
        let stale = fetched_at.map_or(true, |at| {
            now.duration_since(at).unwrap_or_default() >= state.cache_ttl
        });
        Freshness::new(fetched_at, stale, None)
    };

    match kind {
        PageKind::Coins => {
            entry_freshness(lock_or_recover(&state.coin_cache).get(COINS_KEY).map(|e| e.fetched_at))
        }
        PageKind::Exchanges => entry_freshness(
            lock_or_recover(&state.exchange_cache)
                .get(EXCHANGES_KEY)
                .map(|e| e.fetched_at),
        ),
        PageKind::Nfts => Freshness::default(),
    }
}

fn global_summary(state: &AppState) -> Option<GlobalStatsView> {
    lock_or_recover(&state.global_cache)
        .get(crate::data::GLOBAL_KEY)
        .map(|entry| GlobalStatsView::from_stats(&entry.payload))
}

/// The exchange ranked first by trust, else the first listed.
pub fn top_exchange(exchanges: &[Exchange]) -> Option<&Exchange> {
    exchanges
        .iter()
        .find(|exchange| exchange.trust_score_rank == Some(1))
        .or_else(|| exchanges.first())
}

fn render_page(
    state: &AppState,
    kind: PageKind,
    freshness: Freshness,
    summary_error: Option<String>,
) -> HttpResponse {
    match kind {
        PageKind::Coins => {
            let (page, view) = {
                let mut controller = lock_or_recover(&state.coins);
                (controller.display(), controller.view().clone())
            };
            HttpResponse::Ok().json(ListResponse {
                page: kind,
                rows: page.items.into_iter().map(CoinRow::from).collect(),
                page_info: page.page_info,
                view,
                filters: kind.filters().to_vec(),
                summary: global_summary(state).map(PageSummary::Market),
                summary_error,
                freshness,
            })
        }
        PageKind::Exchanges => {
            let (page, view, top) = {
                let mut controller = lock_or_recover(&state.exchanges);
                let top = top_exchange(controller.entities()).map(|e| e.name.clone());
                (controller.display(), controller.view().clone(), top)
            };
            let summary = global_summary(state).map(|global| {
                PageSummary::Exchanges(ExchangeSummary {
                    total_exchanges: global.total_exchanges,
                    total_volume: global.total_volume,
                    btc_dominance: global.btc_dominance,
                    top_exchange: top,
                })
            });
            let offset = page.page_info.offset;
            HttpResponse::Ok().json(ListResponse {
                page: kind,
                rows: page
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(i, exchange)| ExchangeRow::new(exchange, offset + i + 1))
                    .collect(),
                page_info: page.page_info,
                view,
                filters: kind.filters().to_vec(),
                summary,
                summary_error,
                freshness,
            })
        }
        PageKind::Nfts => {
            let (page, view, stats) = {
                let mut controller = lock_or_recover(&state.nfts);
                let stats = shared::NftMarketStats::from_collections(controller.entities());
                (controller.display(), controller.view().clone(), stats)
            };
            let offset = page.page_info.offset;
            HttpResponse::Ok().json(ListResponse {
                page: kind,
                rows: page
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(i, collection)| NftRow::new(collection, offset + i + 1))
                    .collect(),
                page_info: page.page_info,
                view,
                filters: kind.filters().to_vec(),
                summary: Some(PageSummary::Nfts(NftSummary::from(stats))),
                summary_error,
                freshness,
            })
        }
    }
}

fn news_view(state: &AppState, freshness: Freshness) -> NewsResponseView {
    NewsResponseView {
        feed: lock_or_recover(&state.news).clone(),
        freshness,
    }
}
