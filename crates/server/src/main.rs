// coin-watch server: market, exchange, NFT and news pages over HTTP.

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};

mod client;
mod config;
mod data;
mod error;
mod handlers;
mod news;
mod nft;
mod types;

use config::ServerConfig;
use data::{load_exchanges, refresh_news, refresh_periodically, seed_nfts, NewsRequest};
use types::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = ServerConfig::load().map_err(|e| {
        eprintln!("Failed to load server configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    config.setup_logging();

    let state = web::Data::new(AppState::new(&config));
    seed_nfts(&state, &mut rand::thread_rng());

    // Global stats and coins are loaded by the first refresh tick.
    let state_clone = state.clone();
    tokio::spawn(async move {
        refresh_periodically(state_clone).await;
    });

    let state_clone = state.clone();
    tokio::spawn(async move {
        let exchanges = load_exchanges(&state_clone, state_clone.cache_ttl).await;
        if let Some(e) = exchanges.error {
            warn!("Exchanges not loaded at startup: {}", e);
        }
        let news = refresh_news(&state_clone, NewsRequest::Current).await;
        if let Some(e) = news.error {
            warn!("News not loaded at startup: {}", e);
        }
    });

    info!(
        "Starting coin-watch server on http://{}:{}",
        config.http_host, config.http_port
    );
    info!(
        "Cache TTL {}s, refresh every {}s, theme preference in {}",
        config.cache_ttl.as_secs(),
        config.refresh_interval.as_secs(),
        config.theme_store_path.display()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((config.http_host.as_str(), config.http_port))?
    .run()
    .await
}
