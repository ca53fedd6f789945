use log::{debug, error, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use shared::{Coin, Exchange, GlobalMarketStats};

use crate::error::FetchError;
use crate::types::GlobalResponse;

pub const PUBLIC_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

pub const GLOBAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko market endpoints used by the dashboard.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    global_timeout: Duration,
    list_timeout: Duration,
}

impl CoinGeckoClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            global_timeout: GLOBAL_TIMEOUT,
            list_timeout: LIST_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, global: Duration, list: Duration) -> Self {
        self.global_timeout = global;
        self.list_timeout = list;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_global(&self) -> Result<GlobalMarketStats, FetchError> {
        let response: GlobalResponse = self.get_json("/global", &[], self.global_timeout).await?;
        Ok(response.data)
    }

    /// Top 100 coins by market cap, with 7-day sparklines and the derived
    /// 24h sparkline.
    pub async fn fetch_coin_markets(&self) -> Result<Vec<Coin>, FetchError> {
        let coins: Vec<Coin> = self
            .get_json(
                "/coins/markets",
                &[
                    ("vs_currency", "usd"),
                    ("order", "market_cap_desc"),
                    ("per_page", "100"),
                    ("page", "1"),
                    ("sparkline", "true"),
                    ("price_change_percentage", "24h,7d"),
                ],
                self.list_timeout,
            )
            .await?;
        Ok(coins.into_iter().map(Coin::with_recent_sparkline).collect())
    }

    pub async fn fetch_exchanges(&self) -> Result<Vec<Exchange>, FetchError> {
        self.get_json("/exchanges", &[("per_page", "250")], self.list_timeout)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .timeout(timeout);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            match status.as_u16() {
                429 => warn!("CoinGecko rate limit reached on {}", path),
                401 | 403 => error!("CoinGecko rejected the request - check COINGECKO_API_KEY"),
                _ => error!("CoinGecko returned status {} for {}", status, path),
            }
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CoinGeckoClient::new(Client::new(), "http://localhost:1234/api/v3/", None);

        assert_eq!(client.base_url(), "http://localhost:1234/api/v3");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_an_error() {
        let client = CoinGeckoClient::new(Client::new(), "http://127.0.0.1:9", None)
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));

        assert!(client.fetch_global().await.is_err());
        assert!(client.fetch_exchanges().await.is_err());
    }
}
