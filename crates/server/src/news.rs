use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use shared::NewsArticle;

use crate::error::FetchError;

pub const NEWS_BASE_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_NEWS_QUERY: &str = "cryptocurrency OR crypto OR blockchain";
pub const NEWS_PAGE_SIZE: u32 = 25;
pub const NEWS_TIMEOUT: Duration = Duration::from_secs(10);

/// A page this full probably has a successor.
pub const HAS_MORE_THRESHOLD: usize = 18;

pub const CRYPTO_DOMAINS: [&str; 7] = [
    "coindesk.com",
    "cointelegraph.com",
    "decrypt.com",
    "theblock.co",
    "cryptoslate.com",
    "news.bitcoin.com",
    "crypto.news",
];

pub const CRYPTO_KEYWORDS: [&str; 6] = ["crypto", "blockchain", "nft", "defi", "web3", "dapp"];

/// Free-text search restricted to the allowed domains. A blank term falls
/// back to the default query.
pub fn search_query(term: &str, domains: &[String]) -> String {
    let term = term.trim();
    if term.is_empty() {
        return DEFAULT_NEWS_QUERY.to_string();
    }
    let sites: Vec<String> = domains.iter().map(|d| format!("site:{}", d)).collect();
    format!("{} {}", term, sites.join(" OR "))
}

/// Category button query; `all` is the default query.
pub fn filter_query(filter: &str) -> String {
    let filter = filter.trim().to_lowercase();
    if filter.is_empty() || filter == "all" {
        DEFAULT_NEWS_QUERY.to_string()
    } else {
        format!("{} (crypto OR blockchain)", filter)
    }
}

pub fn is_crypto_article(article: &NewsArticle) -> bool {
    let mentions = |text: &Option<String>| {
        text.as_deref().is_some_and(|text| {
            let text = text.to_lowercase();
            CRYPTO_KEYWORDS.iter().any(|keyword| text.contains(keyword))
        })
    };
    mentions(&article.title) || mentions(&article.description)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    domains: Vec<String>,
    timeout: Duration,
}

impl NewsClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        domains: Vec<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            domains,
            timeout: NEWS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// One raw page of the `everything` search, before keyword filtering.
    pub async fn fetch_page(&self, query: &str, page: u32) -> Result<Vec<NewsArticle>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured("NEWS_API_KEY"))?;

        let url = format!("{}/everything", self.base_url);
        debug!("GET {} q='{}' page={}", url, query, page);

        let domains = self.domains.join(",");
        let page = page.to_string();
        let page_size = NEWS_PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("domains", domains.as_str()),
                ("page", page.as_str()),
                ("pageSize", page_size.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
            ])
            .header("X-Api-Key", api_key)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: NewsResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(FetchError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };

        if parsed.status != "ok" {
            let message = parsed.message.unwrap_or_else(|| format!("status {}", status));
            warn!("NewsAPI error: {}", message);
            return Err(FetchError::Api(message));
        }
        Ok(parsed.articles)
    }
}

/// The article list the news page is currently showing.
#[derive(Debug, Clone, Serialize)]
pub struct NewsFeed {
    query: String,
    /// Last page merged into `articles`; 0 before the first load.
    page: u32,
    articles: Vec<NewsArticle>,
    has_more: bool,
}

impl NewsFeed {
    pub fn new() -> Self {
        Self {
            query: DEFAULT_NEWS_QUERY.to_string(),
            page: 0,
            articles: Vec::new(),
            has_more: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn articles(&self) -> &[NewsArticle] {
        &self.articles
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Switches query; the feed starts over empty.
    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.page = 0;
        self.articles.clear();
        self.has_more = false;
    }

    pub fn next_page(&self) -> u32 {
        self.page + 1
    }

    /// True while `page` of `query` is the next page this feed would merge.
    pub fn awaits(&self, query: &str, page: u32) -> bool {
        self.query == query && self.next_page() == page
    }

    /// Page 1 replaces the feed, later pages append. `has_more` looks at the
    /// raw page size, before the keyword filter drops anything.
    pub fn apply_page(&mut self, page: u32, raw: Vec<NewsArticle>) {
        self.has_more = raw.len() >= HAS_MORE_THRESHOLD;
        if page <= 1 {
            self.articles.clear();
        }
        self.articles
            .extend(raw.into_iter().filter(is_crypto_article));
        self.page = page;
    }
}

impl Default for NewsFeed {
    fn default() -> Self {
        Self::new()
    }
}
