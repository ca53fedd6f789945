use log::{info, log, Level};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use shared::view::DEFAULT_PAGE_SIZE;

use crate::client::{PRO_BASE_URL, PUBLIC_BASE_URL};
use crate::error::ConfigError;
use crate::news::{CRYPTO_DOMAINS, NEWS_BASE_URL};

const ENV_FILE: &str = "crates/server/.env.server";
const DEFAULT_DASHBOARD_CONFIG: &str = "crates/server/dashboard.toml";

/// Optional `dashboard.toml` overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub coins_page_size: NonZeroUsize,
    pub exchanges_page_size: NonZeroUsize,
    pub nfts_page_size: NonZeroUsize,
    pub news_domains: Vec<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            coins_page_size: DEFAULT_PAGE_SIZE,
            exchanges_page_size: DEFAULT_PAGE_SIZE,
            nfts_page_size: DEFAULT_PAGE_SIZE,
            news_domains: CRYPTO_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl DashboardSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// A message raised while loading, before the logger is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNote {
    pub level: Level,
    pub message: String,
}

fn note(notes: &mut Vec<ConfigNote>, level: Level, message: String) {
    notes.push(ConfigNote { level, message });
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: String,
    pub news_api_key: Option<String>,
    pub news_base_url: String,
    pub log_level: String,
    pub http_host: String,
    pub http_port: u16,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub search_debounce: Duration,
    pub theme_store_path: PathBuf,
    pub dashboard: DashboardSettings,
    /// Replayed by `setup_logging`.
    pub notes: Vec<ConfigNote>,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut notes = Vec::new();
        match dotenv::from_filename(ENV_FILE) {
            Ok(path) => note(&mut notes, Level::Info, format!("Loaded environment from {}", path.display())),
            Err(e) => note(
                &mut notes,
                Level::Info,
                format!("No {} loaded ({}), using process environment", ENV_FILE, e),
            ),
        }

        let coingecko_api_key = optional_env("COINGECKO_API_KEY");
        if coingecko_api_key.is_none() {
            note(
                &mut notes,
                Level::Info,
                "COINGECKO_API_KEY not set, using the public CoinGecko API".to_string(),
            );
        }

        let news_api_key = optional_env("NEWS_API_KEY");
        if news_api_key.is_none() {
            note(
                &mut notes,
                Level::Warn,
                "NEWS_API_KEY not set, the news page will stay empty".to_string(),
            );
        }

        let dashboard = match std::env::var("DASHBOARD_CONFIG") {
            Ok(path) => DashboardSettings::load_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_DASHBOARD_CONFIG).exists() => {
                DashboardSettings::load_file(Path::new(DEFAULT_DASHBOARD_CONFIG))?
            }
            Err(_) => DashboardSettings::default(),
        };

        Ok(ServerConfig {
            coingecko_base_url: coingecko_base_url(coingecko_api_key.as_deref()).to_string(),
            coingecko_api_key,
            news_api_key,
            news_base_url: NEWS_BASE_URL.to_string(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            http_host: env_parse("HTTP_HOST", "127.0.0.1".to_string(), &mut notes),
            http_port: env_parse("HTTP_PORT", 8080, &mut notes),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECONDS", 300, &mut notes)),
            refresh_interval: Duration::from_secs(env_parse(
                "REFRESH_INTERVAL_SECONDS",
                300,
                &mut notes,
            )),
            search_debounce: Duration::from_millis(env_parse("SEARCH_DEBOUNCE_MS", 300, &mut notes)),
            theme_store_path: PathBuf::from(env_parse(
                "THEME_STORE_PATH",
                "coin-watch-prefs.json".to_string(),
                &mut notes,
            )),
            dashboard,
            notes,
        })
    }

    pub fn setup_logging(&self) {
        shared::logging::init_logging(&self.log_level);
        info!("Logging initialized with level: {}", self.log_level);
        for note in &self.notes {
            log!(note.level, "{}", note.message);
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            coingecko_api_key: None,
            coingecko_base_url: PUBLIC_BASE_URL.to_string(),
            news_api_key: None,
            news_base_url: NEWS_BASE_URL.to_string(),
            log_level: "INFO".to_string(),
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            cache_ttl: shared::cache::DEFAULT_TTL,
            refresh_interval: Duration::from_secs(300),
            search_debounce: shared::debounce::DEFAULT_SEARCH_DEBOUNCE,
            theme_store_path: PathBuf::from("coin-watch-prefs.json"),
            dashboard: DashboardSettings::default(),
            notes: Vec::new(),
        }
    }
}

/// The pro API is used whenever a key is configured.
pub fn coingecko_base_url(api_key: Option<&str>) -> &'static str {
    match api_key {
        Some(_) => PRO_BASE_URL,
        None => PUBLIC_BASE_URL,
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str, default: T, notes: &mut Vec<ConfigNote>) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            note(
                notes,
                Level::Warn,
                format!("{}='{}' is not valid, using default ({})", name, raw, default),
            );
            default
        }),
        Err(_) => {
            note(notes, Level::Info, format!("{} not set, using default ({})", name, default));
            default
        }
    }
}
