use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub github: GithubConfig,
    pub database: DatabaseConfig,
    pub crawl: CrawlConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STARSCAN_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STARSCAN_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            github: GithubConfig::from_env_profiled(p),
            database: DatabaseConfig::from_env_profiled(p),
            crawl: CrawlConfig::from_env_profiled(p),
            retry: RetryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  github:   url={}, token={}",
            self.github.graphql_url,
            if self.github.is_configured() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  database: host={}:{}, db={}, user={}",
            self.database.host, self.database.port, self.database.database, self.database.user
        );
        tracing::info!(
            "  crawl:    max_items={}, page_size={}, query={:?}",
            self.crawl.max_items, self.crawl.page_size, self.crawl.search_query
        );
        tracing::info!(
            "  retry:    max_retries={}, base_delay={:?}, rate_limit_waits={}",
            self.retry.max_retries,
            self.retry.base_delay(),
            self.retry.max_rate_limit_waits
        );
    }
}

// ── GitHub ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub graphql_url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl GithubConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            graphql_url: profiled_env_or(p, "GITHUB_GRAPHQL_URL", "https://api.github.com/graphql"),
            token: profiled_env_opt(p, "GITHUB_TOKEN"),
            timeout_secs: profiled_env_parse(p, "GITHUB_TIMEOUT_SECS", 30),
        }
    }

    /// The bearer credential; absent or blank tokens are an error.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("GITHUB_TOKEN"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.token().is_ok()
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "DB_HOST", "localhost"),
            port: profiled_env_parse(p, "DB_PORT", 5432),
            database: profiled_env_or(p, "DB_NAME", "github_data"),
            user: profiled_env_or(p, "DB_USER", "postgres"),
            password: profiled_env_opt(p, "DB_PASSWORD"),
            max_connections: profiled_env_parse(p, "DB_MAX_CONNECTIONS", 5),
        }
    }
}

// ── Crawl ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Global item budget for one run.
    pub max_items: u64,
    pub page_size: u32,
    /// Courtesy pause between pages, in milliseconds.
    pub page_delay_ms: u64,
    pub search_query: String,
    /// Upper bound on concurrent upserts within one page.
    pub persist_concurrency: usize,
}

impl CrawlConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_items: profiled_env_parse(p, "CRAWL_MAX_REPOSITORIES", 1000),
            page_size: profiled_env_parse(p, "CRAWL_BATCH_SIZE", 100),
            page_delay_ms: profiled_env_parse(p, "CRAWL_PAGE_DELAY_MS", 1000),
            search_query: profiled_env_or(p, "CRAWL_SEARCH_QUERY", "stars:>100"),
            persist_concurrency: profiled_env_parse(p, "CRAWL_PERSIST_CONCURRENCY", 4),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Reject budgets that would never fetch anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 {
            return Err(ConfigError::Invalid("max_items must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive".into()));
        }
        Ok(())
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            page_size: 100,
            page_delay_ms: 1000,
            search_query: "stars:>100".to_string(),
            persist_concurrency: 4,
        }
    }
}

// ── Retry ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts after the first one for transient failures.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// How many rate-limit waits a single request may sit through.
    pub max_rate_limit_waits: u32,
    pub rate_limit_fallback_secs: u64,
}

impl RetryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_retries: profiled_env_parse(p, "RETRY_MAX_RETRIES", 3),
            base_delay_ms: profiled_env_parse(p, "RETRY_BASE_DELAY_MS", 5000),
            max_rate_limit_waits: profiled_env_parse(p, "RETRY_MAX_RATE_LIMIT_WAITS", 3),
            rate_limit_fallback_secs: profiled_env_parse(p, "RETRY_RATE_LIMIT_FALLBACK_SECS", 60),
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_secs(self.rate_limit_fallback_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 5000,
            max_rate_limit_waits: 3,
            rate_limit_fallback_secs: 60,
        }
    }
}
