use std::{env, str::FromStr, time::Duration};

use rand::Rng;

/// Lifetime of entries written by one cached repository.
///
/// Each cached repository picks `base_ttl` plus a random jitter in
/// `[0, max_jitter)` once, at construction, so instances created together
/// do not expire their entries in the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub base_ttl: Duration,
    pub max_jitter: Duration,
}

impl CacheSettings {
    pub fn new(base_ttl: Duration, max_jitter: Duration) -> Self {
        Self {
            base_ttl,
            max_jitter,
        }
    }

    /// Draws a TTL in `[base_ttl, base_ttl + max_jitter)`.
    pub fn jittered_ttl(&self) -> Duration {
        let max_millis = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_millis == 0 {
            return self.base_ttl;
        }
        let jitter = rand::rng().random_range(0..max_millis);
        self.base_ttl.saturating_add(Duration::from_millis(jitter))
    }
}

/// Longest configurable base TTL: one year.
pub const MAX_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Converts a configured TTL in minutes, capped at [`MAX_TTL_MINUTES`].
pub fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.min(MAX_TTL_MINUTES) * 60)
}

impl Default for CacheSettings {
    /// 10 minutes plus up to one minute of jitter.
    fn default() -> Self {
        Self::new(Duration::from_secs(10 * 60), Duration::from_secs(60))
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache entry lifetime (default: 10 minutes + up to 60 seconds of jitter)
    pub cache: CacheSettings,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "repocache.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_MINUTES` - Base cache TTL in minutes (default: 10, capped at one year)
    /// - `CACHE_JITTER_SECONDS` - Upper bound of the TTL jitter (default: 60)
    /// - `CACHE_MAX_ENTRIES` - Maximum in-memory cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "repocache.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |name: &str, default: u64| parse_or(lookup(name), default);

        Self {
            cache: CacheSettings::new(
                ttl_from_minutes(number("CACHE_TTL_MINUTES", 10)),
                Duration::from_secs(number("CACHE_JITTER_SECONDS", 60)),
            ),
            cache_max_entries: parse_or(lookup("CACHE_MAX_ENTRIES"), 10_000),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "repocache.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
