//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Catalog (required only for catalog reads)
//! - `COSMIC_BUCKET_SLUG` - Cosmic bucket slug
//! - `COSMIC_READ_KEY` - Cosmic bucket read key
//!
//! ## Optional
//! - `COSMIC_API_URL` - API base URL (default: `https://api.cosmicjs.com/v3`)
//! - `CATALOG_FIXTURE_PATH` - Serve the catalog from a local JSON export instead of Cosmic
//! - `CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `CATALOG_HTTP_TIMEOUT_SECS` - Content API request timeout (default: 10)
//! - `PROMPTOS_DATA_DIR` - Directory holding persisted ledger state (default: `.promptos`)
//! - `PROMPTOS_STARTING_BALANCE` - Opening wallet balance (default: 500000)
//! - `PROMPTOS_CURRENCY` - Wallet currency (default: VND)
//! - `PROMPTOS_ACCESS_BASE_URL` - Base URL for purchased-prompt access links
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use promptos_core::CurrencyCode;

use crate::ledger::LedgerSettings;

const DEFAULT_COSMIC_API_URL: &str = "https://api.cosmicjs.com/v3";
const DEFAULT_DATA_DIR: &str = ".promptos";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Directory holding persisted ledger records
    pub data_dir: PathBuf,
    /// Ledger defaults (opening balance, currency, access URLs)
    pub ledger: LedgerSettings,
    /// Catalog cache and transport settings
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Catalog adapter configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// How long successful reads stay cached
    pub cache_ttl: Duration,
    /// Local export to serve instead of Cosmic
    pub fixture_path: Option<PathBuf>,
    /// Cosmic API settings, absent when the bucket is not configured
    pub cosmic: Option<CosmicConfig>,
}

/// Cosmic content API configuration.
///
/// Implements `Debug` manually to redact the read key.
#[derive(Clone)]
pub struct CosmicConfig {
    /// API base URL (e.g., `https://api.cosmicjs.com/v3`)
    pub api_url: String,
    /// Bucket slug
    pub bucket_slug: String,
    /// Bucket read key
    pub read_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for CosmicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmicConfig")
            .field("api_url", &self.api_url)
            .field("bucket_slug", &self.bucket_slug)
            .field("read_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// Cosmic read key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let data_dir = PathBuf::from(env.or_default("PROMPTOS_DATA_DIR", DEFAULT_DATA_DIR));

        let starting_balance = env.parsed::<Decimal>("PROMPTOS_STARTING_BALANCE")?;
        let currency = env.parsed::<CurrencyCode>("PROMPTOS_CURRENCY")?;
        let access_base_url = env.optional("PROMPTOS_ACCESS_BASE_URL");

        let mut ledger = LedgerSettings::default();
        if let Some(balance) = starting_balance {
            if balance.is_sign_negative() {
                return Err(ConfigError::InvalidEnvVar(
                    "PROMPTOS_STARTING_BALANCE".to_string(),
                    "must not be negative".to_string(),
                ));
            }
            ledger.starting_balance = balance;
        }
        if let Some(currency) = currency {
            ledger.currency = currency;
        }
        if let Some(url) = access_base_url {
            url::Url::parse(&url).map_err(|e| {
                ConfigError::InvalidEnvVar("PROMPTOS_ACCESS_BASE_URL".to_string(), e.to_string())
            })?;
            ledger.access_base_url = url;
        }

        let catalog = CatalogConfig::from_env(&env)?;
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            data_dir,
            ledger,
            catalog,
            sentry_dsn,
        })
    }
}

impl CatalogConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let cache_ttl = Duration::from_secs(
            env.parsed::<u64>("CATALOG_CACHE_TTL_SECS")?
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );
        let timeout = Duration::from_secs(
            env.parsed::<u64>("CATALOG_HTTP_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );
        let fixture_path = env.optional("CATALOG_FIXTURE_PATH").map(PathBuf::from);

        // The bucket is optional as a whole; half a configuration is an error.
        let cosmic = match (
            env.optional("COSMIC_BUCKET_SLUG"),
            env.optional("COSMIC_READ_KEY"),
        ) {
            (None, None) => None,
            (Some(bucket_slug), Some(read_key)) => {
                let read_key = SecretString::from(read_key);
                validate_secret(&read_key, "COSMIC_READ_KEY")?;
                Some(CosmicConfig {
                    api_url: env.or_default("COSMIC_API_URL", DEFAULT_COSMIC_API_URL),
                    bucket_slug,
                    read_key,
                    timeout,
                })
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("COSMIC_READ_KEY".to_string()));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("COSMIC_BUCKET_SLUG".to_string()));
            }
        };

        Ok(Self {
            cache_ttl,
            fixture_path,
            cosmic,
        })
    }

    /// Cosmic settings, or the error naming what is missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no bucket is configured.
    pub fn require_cosmic(&self) -> Result<&CosmicConfig, ConfigError> {
        self.cosmic
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("COSMIC_BUCKET_SLUG".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with typed accessors.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional variable.
    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Reject secrets that are obviously placeholders.
fn validate_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.expose_secret().to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
