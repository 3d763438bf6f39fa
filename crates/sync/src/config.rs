//! Sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SYNC_MAX_RUNTIME_SECS` - Walk deadline (default: 120)
//! - `SYNC_THROTTLE_BACKOFF_SECS` - Pause before the single throttle retry (default: 120)
//! - `SYNC_PAGE_DELAY_SECS` - Pause between token pages (default: 20 for Amazon, 0 for Shopify)
//! - `TRACKING_CONCURRENCY` - Shipment tracking worker pool size (default: 4)
//! - `CARRIER_UTC_OFFSET` - Offset of carrier local scan dates (default: +00:00)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! The throttle and page pauses apply to paced walks only; replays skip them
//! unless run with `--paced`.
//!
//! ## Optional (Amazon - all four or none)
//! - `AMAZON_SELLER_ID` - Merchant ID
//! - `AMAZON_MARKETPLACE_ID` - Marketplace ID
//! - `AMAZON_AWS_ACCESS_KEY_ID` - MWS access key
//! - `AMAZON_SECRET_KEY` - MWS secret key
//!
//! ## Optional (Shopify - all three or none)
//! - `SHOPIFY_STORE_URL` - Store domain
//! - `SHOPIFY_API_KEY` - Private app API key
//! - `SHOPIFY_PASSWORD` - Private app password

use std::collections::HashMap;
use std::time::Duration;

use chrono::FixedOffset;
use retail_sync_core::Retailer;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_RUNTIME_SECS: &str = "120";
const DEFAULT_THROTTLE_BACKOFF_SECS: &str = "120";
const DEFAULT_TRACKING_CONCURRENCY: &str = "4";
const DEFAULT_CARRIER_UTC_OFFSET: &str = "+00:00";
const AMAZON_PAGE_DELAY_SECS: u64 = 20;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
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

/// What the walker does with a cancellation event for an order it never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Abort the run so an operator looks at it.
    #[default]
    Abort,
    /// Log it, count it in the report, and keep walking.
    Record,
}

/// Timing and failure policy for one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkPolicy {
    /// Elapsed time after which the walk stops at the next page or order.
    pub max_runtime: Duration,
    /// Pause before retrying a throttled call.
    pub throttle_backoff: Duration,
    /// Pause between continuation-token pages.
    pub page_delay: Duration,
    pub orphan_policy: OrphanPolicy,
}

impl WalkPolicy {
    /// Policy with no pauses and the given deadline. Used by replays and tests.
    #[must_use]
    pub const fn immediate(max_runtime: Duration) -> Self {
        Self {
            max_runtime,
            throttle_backoff: Duration::ZERO,
            page_delay: Duration::ZERO,
            orphan_policy: OrphanPolicy::Abort,
        }
    }

    #[must_use]
    pub const fn with_orphan_policy(mut self, orphan_policy: OrphanPolicy) -> Self {
        self.orphan_policy = orphan_policy;
        self
    }
}

/// Amazon Marketplace credentials.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct AmazonCredentials {
    pub seller_id: String,
    pub marketplace_id: String,
    pub access_key_id: String,
    pub secret_key: SecretString,
}

impl std::fmt::Debug for AmazonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmazonCredentials")
            .field("seller_id", &self.seller_id)
            .field("marketplace_id", &self.marketplace_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Shopify private-app credentials.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct ShopifyCredentials {
    pub store_url: String,
    pub api_key: String,
    pub password: SecretString,
}

impl std::fmt::Debug for ShopifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyCredentials")
            .field("store_url", &self.store_url)
            .field("api_key", &self.api_key)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub max_runtime: Duration,
    pub throttle_backoff: Duration,
    /// Overrides the per-retailer page delay when set.
    pub page_delay: Option<Duration>,
    pub tracking_concurrency: usize,
    pub carrier_utc_offset: FixedOffset,
    pub amazon: Option<AmazonCredentials>,
    pub shopify: Option<ShopifyCredentials>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or a credential group
    /// is only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`SyncConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let max_runtime = env.secs("SYNC_MAX_RUNTIME_SECS", DEFAULT_MAX_RUNTIME_SECS)?;
        let throttle_backoff =
            env.secs("SYNC_THROTTLE_BACKOFF_SECS", DEFAULT_THROTTLE_BACKOFF_SECS)?;
        let page_delay = env
            .optional("SYNC_PAGE_DELAY_SECS")
            .map(|raw| parse_secs("SYNC_PAGE_DELAY_SECS", &raw))
            .transpose()?;
        let tracking_concurrency = env
            .or_default("TRACKING_CONCURRENCY", DEFAULT_TRACKING_CONCURRENCY)
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "TRACKING_CONCURRENCY".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;
        let carrier_utc_offset = env
            .or_default("CARRIER_UTC_OFFSET", DEFAULT_CARRIER_UTC_OFFSET)
            .parse::<FixedOffset>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CARRIER_UTC_OFFSET".to_string(), e.to_string())
            })?;

        Ok(Self {
            max_runtime,
            throttle_backoff,
            page_delay,
            tracking_concurrency,
            carrier_utc_offset,
            amazon: AmazonCredentials::from_env(&env)?,
            shopify: ShopifyCredentials::from_env(&env)?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Walk policy for one retailer.
    ///
    /// Amazon paces its token pages; Shopify does not unless overridden.
    #[must_use]
    pub fn walk_policy(&self, retailer: Retailer) -> WalkPolicy {
        let default_delay = match retailer {
            Retailer::Amazon => Duration::from_secs(AMAZON_PAGE_DELAY_SECS),
            Retailer::Shopify => Duration::ZERO,
        };
        WalkPolicy {
            max_runtime: self.max_runtime,
            throttle_backoff: self.throttle_backoff,
            page_delay: self.page_delay.unwrap_or(default_delay),
            orphan_policy: OrphanPolicy::Abort,
        }
    }
}

impl AmazonCredentials {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let group = env.group(
            "AMAZON_*",
            &[
                "AMAZON_SELLER_ID",
                "AMAZON_MARKETPLACE_ID",
                "AMAZON_AWS_ACCESS_KEY_ID",
                "AMAZON_SECRET_KEY",
            ],
        )?;
        Ok(group.map(|mut values| {
            let secret_key = values.remove("AMAZON_SECRET_KEY").unwrap_or_default();
            warn_weak_secret(&secret_key, "AMAZON_SECRET_KEY");
            Self {
                seller_id: values.remove("AMAZON_SELLER_ID").unwrap_or_default(),
                marketplace_id: values.remove("AMAZON_MARKETPLACE_ID").unwrap_or_default(),
                access_key_id: values.remove("AMAZON_AWS_ACCESS_KEY_ID").unwrap_or_default(),
                secret_key: SecretString::from(secret_key),
            }
        }))
    }
}

impl ShopifyCredentials {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let group = env.group(
            "SHOPIFY_*",
            &["SHOPIFY_STORE_URL", "SHOPIFY_API_KEY", "SHOPIFY_PASSWORD"],
        )?;
        Ok(group.map(|mut values| {
            let password = values.remove("SHOPIFY_PASSWORD").unwrap_or_default();
            warn_weak_secret(&password, "SHOPIFY_PASSWORD");
            Self {
                store_url: values.remove("SHOPIFY_STORE_URL").unwrap_or_default(),
                api_key: values.remove("SHOPIFY_API_KEY").unwrap_or_default(),
                password: SecretString::from(password),
            }
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn secs(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        parse_secs(key, &self.or_default(key, default))
    }

    /// Read a credential group that must be set all together or not at all.
    fn group(
        &self,
        label: &str,
        keys: &[&str],
    ) -> Result<Option<HashMap<String, String>>, ConfigError> {
        let values: HashMap<String, String> = keys
            .iter()
            .filter_map(|key| self.optional(key).map(|v| ((*key).to_string(), v)))
            .collect();

        if values.is_empty() {
            return Ok(None);
        }
        if let Some(missing) = keys.iter().find(|key| !values.contains_key(**key)) {
            return Err(ConfigError::InvalidEnvVar(
                label.to_string(),
                format!("{missing} must be set together with {}", keys.join(", ")),
            ));
        }
        Ok(Some(values))
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

fn warn_weak_secret(secret: &str, var_name: &str) {
    if let Err(e) = validate_secret_strength(secret, var_name) {
        tracing::warn!("{var_name} validation warning: {e}");
    }
}
