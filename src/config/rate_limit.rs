//! Token bucket configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::env::{load_dotenv, parse_var};

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Capacity, and the number of tokens the bucket starts with.
    pub max_tokens: u64,
    /// Tokens added on every refill tick, capped at `max_tokens`.
    pub refill_amount: u64,
    /// Time between refill ticks in milliseconds.
    pub refill_interval_ms: u64,
}

impl TokenBucketConfig {
    /// Bucket holding `max_tokens`, refilled by `refill_amount` every `refill_interval`.
    #[must_use]
    pub fn new(max_tokens: u64, refill_amount: u64, refill_interval: Duration) -> Self {
        Self {
            max_tokens,
            refill_amount,
            refill_interval_ms: u64::try_from(refill_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Time between refill ticks.
    #[must_use]
    pub const fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// A zero `max_tokens` yields a bucket that denies every request and a
    /// zero `refill_amount` one that never refills; both are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if `refill_interval_ms` is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.refill_interval_ms == 0 {
            return Err("refill_interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `TOKEN_BUCKET_MAX`, `TOKEN_BUCKET_REFILL` and
    /// `TOKEN_BUCKET_INTERVAL_MS`, loading a `.env` file first if one exists.
    /// All three must be set.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, does not parse, or is invalid.
    pub fn from_env() -> Result<Self, String> {
        load_dotenv();
        let cfg = Self {
            max_tokens: required("TOKEN_BUCKET_MAX")?,
            refill_amount: required("TOKEN_BUCKET_REFILL")?,
            refill_interval_ms: required("TOKEN_BUCKET_INTERVAL_MS")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn required(key: &str) -> Result<u64, String> {
    parse_var(key)?.ok_or_else(|| format!("{key} is not set"))
}
