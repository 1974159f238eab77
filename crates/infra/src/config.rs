//! Service configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

pub const ENV_RETRY_MAX_ATTEMPTS: &str = "PREORDER_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "PREORDER_RETRY_BASE_DELAY_MS";
pub const ENV_RETRY_MAX_DELAY_MS: &str = "PREORDER_RETRY_MAX_DELAY_MS";
pub const ENV_RETRY_JITTER: &str = "PREORDER_RETRY_JITTER";
pub const ENV_MAX_NOTES_LEN: &str = "PREORDER_MAX_NOTES_LEN";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{name} out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Backoff applied when a conditional write loses to a concurrent one.
    pub retry: RetryPolicy,
    /// Longest accepted order note, in characters.
    pub max_notes_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_notes_len: 500,
        }
    }
}

impl ServiceConfig {
    /// Read `PREORDER_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_attempts = parse_var(&lookup, ENV_RETRY_MAX_ATTEMPTS, defaults.retry.max_attempts)?;
        let base_delay_ms = parse_var(
            &lookup,
            ENV_RETRY_BASE_DELAY_MS,
            defaults.retry.base_delay.as_millis() as u64,
        )?;
        let max_delay_ms = parse_var(
            &lookup,
            ENV_RETRY_MAX_DELAY_MS,
            defaults.retry.max_delay.as_millis() as u64,
        )?;
        let jitter = parse_var(&lookup, ENV_RETRY_JITTER, defaults.retry.jitter)?;
        let max_notes_len = parse_var(&lookup, ENV_MAX_NOTES_LEN, defaults.max_notes_len)?;

        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::OutOfRange {
                name: ENV_RETRY_JITTER,
                reason: format!("{jitter} is not within 0.0-1.0"),
            });
        }
        if max_delay_ms < base_delay_ms {
            return Err(ConfigError::OutOfRange {
                name: ENV_RETRY_MAX_DELAY_MS,
                reason: format!("{max_delay_ms} is below the base delay {base_delay_ms}"),
            });
        }

        Ok(Self {
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                jitter,
                ..defaults.retry
            },
            max_notes_len,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
