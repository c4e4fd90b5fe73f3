//! Harness configuration.
//!
//! All configuration is driven by environment variables; anything unset falls
//! back to the defaults the live DynamoDB waiters use (5 s delay, 25 attempts).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RecordError, RecordResult};
use crate::waiter::Waiter;

/// Which table store scenarios run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// The in-process store (requires the `memory` feature).
    #[default]
    Memory,
    /// A DynamoDB endpoint reached through the AWS SDK.
    Dynamodb,
}

impl FromStr for Backend {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "dynamodb" | "aws" => Ok(Self::Dynamodb),
            other => Err(RecordError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Configuration shared by the fixture manager, migrations and the suite.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Store backend.
    pub backend: Backend,
    /// Custom DynamoDB endpoint, e.g. a local emulator.
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
    /// Sign requests with static `test` credentials. Set when a custom
    /// endpoint is configured and `AWS_ACCESS_KEY_ID` is not.
    pub test_credentials: bool,
    /// Delay between waiter polls, in milliseconds.
    pub wait_delay_ms: u64,
    /// Maximum number of waiter polls.
    pub wait_max_attempts: u32,
    /// Maximum number of delete retries while a table is busy.
    pub teardown_max_retries: u32,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint_url: None,
            region: "us-east-1".to_owned(),
            test_credentials: false,
            wait_delay_ms: 5_000,
            wait_max_attempts: 25,
            teardown_max_retries: 10,
            log_level: "warn".to_owned(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RecordResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("DYNARECORD_BACKEND") {
            config.backend = v.parse()?;
        }
        if let Some(v) = lookup("DYNAMODB_ENDPOINT_URL") {
            config.endpoint_url = Some(v);
        }
        config.test_credentials =
            config.endpoint_url.is_some() && lookup("AWS_ACCESS_KEY_ID").is_none();
        if let Some(v) = lookup("DEFAULT_REGION").or_else(|| lookup("AWS_REGION")) {
            config.region = v;
        }
        if let Some(v) = lookup("DYNARECORD_WAIT_DELAY_MS") {
            config.wait_delay_ms = parse_number("DYNARECORD_WAIT_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("DYNARECORD_WAIT_MAX_ATTEMPTS") {
            config.wait_max_attempts = parse_number("DYNARECORD_WAIT_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("DYNARECORD_TEARDOWN_MAX_RETRIES") {
            config.teardown_max_retries = parse_number("DYNARECORD_TEARDOWN_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// The waiter policy described by this configuration.
    #[must_use]
    pub fn waiter(&self) -> Waiter {
        Waiter::new(
            Duration::from_millis(self.wait_delay_ms),
            self.wait_max_attempts,
        )
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> RecordResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RecordError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}
