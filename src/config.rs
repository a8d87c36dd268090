// src/config.rs

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use dotenvy::dotenv;

use crate::services::RetryPolicy;

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_SUBMIT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_SUBMIT_RETRY_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,

    /// Upper bound on waiting for a progress row lock.
    pub lock_timeout_ms: u64,

    /// Reruns of a submission's unit of work after lock contention.
    pub submit_max_retries: u32,
    pub submit_retry_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = parse_setting(
            env::var("BIND_ADDR").ok(),
            SocketAddr::from(([0, 0, 0, 0], 3000)),
        );

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            lock_timeout_ms: parse_setting(env::var("LOCK_TIMEOUT_MS").ok(), DEFAULT_LOCK_TIMEOUT_MS),
            submit_max_retries: parse_setting(
                env::var("SUBMIT_MAX_RETRIES").ok(),
                DEFAULT_SUBMIT_MAX_RETRIES,
            ),
            submit_retry_backoff_ms: parse_setting(
                env::var("SUBMIT_RETRY_BACKOFF_MS").ok(),
                DEFAULT_SUBMIT_RETRY_BACKOFF_MS,
            ),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.submit_max_retries,
            backoff: Duration::from_millis(self.submit_retry_backoff_ms),
        }
    }
}

/// Parses an optional raw value, falling back to `default` when it is
/// missing, blank or malformed.
fn parse_setting<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
