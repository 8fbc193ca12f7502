// src/config.rs

use std::{env, str::FromStr};

use dotenvy::dotenv;
use tracing::warn;
use url::Url;

const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";

/// Sandbox limits applied by the execution gateway.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Run timeout for free-form runs, milliseconds.
    pub default_timeout_ms: u64,
    pub compile_timeout_ms: u64,
    /// Bytes, `-1` for unlimited.
    pub memory_limit: i64,
    pub max_code_size: usize,
    pub rate_per_minute: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5000,
            compile_timeout_ms: 10000,
            memory_limit: -1,
            max_code_size: 65536,
            rate_per_minute: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub piston_url: Url,
    pub execution: ExecutionLimits,
    /// `0` disables the background sweep of expired attempts.
    pub attempt_sweep_interval_secs: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_college_slug: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing required keys panic,
    /// malformed optional ones fall back to their default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = lookup("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty");

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let piston_url = match lookup("PISTON_URL") {
            Some(raw) => Url::parse(&raw).unwrap_or_else(|e| {
                panic!("PISTON_URL is not a valid URL ('{raw}'): {e}");
            }),
            None => Url::parse(DEFAULT_PISTON_URL).expect("default Piston URL is valid"),
        };

        let defaults = ExecutionLimits::default();
        let execution = ExecutionLimits {
            default_timeout_ms: parse_or(
                &lookup,
                "EXECUTION_DEFAULT_TIMEOUT_MS",
                defaults.default_timeout_ms,
            ),
            compile_timeout_ms: parse_or(
                &lookup,
                "EXECUTION_COMPILE_TIMEOUT_MS",
                defaults.compile_timeout_ms,
            ),
            memory_limit: parse_or(&lookup, "EXECUTION_MEMORY_LIMIT", defaults.memory_limit),
            max_code_size: parse_or(&lookup, "EXECUTION_MAX_CODE_SIZE", defaults.max_code_size),
            rate_per_minute: parse_or(
                &lookup,
                "EXECUTION_RATE_PER_MINUTE",
                defaults.rate_per_minute,
            )
            .max(1),
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or(&lookup, "JWT_EXPIRATION", 86400),
            rust_log,
            port: parse_or(&lookup, "PORT", 3000),
            piston_url,
            execution,
            attempt_sweep_interval_secs: parse_or(&lookup, "ATTEMPT_SWEEP_INTERVAL_SECS", 60),
            admin_username: lookup("ADMIN_USERNAME"),
            admin_password: lookup("ADMIN_PASSWORD"),
            admin_college_slug: lookup("ADMIN_COLLEGE_SLUG"),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse {key} ('{raw}'): {e}; using default");
                default
            }
        },
        None => default,
    }
}
