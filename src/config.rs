use chrono::{TimeDelta, Utc};
use std::env;

use thiserror::Error;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded
/// and pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls log format and fail-fast rules.
    pub env: Env,
    // Secret used to sign and validate API bearer tokens.
    pub token_secret: String,
    // Lifetime of an issued API token, in seconds.
    pub token_ttl_secs: i64,
    // Lifetime of a browser session, in seconds.
    pub session_ttl_secs: i64,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Password for the seeded `admin` account.
    pub admin_password: String,
    // Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

/// Env
///
/// Runtime context: `Local` favours developer convenience (pretty logs,
/// in-memory store, default secrets), `Production` demands explicit secrets.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

const LOCAL_TOKEN_SECRET: &str = "til-glossary-local-token-secret";
const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

impl Default for AppConfig {
    /// Safe, non-panicking configuration used for test state scaffolding.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            token_secret: LOCAL_TOKEN_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TTL_SECS,
            session_ttl_secs: DEFAULT_TTL_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            admin_password: "password".to_string(),
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables. In `Production` the
    /// database URL, token secret and admin password are mandatory and a
    /// missing one fails fast.
    pub fn load() -> Result<Self, ConfigError> {
        let env_kind = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let required = |var: &'static str, local_default: &str| -> Result<String, ConfigError> {
            match (env::var(var), &env_kind) {
                (Ok(value), _) => Ok(value),
                (Err(_), Env::Production) => Err(ConfigError::Missing(var)),
                (Err(_), Env::Local) => Ok(local_default.to_string()),
            }
        };

        let db_url = match (env::var("DATABASE_URL"), &env_kind) {
            (Ok(url), _) => Some(url),
            (Err(_), Env::Production) => return Err(ConfigError::Missing("DATABASE_URL")),
            (Err(_), Env::Local) => None,
        };

        let token_secret = required("TOKEN_SECRET", LOCAL_TOKEN_SECRET)?;
        let admin_password = required("ADMIN_PASSWORD", "password")?;

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(raw) => parse_bool("COOKIE_SECURE", &raw)?,
            Err(_) => env_kind == Env::Production,
        };

        Ok(Self {
            db_url,
            token_secret,
            token_ttl_secs: parse_secs("TOKEN_TTL_SECS")?,
            session_ttl_secs: parse_secs("SESSION_TTL_SECS")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            admin_password,
            cookie_secure,
            env: env_kind,
        })
    }
}

/// A positive number of seconds that still yields a representable expiry
/// when added to the current time.
fn parse_secs(var: &'static str) -> Result<i64, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(secs) if secs > 0 && expiry_in_range(secs) => Ok(secs),
            _ => Err(ConfigError::Invalid { var, value: raw }),
        },
        Err(_) => Ok(DEFAULT_TTL_SECS),
    }
}

fn expiry_in_range(secs: i64) -> bool {
    TimeDelta::try_seconds(secs)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .is_some()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}
