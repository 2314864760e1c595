use crate::app_config::{AppConfig, Environment, ImageStoreConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("LOOKSTYLE_ENV", "development"))?;
    let bind_addr = parse_addr("LOOKSTYLE_BIND_ADDR", "0.0.0.0:4000")?;
    let log_level = or_default("LOOKSTYLE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LOOKSTYLE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LOOKSTYLE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LOOKSTYLE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let db_statement_timeout_secs = parse_u64("LOOKSTYLE_DB_STATEMENT_TIMEOUT_SECS", "30")?;

    let images = ImageStoreConfig {
        base_url: or_default("LOOKSTYLE_IMAGE_BASE_URL", "https://api.cloudinary.com"),
        cloud_name: require("CLOUDINARY_CLOUD_NAME")?,
        api_key: require("CLOUDINARY_API_KEY")?,
        api_secret: require("CLOUDINARY_API_SECRET")?,
        folder: or_default("LOOKSTYLE_IMAGE_FOLDER", "lookstyle"),
        request_timeout_secs: parse_u64("LOOKSTYLE_IMAGE_TIMEOUT_SECS", "30")?,
        max_retries: parse_u32("LOOKSTYLE_IMAGE_MAX_RETRIES", "2")?,
        retry_backoff_ms: parse_u64("LOOKSTYLE_IMAGE_RETRY_BACKOFF_MS", "250")?,
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        db_statement_timeout_secs,
        images,
    })
}

/// Parse `LOOKSTYLE_ENV` into an [`Environment`].
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LOOKSTYLE_ENV".to_string(),
            reason: format!("expected development, test, or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
