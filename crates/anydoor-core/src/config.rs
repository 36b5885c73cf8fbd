use crate::app_config::{AppConfig, Environment, GenerationSettings};
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
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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
    let env = parse_environment(&or_default("ANYDOOR_ENV", "development"))?;
    let bind_addr = parse_addr("ANYDOOR_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("ANYDOOR_LOG_LEVEL", "info");
    let host_url = or_default("ANYDOOR_HOST_URL", "localhost:3000");
    let site_name = or_default("ANYDOOR_SITE_NAME", "Any Door");
    let rules_path = optional("ANYDOOR_RULES_PATH").map(PathBuf::from);

    let db_max_connections = parse_u32("ANYDOOR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ANYDOOR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ANYDOOR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let generation = GenerationSettings {
        endpoint: optional("GENERATION_API_ENDPOINT"),
        api_key: optional("GENERATION_API_KEY"),
        model: optional("GENERATION_MODEL"),
        free_model: optional("GENERATION_FREE_MODEL"),
        max_tokens: parse_u32("GENERATION_MAX_TOKENS", "4096")?,
        connect_timeout_secs: parse_u64("GENERATION_CONNECT_TIMEOUT_SECS", "10")?,
    };

    let retention_cron = or_default("ANYDOOR_RETENTION_CRON", "0 30 3 * * *");
    let event_retention_days = parse_u32("ANYDOOR_EVENT_RETENTION_DAYS", "30")?;
    let search_log_retention_days = parse_u32("ANYDOOR_SEARCH_LOG_RETENTION_DAYS", "90")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        host_url,
        site_name,
        rules_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        generation,
        retention_cron,
        event_retention_days,
        search_log_retention_days,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ANYDOOR_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}
