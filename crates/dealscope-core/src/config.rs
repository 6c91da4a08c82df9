use crate::app_config::{AppConfig, Environment, MAX_DEAL_TTL_HOURS, MAX_WRITE_CHUNK_SIZE};
use crate::ConfigError;

const DEFAULT_FETCH_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|s| !s.is_empty());
    let env = parse_environment(&or_default("DEALSCOPE_ENV", "development"));
    let log_level = or_default("DEALSCOPE_LOG_LEVEL", "info");

    let threshold_var = "DEALSCOPE_DEFAULT_THRESHOLD_PCT";
    let default_threshold_pct = or_default(threshold_var, "30")
        .parse::<f64>()
        .map_err(|e| invalid(threshold_var, e.to_string()))?;
    if !(0.0..=100.0).contains(&default_threshold_pct) {
        return Err(invalid(
            threshold_var,
            format!("{default_threshold_pct} is outside 0..=100"),
        ));
    }

    let fetch_timeout_secs = parse_u64("DEALSCOPE_FETCH_TIMEOUT_SECS", "15")?;
    let fetch_max_redirects = parse_usize("DEALSCOPE_FETCH_MAX_REDIRECTS", "5")?;
    let fetch_user_agent = or_default("DEALSCOPE_FETCH_USER_AGENT", DEFAULT_FETCH_USER_AGENT);
    let fetch_max_retries = parse_u32("DEALSCOPE_FETCH_MAX_RETRIES", "2")?;
    let fetch_retry_backoff_base_secs =
        parse_u64("DEALSCOPE_FETCH_RETRY_BACKOFF_BASE_SECS", "1")?;
    let max_concurrent_jobs = parse_usize("DEALSCOPE_MAX_CONCURRENT_JOBS", "4")?;

    let ttl_var = "DEALSCOPE_DEAL_TTL_HOURS";
    let deal_ttl_hours = or_default(ttl_var, "48")
        .parse::<i64>()
        .map_err(|e| invalid(ttl_var, e.to_string()))?;
    if !(1..=MAX_DEAL_TTL_HOURS).contains(&deal_ttl_hours) {
        return Err(invalid(
            ttl_var,
            format!("{deal_ttl_hours} is outside 1..={MAX_DEAL_TTL_HOURS}"),
        ));
    }

    let chunk_var = "DEALSCOPE_WRITE_CHUNK_SIZE";
    let write_chunk_size = parse_usize(chunk_var, "25")?;
    if write_chunk_size == 0 || write_chunk_size > MAX_WRITE_CHUNK_SIZE {
        return Err(invalid(
            chunk_var,
            format!("{write_chunk_size} is outside 1..={MAX_WRITE_CHUNK_SIZE}"),
        ));
    }

    let db_max_connections = parse_u32("DEALSCOPE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DEALSCOPE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("DEALSCOPE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        default_threshold_pct,
        fetch_timeout_secs,
        fetch_max_redirects,
        fetch_user_agent,
        fetch_max_retries,
        fetch_retry_backoff_base_secs,
        max_concurrent_jobs,
        deal_ttl_hours,
        write_chunk_size,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
