use crate::app_config::{AppConfig, Environment, WorkerSetting};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any value is present but invalid.
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
/// Returns `ConfigError` if any value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// configuration targeting `amazon.ae`.
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
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("DEALGRID_ENV", "development"))?;
    let log_level = or_default("DEALGRID_LOG_LEVEL", "info");

    let base_url = or_default("DEALGRID_BASE_URL", "https://www.amazon.ae")
        .trim_end_matches('/')
        .to_string();
    if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
        return Err(invalid(
            "DEALGRID_BASE_URL",
            format!("expected an http(s) URL, got {base_url:?}"),
        ));
    }
    let source_site = or_default("DEALGRID_SOURCE_SITE", "amazon.ae");

    let workers = parse_workers(&or_default("DEALGRID_WORKERS", "auto"))?;
    let headless = parse_bool("DEALGRID_HEADLESS", &or_default("DEALGRID_HEADLESS", "true"))?;
    let user_agent = lookup("DEALGRID_USER_AGENT")
        .ok()
        .map(|ua| ua.trim().to_string())
        .filter(|ua| !ua.is_empty());

    let max_attempts = parse_u32("DEALGRID_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(invalid("DEALGRID_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    let retry_delay_ms = parse_u64("DEALGRID_RETRY_DELAY_MS", "1000")?;

    let navigation_timeout_secs = parse_u64("DEALGRID_NAVIGATION_TIMEOUT_SECS", "60")?;
    let element_timeout_secs = parse_u64("DEALGRID_ELEMENT_TIMEOUT_SECS", "10")?;
    let image_script_timeout_secs = parse_u64("DEALGRID_IMAGE_SCRIPT_TIMEOUT_SECS", "15")?;
    let poll_interval_ms = parse_u64("DEALGRID_POLL_INTERVAL_MS", "500")?;

    let jitter_min_ms = parse_u64("DEALGRID_JITTER_MIN_MS", "1000")?;
    let jitter_max_ms = parse_u64("DEALGRID_JITTER_MAX_MS", "3000")?;
    if jitter_min_ms > jitter_max_ms {
        return Err(invalid(
            "DEALGRID_JITTER_MIN_MS",
            format!("must not exceed DEALGRID_JITTER_MAX_MS ({jitter_max_ms})"),
        ));
    }

    let max_feed_rounds = parse_usize("DEALGRID_MAX_FEED_ROUNDS", "100")?;
    let stuck_rounds = parse_u32("DEALGRID_STUCK_ROUNDS", "3")?;
    if stuck_rounds == 0 {
        return Err(invalid("DEALGRID_STUCK_ROUNDS", "must be at least 1".to_string()));
    }

    Ok(AppConfig {
        env,
        log_level,
        base_url,
        source_site,
        workers,
        headless,
        user_agent,
        max_attempts,
        retry_delay_ms,
        navigation_timeout_secs,
        element_timeout_secs,
        image_script_timeout_secs,
        poll_interval_ms,
        jitter_min_ms,
        jitter_max_ms,
        max_feed_rounds,
        stuck_rounds,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DEALGRID_ENV".to_string(),
            reason: format!("expected development, test or production, got {other:?}"),
        }),
    }
}

/// `auto`, `0` (same as auto) or a positive worker count.
fn parse_workers(s: &str) -> Result<WorkerSetting, ConfigError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("auto") {
        return Ok(WorkerSetting::Auto);
    }
    match s.parse::<usize>() {
        Ok(0) => Ok(WorkerSetting::Auto),
        Ok(n) => Ok(WorkerSetting::Fixed(n)),
        Err(e) => Err(ConfigError::InvalidEnvVar {
            var: "DEALGRID_WORKERS".to_string(),
            reason: format!("expected \"auto\" or a worker count: {e}"),
        }),
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
