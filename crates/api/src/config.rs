use std::time::Duration;

use courier_delivery::dispatcher::DEFAULT_SEND_TIMEOUT;

/// How log lines are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Bound on a single channel sender call (default: `5000` ms).
    pub sender_timeout: Duration,
    /// Postgres connection string. In-memory stores are used when unset.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

/// A configuration value that failed to parse.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SENDER_TIMEOUT_MS`    | `5000`                     |
    /// | `DATABASE_URL`         | unset (in-memory stores)   |
    /// | `LOG_FORMAT`           | `pretty` (or `json`)       |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", "3000", "a valid u16")?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 =
            parse_var("REQUEST_TIMEOUT_SECS", "30", "a valid u64")?;
        let default_sender_ms = DEFAULT_SEND_TIMEOUT.as_millis().to_string();
        let sender_timeout_ms: u64 =
            parse_var("SENDER_TIMEOUT_MS", &default_sender_ms, "a valid u64")?;
        let sender_timeout = Duration::from_millis(sender_timeout_ms);
        check_timeouts(request_timeout_secs, sender_timeout)?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => {
                return Err(ConfigError {
                    var: "LOG_FORMAT",
                    expected: "'json' or 'pretty'",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            sender_timeout,
            database_url,
            log_format,
        })
    }
}

/// A sender call must finish inside the HTTP request timeout.
fn check_timeouts(request_timeout_secs: u64, sender_timeout: Duration) -> Result<(), ConfigError> {
    if sender_timeout >= Duration::from_secs(request_timeout_secs) {
        return Err(ConfigError {
            var: "SENDER_TIMEOUT_MS",
            expected: "shorter than REQUEST_TIMEOUT_SECS",
            value: sender_timeout.as_millis().to_string(),
        });
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = std::env::var(var).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError {
        var,
        expected,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        let port: u16 = parse_var("COURIER_TEST_UNSET_PORT", "3000", "a valid u16").unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn sender_timeout_must_fit_inside_request_timeout() {
        assert!(check_timeouts(30, Duration::from_millis(5000)).is_ok());

        let err = check_timeouts(5, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.var, "SENDER_TIMEOUT_MS");
        assert_eq!(
            err.to_string(),
            "SENDER_TIMEOUT_MS must be shorter than REQUEST_TIMEOUT_SECS, got '5000'"
        );
        assert!(check_timeouts(1, Duration::from_millis(1500)).is_err());
    }

    #[test]
    fn parse_var_reports_bad_values() {
        let err = parse_var::<u16>("COURIER_TEST_UNSET_PORT", "not-a-port", "a valid u16")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "COURIER_TEST_UNSET_PORT must be a valid u16, got 'not-a-port'"
        );
    }
}
