use alertproxy_core::annotation::ExtractSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins from comma-separated `CORS_ORIGINS`; `*` allows any.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining queued jobs at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `3000`    |
    /// | `CORS_ORIGINS`         | `*`       |
    /// | `REQUEST_TIMEOUT_SECS` | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}

/// Extraction defaults from environment variables.
///
/// | Env Var                     | Default |
/// |-----------------------------|---------|
/// | `ALERT_CONTEXT_BEFORE`      | `2`     |
/// | `ALERT_CONTEXT_AFTER`       | `2`     |
/// | `ALERT_CONTEXT_TIME_RANGE`  | `30m`   |
/// | `ALERT_SEARCH_WINDOW`       | `5m`    |
/// | `ALERT_MAX_MATCHES`         | `3`     |
/// | `ALERT_DEFAULT_QUERY_MATCH` | unset   |
///
/// Durations are validated here so a bad default stops the process at
/// startup instead of failing every webhook.
pub fn extract_settings_from_env() -> ExtractSettings {
    let defaults = ExtractSettings::default();
    let count = |name: &str, default: usize| -> usize {
        match std::env::var(name) {
            Ok(v) => v
                .trim()
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a non-negative integer")),
            Err(_) => default,
        }
    };
    let duration = |name: &str, default: String| -> String {
        let value = std::env::var(name).unwrap_or(default);
        if let Err(e) = alertproxy_core::duration::parse_duration_secs(&value) {
            panic!("{name}: {e}");
        }
        value
    };

    ExtractSettings {
        context_before: count("ALERT_CONTEXT_BEFORE", defaults.context_before),
        context_after: count("ALERT_CONTEXT_AFTER", defaults.context_after),
        context_time_range: duration("ALERT_CONTEXT_TIME_RANGE", defaults.context_time_range),
        search_window: duration("ALERT_SEARCH_WINDOW", defaults.search_window),
        max_matches: count("ALERT_MAX_MATCHES", defaults.max_matches),
        default_query_match: std::env::var("ALERT_DEFAULT_QUERY_MATCH")
            .ok()
            .filter(|q| !q.trim().is_empty()),
    }
}
