/// Router configuration. Passed explicitly to [`Router::new`](crate::Router::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Value of the `Server` header on every response. Empty disables it.
    pub server_name: String,

    /// Idle request contexts kept for reuse (default: 1024).
    pub pool_capacity: usize,

    /// Environment: development, production, test
    pub environment: String,

    /// Default log filter when `RUST_LOG` is unset (default: info)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "Sonata".to_string(),
            pool_capacity: 1024,
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    ///
    /// - `SONATA_SERVER_NAME`
    /// - `SONATA_POOL_CAPACITY`
    /// - `ENVIRONMENT`
    /// - `RUST_LOG`
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to
    /// the defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let pool_capacity = match lookup("SONATA_POOL_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        key: "SONATA_POOL_CAPACITY",
                        value: raw,
                    });
                }
            },
            None => defaults.pool_capacity,
        };

        Ok(Config {
            server_name: lookup("SONATA_SERVER_NAME").unwrap_or(defaults.server_name),
            pool_capacity,
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
