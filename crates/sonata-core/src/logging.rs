//! Logging and tracing initialization for Sonata.
//!
//! The core emits `tracing` events (route registration, error translation,
//! dispatch). Nothing is printed until a subscriber is installed:
//!
//! ```rust,no_run
//! use sonata_core::{Config, Router, logging};
//!
//! let config = Config::from_env().expect("config");
//! logging::init_logging_with_level(&config.log_level);
//! let app = Router::new(config).build();
//! ```
//!
//! `RUST_LOG` always takes precedence, e.g.
//! `RUST_LOG=sonata_core=debug,sonata_middleware=info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info`, unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Initialize logging with a specific default level.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize JSON-formatted logging (recommended for production).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
