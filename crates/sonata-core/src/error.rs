use std::fmt;

use thiserror::Error;

use crate::http::{Method, status_text};

/// A failure that carries an explicit status code and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    /// Create an error whose message is the reason phrase of `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: status_text(status).to_string(),
        }
    }

    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(405)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    pub fn internal() -> Self {
        Self::new(500)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// The failure value a handler returns to stop the chain.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid redirect status code: {0}")]
    InvalidRedirectCode(u16),
}

impl Error {
    /// Wrap an arbitrary error as an opaque handler failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Handler(Box::new(err))
    }

    /// Status the translator writes for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Http(e) => e.status,
            _ => 500,
        }
    }

    /// Body the translator writes for this error.
    pub fn message(&self) -> String {
        match self {
            Error::Http(e) => e.message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Handler(Box::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Handler(Box::new(e))
    }
}

pub type HandlerResult = Result<(), Error>;

/// Problems detected while registering routes. These are fatal at startup.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {method} {pattern} is already registered")]
    Duplicate { method: Method, pattern: String },

    #[error("catch-all must be the last segment in {pattern}")]
    CatchAllNotLast { pattern: String },

    #[error("invalid route pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid parameter constraint in {pattern}: {source}")]
    InvalidConstraint {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
