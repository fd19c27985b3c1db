// src/basic_auth.rs
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sonata_core::http::header;
use sonata_core::{Context, Handler, HttpError};

use crate::skipper::{Skipper, default_skipper};

/// Checks a username/password pair.
pub type BasicAuthValidator = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

const BASIC: &str = "Basic";
const CHALLENGE: &str = "Basic realm=Restricted";

#[derive(Clone)]
pub struct BasicAuthConfig {
    pub skipper: Skipper,
    pub validator: BasicAuthValidator,
}

impl BasicAuthConfig {
    pub fn new<F>(validator: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            skipper: default_skipper(),
            validator: Arc::new(validator),
        }
    }
}

/// HTTP basic authentication.
///
/// Valid credentials let the chain continue. Missing or rejected
/// credentials fail with 401 and a `WWW-Authenticate` challenge; a header
/// whose payload is not valid base64 fails with 400.
pub fn basic_auth<F>(validator: F) -> Handler
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    basic_auth_with_config(BasicAuthConfig::new(validator))
}

pub fn basic_auth_with_config(config: BasicAuthConfig) -> Handler {
    Handler::new(move |ctx: &mut Context| {
        if (config.skipper)(ctx) {
            return Ok(());
        }

        if let Some(encoded) = ctx
            .header(header::AUTHORIZATION)
            .and_then(|auth| auth.strip_prefix(BASIC))
            .and_then(|rest| rest.strip_prefix(' '))
            .filter(|rest| !rest.is_empty())
        {
            let decoded = STANDARD
                .decode(encoded)
                .map_err(|_| HttpError::bad_request("malformed basic credentials"))?;
            let credentials = String::from_utf8_lossy(&decoded);
            if let Some((user, password)) = credentials.split_once(':') {
                if (config.validator)(user, password) {
                    return Ok(());
                }
            }
            tracing::debug!(path = ctx.path(), "basic credentials rejected");
        }

        ctx.set_header(header::WWW_AUTHENTICATE, CHALLENGE);
        Err(HttpError::unauthorized().into())
    })
}
