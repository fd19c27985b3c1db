// src/cors.rs
use sonata_core::http::header;
use sonata_core::{Context, Handler, Method};

use crate::skipper::{Skipper, default_skipper};

/// Cross-origin resource sharing policy.
#[derive(Clone)]
pub struct CorsConfig {
    pub skipper: Skipper,
    /// Origins allowed to access the resource. `"*"` allows any origin.
    pub allow_origins: Vec<String>,
    /// Methods answered in `Access-Control-Allow-Methods` on preflight.
    pub allow_methods: Vec<Method>,
    /// Headers answered on preflight. When empty, the request's
    /// `Access-Control-Request-Headers` is echoed back.
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Headers the browser may expose to the calling script.
    pub expose_headers: Vec<String>,
    /// Seconds a preflight result may be cached. Zero omits the header.
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            skipper: default_skipper(),
            allow_origins: vec!["*".to_string()],
            allow_methods: vec![
                Method::Get,
                Method::Head,
                Method::Put,
                Method::Patch,
                Method::Post,
                Method::Delete,
            ],
            allow_headers: Vec::new(),
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: 0,
        }
    }
}

impl std::fmt::Debug for CorsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorsConfig")
            .field("allow_origins", &self.allow_origins)
            .field("allow_methods", &self.allow_methods)
            .field("allow_headers", &self.allow_headers)
            .field("allow_credentials", &self.allow_credentials)
            .field("expose_headers", &self.expose_headers)
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// CORS with the default policy: any origin, the common methods.
pub fn cors() -> Handler {
    cors_with_config(CorsConfig::default())
}

/// Adds CORS headers to simple requests and answers preflight `OPTIONS`
/// requests with 204, ending the chain.
///
/// Empty `allow_origins` or `allow_methods` fall back to the defaults.
pub fn cors_with_config(mut config: CorsConfig) -> Handler {
    let defaults = CorsConfig::default();
    if config.allow_origins.is_empty() {
        config.allow_origins = defaults.allow_origins;
    }
    if config.allow_methods.is_empty() {
        config.allow_methods = defaults.allow_methods;
    }

    let allow_methods = config
        .allow_methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(",");
    let allow_headers = config.allow_headers.join(",");
    let expose_headers = config.expose_headers.join(",");

    Handler::new(move |ctx: &mut Context| {
        if (config.skipper)(ctx) {
            return Ok(());
        }

        let origin = ctx.header(header::ORIGIN).unwrap_or("");
        let allow_origin = config
            .allow_origins
            .iter()
            .find(|o| o.as_str() == "*" || o.as_str() == origin)
            .cloned()
            .unwrap_or_default();

        let res = ctx.response_mut();
        res.append_header(header::VARY, header::ORIGIN);

        if ctx.method() != Method::Options {
            let res = ctx.response_mut();
            res.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
            if config.allow_credentials {
                res.set_header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
            }
            if !expose_headers.is_empty() {
                res.set_header(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose_headers.as_str());
            }
            return Ok(());
        }

        let requested = ctx
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .map(str::to_string);
        let res = ctx.response_mut();
        res.append_header(header::VARY, header::ACCESS_CONTROL_REQUEST_METHOD);
        res.append_header(header::VARY, header::ACCESS_CONTROL_REQUEST_HEADERS);
        res.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        res.set_header(header::ACCESS_CONTROL_ALLOW_METHODS, allow_methods.as_str());
        if config.allow_credentials {
            res.set_header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if !allow_headers.is_empty() {
            res.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers.as_str());
        } else if let Some(requested) = requested {
            res.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
        }
        if config.max_age > 0 {
            res.set_header(header::ACCESS_CONTROL_MAX_AGE, config.max_age.to_string());
        }

        tracing::trace!(path = ctx.path(), "answered cors preflight");
        ctx.no_content(204)?;
        ctx.abort()
    })
}
