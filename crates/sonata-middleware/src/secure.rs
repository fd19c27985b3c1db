// src/secure.rs
use sonata_core::http::header;
use sonata_core::{Context, Handler};

use crate::skipper::{Skipper, default_skipper};

/// Security response headers. An empty string, or a zero `hsts_max_age`,
/// leaves the matching header out.
#[derive(Clone)]
pub struct SecureConfig {
    pub skipper: Skipper,
    /// `X-XSS-Protection`.
    pub xss_protection: String,
    /// `X-Content-Type-Options`.
    pub content_type_nosniff: String,
    /// `X-Frame-Options`.
    pub x_frame_options: String,
    /// `Strict-Transport-Security` max-age in seconds. Only sent on requests
    /// that arrived over https.
    pub hsts_max_age: u64,
    pub hsts_exclude_subdomains: bool,
    /// `Content-Security-Policy`.
    pub content_security_policy: String,
}

impl Default for SecureConfig {
    fn default() -> Self {
        Self {
            skipper: default_skipper(),
            xss_protection: "1; mode=block".to_string(),
            content_type_nosniff: "nosniff".to_string(),
            x_frame_options: "SAMEORIGIN".to_string(),
            hsts_max_age: 0,
            hsts_exclude_subdomains: false,
            content_security_policy: String::new(),
        }
    }
}

impl std::fmt::Debug for SecureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureConfig")
            .field("xss_protection", &self.xss_protection)
            .field("content_type_nosniff", &self.content_type_nosniff)
            .field("x_frame_options", &self.x_frame_options)
            .field("hsts_max_age", &self.hsts_max_age)
            .field("hsts_exclude_subdomains", &self.hsts_exclude_subdomains)
            .field("content_security_policy", &self.content_security_policy)
            .finish()
    }
}

/// Sets the default security headers on every response.
pub fn secure() -> Handler {
    secure_with_config(SecureConfig::default())
}

pub fn secure_with_config(config: SecureConfig) -> Handler {
    let hsts = (config.hsts_max_age > 0).then(|| {
        let mut value = format!("max-age={}", config.hsts_max_age);
        if !config.hsts_exclude_subdomains {
            value.push_str("; includeSubdomains");
        }
        value
    });

    Handler::new(move |ctx: &mut Context| {
        if (config.skipper)(ctx) {
            return Ok(());
        }

        let fixed = [
            (header::X_XSS_PROTECTION, &config.xss_protection),
            (header::X_CONTENT_TYPE_OPTIONS, &config.content_type_nosniff),
            (header::X_FRAME_OPTIONS, &config.x_frame_options),
            (header::CONTENT_SECURITY_POLICY, &config.content_security_policy),
        ];
        for (name, value) in fixed {
            if !value.is_empty() {
                ctx.set_header(name, value.as_str());
            }
        }

        if let Some(hsts) = &hsts {
            if is_https(ctx) {
                ctx.set_header(header::STRICT_TRANSPORT_SECURITY, hsts.as_str());
            }
        }
        Ok(())
    })
}

fn is_https(ctx: &Context) -> bool {
    ctx.header(header::X_FORWARDED_PROTO)
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}
