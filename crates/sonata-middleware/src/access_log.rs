// src/access_log.rs
use std::time::Instant;

use sonata_core::{Context, Handler};

/// Logs one `info` event per request once the rest of the chain has run.
///
/// When the chain failed, the logged status is the one the error translator
/// is about to write.
pub fn access_log() -> Handler {
    Handler::new(|ctx: &mut Context| {
        let start = Instant::now();
        let result = ctx.next();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = match &result {
            Ok(()) => ctx.response().status,
            Err(err) => err.status(),
        };
        let req = ctx.request();
        tracing::info!(
            client = req.client_ip().unwrap_or("-"),
            method = %req.method,
            path = %req.path,
            query = req.query.as_deref().unwrap_or(""),
            status,
            bytes = ctx.response().body.len(),
            elapsed_ms,
            "request"
        );
        result
    })
}
