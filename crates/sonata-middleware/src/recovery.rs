// src/recovery.rs
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use sonata_core::{Context, Handler, HttpError};

/// Turns a panic anywhere downstream into a 500 response.
///
/// Register it first so it covers every later handler.
pub fn recovery() -> Handler {
    Handler::new(|ctx: &mut Context| {
        match catch_unwind(AssertUnwindSafe(|| ctx.next())) {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    panic = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                Err(HttpError::internal().into())
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
