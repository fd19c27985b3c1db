// src/lib.rs
//! Request routing and middleware dispatch.
//!
//! Routes are registered on a [`Router`], which is frozen into an [`App`] by
//! [`Router::build`]. The app matches each request against a per-method
//! segment trie, binds a pooled [`Context`] to the matched handler chain and
//! runs the chain until it finishes, aborts, or fails. Failures go through a
//! single translator, [`handle_error`].

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod logging;
pub mod pool;
pub mod prelude;
pub mod router;
pub mod serialize;
pub mod testing;
pub mod tree;

// Re-exports for users
pub use app::{App, handle_error, method_not_allowed, not_found};
pub use config::{Config, ConfigError};
pub use context::{Context, Handler};
pub use error::{Error, HandlerResult, HttpError, RouteError};
pub use http::{Method, Request, Response};
pub use pool::ContextPool;
pub use router::{Group, Route, RouteRef, Router};
pub use serialize::{Payload, SerializeFn};
pub use tree::PathTree;
