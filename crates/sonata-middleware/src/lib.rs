// src/lib.rs
//! Ready-made handlers for Sonata chains.
//!
//! Each constructor returns a plain handler that is registered like any
//! other, usually at the front of the chain:
//!
//! ```rust
//! use sonata_core::Router;
//! use sonata_middleware::{access_log, recovery, remove_trailing_slash};
//!
//! let mut router = Router::default();
//! router.middleware([recovery(), access_log(), remove_trailing_slash(301)]);
//! ```
//!
//! Configurable handlers take a `*_with_config` struct whose
//! [`Skipper`] decides per request whether the handler steps aside.
pub mod access_log;
pub mod basic_auth;
pub mod cors;
pub mod recovery;
pub mod secure;
pub mod skipper;
pub mod trailing_slash;

pub use access_log::access_log;
pub use basic_auth::{BasicAuthConfig, BasicAuthValidator, basic_auth, basic_auth_with_config};
pub use cors::{CorsConfig, cors, cors_with_config};
pub use recovery::recovery;
pub use secure::{SecureConfig, secure, secure_with_config};
pub use skipper::{Skipper, default_skipper, skip_prefix};
pub use trailing_slash::{add_trailing_slash, remove_trailing_slash};
