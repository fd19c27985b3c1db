//! Sonata prelude: everything a handler module usually needs.
//!
//! ```rust
//! use sonata_core::prelude::*;
//! ```

// ── Core types ─────────────────────────────────────────────────
pub use crate::App;
pub use crate::Config;
pub use crate::Context;
pub use crate::Handler;

// ── Router & routing ───────────────────────────────────────────
pub use crate::{Group, Router};

// ── Errors ─────────────────────────────────────────────────────
pub use crate::{Error, HandlerResult, HttpError};

// ── HTTP types ─────────────────────────────────────────────────
pub use crate::http::{header, mime};
pub use crate::{Method, Request, Response};

// ── Serde ──────────────────────────────────────────────────────
pub use serde::{Deserialize, Serialize};
