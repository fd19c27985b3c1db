// src/skipper.rs
use std::sync::Arc;

use sonata_core::Context;

/// Decides, per request, whether a handler should step aside. Returning
/// `true` skips the handler's work and lets the chain continue.
pub type Skipper = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Never skips.
pub fn default_skipper() -> Skipper {
    Arc::new(|_: &Context| false)
}

/// Skips requests whose path starts with `prefix`.
pub fn skip_prefix(prefix: impl Into<String>) -> Skipper {
    let prefix = prefix.into();
    Arc::new(move |ctx: &Context| ctx.path().starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonata_core::testing::TestClient;
    use sonata_core::{HandlerResult, Router};

    #[test]
    fn test_skip_prefix() {
        let skip = skip_prefix("/health");
        let never = default_skipper();
        let mut router = Router::default();
        router.get("/*", [move |ctx: &mut Context| -> HandlerResult {
            let verdict = format!("{}/{}", skip(ctx), never(ctx));
            ctx.text(verdict)
        }]);
        let client = TestClient::new(router.build());

        assert_eq!(client.get("/health/live").body_str(), "true/false");
        assert_eq!(client.get("/users").body_str(), "false/false");
    }
}
