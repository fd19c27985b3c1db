// src/trailing_slash.rs
use sonata_core::{Context, Handler, HandlerResult};

/// Redirects `/path/` to `/path` with `redirect_code`, keeping the query
/// string. The root path is left alone.
pub fn remove_trailing_slash(redirect_code: u16) -> Handler {
    Handler::new(move |ctx: &mut Context| {
        let path = ctx.path();
        match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => {
                let target = with_query(trimmed, ctx.query());
                redirect(ctx, &target, redirect_code)
            }
            _ => Ok(()),
        }
    })
}

/// Redirects `/path` to `/path/` with `redirect_code`, keeping the query
/// string.
pub fn add_trailing_slash(redirect_code: u16) -> Handler {
    Handler::new(move |ctx: &mut Context| {
        let path = ctx.path();
        if path.ends_with('/') {
            return Ok(());
        }
        let target = with_query(&format!("{path}/"), ctx.query());
        redirect(ctx, &target, redirect_code)
    })
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}

fn redirect(ctx: &mut Context, target: &str, code: u16) -> HandlerResult {
    tracing::debug!(from = ctx.path(), to = target, code, "normalising trailing slash");
    ctx.redirect(target, code)?;
    ctx.abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/a", None), "/a");
        assert_eq!(with_query("/a", Some("")), "/a");
        assert_eq!(with_query("/a", Some("x=1&y=2")), "/a?x=1&y=2");
    }
}
