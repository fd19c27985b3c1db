// src/app.rs
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::context::{Context, Handler};
use crate::error::{Error, HandlerResult, HttpError};
use crate::http::{Method, Request, Response, header, mime};
use crate::pool::ContextPool;
use crate::router::Route;
use crate::tree::PathTree;

/// Read-only tables produced by [`Router::build`](crate::Router::build).
/// Every in-flight context holds a reference to them.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) trees: HashMap<Method, PathTree<usize>>,
    pub(crate) chains: Vec<Arc<[Handler]>>,
    pub(crate) not_found: Arc<[Handler]>,
    pub(crate) routes: HashMap<String, Route>,
    pub(crate) data: HashMap<String, Box<dyn Any + Send + Sync>>,
    pub(crate) max_params: usize,
    pub(crate) no_names: Arc<[String]>,
}

impl Shared {
    /// Resolves `path` for `method`. A miss yields the not-found chain with
    /// no parameter names.
    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
        values: &mut [String],
    ) -> (Arc<[Handler]>, Arc<[String]>) {
        let hit = self
            .trees
            .get(&method)
            .and_then(|tree| tree.get(path, values))
            .and_then(|(idx, names)| Some((Arc::clone(self.chains.get(*idx)?), Arc::clone(names))));
        match hit {
            Some(found) => found,
            None => (Arc::clone(&self.not_found), Arc::clone(&self.no_names)),
        }
    }

    pub(crate) fn data<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key)?.downcast_ref::<T>()
    }

    pub(crate) fn url(&self, name: &str, pairs: &[(&str, &str)]) -> String {
        self.routes
            .get(name)
            .map(|route| route.url(pairs))
            .unwrap_or_default()
    }

    /// Methods, in wire-name order, with a route matching `path`.
    pub(crate) fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut scratch = vec![String::new(); self.max_params];
        let mut methods: Vec<Method> = self
            .trees
            .iter()
            .filter(|(_, tree)| tree.get(path, &mut scratch).is_some())
            .map(|(method, _)| *method)
            .collect();
        methods.sort();
        methods
    }
}

/// A frozen router, ready to serve requests from any number of threads.
///
/// ```rust
/// use sonata_core::{Context, HandlerResult, Method, Request, Router};
///
/// fn hello(ctx: &mut Context) -> HandlerResult {
///     let name = ctx.param("name").unwrap_or("world").to_string();
///     ctx.text(format!("hello {name}"))
/// }
///
/// let mut router = Router::default();
/// router.get("/hello/<name>", [hello]);
/// let app = router.build();
///
/// let res = app.serve(Request::new(Method::Get, "/hello/sonata"));
/// assert_eq!(res.body_str(), "hello sonata");
/// ```
pub struct App {
    shared: Arc<Shared>,
    pool: ContextPool,
}

impl App {
    pub(crate) fn new(shared: Shared, pool: ContextPool) -> Self {
        Self {
            shared: Arc::new(shared),
            pool,
        }
    }

    /// Runs one request through its chain and returns the response.
    pub fn serve(&self, request: Request) -> Response {
        let mut ctx = self.pool.acquire();
        ctx.reset(request, Arc::clone(&self.shared));
        ctx.resolve(&self.shared);
        tracing::trace!(
            method = %ctx.method(),
            path = ctx.path(),
            handlers = ctx.handler_count(),
            "dispatch"
        );

        if let Err(err) = ctx.next() {
            handle_error(&mut ctx, &err);
        }

        let server = &self.shared.config.server_name;
        if !server.is_empty() {
            ctx.set_header(header::SERVER, server.as_str());
        }

        let response = ctx.take_response();
        self.pool.release(ctx);
        response
    }

    /// Methods with a route matching `path`, in wire-name order.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.shared.allowed_methods(path)
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.shared.routes.get(name)
    }

    /// Builds the URL of a named route. Unknown names yield an empty string.
    pub fn url(&self, name: &str, pairs: &[(&str, &str)]) -> String {
        self.shared.url(name, pairs)
    }

    pub fn max_params(&self) -> usize {
        self.shared.max_params
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.shared.chains.len())
            .field("max_params", &self.shared.max_params)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Writes the response for a failed chain: the structured status and message
/// of an [`HttpError`], or 500 with the error text for anything else. Any
/// body written before the failure is discarded. HEAD responses carry no
/// body.
pub fn handle_error(ctx: &mut Context, err: &Error) {
    let status = err.status();
    let message = err.message();

    if status >= 500 {
        tracing::error!(
            method = %ctx.method(),
            path = ctx.path(),
            status,
            error = %err,
            "handler failed"
        );
    } else {
        tracing::debug!(method = %ctx.method(), path = ctx.path(), status, "request rejected");
    }

    let method = ctx.method();
    let res = ctx.response_mut();
    res.status = status;
    res.clear_body();
    if method != Method::Head {
        res.set_header(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF8);
        res.write(message.as_bytes());
    }
}

/// Fallback that answers when the path is routed under other methods.
///
/// Sets `Allow` to the matching methods plus `OPTIONS`. An `OPTIONS` request
/// then completes normally; any other method fails with 405. When no method
/// matches the path this handler does nothing.
pub fn method_not_allowed(ctx: &mut Context) -> HandlerResult {
    let mut methods = ctx.allowed_methods();
    if methods.is_empty() {
        return Ok(());
    }
    if !methods.contains(&Method::Options) {
        methods.push(Method::Options);
        methods.sort();
    }
    let allow = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    ctx.set_header(header::ALLOW, allow);

    if ctx.method() == Method::Options {
        ctx.abort()
    } else {
        Err(HttpError::method_not_allowed().into())
    }
}

/// Fallback that fails with 404.
pub fn not_found(_ctx: &mut Context) -> HandlerResult {
    Err(HttpError::not_found().into())
}
