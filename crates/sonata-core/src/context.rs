// src/context.rs
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::app::Shared;
use crate::error::{Error, HandlerResult};
use crate::http::{Method, Request, Response, header, mime};
use crate::serialize::{Payload, SerializeFn, default_serialize};

/// Cursor value of a context that has not run any handler yet.
pub const INITIAL_INDEX: isize = -1;

/// A single step of a handler chain.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Handler(Arc::new(f))
    }

    #[inline(always)]
    pub fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.0)(ctx)
    }
}

impl<F> From<F> for Handler
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Handler::new(f)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// Per-request state: the request/response pair, the matched handler chain
/// and its cursor, captured parameters and a request-scoped store.
///
/// Contexts are drawn from a [`ContextPool`](crate::ContextPool) and reset
/// between requests.
pub struct Context {
    request: Request,
    response: Response,
    shared: Option<Arc<Shared>>,
    handlers: Arc<[Handler]>,
    names: Arc<[String]>,
    values: Vec<String>,
    index: isize,
    store: HashMap<String, Box<dyn Any + Send + Sync>>,
    serialize: SerializeFn,
}

impl Context {
    pub(crate) fn new(max_params: usize) -> Self {
        Self {
            request: Request::default(),
            response: Response::default(),
            shared: None,
            handlers: Arc::from(Vec::new()),
            names: Arc::from(Vec::new()),
            values: vec![String::new(); max_params],
            index: INITIAL_INDEX,
            store: HashMap::new(),
            serialize: default_serialize,
        }
    }

    pub(crate) fn reset(&mut self, request: Request, shared: Arc<Shared>) {
        self.request = request;
        self.response.reset();
        self.shared = Some(shared);
        self.store.clear();
        self.index = INITIAL_INDEX;
        self.serialize = default_serialize;
    }

    /// Resolves the current request against the application's routes and
    /// binds the resulting chain.
    pub(crate) fn resolve(&mut self, shared: &Shared) {
        let (handlers, names) = shared.lookup(self.request.method, &self.request.path, &mut self.values);
        self.handlers = handlers;
        self.names = names;
    }

    /// Drops everything tied to the finished request. The parameter buffer
    /// keeps its allocations and is overwritten by the next match.
    pub(crate) fn recycle(&mut self) {
        self.request = Request::default();
        self.response.reset();
        self.shared = None;
        self.handlers = Arc::from(Vec::new());
        self.names = Arc::from(Vec::new());
        self.store.clear();
        self.index = INITIAL_INDEX;
        self.serialize = default_serialize;
    }

    pub(crate) fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }

    // ── Chain control ───────────────────────────────────────────

    /// Runs the rest of the chain. Stops at, and returns, the first error.
    ///
    /// A handler may call this to do work after its downstream handlers have
    /// run; if it simply returns `Ok(())` the chain continues anyway.
    pub fn next(&mut self) -> HandlerResult {
        self.index += 1;
        while let Some(handler) = self.handlers.get(self.index as usize).cloned() {
            handler.call(self)?;
            self.index += 1;
        }
        Ok(())
    }

    /// Skips every remaining handler without signalling an error.
    pub fn abort(&mut self) -> HandlerResult {
        self.index = self.handlers.len() as isize;
        Ok(())
    }

    /// Writes `err` through the error translator right away, then aborts.
    pub fn abort_with(&mut self, err: impl Into<Error>) -> HandlerResult {
        let err = err.into();
        crate::app::handle_error(self, &err);
        self.abort()
    }

    /// Position of the handler currently executing, or [`INITIAL_INDEX`].
    pub fn index(&self) -> isize {
        self.index
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= self.handlers.len() as isize
    }

    // ── Request ─────────────────────────────────────────────────

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.request.query.as_deref()
    }

    /// Every decoded `name=value` pair of the query string, in order. A
    /// malformed query yields no pairs.
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self.request.query.as_deref() {
            Some(raw) if !raw.is_empty() => serde_urlencoded::from_str(raw).unwrap_or_else(|err| {
                tracing::debug!(query = raw, error = %err, "malformed query string");
                Vec::new()
            }),
            _ => Vec::new(),
        }
    }

    /// First decoded value of the query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Every decoded value of the query parameter `name`.
    pub fn query_values(&self, name: &str) -> Vec<String> {
        self.query_params()
            .into_iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.get_header(key)
    }

    // ── Parameters ──────────────────────────────────────────────

    /// Value of the named path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.values.get(idx).map(String::as_str)
    }

    /// Value of the parameter at `index` in pattern order.
    pub fn param_at(&self, index: usize) -> Option<&str> {
        if index >= self.names.len() {
            return None;
        }
        self.values.get(index).map(String::as_str)
    }

    /// Remainder captured by a trailing `*`.
    pub fn wildcard(&self) -> Option<&str> {
        self.param("")
    }

    #[cfg(test)]
    pub(crate) fn param_capacity(&self) -> usize {
        self.values.len()
    }

    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    // ── Request-scoped store ────────────────────────────────────

    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.store.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.store.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.store.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.store.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn store_len(&self) -> usize {
        self.store.len()
    }

    // ── Application ─────────────────────────────────────────────

    /// Data shared with [`Router::share`](crate::Router::share).
    pub fn shared<T: Any>(&self, key: &str) -> Option<&T> {
        self.shared.as_ref()?.data(key)
    }

    /// Builds a URL for a named route. Returns an empty string when the name
    /// is unknown.
    pub fn url(&self, route: &str, pairs: &[(&str, &str)]) -> String {
        self.shared
            .as_ref()
            .map(|s| s.url(route, pairs))
            .unwrap_or_default()
    }

    /// Methods with a route matching the current path.
    pub fn allowed_methods(&self) -> Vec<Method> {
        match &self.shared {
            Some(shared) => shared.allowed_methods(&self.request.path),
            None => Vec::new(),
        }
    }

    // ── Response ────────────────────────────────────────────────

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_status(&mut self, status: u16) {
        self.response.status = status;
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.response.set_header(key, value);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    pub fn set_serializer(&mut self, serialize: SerializeFn) {
        self.serialize = serialize;
    }

    /// Serializes `payload` with the current strategy and appends it to the
    /// body.
    pub fn data(&mut self, payload: impl Into<Payload>) -> HandlerResult {
        let bytes = (self.serialize)(payload.into())?;
        self.response.write(&bytes);
        Ok(())
    }

    pub fn text(&mut self, body: impl AsRef<str>) -> HandlerResult {
        self.blob(mime::TEXT_PLAIN_UTF8, body.as_ref().as_bytes())
    }

    pub fn html(&mut self, body: impl AsRef<str>) -> HandlerResult {
        self.blob(mime::TEXT_HTML_UTF8, body.as_ref().as_bytes())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        let bytes = serde_json::to_vec(value)?;
        self.blob(mime::APPLICATION_JSON_UTF8, &bytes)
    }

    pub fn blob(&mut self, content_type: &str, bytes: &[u8]) -> HandlerResult {
        self.response.set_header(header::CONTENT_TYPE, content_type);
        self.response.write(bytes);
        Ok(())
    }

    pub fn no_content(&mut self, status: u16) -> HandlerResult {
        self.response.status = status;
        Ok(())
    }

    /// Sets a redirect. Only 3xx codes up to 308 are accepted.
    pub fn redirect(&mut self, location: &str, status: u16) -> HandlerResult {
        if !(300..=308).contains(&status) {
            return Err(Error::InvalidRedirectCode(status));
        }
        self.response.set_header(header::LOCATION, location);
        self.response.status = status;
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("index", &self.index)
            .field("handlers", &self.handlers.len())
            .field("params", &self.names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use std::sync::Mutex;

    fn bound(handlers: Vec<Handler>) -> Context {
        let mut ctx = Context::new(2);
        ctx.handlers = handlers.into();
        ctx
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = Arc::clone(log);
        Handler::new(move |_| {
            log.lock().unwrap().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_next_runs_every_handler_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = bound(vec![recorder(&log, "a"), recorder(&log, "b"), recorder(&log, "c")]);

        assert_eq!(ctx.index(), INITIAL_INDEX);
        ctx.next().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(ctx.index(), 3);
    }

    #[test]
    fn test_error_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = bound(vec![
            recorder(&log, "first"),
            Handler::new(|_| Err(HttpError::with_message(418, "short and stout").into())),
            recorder(&log, "third"),
        ]);

        let err = ctx.next().unwrap_err();
        assert_eq!(err.status(), 418);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[test]
    fn test_abort_skips_rest_without_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = bound(vec![
            Handler::new(|c: &mut Context| c.abort()),
            recorder(&log, "skipped"),
        ]);

        assert!(ctx.next().is_ok());
        assert!(log.lock().unwrap().is_empty());
        assert!(ctx.is_aborted());
    }

    #[test]
    fn test_handler_can_wrap_downstream() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer_log = Arc::clone(&log);
        let mut ctx = bound(vec![
            Handler::new(move |c: &mut Context| {
                outer_log.lock().unwrap().push("before");
                let res = c.next();
                outer_log.lock().unwrap().push("after");
                res
            }),
            recorder(&log, "inner"),
        ]);

        ctx.next().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["before", "inner", "after"]);
    }

    #[test]
    fn test_store_is_typed() {
        let mut ctx = Context::new(0);
        ctx.set("user_id", 42u64);
        assert_eq!(ctx.get::<u64>("user_id"), Some(&42));
        assert_eq!(ctx.get::<String>("user_id"), None);
        if let Some(v) = ctx.get_mut::<u64>("user_id") {
            *v += 1;
        }
        assert_eq!(ctx.get::<u64>("user_id"), Some(&43));
        assert!(ctx.remove("user_id"));
        assert!(!ctx.contains("user_id"));
    }

    #[test]
    fn test_recycle_clears_request_state() {
        let mut ctx = bound(vec![Handler::new(|c: &mut Context| c.text("hi"))]);
        ctx.set("k", "v");
        ctx.next().unwrap();
        ctx.recycle();

        assert_eq!(ctx.store_len(), 0);
        assert_eq!(ctx.index(), INITIAL_INDEX);
        assert_eq!(ctx.handler_count(), 0);
        assert!(ctx.param_names().is_empty());
        assert!(ctx.response().body.is_empty());
    }

    #[test]
    fn test_redirect_rejects_non_3xx() {
        let mut ctx = Context::new(0);
        assert!(matches!(
            ctx.redirect("/elsewhere", 200),
            Err(Error::InvalidRedirectCode(200))
        ));
        ctx.redirect("/elsewhere", 301).unwrap();
        assert_eq!(ctx.response().status, 301);
        assert_eq!(ctx.response().header("location"), Some("/elsewhere"));
    }

    #[test]
    fn test_query_params_are_decoded() {
        let mut ctx = Context::new(0);
        ctx.request = Request::new(Method::Get, "/search?q=hello+world&tag=a%26b&tag=c&empty=");

        assert_eq!(ctx.query(), Some("q=hello+world&tag=a%26b&tag=c&empty="));
        assert_eq!(ctx.query_param("q").as_deref(), Some("hello world"));
        assert_eq!(ctx.query_param("tag").as_deref(), Some("a&b"));
        assert_eq!(ctx.query_values("tag"), vec!["a&b", "c"]);
        assert_eq!(ctx.query_param("empty").as_deref(), Some(""));
        assert_eq!(ctx.query_param("missing"), None);
        assert_eq!(ctx.query_params().len(), 4);
    }

    #[test]
    fn test_query_params_without_query() {
        let mut ctx = Context::new(0);
        ctx.request = Request::new(Method::Get, "/plain");
        assert!(ctx.query_params().is_empty());
        assert_eq!(ctx.query_param("q"), None);

        ctx.request = Request::new(Method::Get, "/plain?");
        assert!(ctx.query_params().is_empty());
    }

    #[test]
    fn test_data_uses_serializer() {
        let mut ctx = Context::new(0);
        ctx.data("plain").unwrap();
        ctx.set_serializer(crate::serialize::json_serialize);
        ctx.data("quoted").unwrap();
        assert_eq!(ctx.response().body_str(), r#"plain"quoted""#);
    }
}
