// src/router.rs
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::app::{App, Shared, method_not_allowed, not_found};
use crate::config::Config;
use crate::context::Handler;
use crate::error::RouteError;
use crate::http::Method;
use crate::pool::ContextPool;
use crate::tree::PathTree;

/// A named route kept for reverse URL generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    name: String,
    pattern: String,
    template: String,
}

impl Route {
    fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            template: build_template(pattern),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The pattern with constraints stripped: `<id:\d+>` becomes `<id>`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitutes each `<name>` token with its URL-encoded value. Tokens
    /// without a value are left in place.
    pub fn url(&self, pairs: &[(&str, &str)]) -> String {
        let mut url = self.template.clone();
        for (name, value) in pairs {
            let token = format!("<{name}>");
            if url.contains(&token) {
                url = url.replace(&token, &urlencoding::encode(value));
            }
        }
        url
    }
}

fn build_template(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let mut depth = 0usize;
        let mut end = tail.len();
        for (i, b) in tail.bytes().enumerate() {
            match b {
                b'<' => depth += 1,
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        let inner = &tail[1..end.max(1)];
        let name = inner.split(':').next().unwrap_or(inner);
        out.push('<');
        out.push_str(name);
        out.push('>');
        rest = tail.get(end + 1..).unwrap_or("");
    }
    out.push_str(rest);
    out
}

macro_rules! method_shortcuts {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route. Panics on an invalid or duplicate pattern.")]
            pub fn $name<I>(&mut self, pattern: &str, handlers: I) -> RouteRef<'_>
            where
                I: IntoIterator,
                I::Item: Into<Handler>,
            {
                self.add(Method::$method, pattern, handlers)
            }
        )*

        /// Registers the pattern under every routable method.
        pub fn any<I>(&mut self, pattern: &str, handlers: I) -> RouteRef<'_>
        where
            I: IntoIterator,
            I::Item: Into<Handler>,
        {
            let handlers: Vec<Handler> = handlers.into_iter().map(Into::into).collect();
            for method in Method::ALL {
                if let Err(err) = self.try_add(method, pattern, handlers.iter().cloned()) {
                    panic!("{err}");
                }
            }
            self.route_ref(pattern)
        }
    };
}

/// Setup-phase route registry. Call [`Router::build`] once every route is
/// registered to get an [`App`] that can serve requests.
pub struct Router {
    config: Config,
    middleware: Vec<Handler>,
    not_found: Vec<Handler>,
    trees: HashMap<Method, PathTree<usize>>,
    chains: Vec<Vec<Handler>>,
    routes: HashMap<String, Route>,
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
    max_params: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Router {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            middleware: Vec::new(),
            not_found: vec![Handler::new(method_not_allowed), Handler::new(not_found)],
            trees: HashMap::new(),
            chains: Vec::new(),
            routes: HashMap::new(),
            data: HashMap::new(),
            max_params: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Appends handlers that run ahead of every route and of the not-found
    /// chain, whether the routes were registered before or after this call.
    pub fn middleware<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        self.middleware.extend(handlers.into_iter().map(Into::into));
        self
    }

    /// Replaces the handlers run when no route matches.
    pub fn not_found<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        self.not_found = handlers.into_iter().map(Into::into).collect();
        self
    }

    /// Stores application-wide data readable through
    /// [`Context::shared`](crate::Context::shared).
    pub fn share<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.data.insert(key.into(), Box::new(value));
        self
    }

    pub fn try_add<I>(&mut self, method: Method, pattern: &str, handlers: I) -> Result<RouteRef<'_>, RouteError>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        let handlers = handlers.into_iter().map(Into::into).collect();
        self.register(method, pattern, handlers)?;
        Ok(self.route_ref(pattern))
    }

    /// Registers a route.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid or already registered for `method`.
    pub fn add<I>(&mut self, method: Method, pattern: &str, handlers: I) -> RouteRef<'_>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        match self.try_add(method, pattern, handlers) {
            Ok(route) => route,
            Err(err) => panic!("{err}"),
        }
    }

    method_shortcuts! {
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
    }

    /// Opens a group whose routes share `prefix` and run `handlers` after the
    /// router middleware and before their own handlers.
    pub fn group<I>(&mut self, prefix: &str, handlers: I) -> Group<'_>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        Group {
            router: self,
            prefix: prefix.to_string(),
            handlers: handlers.into_iter().map(Into::into).collect(),
        }
    }

    /// Looks up a named route.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    /// Largest parameter count of any registered pattern.
    pub fn max_params(&self) -> usize {
        self.max_params
    }

    /// Freezes the registry. Every chain becomes router middleware, then
    /// group middleware, then route handlers.
    pub fn build(self) -> App {
        let Router {
            config,
            middleware,
            not_found,
            trees,
            chains,
            routes,
            data,
            max_params,
        } = self;

        let chains: Vec<Arc<[Handler]>> = chains
            .into_iter()
            .map(|own| middleware.iter().cloned().chain(own).collect())
            .collect();
        let not_found: Arc<[Handler]> = middleware.iter().cloned().chain(not_found).collect();

        tracing::debug!(
            routes = chains.len(),
            named = routes.len(),
            max_params,
            "router built"
        );

        let pool = ContextPool::new(max_params, config.pool_capacity);
        let shared = Shared {
            config,
            trees,
            chains,
            not_found,
            routes,
            data,
            max_params,
            no_names: Arc::from(Vec::new()),
        };
        App::new(shared, pool)
    }

    fn register(&mut self, method: Method, pattern: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        if method == Method::Unknown {
            return Err(RouteError::invalid(pattern, "routes need a known HTTP method"));
        }
        let idx = self.chains.len();
        let tree = self
            .trees
            .entry(method)
            .or_insert_with(|| PathTree::new(method));
        let params = tree.add(pattern, idx)?;
        self.chains.push(handlers);
        self.max_params = self.max_params.max(params);
        tracing::debug!(%method, pattern, params, "registered route");
        Ok(())
    }

    fn route_ref(&mut self, pattern: &str) -> RouteRef<'_> {
        RouteRef {
            router: self,
            pattern: pattern.to_string(),
        }
    }
}

/// Handle to a freshly registered route.
pub struct RouteRef<'r> {
    router: &'r mut Router,
    pattern: String,
}

impl RouteRef<'_> {
    /// Names the route for reverse lookup. A later route registered under
    /// the same name replaces this one.
    pub fn name(self, name: &str) -> Self {
        let route = Route::new(name, &self.pattern);
        if let Some(prev) = self.router.routes.insert(name.to_string(), route) {
            tracing::warn!(name, previous = prev.pattern(), current = %self.pattern, "route name reused");
        }
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Routes sharing a path prefix and middleware. Registrations are forwarded
/// to the owning [`Router`].
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    handlers: Vec<Handler>,
}

impl Group<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Appends middleware for routes registered on this group from now on.
    pub fn middleware<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        self.handlers.extend(handlers.into_iter().map(Into::into));
        self
    }

    /// Opens a nested group that inherits this group's prefix and middleware.
    pub fn group<I>(&mut self, prefix: &str, handlers: I) -> Group<'_>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        let mut inherited = self.handlers.clone();
        inherited.extend(handlers.into_iter().map(Into::into));
        Group {
            router: &mut *self.router,
            prefix: format!("{}{}", self.prefix, prefix),
            handlers: inherited,
        }
    }

    pub fn try_add<I>(&mut self, method: Method, pattern: &str, handlers: I) -> Result<RouteRef<'_>, RouteError>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        let full = format!("{}{}", self.prefix, pattern);
        let mut chain = self.handlers.clone();
        chain.extend(handlers.into_iter().map(Into::into));
        self.router.register(method, &full, chain)?;
        Ok(self.router.route_ref(&full))
    }

    /// Registers a route under the group prefix.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid or already registered for `method`.
    pub fn add<I>(&mut self, method: Method, pattern: &str, handlers: I) -> RouteRef<'_>
    where
        I: IntoIterator,
        I::Item: Into<Handler>,
    {
        match self.try_add(method, pattern, handlers) {
            Ok(route) => route,
            Err(err) => panic!("{err}"),
        }
    }

    method_shortcuts! {
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
    }

    fn route_ref(&mut self, pattern: &str) -> RouteRef<'_> {
        let full = format!("{}{}", self.prefix, pattern);
        self.router.route_ref(&full)
    }
}
