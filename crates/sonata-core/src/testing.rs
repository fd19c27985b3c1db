// src/testing.rs
use crate::app::App;
use crate::http::{Method, Request, Response};

/// Drives an [`App`] in-process, without any transport.
///
/// ```rust
/// use sonata_core::testing::TestClient;
/// use sonata_core::{Context, HandlerResult, Router};
///
/// fn list(ctx: &mut Context) -> HandlerResult {
///     ctx.text("user list")
/// }
///
/// let mut router = Router::default();
/// router.get("/users", [list]);
/// let client = TestClient::new(router.build());
///
/// let res = client.get("/users");
/// assert_eq!(res.status, 200);
/// assert_eq!(res.body_str(), "user list");
/// ```
pub struct TestClient {
    app: App,
}

impl TestClient {
    pub fn new(app: App) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Send a prepared request.
    pub fn send(&self, request: Request) -> Response {
        self.app.serve(request)
    }

    /// Send a body-less request. `target` may carry a query string.
    pub fn request(&self, method: Method, target: &str) -> Response {
        self.send(Request::new(method, target))
    }

    pub fn get(&self, target: &str) -> Response {
        self.request(Method::Get, target)
    }

    pub fn post(&self, target: &str, body: impl Into<Vec<u8>>) -> Response {
        self.send(Request::new(Method::Post, target).body(body))
    }

    pub fn put(&self, target: &str, body: impl Into<Vec<u8>>) -> Response {
        self.send(Request::new(Method::Put, target).body(body))
    }

    pub fn delete(&self, target: &str) -> Response {
        self.request(Method::Delete, target)
    }
}

impl From<App> for TestClient {
    fn from(app: App) -> Self {
        Self::new(app)
    }
}
