use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sonata_core::serialize::json_serialize;
use sonata_core::testing::TestClient;
use sonata_core::{Context, Error, HandlerResult, HttpError, Method, Request, Router};

type Trace = Vec<&'static str>;

fn mark(step: &'static str) -> impl Fn(&mut Context) -> HandlerResult + Send + Sync + 'static {
    move |ctx: &mut Context| -> HandlerResult {
        match ctx.get_mut::<Trace>("trace") {
            Some(trace) => trace.push(step),
            None => ctx.set("trace", vec![step]),
        }
        Ok(())
    }
}

fn dump_trace(ctx: &mut Context) -> HandlerResult {
    let trace = ctx.get::<Trace>("trace").cloned().unwrap_or_default();
    ctx.text(trace.join(","))
}

#[test]
fn test_error_stops_chain() {
    let third = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&third);

    let mut router = Router::default();
    router.get(
        "/chain",
        [
            sonata_core::Handler::new(|_: &mut Context| -> HandlerResult { Ok(()) }),
            sonata_core::Handler::new(|_: &mut Context| -> HandlerResult {
                Err(HttpError::with_message(418, "short and stout").into())
            }),
            sonata_core::Handler::new(move |ctx: &mut Context| -> HandlerResult {
                seen.fetch_add(1, Ordering::SeqCst);
                ctx.text("unreachable")
            }),
        ],
    );
    let client = TestClient::new(router.build());

    let res = client.get("/chain");
    assert_eq!(res.status, 418);
    assert_eq!(res.body_str(), "short and stout");
    assert_eq!(third.load(Ordering::SeqCst), 0);
}

#[test]
fn test_opaque_error_stops_chain() {
    let mut router = Router::default();
    router.get(
        "/chain",
        [
            sonata_core::Handler::new(|_: &mut Context| -> HandlerResult {
                Err(Error::other(std::fmt::Error))
            }),
            sonata_core::Handler::new(|ctx: &mut Context| -> HandlerResult { ctx.text("unreachable") }),
        ],
    );
    let res = TestClient::new(router.build()).get("/chain");
    assert_eq!(res.status, 500);
    assert_eq!(res.body_str(), std::fmt::Error.to_string());
}

#[test]
fn test_chain_order_ignores_registration_order() {
    let mut router = Router::default();
    {
        let mut api = router.group("/api", [mark("group")]);
        api.get("/x", [sonata_core::Handler::new(mark("route")), sonata_core::Handler::new(dump_trace)]);
    }
    router.middleware([mark("global")]);
    let client = TestClient::new(router.build());

    assert_eq!(client.get("/api/x").body_str(), "global,group,route");
}

#[test]
fn test_middleware_runs_for_not_found() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let mut router = Router::default();
    router.middleware([move |_: &mut Context| -> HandlerResult {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }]);
    let client = TestClient::new(router.build());

    assert_eq!(client.get("/missing").status, 404);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_next_wraps_downstream() {
    let mut router = Router::default();
    router.middleware([|ctx: &mut Context| -> HandlerResult {
        ctx.write(b"<");
        ctx.next()?;
        ctx.write(b">");
        Ok(())
    }]);
    router.get("/wrapped", [|ctx: &mut Context| -> HandlerResult {
        ctx.write(b"body");
        Ok(())
    }]);
    let client = TestClient::new(router.build());

    assert_eq!(client.get("/wrapped").body_str(), "<body>");
}

#[test]
fn test_abort_skips_rest() {
    let mut router = Router::default();
    router.get(
        "/guarded",
        [
            sonata_core::Handler::new(|ctx: &mut Context| -> HandlerResult {
                if ctx.header("Authorization").is_none() {
                    ctx.set_status(401);
                    return ctx.abort();
                }
                Ok(())
            }),
            sonata_core::Handler::new(|ctx: &mut Context| -> HandlerResult { ctx.text("secret") }),
        ],
    );
    let client = TestClient::new(router.build());

    let res = client.get("/guarded");
    assert_eq!(res.status, 401);
    assert!(res.body.is_empty());

    let res = client.send(Request::new(Method::Get, "/guarded").header("authorization", "Bearer x"));
    assert_eq!(res.body_str(), "secret");
}

#[test]
fn test_abort_with_translates_immediately() {
    let mut router = Router::default();
    router.get(
        "/denied",
        [
            sonata_core::Handler::new(|ctx: &mut Context| -> HandlerResult {
                ctx.abort_with(HttpError::unauthorized())
            }),
            sonata_core::Handler::new(|ctx: &mut Context| -> HandlerResult { ctx.text("secret") }),
        ],
    );
    let res = TestClient::new(router.build()).get("/denied");
    assert_eq!(res.status, 401);
    assert_eq!(res.body_str(), "Unauthorized");
}

#[test]
fn test_context_is_clean_between_requests() {
    let mut router = Router::default();
    router.get("/a/<x>", [|ctx: &mut Context| -> HandlerResult {
        assert_eq!(ctx.index(), 0);
        ctx.set("leak", 1u8);
        ctx.set_header("X-Leak", "yes");
        ctx.text("a")
    }]);
    router.get("/b", [|ctx: &mut Context| -> HandlerResult {
        assert_eq!(ctx.index(), 0);
        assert!(!ctx.contains("leak"));
        assert!(ctx.param("x").is_none());
        ctx.text("b")
    }]);
    let app = router.build();

    for _ in 0..3 {
        let res = app.serve(Request::new(Method::Get, "/a/1"));
        assert_eq!(res.body_str(), "a");
        let res = app.serve(Request::new(Method::Get, "/b"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_str(), "b");
        assert!(res.header("X-Leak").is_none());
    }
    assert_eq!(app.pool().idle(), 1);
}

#[test]
fn test_concurrent_serving() {
    let mut router = Router::default();
    router.get("/echo/<n>", [|ctx: &mut Context| -> HandlerResult {
        let n = ctx.param("n").unwrap_or_default().to_string();
        ctx.text(n)
    }]);
    let app = router.build();

    std::thread::scope(|s| {
        for t in 0..4 {
            let app = &app;
            s.spawn(move || {
                for i in 0..250 {
                    let expected = format!("{t}-{i}");
                    let res = app.serve(Request::new(Method::Get, &format!("/echo/{expected}")));
                    assert_eq!(res.body_str(), expected);
                }
            });
        }
    });
    assert!(app.pool().idle() <= 4);
}

#[test]
fn test_shared_data() {
    let mut router = Router::default();
    router.share("greeting", String::from("hello"));
    router.get("/greet", [|ctx: &mut Context| -> HandlerResult {
        let greeting = ctx.shared::<String>("greeting").cloned().unwrap_or_default();
        ctx.text(greeting)
    }]);
    let client = TestClient::new(router.build());
    assert_eq!(client.get("/greet").body_str(), "hello");
}

#[test]
fn test_redirect() {
    let mut router = Router::default();
    router.get("/old", [|ctx: &mut Context| -> HandlerResult { ctx.redirect("/new", 301) }]);
    router.get("/bad", [|ctx: &mut Context| -> HandlerResult { ctx.redirect("/new", 200) }]);
    let client = TestClient::new(router.build());

    let res = client.get("/old");
    assert_eq!(res.status, 301);
    assert_eq!(res.header("Location"), Some("/new"));

    let res = client.get("/bad");
    assert_eq!(res.status, 500);
    assert_eq!(res.body_str(), "invalid redirect status code: 200");
}

#[test]
fn test_serializer_per_request() {
    let mut router = Router::default();
    router.get("/plain", [|ctx: &mut Context| -> HandlerResult { ctx.data("raw text") }]);
    router.get("/json", [|ctx: &mut Context| -> HandlerResult {
        ctx.set_serializer(json_serialize);
        ctx.data("raw text")
    }]);
    let client = TestClient::new(router.build());

    assert_eq!(client.get("/json").body_str(), r#""raw text""#);
    assert_eq!(client.get("/plain").body_str(), "raw text");
}
