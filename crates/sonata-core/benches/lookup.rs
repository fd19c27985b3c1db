use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sonata_core::{Context, HandlerResult, Method, PathTree, Request, Router};

const PATTERNS: &[&str] = &[
    "/",
    "/users",
    "/users/me",
    r"/users/<id:\d+>",
    "/users/<id>/posts",
    "/users/<id>/posts/<slug>",
    "/repos/<owner>/<repo>/issues/<number>",
    "/static/*",
];

fn ok(ctx: &mut Context) -> HandlerResult {
    ctx.write(b"ok");
    Ok(())
}

fn bench_tree(c: &mut Criterion) {
    let mut tree = PathTree::new(Method::Get);
    let mut max = 0;
    for (i, pattern) in PATTERNS.iter().enumerate() {
        max = max.max(tree.add(pattern, i).unwrap());
    }
    let mut values = vec![String::new(); max];

    let mut group = c.benchmark_group("tree_get");
    for path in ["/users/me", "/users/42", "/repos/rust-lang/rust/issues/1", "/static/js/app.js", "/nope"] {
        group.bench_function(path, |b| {
            b.iter(|| black_box(tree.get(black_box(path), &mut values).map(|(v, _)| *v)))
        });
    }
    group.finish();
}

fn bench_serve(c: &mut Criterion) {
    let mut router = Router::default();
    for pattern in PATTERNS {
        router.get(pattern, [ok]);
    }
    let app = router.build();

    c.bench_function("serve_param_route", |b| {
        b.iter(|| black_box(app.serve(Request::new(Method::Get, "/users/7/posts/hello"))))
    });
    c.bench_function("serve_not_found", |b| {
        b.iter(|| black_box(app.serve(Request::new(Method::Post, "/users"))))
    });
}

criterion_group!(benches, bench_tree, bench_serve);
criterion_main!(benches);
