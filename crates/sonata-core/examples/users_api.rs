//! # Sonata Users API
//!
//! Registers a small users API, then drives it in-process and prints each
//! response.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=sonata_core=debug cargo run -p sonata-core --example users_api
//! ```

use sonata_core::prelude::*;
use sonata_core::logging;

#[derive(Serialize)]
struct User {
    id: u64,
    name: &'static str,
}

const USERS: &[User] = &[User { id: 1, name: "ada" }, User { id: 2, name: "grace" }];

fn list_users(ctx: &mut Context) -> HandlerResult {
    ctx.json(USERS)
}

fn get_user(ctx: &mut Context) -> HandlerResult {
    let id: u64 = ctx
        .param("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| HttpError::bad_request("id must be a number"))?;
    match USERS.iter().find(|u| u.id == id) {
        Some(user) => ctx.json(user),
        None => Err(HttpError::with_message(404, format!("user {id} not found")).into()),
    }
}

fn require_token(ctx: &mut Context) -> HandlerResult {
    match ctx.header("Authorization") {
        Some(token) if token == "Bearer demo" => Ok(()),
        _ => Err(HttpError::unauthorized().into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logging::init_logging_with_level(&config.log_level);

    let mut router = Router::new(config);
    {
        let mut api = router.group("/api", Vec::<Handler>::new());
        api.get("/users", [list_users]).name("users");
        api.get(r"/users/<id:\d+>", [get_user]).name("user");
        let mut admin = api.group("/admin", [require_token]);
        admin.delete(r"/users/<id:\d+>", [|ctx: &mut Context| -> HandlerResult {
            ctx.no_content(204)
        }]);
    }
    let app = router.build();

    let user_url = app.url("user", &[("id", "2")]);
    let requests = [
        Request::new(Method::Get, "/api/users"),
        Request::new(Method::Get, &user_url),
        Request::new(Method::Get, "/api/users/9"),
        Request::new(Method::Post, "/api/users"),
        Request::new(Method::Delete, "/api/admin/users/1"),
        Request::new(Method::Delete, "/api/admin/users/1").header("Authorization", "Bearer demo"),
    ];

    for request in requests {
        let line = format!("{} {}", request.method, request.path);
        let res = app.serve(request);
        println!("{line} -> {} {}", res.status, res.body_str());
    }

    Ok(())
}
