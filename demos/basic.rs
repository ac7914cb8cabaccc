//! Minimal gantry example: ranked routes, a singleton, and a per-request scope.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/list
//!   curl http://localhost:3000/users/42
//!   curl -H 'x-request-id: 7' http://localhost:3000/users/42/audit
//!   curl -X POST http://localhost:3000/api/users -d '{"name":"alice"}'

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gantry::{Container, Error, Json, Request, Router, Scope, Server};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

struct Store {
    next_id: AtomicU64,
}

struct Audit {
    request: u64,
}

#[derive(Deserialize, Serialize)]
struct User {
    #[serde(default)]
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct UserPath {
    id: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let container = Arc::new(Container::new());
    container.add_singleton(|| Ok::<_, std::io::Error>(Store { next_id: AtomicU64::new(100) }))?;

    let requests = AtomicU64::new(0);
    container.add_scoped(move || {
        Ok::<_, std::io::Error>(Audit { request: requests.fetch_add(1, Ordering::SeqCst) })
    })?;

    let app = Router::new()
        .get("/users/list", list_users)
        .get("/users/:id", get_user)
        .get("/users/:id/audit", audit_user)
        .group("api", |api| api.post("/users", create_user));

    Server::bind("0.0.0.0:3000")?
        .with_container(container)
        .serve(app)
        .await
}

// GET /users/list. The literal route outranks /users/:id.
async fn list_users(_req: Request) -> Json<Vec<User>> {
    Json(vec![User { id: 1, name: "alice".into() }])
}

// GET /users/:id
async fn get_user(req: Request) -> Result<Json<User>, Error> {
    let path: UserPath = req.params().unmarshal()?;
    Ok(Json(User { id: path.id, name: "alice".into() }))
}

// GET /users/:id/audit. One Audit per x-request-id for 30 seconds.
async fn audit_user(req: Request) -> Result<String, Error> {
    let request_id = req.header("x-request-id").and_then(|v| v.parse().ok()).unwrap_or(0);
    let scope = Scope::new(request_id, Duration::from_secs(30));
    let audit = req.container().resolve::<Audit>(Some(&scope))?;
    Ok(format!("user {} audited in unit {}", req.param("id").unwrap_or("?"), audit.request))
}

// POST /api/users
async fn create_user(req: Request) -> Result<(StatusCode, Json<User>), Error> {
    let mut user: User = req.json()?;
    let store = req.container().resolve::<Store>(None)?;
    user.id = store.next_id.fetch_add(1, Ordering::SeqCst);
    Ok((StatusCode::CREATED, Json(user)))
}
