//! Application router.
//!
//! A thin builder over [`RouteTable`]: it erases handlers, joins group
//! prefixes, and hands the finished table to the server. Matching, ranking
//! and parameter binding all happen in the table.

use crate::error::Error;
use crate::handler::{Handler, SharedEndpoint};
use crate::method::Method;
use crate::params::RouteValues;
use crate::table::RouteTable;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every registration method returns `self`, so calls chain:
///
/// ```rust,no_run
/// # use gantry::{Request, Response, Router};
/// # async fn list(_: Request) -> Response { Response::text("") }
/// # async fn show(_: Request) -> Response { Response::text("") }
/// # async fn create(_: Request) -> Response { Response::text("") }
/// Router::new()
///     .get("/users/list", list)
///     .get("/users/:id", show)
///     .group("api/v1", |api| api.post("/users", create));
/// ```
///
/// Registering the same method and path twice keeps the first handler.
pub struct Router {
    table: RouteTable<SharedEndpoint>,
}

impl Router {
    pub fn new() -> Self {
        Self { table: RouteTable::new() }
    }

    /// Registers `handler` for any method name, including extension methods.
    pub fn route(mut self, method: &str, path: &str, handler: impl Handler) -> Self {
        self.table.register(path, method, handler.into_endpoint());
        self
    }

    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method.as_str(), path, handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Registers every route added inside `build` under `prefix`.
    ///
    /// `group("api", |g| g.get("/users", h))` registers `GET /api/users`.
    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        build(Group { prefix: prefix.to_owned(), router: self }).router
    }

    pub fn table(&self) -> &RouteTable<SharedEndpoint> {
        &self.table
    }

    pub(crate) fn find(
        &self,
        path: &str,
        method: &str,
    ) -> Result<(SharedEndpoint, RouteValues), Error> {
        let matched = self.table.find(path, method)?;
        Ok((SharedEndpoint::clone(matched.handler), matched.values))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Registration scope handed to [`Router::group`].
pub struct Group {
    prefix: String,
    router: Router,
}

impl Group {
    pub fn route(mut self, method: &str, path: &str, handler: impl Handler) -> Self {
        let path = join(&self.prefix, path);
        self.router = self.router.route(method, &path, handler);
        self
    }

    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method.as_str(), path, handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Nests a further prefix inside this one.
    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let nested = Group { prefix: join(&self.prefix, prefix), router: self.router };
        let router = build(nested).router;
        Self { prefix: self.prefix, router }
    }
}

/// `("api/", "/users")` → `"/api/users"`.
fn join(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    if prefix.is_empty() {
        format!("/{path}")
    } else {
        format!("/{prefix}/{path}")
    }
}
