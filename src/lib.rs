//! # gantry
//!
//! Request dispatch and dependency lifecycles for HTTP services.
//!
//! Two independent pieces, composed by the server:
//!
//! - [`RouteTable`]: resolves `(path, method)` to the best-ranked handler.
//!   Literal segments outrank `:captures`; captured values are bound by name.
//! - [`Container`]: named factories with singleton, transient, or scoped
//!   lifecycles, plus refresh and refresh notifications.
//!
//! [`Router`] and [`Server`] wrap both for hyper: every handler receives a
//! [`Request`] carrying its route values and the shared container.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gantry::{Container, Json, Request, Router, Server};
//!
//! struct Greeting(String);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry::Error> {
//!     let container = Arc::new(Container::new());
//!     container.add_singleton(|| Ok::<_, std::io::Error>(Greeting("hello".into())))?;
//!
//!     let app = Router::new()
//!         .get("/greet/:name", greet);
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .with_container(container)
//!         .serve(app)
//!         .await
//! }
//!
//! async fn greet(req: Request) -> Result<Json<String>, gantry::Error> {
//!     let greeting = req.container().resolve::<Greeting>(None)?;
//!     let name = req.param("name").unwrap_or("world");
//!     Ok(Json(format!("{}, {name}", greeting.0)))
//! }
//! ```

mod cell;
mod container;
mod error;
mod handler;
mod method;
mod params;
mod request;
mod response;
mod route;
mod router;
mod scope;
mod server;
mod service;
mod table;

pub use container::{BoxError, Container, Lifecycle, RefreshEvent};
pub use error::{Error, SharedError};
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use params::{BindError, RouteValues};
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use route::{Route, RouteHash, Segment};
pub use router::{Group, Router};
pub use scope::Scope;
pub use server::Server;
pub use service::Service;
pub use table::{Match, RouteTable};
