//! HTTP server and graceful shutdown.
//!
//! The server owns the transport only. For each request it asks the
//! [`Router`] for a handler, reads the body, and calls the handler with a
//! [`Request`] that carries the bound route values and a handle to the
//! shared [`Container`].
//!
//! On SIGTERM or Ctrl-C it stops accepting, lets in-flight connections
//! finish, and returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::container::Container;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

enum Listen {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    listen: Listen,
    container: Option<Arc<Container>>,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    ///
    /// ```rust,no_run
    /// # fn main() -> Result<(), gantry::Error> {
    /// let server = gantry::Server::bind("0.0.0.0:3000")?;
    /// # Ok(()) }
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self::with_listen(Listen::Addr(addr)))
    }

    /// Serves on an already bound listener.
    pub fn listen(listener: TcpListener) -> Self {
        Self::with_listen(Listen::Listener(listener))
    }

    fn with_listen(listen: Listen) -> Self {
        Self { listen, container: None }
    }

    /// Shares `container` with every request. Without this the server
    /// creates an empty container of its own when it starts serving.
    pub fn with_container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;

        let router = Arc::new(router);
        let container = self.container.unwrap_or_default();

        info!(%addr, routes = router.table().len(), "gantry listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even with a backlog.
                biased;

                () = &mut signal => {
                    info!(
                        in_flight = tasks.len(),
                        "shutdown signal received, draining connections"
                    );
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let container = Arc::clone(&container);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            dispatch(Arc::clone(&router), Arc::clone(&container), req)
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("gantry stopped");
        Ok(())
    }
}

/// Routes one request and produces one response. Every failure becomes a
/// status code, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    container: Arc<Container>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let (handler, params) = match router.find(parts.uri.path(), parts.method.as_str()) {
        Ok(found) => found,
        Err(e) => {
            debug!(method = %parts.method, path = parts.uri.path(), "{e}");
            return Ok(Response::status(StatusCode::NOT_FOUND).into_http());
        }
    };

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
    };

    let response = handler.call(Request::new(parts, body, params, container)).await;
    Ok(response.into_http())
}

/// Resolves on SIGTERM (Unix) or Ctrl-C, whichever comes first.
///
/// A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
