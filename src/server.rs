//! HTTP server and graceful shutdown.
//!
//! Each accepted connection runs in its own tokio task; hyper calls the
//! [`Pipeline`] once per request on that connection. The request head and
//! the request body each have `read_timeout` to arrive in full; stalled
//! reads and writes are cut off by the connection's idle deadlines. On
//! SIGTERM or Ctrl-C
//! the server stops accepting, lets in-flight connections finish, and
//! returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONNECTION, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::io::TimedIo;
use crate::pipeline::Pipeline;
use crate::report::{LogReporter, Reporter, SharedReporter};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    config: Config,
    reporter: SharedReporter,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config, reporter: Arc::new(LogReporter) }
    }

    /// A server with default settings listening on `addr`.
    ///
    /// The address is checked when [`serve`](Server::serve) is called.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self::new(Config { bind_address: addr.to_owned(), ..Config::default() })
    }

    /// Replaces the [`LogReporter`] used for panics and handler errors.
    pub fn with_reporter(mut self, reporter: impl Reporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds the configured address and serves `router` until SIGTERM or
    /// Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.config.socket_addr()?).await?;
        self.serve_with_shutdown(listener, router, shutdown_signal()).await
    }

    /// Serves `router` on an already bound listener until `shutdown`
    /// resolves, then drains in-flight connections.
    ///
    /// Fails with [`Error::InvalidConfig`] before accepting anything if the
    /// configuration does not validate.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        self.config.validate()?;
        let addr = listener.local_addr()?;
        let read_timeout = self.config.read_timeout();
        let write_timeout = self.config.write_timeout();
        let pipeline = Pipeline::with_reporter(router, self.config.request_timeout(), self.reporter);

        info!(%addr, "strata listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Checked first so a shutdown request stops accepting at once,
                // even with connections still queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = pipeline.clone();
                    let io = TokioIo::new(TimedIo::new(stream, read_timeout, write_timeout));

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let pipeline = pipeline.clone();
                            async move { dispatch(pipeline, req, remote_addr, read_timeout).await }
                        });

                        let mut conn = ConnBuilder::new(TokioExecutor::new());
                        conn.http1().timer(TokioTimer::new()).header_read_timeout(read_timeout);

                        // Idle and dropped connections end up here too, so
                        // this is not an error from the server's point of view.
                        if let Err(e) = conn.serve_connection(io, svc).await {
                            debug!(peer = %remote_addr, "connection closed: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body and runs one request through the pipeline.
///
/// The whole body must arrive within `read_timeout`, however it is paced;
/// a late body is answered with `408` and the connection is closed.
/// Never returns an error to hyper: every failure becomes a response.
async fn dispatch(
    pipeline: Pipeline,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    read_timeout: Duration,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match tokio::time::timeout(read_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::error(StatusCode::BAD_REQUEST, "Bad Request").into_http());
        }
        Err(_) => {
            warn!(peer = %remote_addr, ?read_timeout, "request body not received in time");
            let mut res = Response::error(StatusCode::REQUEST_TIMEOUT, "Request Timeout");
            res.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
            return Ok(res.into_http());
        }
    };

    let req = Request::new(http::Request::from_parts(parts, body), remote_addr);
    Ok(pipeline.handle(req).await.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only, off Unix).
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
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
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
