//! The fixed middleware pipeline around the router.
//!
//! ```text
//! request ─▶ Timeout ─▶ Recovery ─▶ Metrics ─▶ Compression ─▶ Router ─▶ handler
//! response ◀──────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::handler::BoxedHandler;
use crate::middleware::{Chain, compress, metrics, recover, timeout};
use crate::report::{LogReporter, SharedReporter};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// A router wrapped in the timeout, recovery, metrics and compression stages.
///
/// The server builds one per [`Server::serve`](crate::Server::serve) call;
/// it can also be driven directly, without a socket:
///
/// ```rust
/// # async fn demo() {
/// use std::time::Duration;
/// use strata::{Pipeline, Request, Router};
///
/// let pipeline = Pipeline::new(Router::new().route("/", |_req: Request| async { "home" }), Duration::from_secs(4));
/// let req = http::Request::get("/").body(bytes::Bytes::new()).unwrap();
/// let res = pipeline.handle(Request::new(req, "127.0.0.1:1".parse().unwrap())).await;
/// assert_eq!(res.body(), b"home");
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    handler: BoxedHandler,
    reporter: SharedReporter,
}

impl Pipeline {
    /// Builds the pipeline reporting failures through [`LogReporter`].
    pub fn new(router: Router, request_timeout: Duration) -> Self {
        Self::with_reporter(router, request_timeout, Arc::new(LogReporter))
    }

    pub fn with_reporter(router: Router, request_timeout: Duration, reporter: SharedReporter) -> Self {
        let handler = Chain::new(vec![
            timeout::layer(request_timeout),
            recover::layer(Arc::clone(&reporter)),
            metrics::layer(),
            compress::layer(),
        ])
        .then(router.into_handler());
        Self { handler, reporter }
    }

    /// Runs one request through every stage.
    pub fn handle(&self, req: Request) -> impl Future<Output = Response> + Send + use<> {
        self.handler.call(req.with_reporter(Arc::clone(&self.reporter)))
    }
}
