//! Request deadline.
//!
//! The downstream future races a timer. If the timer wins, the future is
//! dropped, which aborts it at its next `.await`, and the client receives a
//! fixed `503` with body `timed out`. Synchronous work already running inside
//! a handler is not interrupted; it is simply never awaited again.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tracing::warn;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Stage;
use crate::request::Request;
use crate::response::Response;

/// Body of the response sent when the deadline passes.
pub const TIMED_OUT_BODY: &str = "timed out";

pub(crate) fn layer(ceiling: Duration) -> Stage {
    Box::new(move |next| Arc::new(Timeout { ceiling, next }))
}

struct Timeout {
    ceiling: Duration,
    next: BoxedHandler,
}

impl ErasedHandler for Timeout {
    fn call(&self, req: Request) -> BoxFuture {
        let ceiling = self.ceiling;
        let uri = req.uri().clone();
        let fut = self.next.call(req);
        Box::pin(async move {
            match tokio::time::timeout(ceiling, fut).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(%uri, ?ceiling, "request timed out");
                    Response::builder()
                        .status(StatusCode::SERVICE_UNAVAILABLE)
                        .text(TIMED_OUT_BODY)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;

    fn get() -> Request {
        let req = http::Request::get("/slow").body(Bytes::new()).unwrap();
        Request::new(req, "127.0.0.1:1".parse().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_gets_timed_out_body() {
        let finished = Arc::new(AtomicBool::new(false));
        let handler = {
            let finished = Arc::clone(&finished);
            move |_req: Request| {
                let finished = Arc::clone(&finished);
                async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    finished.store(true, Ordering::SeqCst);
                    "too late"
                }
            }
        };
        let app = layer(Duration::from_secs(4))(handler.into_boxed_handler());

        let res = app.call(get()).await;
        assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.body(), TIMED_OUT_BODY.as_bytes());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst), "handler kept running after the deadline");
    }

    #[tokio::test(start_paused = true)]
    async fn fast_handler_is_untouched() {
        let handler = |_req: Request| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "made it"
        };
        let app = layer(Duration::from_secs(4))(handler.into_boxed_handler());
        let res = app.call(get()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"made it");
    }
}
