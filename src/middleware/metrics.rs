//! Request timing.
//!
//! Emits one `INFO` event per request with `uri`, `method` and `duration`
//! once the downstream chain has finished. A panic coming up from below is
//! timed and logged too, then resumed untouched so the recovery stage can
//! deal with it. A request abandoned by the timeout stage logs nothing.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::info;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Stage;
use crate::request::Request;

pub(crate) fn layer() -> Stage {
    Box::new(|next| Arc::new(Metrics { next }))
}

struct Metrics {
    next: BoxedHandler,
}

impl ErasedHandler for Metrics {
    fn call(&self, req: Request) -> BoxFuture {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let start = Instant::now();
            let outcome = AssertUnwindSafe(async move { next.call(req).await })
                .catch_unwind()
                .await;
            let duration = start.elapsed();
            info!(%uri, %method, ?duration, "request");
            match outcome {
                Ok(res) => res,
                Err(payload) => panic::resume_unwind(payload),
            }
        })
    }
}
