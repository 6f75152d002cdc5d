//! Middleware stages.
//!
//! A stage receives the next handler and returns a new handler that adds one
//! cross-cutting behaviour around it. The stages strata ships, outermost
//! first:
//!
//! | Stage | Module | Behaviour |
//! |---|---|---|
//! | Timeout | [`timeout`] | `503 timed out` once the request ceiling passes |
//! | Recovery | [`recover`] | panic → report with stack trace → `500` |
//! | Metrics | [`metrics`] | one log line with method, URI and duration |
//! | Compression | [`compress`] | gzip the body when the client accepts it |
//!
//! The order is fixed by [`Pipeline`](crate::Pipeline). Timeout bounds
//! everything; recovery is the fault boundary for all stages inside it;
//! metrics times faulted requests up to the point they are intercepted;
//! compression only ever sees real handler output, so the error pages
//! produced further out are never compressed.

pub mod compress;
pub mod metrics;
pub mod recover;
pub mod timeout;

use crate::handler::BoxedHandler;

/// A middleware constructor: takes the next stage, returns the wrapped one.
pub(crate) type Stage = Box<dyn FnOnce(BoxedHandler) -> BoxedHandler + Send>;

/// An ordered list of stages, outermost first.
pub(crate) struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    pub(crate) fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Wraps `endpoint` in every stage; the first stage ends up outermost.
    pub(crate) fn then(self, endpoint: BoxedHandler) -> BoxedHandler {
        self.stages.into_iter().rev().fold(endpoint, |next, stage| stage(next))
    }
}
