//! Panic recovery.
//!
//! A panic anywhere below this stage (an inner stage, the router, the
//! handler, whether raised while building the handler's future or during
//! any poll of it) stops here. The panic message is reported prefixed with
//! `PANIC: `, the stack trace captured at the panic site is reported
//! separately prefixed with `STACKTRACE: ` (the recovery site's stack if the
//! process panic hook was replaced after startup), and the client receives a plain
//! `500 Internal Server Error`. The trace never reaches the client.
//!
//! Reporting cannot prevent the response: a reporter that itself panics is
//! contained and the `500` is still returned.

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;

use crate::fault::{CatchFault, Fault};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Stage;
use crate::report::{Reporter, SharedReporter};
use crate::request::{Request, RequestInfo};
use crate::response::Response;

/// Body of the response sent after a panic.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

pub(crate) fn layer(reporter: SharedReporter) -> Stage {
    Box::new(move |next| Arc::new(Recover { reporter, next }))
}

struct Recover {
    reporter: SharedReporter,
    next: BoxedHandler,
}

impl ErasedHandler for Recover {
    fn call(&self, req: Request) -> BoxFuture {
        let info = req.info();
        let next = Arc::clone(&self.next);
        let reporter = Arc::clone(&self.reporter);
        Box::pin(async move {
            match CatchFault::new(async move { next.call(req).await }).await {
                Ok(res) => res,
                Err(fault) => {
                    report_fault(reporter.as_ref(), &info, &fault);
                    Response::error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
                }
            }
        })
    }
}

fn report_fault(reporter: &dyn Reporter, info: &RequestInfo, fault: &Fault) {
    report_contained(reporter, info, &format_args!("PANIC: {}", fault.message()));
    // No trace means our hook was replaced after startup: use this stack.
    match fault.backtrace() {
        Some(trace) => report_contained(reporter, info, &format_args!("STACKTRACE: {trace}")),
        None => {
            let trace = Backtrace::force_capture();
            report_contained(reporter, info, &format_args!("STACKTRACE: {trace}"));
        }
    }
}

fn report_contained(reporter: &dyn Reporter, info: &RequestInfo, error: &dyn fmt::Display) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| reporter.report(info, Some(error), true)));
}
