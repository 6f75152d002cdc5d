//! Error reporting with request context.
//!
//! The recovery middleware and application handlers both report failures
//! through a [`Reporter`]. The default, [`LogReporter`], turns each report
//! into a single `tracing` event.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::request::RequestInfo;

/// Sink for failure diagnostics.
///
/// Implementations must not fail the caller: `report` has no return value and
/// a panicking implementation is contained by the recovery middleware.
pub trait Reporter: Send + Sync + 'static {
    /// `is_panic` is set when the failure is a recovered panic rather than an
    /// error a handler chose to surface.
    fn report(&self, req: &RequestInfo, error: Option<&dyn fmt::Display>, is_panic: bool);
}

pub type SharedReporter = Arc<dyn Reporter>;

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, req: &RequestInfo, error: Option<&dyn fmt::Display>, is_panic: bool) {
        (**self).report(req, error, is_panic);
    }
}

/// Logs every report as one `tracing` event.
///
/// Panics are logged at `ERROR` with `kind = "panic"`, handler errors at
/// `WARN` with `kind = "handler"`. The message is [`diagnostic`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, req: &RequestInfo, error: Option<&dyn fmt::Display>, is_panic: bool) {
        let line = diagnostic(req, error);
        if is_panic {
            error!(kind = "panic", "{line}");
        } else {
            warn!(kind = "handler", "{line}");
        }
    }
}

/// Formats the single-line diagnostic used by [`LogReporter`].
pub fn diagnostic(req: &RequestInfo, error: Option<&dyn fmt::Display>) -> String {
    let mut line = format!(
        "Server Error - Method: {}, User Agent: {}, Remote Address: {}, Endpoint: {}",
        req.method,
        req.user_agent(),
        req.remote_addr,
        req.uri,
    );
    if let Some(error) = error {
        line.push_str(&format!(", ERROR: {error}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(user_agent: Option<&str>) -> RequestInfo {
        RequestInfo {
            method: http::Method::GET,
            uri: "/reports?year=2024".parse().unwrap(),
            remote_addr: "192.0.2.1:40000".parse().unwrap(),
            user_agent: user_agent.map(str::to_owned),
        }
    }

    #[test]
    fn diagnostic_embeds_request_context() {
        let line = diagnostic(&info(Some("Mozilla/5.0")), None);
        assert_eq!(
            line,
            "Server Error - Method: GET, User Agent: Mozilla/5.0, \
             Remote Address: 192.0.2.1:40000, Endpoint: /reports?year=2024"
        );
    }

    #[test]
    fn diagnostic_appends_error_and_unknown_agent() {
        let line = diagnostic(&info(None), Some(&"PANIC: boom"));
        assert!(line.contains("User Agent: Unknown"));
        assert!(line.ends_with(", ERROR: PANIC: boom"));
    }

    #[test]
    fn log_reporter_never_fails() {
        LogReporter.report(&info(None), Some(&"db unavailable"), false);
        LogReporter.report(&info(None), None, true);
    }
}
