//! Incoming HTTP request type.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::report::{LogReporter, SharedReporter};

/// An incoming HTTP request with its body fully read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) reporter: SharedReporter,
}

impl Request {
    /// Wraps an `http::Request` that arrived from `remote_addr`.
    ///
    /// Errors passed to [`Request::report_error`] go to the default
    /// [`LogReporter`] unless the request is served by a [`Server`](crate::Server)
    /// configured with another reporter.
    pub fn new(req: http::Request<Bytes>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr,
            reporter: Arc::new(LogReporter),
        }
    }

    pub(crate) fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Header lookup; returns the first value, and `None` for values that are
    /// not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Snapshot of the request metadata, detached from the request itself.
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            uri: self.uri.clone(),
            remote_addr: self.remote_addr,
            user_agent: self
                .headers
                .get(http::header::USER_AGENT)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
        }
    }

    /// Reports an error the handler dealt with itself.
    ///
    /// Logged with the request's context but without a stack trace. The
    /// handler still decides what status to send.
    pub fn report_error(&self, err: &dyn fmt::Display) {
        self.reporter.report(&self.info(), Some(err), false);
    }
}

/// Request metadata carried into error reports and request logs.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub remote_addr: SocketAddr,
    pub user_agent: Option<String>,
}

impl RequestInfo {
    /// The `User-Agent` header, or `"Unknown"` when the client sent none.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_agent: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/users?page=2");
        if let Some(ua) = user_agent {
            builder = builder.header("user-agent", ua);
        }
        Request::new(builder.body(Bytes::from_static(b"{}")).unwrap(), "10.0.0.7:5555".parse().unwrap())
    }

    #[test]
    fn accessors_expose_the_request_line() {
        let req = request(None);
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/users");
        assert_eq!(req.uri().query(), Some("page=2"));
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = request(Some("curl/8.0"));
        assert_eq!(req.header("User-Agent"), Some("curl/8.0"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn info_falls_back_to_unknown_agent() {
        assert_eq!(request(None).info().user_agent(), "Unknown");
        assert_eq!(request(Some("curl/8.0")).info().user_agent(), "curl/8.0");
    }
}
