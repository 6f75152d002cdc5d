//! gzip response compression.
//!
//! Requests that do not accept gzip go straight to the next stage with no
//! extra work. For the others, the response body produced downstream is run
//! through a gzip encoder, which is finished before this stage returns, and
//! the response is marked with `Content-Encoding: gzip` and
//! `Vary: Accept-Encoding`.
//!
//! Left alone even when gzip is accepted: `HEAD` requests, statuses that
//! cannot carry a body (`1xx`, `204`, `304`), and responses the handler has
//! already encoded itself.

use std::io::{self, Write};
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, HeaderValue, VARY};
use http::{HeaderMap, Method, StatusCode};
use tracing::warn;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Stage;
use crate::request::Request;
use crate::response::Response;

pub(crate) fn layer() -> Stage {
    Box::new(|next| Arc::new(Gzip { next }))
}

struct Gzip {
    next: BoxedHandler,
}

impl ErasedHandler for Gzip {
    fn call(&self, req: Request) -> BoxFuture {
        if req.method() == Method::HEAD || !accepts_gzip(req.headers()) {
            return self.next.call(req);
        }
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let mut res = next.call(req).await;
            if may_encode(&res) {
                encode(&mut res);
            }
            res
        })
    }
}

/// Whether the `Accept-Encoding` header lists `gzip` (or `x-gzip`) without
/// refusing it through `q=0`.
pub(crate) fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| {
            let mut parts = item.split(';');
            let coding = parts.next().unwrap_or_default().trim();
            let gzip = coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip");
            gzip && !parts.any(refuses)
        })
}

fn refuses(param: &str) -> bool {
    match param.split_once('=') {
        Some((name, q)) if name.trim().eq_ignore_ascii_case("q") => {
            q.trim().parse::<f32>().is_ok_and(|q| q == 0.0)
        }
        _ => false,
    }
}

fn may_encode(res: &Response) -> bool {
    let status = res.status_code();
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || res.headers().contains_key(CONTENT_ENCODING))
}

fn encode(res: &mut Response) {
    match gzip(&res.body) {
        Ok(body) => {
            res.body = body.into();
            let headers = res.headers_mut();
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            headers.append(VARY, HeaderValue::from_static("accept-encoding"));
            headers.remove(CONTENT_LENGTH);
        }
        Err(e) => warn!("gzip failed, sending identity body: {e}"),
    }
}

fn gzip(body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2 + 32), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
