//! Stage ordering, observed without a socket.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use flate2::read::GzDecoder;
use strata::{Pipeline, Request, Response, Router};

mod common;

use common::Recording;

fn request(path: &str, accept_encoding: Option<&str>) -> Request {
    let mut builder = http::Request::get(path);
    if let Some(value) = accept_encoding {
        builder = builder.header("accept-encoding", value);
    }
    Request::new(builder.body(Bytes::new()).unwrap(), "127.0.0.1:4000".parse().unwrap())
}

async fn late_panic(_req: Request) -> Response {
    tokio::time::sleep(Duration::from_secs(10)).await;
    panic!("after the deadline");
}

async fn page(_req: Request) -> Response {
    Response::html("<p>compressed only when asked</p>")
}

fn pipeline(reporter: &Recording) -> Pipeline {
    let router = Router::new().route("/late", late_panic).route("/page", page);
    Pipeline::with_reporter(router, Duration::from_secs(4), Arc::new(reporter.clone()))
}

#[tokio::test(start_paused = true)]
async fn timeout_wins_over_a_later_panic() {
    let reporter = Recording::default();
    let res = pipeline(&reporter).handle(request("/late", None)).await;
    assert_eq!(res.status_code(), 503);
    assert_eq!(res.body(), b"timed out");
    assert!(reporter.entries().is_empty());
}

#[tokio::test]
async fn timeout_body_is_not_compressed() {
    let reporter = Recording::default();
    let router = Router::new().route("/late", late_panic);
    let pipeline = Pipeline::with_reporter(router, Duration::from_millis(20), Arc::new(reporter));
    let res = pipeline.handle(request("/late", Some("gzip"))).await;
    assert_eq!(res.body(), b"timed out");
    assert!(!res.headers().contains_key("content-encoding"));
}

#[tokio::test]
async fn handler_output_is_compressed_end_to_end() {
    let reporter = Recording::default();
    let res = pipeline(&reporter).handle(request("/page", Some("gzip"))).await;
    assert_eq!(res.headers()["content-encoding"], "gzip");

    let mut body = String::new();
    GzDecoder::new(res.body()).read_to_string(&mut body).unwrap();
    assert_eq!(body, "<p>compressed only when asked</p>");
}

#[tokio::test]
async fn unknown_path_is_plain_404() {
    let reporter = Recording::default();
    let res = pipeline(&reporter).handle(request("/nope", None)).await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.body(), strata::NOT_FOUND_BODY.as_bytes());
}
