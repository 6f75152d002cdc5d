//! Fault reports when the application installs its own panic hook after
//! the server has started. Kept in its own test binary: the hook is
//! process-wide.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use strata::{Pipeline, Request, Response, Router};

mod common;

use common::Recording;

async fn boom(_req: Request) -> Response {
    panic!("boom");
}

fn request() -> Request {
    let req = http::Request::get("/boom").body(Bytes::new()).unwrap();
    Request::new(req, "127.0.0.1:4000".parse().unwrap())
}

fn pipeline(reporter: &Recording) -> Pipeline {
    let router = Router::new().route("/boom", boom);
    Pipeline::with_reporter(router, Duration::from_secs(4), Arc::new(reporter.clone()))
}

#[tokio::test]
async fn trace_is_reported_after_hook_is_replaced() {
    let before = Recording::default();
    let res = pipeline(&before).handle(request()).await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(before.entries().len(), 2);

    std::panic::set_hook(Box::new(|_| {}));

    let after = Recording::default();
    let res = pipeline(&after).handle(request()).await;
    assert_eq!(res.status_code(), 500);

    let reports = after.entries();
    assert_eq!(reports.len(), 2, "{reports:?}");
    assert_eq!(reports[0], ("PANIC: boom".to_owned(), true));
    assert!(reports[1].0.starts_with("STACKTRACE: "), "{reports:?}");
    assert!(reports[1].1);
}
