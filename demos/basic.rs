//! Minimal strata example: a page, a panicking route, a slow route.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i --compressed http://localhost:3000/
//!   curl -i http://localhost:3000/panic      # 500, trace in the server log
//!   curl -i http://localhost:3000/slow       # 503 timed out after 4 s

use std::time::Duration;

use strata::{AssetManifest, Config, Request, Response, Router, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), strata::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "strata=info".into()))
        .init();

    let config = match std::env::var("STRATA_CONFIG") {
        Ok(path) => Config::load(path)?,
        Err(_) => Config { bind_address: "0.0.0.0:3000".to_owned(), ..Config::default() },
    };

    let assets = AssetManifest::new();
    assets.load_json(br#"{"site.css": "site-5d41402a.css"}"#.as_slice())?;

    let app = Router::new()
        .route("/", move |req: Request| index(req, assets.clone()))
        .route("/panic", fail)
        .route("/slow", slow);

    Server::new(config).serve(app).await
}

// GET /
//
// Pages take the manifest they need as an argument; the closure in `main`
// hands each request its own clone.
async fn index(_req: Request, assets: AssetManifest) -> Response {
    Response::html(format!(
        "<html><head>{}</head><body><h1>strata</h1></body></html>",
        assets.stylesheet_tag("site.css"),
    ))
}

// GET /panic → 500, the panic and its stack trace go to the log.
async fn fail(_req: Request) -> Response {
    panic!("this route always fails");
}

// GET /slow → sleeps past the default 4 s ceiling.
async fn slow(_req: Request) -> Response {
    tokio::time::sleep(Duration::from_secs(10)).await;
    Response::text("you will not see this")
}
