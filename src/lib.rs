//! # strata
//!
//! A small HTTP serving layer. You register handlers on exact paths; strata
//! wraps them in a fixed stack of cross-cutting concerns and serves them.
//!
//! ## The pipeline
//!
//! Every request passes through the same stages, in this order:
//!
//! 1. **Timeout**: the whole chain below gets a fixed ceiling
//!    ([`Config::request_timeout_ms`]); past it the client gets
//!    `503 timed out`.
//! 2. **Recovery**: a panic anywhere below is caught, reported with its
//!    stack trace through the [`Reporter`], and answered with
//!    `500 Internal Server Error`. The process keeps serving.
//! 3. **Metrics**: one log line per request with method, URI and duration.
//! 4. **Compression**: gzip for clients that accept it.
//! 5. **Router**: exact path match, or `404 page not found`.
//!
//! The order is not configurable. See [`middleware`] for what each stage
//! guarantees.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .route("/",      index)
//!         .route("/about", about);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn index(_req: Request) -> Response {
//!     Response::html("<h1>home</h1>")
//! }
//!
//! async fn about(req: Request) -> Response {
//!     if req.header("x-broken").is_some() {
//!         req.report_error(&"about page data missing");
//!     }
//!     Response::html("<h1>about</h1>")
//! }
//! ```

mod error;
mod fault;
mod handler;
mod io;
mod pipeline;
mod request;
mod response;
mod router;
mod server;

pub mod assets;
pub mod config;
pub mod middleware;
pub mod report;

pub use assets::AssetManifest;
pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use pipeline::Pipeline;
pub use report::{LogReporter, Reporter, SharedReporter};
pub use request::{Request, RequestInfo};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{NOT_FOUND_BODY, Router};
pub use server::Server;
