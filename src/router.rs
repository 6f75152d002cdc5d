//! Exact-match request router.
//!
//! One hash map from path to handler. No wildcards, no parameters, no
//! precedence rules: a request is served by the handler registered for
//! exactly its path, or gets the stock not-found page.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// Body of the response sent when no route matches.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// The application router.
///
/// Build it once at startup and hand it to [`Server::serve`](crate::Server::serve)
/// or [`Pipeline::new`](crate::Pipeline::new). After that it is read-only and
/// shared between connections without locking.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers `handler` for requests whose path is exactly `path`, any
    /// method. Registering the same path again replaces the earlier handler.
    ///
    /// ```rust,no_run
    /// # use strata::{Request, Response, Router};
    /// # async fn index(_: Request) -> Response { Response::text("") }
    /// # async fn about(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .route("/",      index)
    ///     .route("/about", about);
    /// ```
    pub fn route(mut self, path: &str, handler: impl Handler) -> Self {
        self.routes.insert(path.to_owned(), handler.into_boxed_handler());
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn lookup(&self, path: &str) -> Option<BoxedHandler> {
        self.routes.get(path).map(Arc::clone)
    }

    /// Turns the route table into the innermost stage of the pipeline.
    pub(crate) fn into_handler(self) -> BoxedHandler {
        Arc::new(Dispatch(Arc::new(self)))
    }
}

/// Resolves a request's path and invokes the matching handler.
struct Dispatch(Arc<Router>);

impl ErasedHandler for Dispatch {
    fn call(&self, req: Request) -> BoxFuture {
        match self.0.lookup(req.path()) {
            Some(handler) => handler.call(req),
            None => Box::pin(async {
                Response::error(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
            }),
        }
    }
}
