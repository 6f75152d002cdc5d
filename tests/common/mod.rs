//! Shared helpers: a server on an ephemeral port, a hyper HTTP/1.1 client
//! and a reporter that records what it is given.

#![allow(dead_code)]

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::HOST;
use http_body_util::{BodyExt, Empty};
use hyper::body::Body;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use strata::{Config, Reporter, RequestInfo, Router, Server};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
pub struct Recording(Arc<Mutex<Vec<(String, bool)>>>);

impl Recording {
    pub fn entries(&self) -> Vec<(String, bool)> {
        self.0.lock().unwrap().clone()
    }
}

impl Reporter for Recording {
    fn report(&self, _req: &RequestInfo, error: Option<&dyn fmt::Display>, is_panic: bool) {
        let line = error.map(|e| e.to_string()).unwrap_or_default();
        self.0.lock().unwrap().push((line, is_panic));
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub reporter: Recording,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), strata::Error>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        Self::start_with(Config::default(), router).await
    }

    pub async fn start_with(config: Config, router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reporter = Recording::default();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = Server::new(config).with_reporter(reporter.clone());
        let handle = tokio::spawn(server.serve_with_shutdown(listener, router, async move {
            let _ = stopped.await;
        }));

        Self { addr, reporter, stop: Some(stop), handle }
    }

    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut req = http::Request::get(path).header(HOST, self.addr.to_string());
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.send(req.body(Empty::<Bytes>::new()).unwrap()).await
    }

    /// Sends `req` on a fresh connection and reads the full response.
    pub async fn send<B>(&self, req: http::Request<B>) -> TestResponse
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
        let conn = tokio::spawn(conn);

        let (parts, body) = sender.send_request(req).await.unwrap().into_parts();
        let body = body.collect().await.unwrap().to_bytes().to_vec();

        drop(sender);
        let _ = conn.await;

        let headers = parts
            .headers
            .iter()
            .map(|(k, v)| (k.as_str().to_owned(), v.to_str().unwrap_or_default().to_owned()))
            .collect();
        TestResponse { status: parts.status.as_u16(), headers, body }
    }

    /// Signals shutdown and waits for the server to drain.
    pub async fn stop(mut self) -> Result<(), strata::Error> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap()
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
