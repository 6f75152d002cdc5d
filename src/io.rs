//! Idle deadlines on accepted connections.
//!
//! A read that makes no progress for `read_timeout`, or a write that makes
//! no progress for `write_timeout`, fails with `ErrorKind::TimedOut` and
//! hyper closes the connection. These bound stuck clients between requests;
//! a client that keeps trickling bytes resets them, so the server also puts
//! absolute limits on reading each request's head and body.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Sleep, sleep};

pin_project! {
    pub(crate) struct TimedIo<T> {
        #[pin]
        inner: T,
        read_timeout: Duration,
        write_timeout: Duration,
        read_deadline: Option<Pin<Box<Sleep>>>,
        write_deadline: Option<Pin<Box<Sleep>>>,
    }
}

impl<T> TimedIo<T> {
    pub(crate) fn new(inner: T, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self { inner, read_timeout, write_timeout, read_deadline: None, write_deadline: None }
    }
}

/// Arms the deadline on the first stalled poll and checks it on later ones.
fn expired(deadline: &mut Option<Pin<Box<Sleep>>>, timeout: Duration, cx: &mut Context<'_>) -> bool {
    let timer = deadline.get_or_insert_with(|| Box::pin(sleep(timeout)));
    timer.as_mut().poll(cx).is_ready()
}

fn timed_out(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("connection {what} timed out"))
}

impl<T: AsyncRead> AsyncRead for TimedIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        match this.inner.poll_read(cx, buf) {
            Poll::Ready(res) => {
                *this.read_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending if expired(this.read_deadline, *this.read_timeout, cx) => {
                Poll::Ready(Err(timed_out("read")))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: AsyncWrite> AsyncWrite for TimedIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();
        match this.inner.poll_write(cx, buf) {
            Poll::Ready(res) => {
                *this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending if expired(this.write_deadline, *this.write_timeout, cx) => {
                Poll::Ready(Err(timed_out("write")))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();
        match this.inner.poll_write_vectored(cx, bufs) {
            Poll::Ready(res) => {
                *this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending if expired(this.write_deadline, *this.write_timeout, cx) => {
                Poll::Ready(Err(timed_out("write")))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        match this.inner.poll_flush(cx) {
            Poll::Ready(res) => {
                *this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending if expired(this.write_deadline, *this.write_timeout, cx) => {
                Poll::Ready(Err(timed_out("write")))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn silent_peer_trips_read_deadline() {
        let (client, _server) = duplex(64);
        let mut io = TimedIo::new(client, Duration::from_secs(5), Duration::from_secs(5));
        let mut buf = [0_u8; 8];
        let err = io.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_resets_the_deadline() {
        let (client, mut server) = duplex(64);
        let mut io = TimedIo::new(client, Duration::from_secs(5), Duration::from_secs(5));

        tokio::spawn(async move {
            for chunk in [b"ab", b"cd"] {
                tokio::time::sleep(Duration::from_secs(4)).await;
                server.write_all(chunk).await.unwrap();
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let mut buf = [0_u8; 2];
        io.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ab");
        io.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"cd");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_writer_trips_write_deadline() {
        let (client, _server) = duplex(4);
        let mut io = TimedIo::new(client, Duration::from_secs(5), Duration::from_secs(5));
        let err = io.write_all(b"more than four bytes").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
