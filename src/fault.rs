//! Turning a panic inside a request future into a value.
//!
//! [`CatchFault`] polls its inner future under `catch_unwind`. While such a
//! poll is on the stack, the process panic hook records a backtrace of the
//! panicking thread into a thread-local slot instead of printing the default
//! message to stderr; the slot is drained into the resulting [`Fault`].
//! Panics raised anywhere else keep going to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

thread_local! {
    /// Number of `CatchFault` polls currently on this thread's stack.
    static GUARDED: Cell<usize> = const { Cell::new(0) };
    static TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) > 0 {
                let trace = Backtrace::force_capture();
                TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

struct Guarded;

impl Guarded {
    fn enter() -> Self {
        GUARDED.with(|n| n.set(n.get() + 1));
        Guarded
    }
}

impl Drop for Guarded {
    fn drop(&mut self) {
        GUARDED.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

/// A panic intercepted while handling a request.
#[derive(Debug)]
pub(crate) struct Fault {
    message: String,
    backtrace: Option<Backtrace>,
}

impl Fault {
    /// Normalizes a panic payload.
    ///
    /// String payloads become the message; error payloads keep their own
    /// display text; anything else is an `"unknown panic"`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>, backtrace: Option<Backtrace>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
            err.to_string()
        } else if let Some(err) = payload.downcast_ref::<crate::Error>() {
            err.to_string()
        } else if let Some(err) = payload.downcast_ref::<std::io::Error>() {
            err.to_string()
        } else {
            "unknown panic".to_owned()
        };
        Self { message, backtrace }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }
}

pin_project! {
    /// Resolves to `Err(Fault)` instead of unwinding when the inner future
    /// panics. Must not be polled again after it has resolved.
    pub(crate) struct CatchFault<F> {
        #[pin]
        inner: F,
    }
}

impl<F> CatchFault<F> {
    pub(crate) fn new(inner: F) -> Self {
        install_hook();
        Self { inner }
    }
}

impl<F: Future> Future for CatchFault<F> {
    type Output = Result<F::Output, Fault>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.project().inner;
        let _guard = Guarded::enter();
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(out)) => Poll::Ready(Ok(out)),
            Err(payload) => {
                let trace = TRACE.with(|slot| slot.borrow_mut().take());
                Poll::Ready(Err(Fault::from_panic(payload, trace)))
            }
        }
    }
}
