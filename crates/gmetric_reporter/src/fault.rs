//! Recovery boundary for the background export loop.
//!
//! [`FaultBoundary`] polls its inner future under `catch_unwind`. A panic
//! raised while polling is turned into a [`Fault`] holding the panic message
//! and the backtrace of the panicking frame, instead of unwinding into the
//! runtime and silently killing the task.
//!
//! The backtrace is captured by a process-wide panic hook that is installed
//! once and chains to whatever hook was there before. The hook only captures
//! while a boundary is polling on the current thread, so panics elsewhere in
//! the process keep their usual cost and output.

use pin_project_lite::pin_project;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if ARMED.with(Cell::get) > 0 {
                let trace = Backtrace::force_capture().to_string();
                LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as inside a boundary for the guard's lifetime.
struct Armed;

impl Armed {
    fn enter() -> Self {
        ARMED.with(|armed| armed.set(armed.get() + 1));
        Armed
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(armed.get().saturating_sub(1)));
    }
}

/// A panic caught by a [`FaultBoundary`].
#[derive(Debug, Clone)]
pub struct Fault {
    message: String,
    trace: String,
}

impl Fault {
    fn from_panic(payload: Box<dyn Any + Send>, trace: Option<String>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            message,
            trace: trace.unwrap_or_else(|| Backtrace::force_capture().to_string()),
        }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Call-stack trace captured at the panic site.
    pub fn trace(&self) -> &str {
        &self.trace
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recovered from panic: {}", self.message)
    }
}

pin_project! {
    /// Future wrapper that converts a panic in `inner` into `Err(Fault)`.
    ///
    /// Once a fault is returned the inner future is never polled again.
    pub struct FaultBoundary<F> {
        #[pin]
        inner: F,
        faulted: bool,
    }
}

impl<F> FaultBoundary<F> {
    pub fn new(inner: F) -> Self {
        install_hook();
        Self {
            inner,
            faulted: false,
        }
    }
}

impl<F: Future> Future for FaultBoundary<F> {
    type Output = Result<F::Output, Fault>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if *this.faulted {
            return Poll::Pending;
        }

        let mut inner = this.inner;
        let result = {
            let _armed = Armed::enter();
            panic::catch_unwind(AssertUnwindSafe(|| inner.as_mut().poll(cx)))
        };

        match result {
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => {
                *this.faulted = true;
                let trace = LAST_TRACE.with(|slot| slot.borrow_mut().take());
                Poll::Ready(Err(Fault::from_panic(payload, trace)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_output_passes_through() {
        let out = FaultBoundary::new(async { 42 }).await;
        assert_eq!(out.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_panic_becomes_fault() {
        let out = FaultBoundary::new(async {
            tokio::task::yield_now().await;
            panic!("collector exploded");
        })
        .await;

        let fault = out.unwrap_err();
        assert_eq!(fault.message(), "collector exploded");
        assert!(!fault.trace().is_empty());
        assert_eq!(fault.to_string(), "recovered from panic: collector exploded");
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let code = 7;
        let fault = FaultBoundary::new(async move {
            if code > 0 {
                panic!("bad code {code}");
            }
        })
        .await
        .unwrap_err();
        assert_eq!(fault.message(), "bad code 7");
    }

    #[test]
    fn test_guard_disarms_on_drop() {
        {
            let _a = Armed::enter();
            let _b = Armed::enter();
            assert_eq!(ARMED.with(Cell::get), 2);
        }
        assert_eq!(ARMED.with(Cell::get), 0);
    }
}
