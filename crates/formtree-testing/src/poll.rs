//! Manual future polling for single-threaded store tests.

use futures_task::{noop_waker_ref, waker, ArcWake};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Polls `future` once with a waker that ignores wake-ups.
pub fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    let mut cx = Context::from_waker(noop_waker_ref());
    Pin::new(future).poll(&mut cx)
}

#[derive(Default)]
struct WakeCounter {
    wakes: AtomicUsize,
}

impl ArcWake for WakeCounter {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Owns a future and polls it on demand, counting how often it was woken.
pub struct TestPoller<F: Future> {
    future: Pin<Box<F>>,
    counter: Arc<WakeCounter>,
    waker: Waker,
    output: Option<F::Output>,
    finished: bool,
}

impl<F: Future> TestPoller<F> {
    pub fn new(future: F) -> Self {
        let counter = Arc::new(WakeCounter::default());
        let waker = waker(Arc::clone(&counter));
        Self {
            future: Box::pin(future),
            counter,
            waker,
            output: None,
            finished: false,
        }
    }

    /// Polls once unless the future already completed. Returns whether it
    /// has completed.
    pub fn poll(&mut self) -> bool {
        if self.finished {
            return true;
        }
        let mut cx = Context::from_waker(&self.waker);
        if let Poll::Ready(output) = self.future.as_mut().poll(&mut cx) {
            self.output = Some(output);
            self.finished = true;
        }
        self.finished
    }

    pub fn wake_count(&self) -> usize {
        self.counter.wakes.load(Ordering::SeqCst)
    }

    pub fn take_output(&mut self) -> Option<F::Output> {
        self.output.take()
    }
}
