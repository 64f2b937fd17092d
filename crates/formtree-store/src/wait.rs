use crate::observable::{Observable, Subscription};
use crate::state::NodesState;
use crate::store::NodeStore;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct WaitState {
    subscription: Option<Subscription>,
    waker: Option<Waker>,
}

/// Future returned by [`NodeStore::wait_for`].
///
/// Typical use is awaiting a node that a form-data change will create once
/// the next generation has run.
pub struct WaitFor<P> {
    store: NodeStore,
    predicate: P,
    state: Rc<RefCell<WaitState>>,
}

impl<P> WaitFor<P> {
    pub(crate) fn new(store: NodeStore, predicate: P) -> Self {
        Self {
            store,
            predicate,
            state: Rc::new(RefCell::new(WaitState {
                subscription: None,
                waker: None,
            })),
        }
    }
}

impl<P> Future for WaitFor<P>
where
    P: Fn(&NodesState) -> bool,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.store.with_state(&self.predicate) {
            self.state.borrow_mut().subscription.take();
            return Poll::Ready(());
        }

        let mut state = self.state.borrow_mut();
        state.waker = Some(cx.waker().clone());
        if state.subscription.is_none() {
            let weak = Rc::downgrade(&self.state);
            let subscription = Observable::subscribe(
                &self.store,
                Rc::new(move || {
                    if let Some(state) = weak.upgrade() {
                        let waker = state.borrow_mut().waker.take();
                        if let Some(waker) = waker {
                            waker.wake();
                        }
                    }
                }),
            );
            state.subscription = Some(subscription);
        }
        Poll::Pending
    }
}

impl<P> Drop for WaitFor<P> {
    fn drop(&mut self) {
        self.state.borrow_mut().subscription.take();
    }
}
