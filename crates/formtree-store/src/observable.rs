//! Commit notification plumbing shared by the store and its consumers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Something that holds state and announces every commit.
pub trait Observable {
    type State;

    /// Runs `f` against the current state.
    fn with_state<R>(&self, f: impl FnOnce(&Self::State) -> R) -> R;

    /// Registers `listener` to run after every commit. The returned handle
    /// unregisters it when dropped.
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

#[derive(Default)]
struct Listeners {
    next_id: usize,
    entries: Vec<(usize, Rc<dyn Fn()>)>,
}

/// Ordered listener list with drop-to-unsubscribe handles.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Rc<RefCell<Listeners>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let mut listeners = self.inner.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, listener));
        Subscription {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Calls every listener registered at the time of the call.
    pub fn notify(&self) {
        // Copy listeners so callbacks may subscribe or unsubscribe.
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered listener.
///
/// When dropped, automatically removes the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<RefCell<Listeners>>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropped_subscription_stops_notifications() {
        let registry = ListenerRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let subscription = registry.subscribe(Rc::new(move || counter.set(counter.get() + 1)));

        registry.notify();
        assert_eq!(calls.get(), 1);
        drop(subscription);
        registry.notify();
        assert_eq!(calls.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_notify() {
        let registry = ListenerRegistry::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));
        let (inner_slot, counter) = (Rc::clone(&slot), Rc::clone(&calls));
        let subscription = registry.subscribe(Rc::new(move || {
            counter.set(counter.get() + 1);
            inner_slot.borrow_mut().take();
        }));
        *slot.borrow_mut() = Some(subscription);

        registry.notify();
        registry.notify();
        assert_eq!(calls.get(), 1);
    }
}
