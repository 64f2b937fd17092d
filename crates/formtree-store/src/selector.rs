//! Per-consumer delayed selectors.
//!
//! A [`DelayedSelector`] belongs to one consumer (one rendered component).
//! The consumer reads slices of the store through it; each slice is computed
//! once, cached by an explicit key, and reused until a commit changes any
//! cached slice. At that point the whole cache is dropped and the consumer's
//! `on_invalidate` callback schedules its next render.
//!
//! The selector subscribes to the store lazily, on the first cache miss. A
//! consumer that never reads never subscribes and never re-renders.

use crate::error::SelectorError;
use crate::observable::{Observable, Subscription};
use formtree_layout::collections::map::HashMap;
use formtree_layout::hash::fingerprint;
use std::cell::RefCell;
use std::hash::Hash;
use std::rc::{Rc, Weak};

/// What a read does when no store is attached yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Fail with [`SelectorError::StoreNotProvided`].
    #[default]
    Strict,
    /// Answer [`Selected::NotProvided`].
    Lax,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selected<V> {
    Value(V),
    NotProvided,
}

impl<V> Selected<V> {
    pub fn value(self) -> Option<V> {
        match self {
            Selected::Value(value) => Some(value),
            Selected::NotProvided => None,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Selected::Value(_))
    }
}

/// Cheap pre-check run on every commit before the cached selectors are
/// replayed. Returning false skips the replay for that commit.
pub trait ReRenderGate<S> {
    /// Records the baseline when the cache gets its first entry.
    fn observe(&mut self, _state: &S) {}

    fn should_replay(&mut self, state: &S) -> bool;
}

/// Replays only when the fingerprint of a probed value changed.
pub struct WhenChanged<S, T> {
    probe: Box<dyn Fn(&S) -> T>,
    last: Option<u64>,
}

impl<S, T: Hash> WhenChanged<S, T> {
    pub fn new(probe: impl Fn(&S) -> T + 'static) -> Self {
        Self {
            probe: Box::new(probe),
            last: None,
        }
    }
}

impl<S, T: Hash> ReRenderGate<S> for WhenChanged<S, T> {
    fn observe(&mut self, state: &S) {
        self.last = Some(fingerprint(&(self.probe)(state)));
    }

    fn should_replay(&mut self, state: &S) -> bool {
        let next = fingerprint(&(self.probe)(state));
        let changed = self.last != Some(next);
        self.last = Some(next);
        changed
    }
}

pub struct DelayedSelectorConfig<S, K, V> {
    selector: Rc<dyn Fn(&S, &K) -> V>,
    equality: Rc<dyn Fn(&V, &V) -> bool>,
    strictness: Strictness,
    gate: Option<Box<dyn ReRenderGate<S>>>,
}

impl<S, K, V: PartialEq + 'static> DelayedSelectorConfig<S, K, V> {
    /// Compares values with `PartialEq`.
    pub fn new(selector: impl Fn(&S, &K) -> V + 'static) -> Self {
        Self::with_equality(selector, |a: &V, b: &V| a == b)
    }
}

impl<S, K, V> DelayedSelectorConfig<S, K, V> {
    pub fn with_equality(
        selector: impl Fn(&S, &K) -> V + 'static,
        equality: impl Fn(&V, &V) -> bool + 'static,
    ) -> Self {
        Self {
            selector: Rc::new(selector),
            equality: Rc::new(equality),
            strictness: Strictness::default(),
            gate: None,
        }
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn only_rerender_when(mut self, gate: impl ReRenderGate<S> + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }
}

struct CacheEntry<S, V> {
    selector: Rc<dyn Fn(&S) -> V>,
    value: V,
}

struct SelectorInner<O: Observable, K, V> {
    store: RefCell<Option<O>>,
    selector: Rc<dyn Fn(&O::State, &K) -> V>,
    equality: Rc<dyn Fn(&V, &V) -> bool>,
    strictness: Strictness,
    gate: RefCell<Option<Box<dyn ReRenderGate<O::State>>>>,
    cache: RefCell<HashMap<K, CacheEntry<O::State, V>>>,
    subscription: RefCell<Option<Subscription>>,
    on_invalidate: Rc<dyn Fn()>,
}

/// Cheap-clone handle; clones share one cache.
pub struct DelayedSelector<O: Observable, K, V> {
    inner: Rc<SelectorInner<O, K, V>>,
}

impl<O: Observable, K, V> Clone for DelayedSelector<O, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O, K, V> DelayedSelector<O, K, V>
where
    O: Observable + Clone + 'static,
    O::State: 'static,
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// `store` may be `None` until the consumer's store is available; see
    /// [`DelayedSelector::attach`].
    pub fn new(
        config: DelayedSelectorConfig<O::State, K, V>,
        store: Option<O>,
        on_invalidate: impl Fn() + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(SelectorInner {
                store: RefCell::new(store),
                selector: config.selector,
                equality: config.equality,
                strictness: config.strictness,
                gate: RefCell::new(config.gate),
                cache: RefCell::new(HashMap::default()),
                subscription: RefCell::new(None),
                on_invalidate: Rc::new(on_invalidate),
            }),
        }
    }

    /// Reads the slice for `key` with the configured selector.
    pub fn select(&self, key: K) -> Result<Selected<V>, SelectorError> {
        let selector = Rc::clone(&self.inner.selector);
        let owned_key = key.clone();
        self.select_with(key, move |state| selector(state, &owned_key))
    }

    /// Reads the slice for `key` with a one-off selector. The key alone
    /// identifies the cache entry, so one key must always mean one selector.
    pub fn select_with(
        &self,
        key: K,
        selector: impl Fn(&O::State) -> V + 'static,
    ) -> Result<Selected<V>, SelectorError> {
        if let Some(entry) = self.inner.cache.borrow().get(&key) {
            return Ok(Selected::Value(entry.value.clone()));
        }

        let store = self.inner.store.borrow().clone();
        let Some(store) = store else {
            return match self.inner.strictness {
                Strictness::Strict => Err(SelectorError::StoreNotProvided),
                Strictness::Lax => Ok(Selected::NotProvided),
            };
        };

        let selector: Rc<dyn Fn(&O::State) -> V> = Rc::new(selector);
        let first_entry = self.inner.cache.borrow().is_empty();
        let value = store.with_state(|state| {
            if first_entry {
                if let Some(gate) = self.inner.gate.borrow_mut().as_mut() {
                    gate.observe(state);
                }
            }
            selector(state)
        });
        self.inner.cache.borrow_mut().insert(
            key,
            CacheEntry {
                selector,
                value: value.clone(),
            },
        );
        self.ensure_subscribed(&store);
        Ok(Selected::Value(value))
    }

    fn ensure_subscribed(&self, store: &O) {
        if self.inner.subscription.borrow().is_some() {
            return;
        }
        let weak: Weak<SelectorInner<O, K, V>> = Rc::downgrade(&self.inner);
        let subscription = store.subscribe(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_commit();
            }
        }));
        *self.inner.subscription.borrow_mut() = Some(subscription);
    }

    /// Supplies or swaps the backing store. Cached values and the old
    /// subscription are dropped.
    pub fn attach(&self, store: O) {
        self.inner.subscription.borrow_mut().take();
        self.inner.cache.borrow_mut().clear();
        *self.inner.store.borrow_mut() = Some(store);
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.subscription.borrow().is_some()
    }

    pub fn cache_len(&self) -> usize {
        self.inner.cache.borrow().len()
    }
}

impl<O: Observable + Clone, K, V> SelectorInner<O, K, V> {
    fn on_commit(&self) {
        let Some(store) = self.store.borrow().clone() else {
            return;
        };
        let stale = store.with_state(|state| {
            if let Some(gate) = self.gate.borrow_mut().as_mut() {
                if !gate.should_replay(state) {
                    return false;
                }
            }
            let cache = self.cache.borrow();
            cache
                .values()
                .any(|entry| !(self.equality)(&entry.value, &(entry.selector)(state)))
        });
        if stale {
            log::debug!("delayed selector cache invalidated");
            self.cache.borrow_mut().clear();
            (self.on_invalidate)();
        }
    }
}

#[cfg(test)]
#[path = "tests/selector_tests.rs"]
mod tests;
