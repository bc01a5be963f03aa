//! Subscriber bookkeeping shared by the bundled observers

use super::{BatchCallback, Subscription, VisibilityChange};
use crate::config::ObserverOptions;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::{Rc, Weak};

pub(crate) struct Subscriber {
    pub targets: Vec<String>,
    pub options: ObserverOptions,
    /// Last reported state per target; empty until the first delivery
    pub last: HashMap<String, bool>,
    /// Taken out while the callback runs
    callback: Option<BatchCallback>,
    /// Batches that arrived while the callback was running
    queued: VecDeque<Vec<VisibilityChange>>,
}

#[derive(Default)]
struct Inner {
    next_key: u64,
    subscribers: BTreeMap<u64, Subscriber>,
}

/// Live subscribers, keyed in subscription order
#[derive(Clone, Default)]
pub(crate) struct Registry {
    inner: Rc<RefCell<Inner>>,
}

impl Registry {
    /// Register a callback and hand back its releasing subscription
    pub fn add(
        &self,
        targets: &[String],
        options: &ObserverOptions,
        callback: BatchCallback,
    ) -> Subscription {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let key = inner.next_key;
            inner.next_key += 1;
            inner.subscribers.insert(
                key,
                Subscriber {
                    targets: targets.to_vec(),
                    options: options.clone(),
                    last: HashMap::new(),
                    callback: Some(callback),
                    queued: VecDeque::new(),
                },
            );
            key
        };

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.remove(&key);
            }
        })
    }

    pub fn keys(&self) -> Vec<u64> {
        self.inner.borrow().subscribers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Run `f` against a subscriber, if it is still registered
    pub fn with_subscriber<R>(&self, key: u64, f: impl FnOnce(&mut Subscriber) -> R) -> Option<R> {
        self.inner.borrow_mut().subscribers.get_mut(&key).map(f)
    }

    /// Deliver a batch to one subscriber
    ///
    /// The registry is not borrowed while the callback runs, so callbacks may
    /// subscribe or release (including their own subscription). A batch that
    /// arrives while the subscriber's callback is running is queued and
    /// delivered, in order, once that call returns.
    pub fn deliver(&self, key: u64, batch: &[VisibilityChange]) -> bool {
        if batch.is_empty() {
            return false;
        }

        enum Slot {
            Ready(BatchCallback),
            Busy,
        }

        let slot = self.with_subscriber(key, |s| match s.callback.take() {
            Some(callback) => Slot::Ready(callback),
            None => {
                s.queued.push_back(batch.to_vec());
                Slot::Busy
            }
        });
        let mut callback = match slot {
            Some(Slot::Ready(callback)) => callback,
            Some(Slot::Busy) => {
                tracing::trace!(key, size = batch.len(), "Queued re-entrant batch");
                return true;
            }
            None => return false,
        };

        callback(batch);

        // Drain re-entrant batches; stop if the subscription was released meanwhile
        while let Some(Some(next)) = self.with_subscriber(key, |s| s.queued.pop_front()) {
            callback(&next);
        }

        self.with_subscriber(key, |s| s.callback = Some(callback));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_reentrant_batch_delivered_after_current_one() {
        let registry = Registry::default();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let fired = Rc::new(Cell::new(false));

        let inner = registry.clone();
        let sink = Rc::clone(&seen);
        let once = Rc::clone(&fired);
        let _sub = registry.add(
            &["a".to_string(), "b".to_string()],
            &ObserverOptions::viewport(),
            Box::new(move |batch: &[VisibilityChange]| {
                sink.borrow_mut().push(batch[0].id.clone());
                if !once.replace(true) {
                    assert!(inner.deliver(0, &[VisibilityChange::visible("b")]));
                    sink.borrow_mut().push("returned".to_string());
                }
            }),
        );

        assert!(registry.deliver(0, &[VisibilityChange::visible("a")]));
        assert_eq!(*seen.borrow(), vec!["a", "returned", "b"]);
    }

    #[test]
    fn test_release_during_callback_discards_queue() {
        let registry = Registry::default();
        let calls = Rc::new(Cell::new(0));
        let handle: Rc<RefCell<Option<Subscription>>> = Rc::default();

        let inner = registry.clone();
        let counter = Rc::clone(&calls);
        let own = Rc::clone(&handle);
        let sub = registry.add(
            &["a".to_string()],
            &ObserverOptions::viewport(),
            Box::new(move |_batch: &[VisibilityChange]| {
                counter.set(counter.get() + 1);
                inner.deliver(0, &[VisibilityChange::hidden("a")]);
                if let Some(mut sub) = own.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }),
        );
        *handle.borrow_mut() = Some(sub);

        registry.deliver(0, &[VisibilityChange::visible("a")]);

        assert_eq!(calls.get(), 1);
        assert_eq!(registry.len(), 0);
    }
}
