//! Replay of recorded visibility batches

use super::registry::Registry;
use super::{BatchCallback, Subscription, VisibilityChange, VisibilityObserver};
use crate::config::ObserverOptions;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Observer that delivers a fixed sequence of batches, in arrival order
///
/// Each batch is narrowed to the subscriber's targets before delivery.
#[derive(Default)]
pub struct ReplayObserver {
    pending: RefCell<VecDeque<Vec<VisibilityChange>>>,
    registry: Registry,
    delivered: Cell<usize>,
}

impl ReplayObserver {
    /// Create an observer with batches to replay
    pub fn new(batches: Vec<Vec<VisibilityChange>>) -> Self {
        Self {
            pending: RefCell::new(batches.into()),
            ..Default::default()
        }
    }

    /// Load batches from a JSON array of arrays of `{"id", "is_visible"}`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let batches: Vec<Vec<VisibilityChange>> = serde_json::from_str(json)?;
        Ok(Self::new(batches))
    }

    /// Batches not yet replayed
    pub fn remaining(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Batches replayed so far
    pub fn delivered(&self) -> usize {
        self.delivered.get()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Replay the next batch; returns false once the queue is empty
    pub fn step(&self) -> bool {
        let Some(batch) = self.pending.borrow_mut().pop_front() else {
            return false;
        };

        for key in self.registry.keys() {
            let Some(narrowed) = self.registry.with_subscriber(key, |s| {
                batch
                    .iter()
                    .filter(|c| s.targets.contains(&c.id))
                    .cloned()
                    .collect::<Vec<_>>()
            }) else {
                continue;
            };
            self.registry.deliver(key, &narrowed);
        }

        self.delivered.set(self.delivered.get() + 1);
        tracing::trace!(batch = self.delivered.get(), size = batch.len(), "Replayed batch");
        true
    }

    /// Replay every queued batch; returns how many were replayed
    pub fn play(&self) -> usize {
        let mut count = 0;
        while self.step() {
            count += 1;
        }
        count
    }
}

impl VisibilityObserver for ReplayObserver {
    fn subscribe(
        &self,
        targets: &[String],
        options: &ObserverOptions,
        on_batch: BatchCallback,
    ) -> Subscription {
        self.registry.add(targets, options, on_batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn targets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_replays_in_order_and_narrows_to_targets() {
        let observer = ReplayObserver::from_json(
            r#"[
                [{"id": "a", "is_visible": true}, {"id": "zzz", "is_visible": true}],
                [{"id": "a", "visible": false}, {"id": "b", "visible": true}]
            ]"#,
        )
        .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = observer.subscribe(
            &targets(&["a", "b"]),
            &ObserverOptions::default(),
            Box::new(move |batch: &[VisibilityChange]| sink.borrow_mut().push(batch.to_vec())),
        );

        assert_eq!(observer.play(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                vec![VisibilityChange::visible("a")],
                vec![VisibilityChange::hidden("a"), VisibilityChange::visible("b")],
            ]
        );
        assert_eq!(observer.remaining(), 0);
        assert!(!observer.step());
    }

    #[test]
    fn test_released_subscriber_gets_nothing() {
        let observer = ReplayObserver::new(vec![vec![VisibilityChange::visible("a")]]);
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();

        let mut sub = observer.subscribe(
            &targets(&["a"]),
            &ObserverOptions::default(),
            Box::new(move |_: &[VisibilityChange]| counter.set(counter.get() + 1)),
        );
        sub.unsubscribe();

        assert_eq!(observer.subscriber_count(), 0);
        observer.play();
        assert_eq!(hits.get(), 0);
        assert_eq!(observer.delivered(), 1);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(ReplayObserver::from_json(r#"[{"id": "a"}]"#).is_err());
    }
}
