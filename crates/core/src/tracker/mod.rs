//! Active-section tracking
//!
//! An [`ActiveSectionTracker`] subscribes to a [`VisibilityObserver`] for the
//! page's headings and publishes the active heading id to a listener after
//! every batch that leaves at least one heading visible. The tracker owns its
//! visibility state; only the selected id leaves it.
//!
//! Tearing the tracker down discards the state and releases the subscription.
//! Teardown is idempotent and also happens on drop. Once torn down, the
//! listener is never called again, even by an observer that keeps emitting
//! to a released callback.

mod state;

pub use state::TrackerState;

use crate::config::ObserverOptions;
use crate::models::HeadingNode;
use crate::observer::{Subscription, VisibilityChange, VisibilityObserver};
use std::cell::RefCell;
use std::rc::Rc;

/// Live tracking of the active heading for one page view
pub struct ActiveSectionTracker {
    /// `None` once torn down
    state: Rc<RefCell<Option<TrackerState>>>,
    subscription: Subscription,
}

impl ActiveSectionTracker {
    /// Subscribe to `observer` for `headings` and publish selections to `listener`
    pub fn activate<O, L>(
        observer: &O,
        headings: &[HeadingNode],
        options: &ObserverOptions,
        listener: L,
    ) -> Self
    where
        O: VisibilityObserver + ?Sized,
        L: FnMut(&str) + 'static,
    {
        let state = Rc::new(RefCell::new(Some(TrackerState::new(headings))));
        let targets: Vec<String> = headings.iter().map(|h| h.id.clone()).collect();

        let shared = Rc::clone(&state);
        let mut listener = listener;
        let subscription = observer.subscribe(
            &targets,
            options,
            Box::new(move |batch: &[VisibilityChange]| {
                let resolved = {
                    let mut guard = shared.borrow_mut();
                    let Some(state) = guard.as_mut() else {
                        tracing::trace!(size = batch.len(), "Dropping batch after teardown");
                        return;
                    };
                    state.apply_batch(batch).map(str::to_string)
                };

                // Borrow released so the listener may query or tear down the tracker
                if let Some(id) = resolved {
                    tracing::trace!(active = %id, "Active heading");
                    listener(&id);
                }
            }),
        );

        tracing::debug!(
            headings = targets.len(),
            root = options.root.as_deref().unwrap_or("viewport"),
            "Active-section tracker subscribed"
        );

        Self {
            state,
            subscription,
        }
    }

    /// Current selection, if any
    pub fn active_id(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .and_then(|s| s.active().map(str::to_string))
    }

    /// Visible heading ids in document order
    pub fn visible_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .as_ref()
            .map(|s| s.visible_ids().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether the tracker is still subscribed
    pub fn is_active(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Discard state and release the subscription; a no-op when already done
    pub fn teardown(&mut self) {
        let had_state = self.state.borrow_mut().take().is_some();
        let released = self.subscription.unsubscribe();
        if had_state || released {
            tracing::debug!("Active-section tracker torn down");
        }
    }
}

impl Drop for ActiveSectionTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}
