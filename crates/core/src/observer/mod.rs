//! Visibility observation
//!
//! A [`VisibilityObserver`] reports, in batches, whether observed headings are
//! inside the observation window (the root's box grown by the root margin).
//! Subscribing returns a [`Subscription`] handle; releasing the handle, either
//! explicitly or by dropping it, stops delivery to that subscriber.
//!
//! Everything here is single-threaded: observers and callbacks live on the
//! thread that drives the page, so shared state uses `Rc<RefCell<_>>`.

mod registry;
mod replay;
mod scroll;

pub use replay::ReplayObserver;
pub use scroll::{ElementBox, ScrollObserver};

use crate::config::ObserverOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One heading's visibility transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityChange {
    /// Heading id
    pub id: String,

    /// Whether the heading is inside the observation window
    #[serde(alias = "visible")]
    pub is_visible: bool,
}

impl VisibilityChange {
    pub fn visible(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_visible: true,
        }
    }

    pub fn hidden(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_visible: false,
        }
    }
}

/// Callback invoked with each delivered batch
pub type BatchCallback = Box<dyn FnMut(&[VisibilityChange])>;

/// Source of visibility batches
pub trait VisibilityObserver {
    /// Start observing `targets`, delivering batches to `on_batch` until the
    /// returned subscription is released
    fn subscribe(
        &self,
        targets: &[String],
        options: &ObserverOptions,
        on_batch: BatchCallback,
    ) -> Subscription;
}

/// Handle to a live observation
///
/// Releasing is idempotent, and dropping the handle releases it.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `release` once when released
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that holds nothing
    pub fn released() -> Self {
        Self { release: None }
    }

    /// Release the observation; returns false if it was already released
    pub fn unsubscribe(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Region headings are observed against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationRoot {
    /// A scrollable element matched by selector
    Element(String),
    /// The page viewport
    Viewport,
}

impl ObserverOptions {
    /// Resolve the configured root, falling back to the viewport when the
    /// selector matches nothing
    pub fn resolve_root(&self, has_element: impl Fn(&str) -> bool) -> ObservationRoot {
        match self.root.as_deref() {
            Some(selector) if has_element(selector) => ObservationRoot::Element(selector.to_string()),
            Some(selector) => {
                tracing::debug!(selector, "Observation root not found, using viewport");
                ObservationRoot::Viewport
            }
            None => ObservationRoot::Viewport,
        }
    }

    /// Options with the root replaced by its resolution
    pub fn resolved(&self, has_element: impl Fn(&str) -> bool) -> Self {
        let root = match self.resolve_root(has_element) {
            ObservationRoot::Element(selector) => Some(selector),
            ObservationRoot::Viewport => None,
        };
        self.clone().with_root(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_subscription_releases_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut sub = Subscription::new(move || counter.set(counter.get() + 1));

        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        drop(sub);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_subscription_released_on_drop() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        {
            let _sub = Subscription::new(move || counter.set(counter.get() + 1));
        }
        assert_eq!(calls.get(), 1);
        assert!(!Subscription::released().is_active());
    }

    #[test]
    fn test_resolve_root_falls_back_to_viewport() {
        let options = ObserverOptions::default();

        assert_eq!(
            options.resolve_root(|s| s == "iframe"),
            ObservationRoot::Element("iframe".to_string())
        );
        assert_eq!(options.resolve_root(|_| false), ObservationRoot::Viewport);
        assert_eq!(
            ObserverOptions::viewport().resolve_root(|_| true),
            ObservationRoot::Viewport
        );
        assert!(options.resolved(|_| false).root.is_none());
    }

    #[test]
    fn test_change_accepts_short_field_name() {
        let change: VisibilityChange =
            serde_json::from_str(r#"{"id": "intro", "visible": true}"#).unwrap();
        assert_eq!(change, VisibilityChange::visible("intro"));
    }
}
