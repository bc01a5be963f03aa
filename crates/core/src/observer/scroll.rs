//! Geometric viewport model
//!
//! Headings are laid out as vertical boxes inside one scroll container. Each
//! call to [`ScrollObserver::scroll_to`] intersects every observed box with the
//! window `[top - margin.top, top + viewport_height + margin.bottom)` and
//! delivers the targets whose state changed. The first delivery to a
//! subscriber reports every laid-out target.
//!
//! There is a single scroll container: whatever `root` a subscriber resolved
//! to, it is modelled as the viewport, and only the root margin changes the
//! window. A subscriber that scrolls from inside its own callback receives
//! the resulting batch after the current one.

use super::registry::Registry;
use super::{BatchCallback, Subscription, VisibilityChange, VisibilityObserver};
use crate::config::{ObserverOptions, RootMargin};
use crate::models::HeadingNode;
use std::cell::Cell;
use std::collections::HashMap;

/// Vertical extent of an element, in pixels from the top of the document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBox {
    pub top: f64,
    pub height: f64,
}

impl ElementBox {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height.max(0.0)
    }

    /// Whether the box overlaps `[start, end)`
    fn intersects(&self, start: f64, end: f64) -> bool {
        if self.height <= 0.0 {
            return self.top >= start && self.top < end;
        }
        self.top < end && self.bottom() > start
    }
}

/// Observer driven by an explicit scroll position
pub struct ScrollObserver {
    layout: HashMap<String, ElementBox>,
    viewport_height: f64,
    scroll_top: Cell<f64>,
    registry: Registry,
}

impl ScrollObserver {
    /// Create an empty layout with the given viewport height
    pub fn new(viewport_height: f64) -> Self {
        Self {
            layout: HashMap::new(),
            viewport_height: viewport_height.max(0.0),
            scroll_top: Cell::new(0.0),
            registry: Registry::default(),
        }
    }

    /// Lay headings out one line apart by source line
    pub fn from_headings(headings: &[HeadingNode], line_height: f64, viewport_height: f64) -> Self {
        let mut observer = Self::new(viewport_height);
        for heading in headings {
            let top = heading.line.saturating_sub(1) as f64 * line_height;
            observer.place(heading.id.clone(), ElementBox::new(top, line_height));
        }
        observer
    }

    /// Add an element (builder pattern)
    pub fn with_element(mut self, id: impl Into<String>, top: f64, height: f64) -> Self {
        self.place(id, ElementBox::new(top, height));
        self
    }

    /// Place or move an element
    pub fn place(&mut self, id: impl Into<String>, element: ElementBox) {
        self.layout.insert(id.into(), element);
    }

    pub fn element(&self, id: &str) -> Option<ElementBox> {
        self.layout.get(id).copied()
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top.get()
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Bottom edge of the lowest element
    pub fn document_height(&self) -> f64 {
        self.layout
            .values()
            .map(ElementBox::bottom)
            .fold(0.0, f64::max)
    }

    /// Observation window for a scroll position and margin
    pub fn window(&self, top: f64, margin: &RootMargin) -> (f64, f64) {
        (top - margin.top, top + self.viewport_height + margin.bottom)
    }

    /// Scroll to `top` (clamped at zero) and notify subscribers
    ///
    /// Returns the number of batches delivered.
    pub fn scroll_to(&self, top: f64) -> usize {
        let top = top.max(0.0);
        self.scroll_top.set(top);

        let mut delivered = 0;
        for key in self.registry.keys() {
            let batch = self
                .registry
                .with_subscriber(key, |s| {
                    let (start, end) = self.window(top, &s.options.root_margin);
                    let mut changes = Vec::new();
                    for target in &s.targets {
                        let Some(element) = self.layout.get(target) else {
                            continue;
                        };
                        let visible = element.intersects(start, end);
                        if s.last.get(target) != Some(&visible) {
                            s.last.insert(target.clone(), visible);
                            changes.push(VisibilityChange {
                                id: target.clone(),
                                is_visible: visible,
                            });
                        }
                    }
                    changes
                })
                .unwrap_or_default();

            if self.registry.deliver(key, &batch) {
                delivered += 1;
            }
        }

        tracing::trace!(top, delivered, "Scrolled");
        delivered
    }
}

impl VisibilityObserver for ScrollObserver {
    fn subscribe(
        &self,
        targets: &[String],
        options: &ObserverOptions,
        on_batch: BatchCallback,
    ) -> Subscription {
        self.registry.add(targets, options, on_batch)
    }
}
