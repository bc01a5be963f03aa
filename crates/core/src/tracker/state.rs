//! Active-section selection state

use crate::models::HeadingNode;
use crate::observer::VisibilityChange;
use std::collections::HashMap;

/// Visibility map plus the current selection for one page view
///
/// Starts empty. Batches are merged as a whole before the selection is
/// recomputed, so a batch never produces an intermediate selection.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    /// Last known visibility per heading id
    visibility: HashMap<String, bool>,

    /// Document position per heading id (first occurrence wins)
    order: HashMap<String, usize>,

    /// Current selection
    active: Option<String>,
}

impl TrackerState {
    /// Create state for headings in document order
    pub fn new(headings: &[HeadingNode]) -> Self {
        let mut order = HashMap::with_capacity(headings.len());
        for (index, heading) in headings.iter().enumerate() {
            order.entry(heading.id.clone()).or_insert(index);
        }
        Self {
            visibility: HashMap::new(),
            order,
            active: None,
        }
    }

    /// Merge a batch and recompute the selection
    ///
    /// Returns the resolved heading when at least one heading is visible.
    /// With nothing visible the previous selection is kept and `None` is
    /// returned. Ids outside the heading set are ignored.
    pub fn apply_batch(&mut self, batch: &[VisibilityChange]) -> Option<&str> {
        for change in batch {
            if !self.order.contains_key(&change.id) {
                tracing::trace!(id = %change.id, "Ignoring visibility change for unknown heading");
                continue;
            }
            self.visibility.insert(change.id.clone(), change.is_visible);
        }

        let resolved = self.earliest_visible()?.to_string();
        self.active = Some(resolved);
        self.active.as_deref()
    }

    /// Visible heading that comes first in document order
    fn earliest_visible(&self) -> Option<&str> {
        self.visibility
            .iter()
            .filter(|(_, visible)| **visible)
            .filter_map(|(id, _)| self.order.get(id).map(|index| (*index, id.as_str())))
            .min_by_key(|(index, _)| *index)
            .map(|(_, id)| id)
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Visible heading ids in document order
    pub fn visible_ids(&self) -> Vec<&str> {
        let mut visible: Vec<(usize, &str)> = self
            .visibility
            .iter()
            .filter(|(_, visible)| **visible)
            .filter_map(|(id, _)| self.order.get(id).map(|index| (*index, id.as_str())))
            .collect();
        visible.sort_unstable();
        visible.into_iter().map(|(_, id)| id).collect()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(false)
    }
}
