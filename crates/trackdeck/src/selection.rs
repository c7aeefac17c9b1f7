//! Selection controller for bulk operations.
//!
//! The selection set only ever holds ids drawn from the currently visible
//! page. It is cleared on page change, on leaving selection mode, and after
//! any bulk delete completes, successfully or not.

use std::collections::HashSet;

use trackdeck_types::Track;

#[derive(Default)]
pub(crate) struct SelectionController {
    active: bool,
    selected: HashSet<String>,
}

impl SelectionController {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn count(&self) -> usize {
        self.selected.len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Enter or leave selection mode. Leaving discards the set.
    pub(crate) fn toggle_mode(&mut self) {
        self.active = !self.active;
        if !self.active {
            self.selected.clear();
        }
    }

    /// Mark or unmark a visible track. Ids not on the visible page are
    /// ignored.
    pub(crate) fn toggle(&mut self, id: &str, visible: &[Track]) {
        if !visible.iter().any(|track| track.id == id) {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Select every track on the visible page; if all are already selected,
    /// unselect them instead.
    pub(crate) fn toggle_all(&mut self, visible: &[Track]) {
        if !visible.is_empty() && visible.iter().all(|track| self.selected.contains(&track.id)) {
            self.selected.clear();
        } else {
            self.selected = visible.iter().map(|track| track.id.clone()).collect();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop ids no longer on the visible page. Called whenever a new result
    /// page is applied.
    pub(crate) fn retain_visible(&mut self, visible: &[Track]) {
        self.selected
            .retain(|id| visible.iter().any(|track| &track.id == id));
    }
}
