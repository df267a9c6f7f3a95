//! Mock view observer for testing.

use crate::geo::Bounds;
use crate::listing::ListingId;
use crate::providers::ViewObserver;
use std::sync::{Arc, Mutex, PoisonError};

/// Records every notification.
#[derive(Debug, Clone, Default)]
pub struct MockViewObserver {
    selections: Arc<Mutex<Vec<Option<ListingId>>>>,
    viewports: Arc<Mutex<Vec<Bounds>>>,
}

impl MockViewObserver {
    /// Create a new mock observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every selection notified, in order.
    #[must_use]
    pub fn selections(&self) -> Vec<Option<ListingId>> {
        self.selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every viewport notified, in order.
    #[must_use]
    pub fn viewports(&self) -> Vec<Bounds> {
        self.viewports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ViewObserver for MockViewObserver {
    fn selection_changed(&self, selection: Option<&ListingId>) {
        self.selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(selection.cloned());
    }

    fn viewport_changed(&self, bounds: &Bounds) {
        self.viewports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*bounds);
    }
}
