//! Listing browser environment.
//!
//! Injected collaborators for [`BrowserReducer`](crate::reducer::BrowserReducer).

use crate::layer::{MarkerLayer, SharedLayer};
use crate::providers::{ListingSource, LoggingObserver, MapProvider, OrderedObserver, ViewObserver};
use spacemap_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Listing browser environment.
///
/// # Type Parameters
///
/// - `P`: Map surface provider
/// - `L`: Listing source
pub struct BrowserEnvironment<P, L>
where
    P: MapProvider,
    L: ListingSource,
{
    /// Map surface provider.
    pub provider: P,

    /// Listing source.
    pub listings: L,

    /// Marker layer owning the surface once constructed.
    pub layer: SharedLayer<P::Surface>,

    /// Selection and viewport observer (e.g. the list view).
    pub observer: Arc<OrderedObserver>,

    /// Clock used to stamp listing sets.
    pub clock: Arc<dyn Clock>,
}

impl<P, L> BrowserEnvironment<P, L>
where
    P: MapProvider,
    L: ListingSource,
{
    /// Create an environment with a logging observer and the system clock.
    #[must_use]
    pub fn new(provider: P, listings: L) -> Self {
        Self {
            provider,
            listings,
            layer: MarkerLayer::shared(),
            observer: Arc::new(OrderedObserver::new(Arc::new(LoggingObserver))),
            clock: Arc::new(SystemClock),
        }
    }

    /// Notify this observer instead.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ViewObserver>) -> Self {
        self.observer = Arc::new(OrderedObserver::new(observer));
        self
    }

    /// Use this clock instead.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

// Manual impl: the layer is shared, and derive would demand `P::Surface: Clone`
impl<P, L> Clone for BrowserEnvironment<P, L>
where
    P: MapProvider + Clone,
    L: ListingSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            listings: self.listings.clone(),
            layer: Arc::clone(&self.layer),
            observer: Arc::clone(&self.observer),
            clock: Arc::clone(&self.clock),
        }
    }
}
