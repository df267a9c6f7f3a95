//! The listing browser: store, reducer and marker layer wired together.
//!
//! Host views talk to a [`ListingBrowser`] instead of the store: it turns
//! surface callbacks into actions, resolves clicked markers to listings and
//! releases the surface synchronously on unmount.

use crate::actions::{BrowserAction, SelectionOrigin, SurfaceEvent};
use crate::config::MapConfig;
use crate::environment::BrowserEnvironment;
use crate::layer::{self, SharedLayer};
use crate::listing::{ListingFilter, ListingId};
use crate::providers::{ContainerId, ListingSource, MapProvider};
use crate::reducer::BrowserReducer;
use crate::state::BrowserState;
use spacemap_runtime::{EffectHandle, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Store driving a listing browser.
pub type BrowserStore<P, L> =
    Store<BrowserState, BrowserAction, BrowserEnvironment<P, L>, BrowserReducer<P, L>>;

/// Map-and-listing browser for one host view.
///
/// Dropping the browser tears the surface down, same as [`unmount`](Self::unmount).
pub struct ListingBrowser<P, L>
where
    P: MapProvider + Clone + 'static,
    L: ListingSource + Clone + 'static,
{
    store: BrowserStore<P, L>,
    layer: SharedLayer<P::Surface>,
}

impl<P, L> ListingBrowser<P, L>
where
    P: MapProvider + Clone + 'static,
    L: ListingSource + Clone + 'static,
{
    /// Create a browser. Nothing is loaded until [`mount`](Self::mount).
    #[must_use]
    pub fn new(config: MapConfig, env: BrowserEnvironment<P, L>) -> Self {
        let layer = Arc::clone(&env.layer);
        let store = Store::new(BrowserState::new(), BrowserReducer::with_config(config), env);
        Self { store, layer }
    }

    /// Mount into a display container.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn mount(&self, container: ContainerId) -> Result<EffectHandle, StoreError> {
        self.store.send(BrowserAction::Mount { container }).await
    }

    /// Deliver a callback from the map surface.
    ///
    /// A click on a marker that is no longer live is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn surface_event(&self, event: SurfaceEvent) -> Result<EffectHandle, StoreError> {
        let action = match event {
            SurfaceEvent::Loaded => BrowserAction::SurfaceLoaded,
            SurfaceEvent::Error { message } => BrowserAction::SurfaceFailed { reason: message },
            SurfaceEvent::ViewportChanged { bounds } => BrowserAction::ViewportChanged { bounds },
            SurfaceEvent::MarkerHoverEnter { marker } => BrowserAction::MarkerHovered { marker },
            SurfaceEvent::MarkerHoverExit { marker } => BrowserAction::MarkerUnhovered { marker },
            SurfaceEvent::MarkerClicked { marker } => {
                let listing = layer::lock(&self.layer).listing_for(marker);
                let Some(listing) = listing else {
                    tracing::debug!(%marker, "Click on a marker that is no longer live");
                    return Ok(EffectHandle::completed());
                };
                BrowserAction::SelectListing {
                    id: Some(listing),
                    origin: SelectionOrigin::MarkerClick,
                }
            },
        };
        self.store.send(action).await
    }

    /// Fetch listings for a new filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn search(&self, filter: ListingFilter) -> Result<EffectHandle, StoreError> {
        self.store.send(BrowserAction::Search { filter }).await
    }

    /// Re-run the current search within the visible region.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn search_this_area(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(BrowserAction::SearchThisArea).await
    }

    /// Select a listing, or clear the selection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn select(
        &self,
        id: Option<ListingId>,
        origin: SelectionOrigin,
    ) -> Result<EffectHandle, StoreError> {
        self.store.send(BrowserAction::SelectListing { id, origin }).await
    }

    /// Read the browser state.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&BrowserState) -> T,
    {
        self.store.state(f).await
    }

    /// Listings that currently have a marker, in creation order.
    #[must_use]
    pub fn live_markers(&self) -> Vec<ListingId> {
        layer::lock(&self.layer).marker_listing_ids()
    }

    /// Wait until every effect finished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsettled`] if effects are still running at the
    /// timeout, e.g. a fetch that never answers.
    pub async fn settle(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.settle(timeout).await
    }

    /// Release the surface and every marker, then stop reacting.
    ///
    /// The surface is destroyed before this returns. Fetches still in flight
    /// complete into a destroyed browser and are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn unmount(&self) -> Result<EffectHandle, StoreError> {
        layer::lock(&self.layer).teardown();
        self.store.send(BrowserAction::Unmount).await
    }

    /// Actions produced by effects, for observers such as the list view.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<BrowserAction> {
        self.store.subscribe_actions()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &BrowserStore<P, L> {
        &self.store
    }
}

impl<P, L> Drop for ListingBrowser<P, L>
where
    P: MapProvider + Clone + 'static,
    L: ListingSource + Clone + 'static,
{
    fn drop(&mut self) {
        layer::lock(&self.layer).teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Listing;
    use crate::mocks::{MockListingSource, MockMapProvider};
    use crate::providers::MarkerId;

    const SETTLE: Duration = Duration::from_secs(2);

    fn browser(provider: MockMapProvider) -> ListingBrowser<MockMapProvider, MockListingSource> {
        let source = MockListingSource::new(vec![
            Listing::new("1", "Loft", 75.0, "New York, NY").at(40.71, -74.01),
        ]);
        ListingBrowser::new(MapConfig::default(), BrowserEnvironment::new(provider, source))
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn test_click_on_unknown_marker_is_dropped() {
        let browser = browser(MockMapProvider::available());
        browser.mount(ContainerId::new("map")).await.unwrap();
        browser.settle(SETTLE).await.unwrap();
        browser.surface_event(SurfaceEvent::Loaded).await.unwrap();
        browser.settle(SETTLE).await.unwrap();

        browser
            .surface_event(SurfaceEvent::MarkerClicked { marker: MarkerId(999) })
            .await
            .unwrap();
        browser.settle(SETTLE).await.unwrap();

        assert_eq!(browser.state(|s| s.selection.clone()).await, None);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn test_drop_destroys_surface() {
        let provider = MockMapProvider::available();
        {
            let browser = browser(provider.clone());
            browser.mount(ContainerId::new("map")).await.unwrap();
            browser.settle(SETTLE).await.unwrap();
            browser.surface_event(SurfaceEvent::Loaded).await.unwrap();
            browser.settle(SETTLE).await.unwrap();
            assert_eq!(browser.live_markers().len(), 1);
        }
        let surface = provider.surface().unwrap();
        assert!(surface.is_destroyed());
        assert!(surface.live_markers().is_empty());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn test_unmount_before_mount_is_harmless() {
        let browser = browser(MockMapProvider::available());
        browser.unmount().await.unwrap();
        browser.settle(SETTLE).await.unwrap();
        assert!(browser.state(|s| s.phase.is_destroyed()).await);
        assert!(browser.live_markers().is_empty());
    }
}
