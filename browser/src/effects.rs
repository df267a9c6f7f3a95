//! Effect constructors for the browser reducer.
//!
//! Each function describes one side effect. Nothing runs until the store
//! executes the returned [`Effect`]. Surface commands lock the shared layer
//! for the duration of a single synchronous call and never across an await.

use crate::actions::BrowserAction;
use crate::geo::Bounds;
use crate::layer::{self, SharedLayer};
use crate::listing::{ListingFilter, ListingId};
use crate::providers::{
    ListingSource, MapProvider, MapSurface, MarkerId, OrderedObserver, SurfaceOptions,
};
use crate::state::RequestId;
use crate::sync::{CameraFlight, MarkerPlan};
use spacemap_core::async_effect;
use spacemap_core::effect::Effect;
use std::sync::Arc;

/// Load the provider runtime asset.
pub fn load_provider<P>(provider: P) -> Effect<BrowserAction>
where
    P: MapProvider + 'static,
{
    async_effect! {
        match provider.load().await {
            Ok(()) => Some(BrowserAction::ProviderLoaded),
            Err(error) => Some(BrowserAction::ProviderLoadFailed {
                reason: error.to_string(),
            }),
        }
    }
}

/// Construct a surface and hand it to the layer.
///
/// Success produces no action: the surface itself reports when it has
/// loaded.
pub fn initialize_surface<P>(
    provider: P,
    layer: SharedLayer<P::Surface>,
    options: SurfaceOptions,
) -> Effect<BrowserAction>
where
    P: MapProvider + 'static,
{
    async_effect! {
        let attached = provider
            .create_surface(&options)
            .and_then(|surface| layer::lock(&layer).attach(surface));
        match attached {
            Ok(()) => {
                tracing::debug!(container = %options.container, "Surface constructed");
                None
            },
            Err(error) => Some(BrowserAction::SurfaceFailed {
                reason: error.to_string(),
            }),
        }
    }
}

/// Fetch listings for a filter, tagged with the request that started it.
pub fn fetch_listings<L>(source: L, request: RequestId, filter: ListingFilter) -> Effect<BrowserAction>
where
    L: ListingSource + 'static,
{
    async_effect! {
        match source.fetch(&filter).await {
            Ok(listings) => Some(BrowserAction::ListingsLoaded { request, listings }),
            Err(error) => Some(BrowserAction::ListingsFailed {
                request,
                reason: error.to_string(),
            }),
        }
    }
}

/// One render cycle: synchronize markers, then focus the selection.
///
/// The focus flight only starts once every marker command was issued.
pub fn render<S>(
    layer: SharedLayer<S>,
    plan: MarkerPlan,
    flight: Option<CameraFlight>,
) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    let mut steps = vec![apply_markers(Arc::clone(&layer), plan)];
    if let Some(flight) = flight {
        steps.push(focus(layer, flight));
    }
    Effect::chain(steps)
}

fn apply_markers<S>(layer: SharedLayer<S>, plan: MarkerPlan) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    async_effect! {
        metrics::counter!(crate::metrics::SYNC_RUNS).increment(1);
        match layer::lock(&layer).apply(&plan) {
            Ok(Some(report)) => tracing::info!(
                generation = plan.generation,
                removed = report.removed,
                created = report.created,
                rejected = report.rejected.len(),
                skipped = plan.skipped.len(),
                "Markers synchronized"
            ),
            Ok(None) => {},
            Err(error) => tracing::debug!(%error, "Marker synchronization skipped"),
        }
        None
    }
}

fn focus<S>(layer: SharedLayer<S>, flight: CameraFlight) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    async_effect! {
        match layer::lock(&layer).focus(&flight) {
            Ok(true) => tracing::debug!(listing = %flight.listing_id, "Focused selection"),
            Ok(false) => {},
            Err(error) => tracing::debug!(%error, "Focus skipped"),
        }
        None
    }
}

/// Open the hover popup of a marker.
pub fn show_popup<S>(layer: SharedLayer<S>, marker: MarkerId) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    async_effect! {
        if let Err(error) = layer::lock(&layer).show_popup(marker) {
            tracing::debug!(%marker, %error, "Popup not shown");
        }
        None
    }
}

/// Close the hover popup of a marker.
pub fn hide_popup<S>(layer: SharedLayer<S>, marker: MarkerId) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    async_effect! {
        layer::lock(&layer).hide_popup(marker);
        None
    }
}

/// Release the surface and every marker.
pub fn teardown<S>(layer: SharedLayer<S>) -> Effect<BrowserAction>
where
    S: MapSurface + 'static,
{
    async_effect! {
        layer::lock(&layer).teardown();
        None
    }
}

/// Tell the observer about selection number `sequence`.
pub fn notify_selection(
    observer: Arc<OrderedObserver>,
    sequence: u64,
    selection: Option<ListingId>,
) -> Effect<BrowserAction> {
    async_effect! {
        if !observer.selection_changed(sequence, selection.as_ref()) {
            tracing::trace!(sequence, "Superseded selection notice dropped");
        }
        None
    }
}

/// Tell the observer about a new viewport.
pub fn notify_viewport(observer: Arc<OrderedObserver>, bounds: Bounds) -> Effect<BrowserAction> {
    async_effect! {
        observer.viewport_changed(&bounds);
        None
    }
}
