//! Listing browser actions.
//!
//! Actions are the only way in. They come from three places:
//! - **The host view**: mount, search, row clicks, unmount
//! - **The map surface**: loaded, failed, viewport, marker hover and click
//!   (see [`SurfaceEvent`])
//! - **Effects**: results of provider loads and listing fetches

use crate::geo::Bounds;
use crate::listing::{Listing, ListingFilter, ListingId};
use crate::providers::{ContainerId, MarkerId};
use crate::state::RequestId;
use serde::{Deserialize, Serialize};

/// Where a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionOrigin {
    /// Click on a map marker.
    MarkerClick,
    /// Click on a list row.
    ListRow,
    /// Deep link or other code path.
    Programmatic,
}

/// Listing browser action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrowserAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Surface lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// The view was mounted with a display container.
    ///
    /// Loads the provider runtime (or skips straight to surface construction
    /// when it is already present) and fetches the initial listing set.
    Mount {
        /// Container the surface renders into.
        container: ContainerId,
    },

    /// The provider runtime asset loaded.
    ProviderLoaded,

    /// The provider runtime asset failed to load.
    ProviderLoadFailed {
        /// Diagnostic.
        reason: String,
    },

    /// Scheduled retry of the provider asset load.
    RetryProviderLoad,

    /// The surface finished its own internal load.
    SurfaceLoaded,

    /// The surface could not be constructed or reported an internal error.
    SurfaceFailed {
        /// Diagnostic.
        reason: String,
    },

    /// The view is going away. Releases the surface and every marker.
    Unmount,

    // ═══════════════════════════════════════════════════════════════════════
    // Listings
    // ═══════════════════════════════════════════════════════════════════════
    /// Fetch listings for a new filter, superseding any fetch in flight.
    Search {
        /// Search criteria.
        filter: ListingFilter,
    },

    /// Re-run the current search restricted to the visible region.
    SearchThisArea,

    /// A fetch delivered its listing set.
    ListingsLoaded {
        /// Fetch that produced the set.
        request: RequestId,
        /// Listings in display order.
        listings: Vec<Listing>,
    },

    /// A fetch failed.
    ListingsFailed {
        /// Fetch that failed.
        request: RequestId,
        /// Diagnostic.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Interaction
    // ═══════════════════════════════════════════════════════════════════════
    /// Select a listing, or clear the selection with `None`.
    SelectListing {
        /// Listing to select.
        id: Option<ListingId>,
        /// Input channel.
        origin: SelectionOrigin,
    },

    /// Pointer entered a marker.
    MarkerHovered {
        /// Hovered marker.
        marker: MarkerId,
    },

    /// Pointer left a marker.
    MarkerUnhovered {
        /// Marker left.
        marker: MarkerId,
    },

    /// The surface reported a new visible region.
    ViewportChanged {
        /// Visible region.
        bounds: Bounds,
    },
}

/// Callback from a map surface to the browser.
///
/// Vendor bindings translate their native events into these and hand them to
/// [`ListingBrowser::surface_event`](crate::browser::ListingBrowser::surface_event).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// Internal load finished.
    Loaded,
    /// Internal error.
    Error {
        /// Provider diagnostic.
        message: String,
    },
    /// The camera stopped moving.
    ViewportChanged {
        /// Visible region.
        bounds: Bounds,
    },
    /// A marker was clicked. Never also delivered as a map click.
    MarkerClicked {
        /// Clicked marker.
        marker: MarkerId,
    },
    /// Pointer entered a marker.
    MarkerHoverEnter {
        /// Hovered marker.
        marker: MarkerId,
    },
    /// Pointer left a marker.
    MarkerHoverExit {
        /// Marker left.
        marker: MarkerId,
    },
}
