//! Collaborator traits for the listing browser.
//!
//! The browser never talks to a mapping vendor or a data store directly.
//! Everything outside the process sits behind one of these traits and is
//! injected through [`BrowserEnvironment`](crate::environment::BrowserEnvironment).
//!
//! ```text
//!   ListingSource ──listings──▶ BrowserReducer ──commands──▶ MapSurface
//!                                     ▲   │                      │
//!                                     │   └──selection──▶ ViewObserver
//!                                     └──────SurfaceEvent────────┘
//! ```
//!
//! - **Testing**: [`mocks`](crate::mocks) record every command in memory
//! - **Production**: a vendor binding implements [`MapProvider`] and
//!   [`MapSurface`]; [`RestListingSource`] reads listings over HTTP

use crate::config::FitConfig;
use crate::error::Result;
use crate::geo::{Bounds, Coordinates};
use crate::listing::{Listing, ListingFilter, ListingId};
use crate::sync::{CameraFlight, MarkerSpec, PopupContent};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

pub mod rest;

pub use rest::RestListingSource;

/// Identifies the display container a surface renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wrap a container identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a marker, allocated by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

/// Handle to an open popup, allocated by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopupId(pub u64);

/// Standard controls attached to every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapControl {
    /// Zoom and pan buttons.
    Navigation,
    /// Locate the user on the map.
    Geolocate {
        /// Request a high accuracy position.
        high_accuracy: bool,
        /// Keep following the user as they move.
        track_user: bool,
    },
}

/// Everything a provider needs to construct a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOptions {
    /// Where the surface renders.
    pub container: ContainerId,
    /// Initial center.
    pub center: Coordinates,
    /// Initial zoom.
    pub zoom: f64,
    /// Base style identifier.
    pub style: String,
    /// Provider access token, if the provider needs one.
    pub access_token: Option<String>,
}

/// Map surface provider.
///
/// Owns the provider runtime: loading its asset and constructing surfaces.
pub trait MapProvider: Send + Sync {
    /// Surface type constructed by this provider.
    type Surface: MapSurface + 'static;

    /// Whether the runtime asset is already present in the host.
    ///
    /// When it is, the browser skips the asset load entirely.
    fn is_available(&self) -> bool;

    /// Load the runtime asset.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::ProviderLoad`](crate::error::MapError::ProviderLoad)
    /// if the asset cannot be fetched or evaluated.
    fn load(&self) -> impl Future<Output = Result<()>> + Send;

    /// Construct a surface inside a container.
    ///
    /// The surface reports [`SurfaceEvent::Loaded`](crate::actions::SurfaceEvent::Loaded)
    /// once it has finished its own internal load.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::SurfaceInit`](crate::error::MapError::SurfaceInit)
    /// if construction fails.
    fn create_surface(&self, options: &SurfaceOptions) -> Result<Self::Surface>;
}

/// An interactive map canvas.
///
/// Commands are imperative and synchronous. Only the
/// [`MarkerLayer`](crate::layer::MarkerLayer) issues them.
pub trait MapSurface: Send {
    /// Attach a control.
    ///
    /// # Errors
    ///
    /// Returns error if the surface refuses the control.
    fn add_control(&mut self, control: MapControl) -> Result<()>;

    /// Start reporting viewport changes as
    /// [`SurfaceEvent::ViewportChanged`](crate::actions::SurfaceEvent::ViewportChanged).
    ///
    /// # Errors
    ///
    /// Returns error if the observer cannot be registered.
    fn observe_viewport(&mut self) -> Result<()>;

    /// Place a marker.
    ///
    /// The surface reports hover and click on the marker through
    /// [`SurfaceEvent`](crate::actions::SurfaceEvent). A click on a marker
    /// never counts as a click on the empty map.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MarkerRejected`](crate::error::MapError::MarkerRejected)
    /// if the marker cannot be rendered.
    fn create_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId>;

    /// Remove a marker and its listeners. Unknown ids are ignored.
    fn remove_marker(&mut self, marker: MarkerId);

    /// Open a popup anchored to a marker.
    ///
    /// # Errors
    ///
    /// Returns error if the marker is unknown to the surface.
    fn open_popup(&mut self, marker: MarkerId, content: &PopupContent) -> Result<PopupId>;

    /// Close a popup. Unknown ids are ignored.
    fn close_popup(&mut self, popup: PopupId);

    /// Fit the viewport to a region.
    fn fit_bounds(&mut self, bounds: &Bounds, options: &FitConfig);

    /// Animate the camera.
    fn fly_to(&mut self, flight: &CameraFlight);

    /// Release the surface. No command is issued afterwards.
    fn destroy(&mut self);
}

/// Supplies listing sets.
pub trait ListingSource: Send + Sync {
    /// Fetch the listings matching a filter, in display order.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::ListingFetch`](crate::error::MapError::ListingFetch)
    /// or a transport error if the source is unreachable.
    fn fetch(&self, filter: &ListingFilter) -> impl Future<Output = Result<Vec<Listing>>> + Send;
}

/// Receives selection and viewport notifications, e.g. a list view.
pub trait ViewObserver: Send + Sync {
    /// The selection changed, whatever the origin.
    fn selection_changed(&self, selection: Option<&ListingId>);

    /// The visible region changed.
    fn viewport_changed(&self, bounds: &Bounds) {
        let _ = bounds;
    }
}

/// Observer that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl ViewObserver for LoggingObserver {
    fn selection_changed(&self, selection: Option<&ListingId>) {
        match selection {
            Some(id) => tracing::info!(listing = %id, "Selection changed"),
            None => tracing::info!("Selection cleared"),
        }
    }

    fn viewport_changed(&self, bounds: &Bounds) {
        tracing::debug!(
            south = bounds.south,
            west = bounds.west,
            north = bounds.north,
            east = bounds.east,
            "Viewport changed"
        );
    }
}

/// Delivers notifications to a [`ViewObserver`] in the order they were issued.
///
/// Each selection carries a sequence number from the reducer. Effects run
/// concurrently, so a notification may arrive after a later one: it is
/// dropped instead of overwriting the newer selection.
pub struct OrderedObserver {
    observer: Arc<dyn ViewObserver>,
    delivered: Mutex<u64>,
}

impl OrderedObserver {
    /// Wrap an observer.
    #[must_use]
    pub fn new(observer: Arc<dyn ViewObserver>) -> Self {
        Self {
            observer,
            delivered: Mutex::new(0),
        }
    }

    /// Deliver selection number `sequence`.
    ///
    /// Returns `false` when a later selection was already delivered.
    pub fn selection_changed(&self, sequence: u64, selection: Option<&ListingId>) -> bool {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if sequence <= *delivered {
            return false;
        }
        *delivered = sequence;
        self.observer.selection_changed(selection);
        true
    }

    /// Forward a viewport change.
    pub fn viewport_changed(&self, bounds: &Bounds) {
        self.observer.viewport_changed(bounds);
    }
}

impl std::fmt::Debug for OrderedObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedObserver")
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockViewObserver;

    #[test]
    fn test_ordered_observer_drops_superseded_selections() {
        let recorded = Arc::new(MockViewObserver::new());
        let observer = OrderedObserver::new(Arc::clone(&recorded) as Arc<dyn ViewObserver>);
        let first = ListingId::new("1");
        let second = ListingId::new("2");

        assert!(observer.selection_changed(2, Some(&second)));
        assert!(!observer.selection_changed(1, Some(&first)));
        assert!(!observer.selection_changed(2, Some(&second)));
        assert!(observer.selection_changed(3, None));

        assert_eq!(recorded.selections(), vec![Some(second), None]);
    }
}
