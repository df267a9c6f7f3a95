//! Marker layer: the only owner of the map surface and its markers.
//!
//! Effects reach the layer through a [`SharedLayer`]. Every command runs to
//! completion under the lock, so no other task ever observes old and new
//! markers together.

use crate::error::{MapError, Result};
use crate::geo::Bounds;
use crate::listing::ListingId;
use crate::providers::{MapControl, MapSurface, MarkerId, PopupId};
use crate::sync::{CameraFlight, MarkerPlan, PopupContent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Layer shared between the browser and its effects.
pub type SharedLayer<S> = Arc<Mutex<MarkerLayer<S>>>;

/// Lock a shared layer.
///
/// A panic while holding the lock leaves the layer usable: every command
/// leaves the marker list consistent with the surface before returning.
pub fn lock<S: MapSurface>(layer: &SharedLayer<S>) -> MutexGuard<'_, MarkerLayer<S>> {
    layer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A live marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    /// Surface handle.
    pub marker: MarkerId,
    /// Listing it represents.
    pub listing_id: ListingId,
    popup_content: PopupContent,
    popup: Option<PopupId>,
}

impl MarkerHandle {
    /// Whether the hover popup is open.
    #[must_use]
    pub const fn has_popup(&self) -> bool {
        self.popup.is_some()
    }
}

/// What one synchronization did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Markers removed from the previous generation.
    pub removed: usize,
    /// Markers created.
    pub created: usize,
    /// Listings whose marker the surface rejected.
    pub rejected: Vec<ListingId>,
    /// Region the viewport was fitted to, if any.
    pub fitted: Option<Bounds>,
}

/// Exclusive owner of a surface and the markers on it.
#[derive(Debug)]
pub struct MarkerLayer<S: MapSurface> {
    surface: Option<S>,
    markers: Vec<MarkerHandle>,
    generation: u64,
    torn_down: bool,
}

impl<S: MapSurface> Default for MarkerLayer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MapSurface> MarkerLayer<S> {
    /// Create an empty, detached layer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            surface: None,
            markers: Vec::new(),
            generation: 0,
            torn_down: false,
        }
    }

    /// Create an empty layer ready to share with effects.
    #[must_use]
    pub fn shared() -> SharedLayer<S> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Take ownership of a freshly constructed surface.
    ///
    /// Adds the navigation and geolocation controls and registers the
    /// viewport observer. On failure the surface is destroyed.
    ///
    /// # Errors
    ///
    /// - [`MapError::SurfaceDetached`] after [`teardown`](Self::teardown)
    /// - [`MapError::SurfaceInit`] if a surface is already attached or the
    ///   surface refuses a control
    pub fn attach(&mut self, mut surface: S) -> Result<()> {
        if self.torn_down {
            surface.destroy();
            return Err(MapError::SurfaceDetached);
        }
        if self.surface.is_some() {
            surface.destroy();
            return Err(MapError::SurfaceInit("a surface is already attached".to_string()));
        }

        let setup = surface
            .add_control(MapControl::Navigation)
            .and_then(|()| {
                surface.add_control(MapControl::Geolocate {
                    high_accuracy: true,
                    track_user: true,
                })
            })
            .and_then(|()| surface.observe_viewport());

        if let Err(error) = setup {
            surface.destroy();
            return Err(MapError::SurfaceInit(error.to_string()));
        }

        tracing::debug!("Surface attached");
        self.surface = Some(surface);
        Ok(())
    }

    /// Whether a surface is attached.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Whether the layer was torn down.
    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Latest render generation applied.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Live markers, in creation order.
    #[must_use]
    pub fn markers(&self) -> &[MarkerHandle] {
        &self.markers
    }

    /// Listing ids of the live markers, in creation order.
    #[must_use]
    pub fn marker_listing_ids(&self) -> Vec<ListingId> {
        self.markers.iter().map(|m| m.listing_id.clone()).collect()
    }

    /// Listing a marker represents.
    #[must_use]
    pub fn listing_for(&self, marker: MarkerId) -> Option<ListingId> {
        self.handle(marker).map(|handle| handle.listing_id.clone())
    }

    /// Borrow the attached surface.
    #[must_use]
    pub const fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    fn handle(&self, marker: MarkerId) -> Option<&MarkerHandle> {
        self.markers.iter().find(|handle| handle.marker == marker)
    }

    /// Replace every marker with the planned set and fit the viewport.
    ///
    /// All markers of the previous generation are removed before the first
    /// new one is created. A marker the surface rejects is logged and
    /// skipped; the rest of the set still renders. Returns `Ok(None)` when a
    /// newer generation was already applied.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::SurfaceDetached`] if no surface is attached.
    pub fn apply(&mut self, plan: &MarkerPlan) -> Result<Option<SyncReport>> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(MapError::SurfaceDetached);
        };
        if plan.generation < self.generation {
            tracing::debug!(
                plan = plan.generation,
                applied = self.generation,
                "Skipping superseded marker plan"
            );
            return Ok(None);
        }
        self.generation = plan.generation;

        let mut report = SyncReport {
            removed: clear_markers(surface, &mut self.markers),
            ..SyncReport::default()
        };

        if plan.is_empty() {
            return Ok(Some(report));
        }

        let mut bounds: Option<Bounds> = None;
        for spec in &plan.markers {
            match surface.create_marker(spec) {
                Ok(marker) => {
                    self.markers.push(MarkerHandle {
                        marker,
                        listing_id: spec.listing_id.clone(),
                        popup_content: spec.popup.clone(),
                        popup: None,
                    });
                    match bounds.as_mut() {
                        Some(bounds) => bounds.extend(spec.position),
                        None => bounds = Some(Bounds::around(spec.position)),
                    }
                    report.created += 1;
                },
                Err(error) => {
                    tracing::warn!(listing = %spec.listing_id, %error, "Marker rejected");
                    metrics::counter!(crate::metrics::MARKERS_REJECTED).increment(1);
                    report.rejected.push(spec.listing_id.clone());
                },
            }
        }

        if let Some(bounds) = bounds {
            surface.fit_bounds(&bounds, &plan.fit);
            report.fitted = Some(bounds);
        }

        metrics::counter!(crate::metrics::MARKERS_CREATED).increment(report.created as u64);
        Ok(Some(report))
    }

    /// Fly to the selected listing.
    ///
    /// Returns `Ok(false)` when the flight belongs to a generation other
    /// than the one on screen.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::SurfaceDetached`] if no surface is attached.
    pub fn focus(&mut self, flight: &CameraFlight) -> Result<bool> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(MapError::SurfaceDetached);
        };
        if flight.generation != self.generation {
            tracing::debug!(
                flight = flight.generation,
                applied = self.generation,
                "Skipping superseded focus"
            );
            return Ok(false);
        }
        surface.fly_to(flight);
        metrics::counter!(crate::metrics::FOCUS_FLIGHTS).increment(1);
        Ok(true)
    }

    /// Open the hover popup of a marker, creating it on first use.
    ///
    /// Hovering a marker that already shows its popup does nothing. Unknown
    /// markers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::SurfaceDetached`] if no surface is attached, or
    /// the surface's error if it cannot open the popup.
    pub fn show_popup(&mut self, marker: MarkerId) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(MapError::SurfaceDetached);
        };
        let Some(handle) = self.markers.iter_mut().find(|h| h.marker == marker) else {
            tracing::debug!(%marker, "Hover on unknown marker");
            return Ok(());
        };
        if handle.popup.is_none() {
            handle.popup = Some(surface.open_popup(marker, &handle.popup_content)?);
        }
        Ok(())
    }

    /// Close the hover popup of a marker, if open.
    pub fn hide_popup(&mut self, marker: MarkerId) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Some(popup) = self
            .markers
            .iter_mut()
            .find(|h| h.marker == marker)
            .and_then(|h| h.popup.take())
        {
            surface.close_popup(popup);
        }
    }

    /// Remove every marker and release the surface.
    ///
    /// Idempotent. After teardown the layer refuses to attach a new surface,
    /// and every command reports [`MapError::SurfaceDetached`].
    pub fn teardown(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            let removed = clear_markers(&mut surface, &mut self.markers);
            surface.destroy();
            tracing::debug!(removed, "Surface released");
        }
        self.markers.clear();
        self.torn_down = true;
    }
}

impl<S: MapSurface> Drop for MarkerLayer<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn clear_markers<S: MapSurface>(surface: &mut S, markers: &mut Vec<MarkerHandle>) -> usize {
    let removed = markers.len();
    for handle in markers.drain(..) {
        if let Some(popup) = handle.popup {
            surface.close_popup(popup);
        }
        surface.remove_marker(handle.marker);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::listing::Listing;
    use crate::mocks::{MockSurface, SurfaceCommand};
    use crate::sync::{plan_focus, plan_markers};

    fn listings() -> Vec<Listing> {
        vec![
            Listing::new("1", "Loft", 75.0, "New York, NY").at(40.71, -74.01),
            Listing::new("2", "Venue", 200.0, "Los Angeles, CA").at(34.05, -118.24),
        ]
    }

    fn attached() -> (MarkerLayer<MockSurface>, MockSurface) {
        let surface = MockSurface::new();
        let seen = surface.clone();
        let mut layer = MarkerLayer::new();
        assert!(layer.attach(surface).is_ok());
        (layer, seen)
    }

    #[test]
    fn test_attach_adds_controls_and_viewport_observer() {
        let (_layer, seen) = attached();
        assert_eq!(
            seen.commands(),
            vec![
                SurfaceCommand::AddControl(MapControl::Navigation),
                SurfaceCommand::AddControl(MapControl::Geolocate {
                    high_accuracy: true,
                    track_user: true,
                }),
                SurfaceCommand::ObserveViewport,
            ]
        );
    }

    #[test]
    fn test_apply_requires_surface() {
        let mut layer = MarkerLayer::<MockSurface>::new();
        let plan = plan_markers(1, &listings(), None, &MapConfig::default());
        assert_eq!(layer.apply(&plan), Err(MapError::SurfaceDetached));
    }

    #[test]
    fn test_apply_removes_old_generation_before_creating() -> Result<()> {
        let (mut layer, seen) = attached();
        let config = MapConfig::default();

        layer.apply(&plan_markers(1, &listings(), None, &config))?;
        let first: Vec<MarkerId> = layer.markers().iter().map(|h| h.marker).collect();
        seen.clear_commands();

        layer.apply(&plan_markers(2, &listings()[1..], None, &config))?;

        let commands = seen.commands();
        let first_create = commands
            .iter()
            .position(|c| matches!(c, SurfaceCommand::CreateMarker { .. }));
        let last_remove = commands
            .iter()
            .rposition(|c| matches!(c, SurfaceCommand::RemoveMarker(_)));
        assert!(last_remove < first_create);
        for marker in first {
            assert!(!seen.is_live(marker));
        }
        assert_eq!(layer.marker_listing_ids(), vec![ListingId::from("2")]);
        Ok(())
    }

    #[test]
    fn test_rejected_marker_is_skipped() -> Result<()> {
        let (mut layer, seen) = attached();
        seen.reject_listing("1");

        let report = layer.apply(&plan_markers(1, &listings(), None, &MapConfig::default()))?;

        let report = report.ok_or(MapError::SurfaceDetached)?;
        assert_eq!(report.created, 1);
        assert_eq!(report.rejected, vec![ListingId::from("1")]);
        assert_eq!(report.fitted, Some(Bounds::around(crate::geo::Coordinates::new(34.05, -118.24))));
        assert_eq!(layer.marker_listing_ids(), vec![ListingId::from("2")]);
        Ok(())
    }

    #[test]
    fn test_superseded_plan_is_ignored() -> Result<()> {
        let (mut layer, _probe) = attached();
        let config = MapConfig::default();

        layer.apply(&plan_markers(5, &listings(), None, &config))?;
        let outcome = layer.apply(&plan_markers(4, &[], None, &config))?;

        assert_eq!(outcome, None);
        assert_eq!(layer.markers().len(), 2);
        Ok(())
    }

    #[test]
    fn test_focus_only_for_current_generation() -> Result<()> {
        let (mut layer, seen) = attached();
        let config = MapConfig::default();
        let selection = ListingId::from("2");
        layer.apply(&plan_markers(2, &listings(), Some(&selection), &config))?;

        let stale = plan_focus(1, &listings(), Some(&selection), &config.focus);
        let current = plan_focus(2, &listings(), Some(&selection), &config.focus);

        assert_eq!(stale.as_ref().map(|f| layer.focus(f)), Some(Ok(false)));
        assert_eq!(current.as_ref().map(|f| layer.focus(f)), Some(Ok(true)));
        assert_eq!(seen.flights().len(), 1);
        Ok(())
    }

    #[test]
    fn test_popup_is_lazy_and_closed_on_exit() -> Result<()> {
        let (mut layer, seen) = attached();
        layer.apply(&plan_markers(1, &listings(), None, &MapConfig::default()))?;
        let marker = layer.markers()[0].marker;
        assert!(seen.open_popups().is_empty());

        layer.show_popup(marker)?;
        layer.show_popup(marker)?;
        assert_eq!(seen.open_popups().len(), 1);
        assert!(layer.markers()[0].has_popup());

        layer.hide_popup(marker);
        assert!(seen.open_popups().is_empty());
        Ok(())
    }

    #[test]
    fn test_teardown_releases_everything_once() -> Result<()> {
        let (mut layer, seen) = attached();
        layer.apply(&plan_markers(1, &listings(), None, &MapConfig::default()))?;

        layer.teardown();
        layer.teardown();

        assert!(seen.live_markers().is_empty());
        assert!(seen.is_destroyed());
        assert_eq!(
            seen
                .commands()
                .iter()
                .filter(|c| matches!(c, SurfaceCommand::Destroy))
                .count(),
            1
        );
        assert_eq!(layer.attach(MockSurface::new()), Err(MapError::SurfaceDetached));
        Ok(())
    }

    #[test]
    fn test_shared_layer_is_locked_per_command() -> Result<()> {
        let shared = MarkerLayer::<MockSurface>::shared();
        let seen = MockSurface::new();
        lock(&shared).attach(seen.clone())?;
        let plan = plan_markers(1, &listings(), None, &MapConfig::default());
        lock(&Arc::clone(&shared)).apply(&plan)?;

        let mut live = seen.live_listing_ids();
        live.sort();
        assert_eq!(live, vec![ListingId::from("1"), ListingId::from("2")]);
        Ok(())
    }

    #[test]
    fn test_drop_releases_surface() {
        let (layer, seen) = attached();
        drop(layer);
        assert!(seen.is_destroyed());
    }
}
