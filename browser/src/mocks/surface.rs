//! Mock map provider and surface for testing.

use crate::config::FitConfig;
use crate::error::{MapError, Result};
use crate::geo::Bounds;
use crate::listing::ListingId;
use crate::providers::{MapControl, MapProvider, MapSurface, MarkerId, PopupId, SurfaceOptions};
use crate::sync::{CameraFlight, MarkerSpec, PopupContent};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A command received by a [`MockSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    /// `add_control`
    AddControl(MapControl),
    /// `observe_viewport`
    ObserveViewport,
    /// `create_marker`, accepted or not.
    CreateMarker {
        /// Listing of the marker.
        listing_id: ListingId,
        /// Whether it rendered as selected.
        selected: bool,
        /// Rate label.
        label: String,
        /// Allocated id, `None` when rejected.
        marker: Option<MarkerId>,
    },
    /// `remove_marker`
    RemoveMarker(MarkerId),
    /// `open_popup`
    OpenPopup {
        /// Anchor marker.
        marker: MarkerId,
        /// Allocated popup.
        popup: PopupId,
        /// Popup summary.
        content: PopupContent,
    },
    /// `close_popup`
    ClosePopup(PopupId),
    /// `fit_bounds`
    FitBounds {
        /// Target region.
        bounds: Bounds,
        /// Fit options.
        options: FitConfig,
    },
    /// `fly_to`
    FlyTo(CameraFlight),
    /// `destroy`
    Destroy,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    commands: Vec<CommandRecord>,
    live: BTreeMap<MarkerId, MarkerSpec>,
    popups: BTreeMap<u64, MarkerId>,
    rejected: HashSet<ListingId>,
    refuse_controls: bool,
    next_id: u64,
    destroyed: bool,
}

#[derive(Debug, Clone)]
struct CommandRecord {
    command: SurfaceCommand,
    after_destroy: bool,
}

impl SurfaceLog {
    fn record(&mut self, command: SurfaceCommand) {
        self.commands.push(CommandRecord {
            command,
            after_destroy: self.destroyed,
        });
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mock map surface.
///
/// Records every command. Clones share the same log, so a test keeps a
/// clone to inspect it after handing the surface to the browser.
#[derive(Debug, Clone, Default)]
pub struct MockSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl MockSurface {
    /// Create a new mock surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, SurfaceLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject every marker for this listing.
    pub fn reject_listing(&self, id: impl Into<ListingId>) {
        self.log().rejected.insert(id.into());
    }

    /// Refuse every control, failing surface setup.
    pub fn refuse_controls(&self) {
        self.log().refuse_controls = true;
    }

    /// Every command received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.log().commands.iter().map(|r| r.command.clone()).collect()
    }

    /// Forget recorded commands. Live markers and popups are kept.
    pub fn clear_commands(&self) {
        self.log().commands.clear();
    }

    /// Number of commands received after `destroy`.
    #[must_use]
    pub fn commands_after_destroy(&self) -> usize {
        self.log().commands.iter().filter(|r| r.after_destroy).count()
    }

    /// Live marker ids, in allocation order.
    #[must_use]
    pub fn live_markers(&self) -> Vec<MarkerId> {
        self.log().live.keys().copied().collect()
    }

    /// Listing ids of live markers, in allocation order.
    #[must_use]
    pub fn live_listing_ids(&self) -> Vec<ListingId> {
        self.log().live.values().map(|spec| spec.listing_id.clone()).collect()
    }

    /// Whether a marker is still on the surface.
    #[must_use]
    pub fn is_live(&self, marker: MarkerId) -> bool {
        self.log().live.contains_key(&marker)
    }

    /// The live marker of a listing, with the spec it was created from.
    #[must_use]
    pub fn marker_for(&self, listing: &ListingId) -> Option<(MarkerId, MarkerSpec)> {
        self.log()
            .live
            .iter()
            .find(|(_, spec)| &spec.listing_id == listing)
            .map(|(id, spec)| (*id, spec.clone()))
    }

    /// Open popups, in allocation order.
    #[must_use]
    pub fn open_popups(&self) -> Vec<PopupId> {
        self.log().popups.keys().map(|id| PopupId(*id)).collect()
    }

    /// Every fit-bounds command, in order.
    #[must_use]
    pub fn fits(&self) -> Vec<(Bounds, FitConfig)> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                SurfaceCommand::FitBounds { bounds, options } => Some((bounds, options)),
                _ => None,
            })
            .collect()
    }

    /// Every fly-to command, in order.
    #[must_use]
    pub fn flights(&self) -> Vec<CameraFlight> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                SurfaceCommand::FlyTo(flight) => Some(flight),
                _ => None,
            })
            .collect()
    }

    /// Whether `destroy` was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.log().destroyed
    }
}

impl MapSurface for MockSurface {
    fn add_control(&mut self, control: MapControl) -> Result<()> {
        let mut log = self.log();
        log.record(SurfaceCommand::AddControl(control));
        if log.refuse_controls {
            return Err(MapError::SurfaceInit(format!("control {control:?} refused")));
        }
        Ok(())
    }

    fn observe_viewport(&mut self) -> Result<()> {
        self.log().record(SurfaceCommand::ObserveViewport);
        Ok(())
    }

    fn create_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId> {
        let mut log = self.log();
        let accepted = !log.rejected.contains(&marker.listing_id);
        let id = accepted.then(|| MarkerId(log.allocate()));
        log.record(SurfaceCommand::CreateMarker {
            listing_id: marker.listing_id.clone(),
            selected: marker.style.selected,
            label: marker.style.label.clone(),
            marker: id,
        });
        match id {
            Some(id) => {
                log.live.insert(id, marker.clone());
                Ok(id)
            },
            None => Err(MapError::MarkerRejected {
                listing: marker.listing_id.to_string(),
                reason: "rejected by mock surface".to_string(),
            }),
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        let mut log = self.log();
        log.record(SurfaceCommand::RemoveMarker(marker));
        log.live.remove(&marker);
    }

    fn open_popup(&mut self, marker: MarkerId, content: &PopupContent) -> Result<PopupId> {
        let mut log = self.log();
        if !log.live.contains_key(&marker) {
            return Err(MapError::SurfaceInit(format!("{marker} is not on the surface")));
        }
        let popup = PopupId(log.allocate());
        log.popups.insert(popup.0, marker);
        log.record(SurfaceCommand::OpenPopup {
            marker,
            popup,
            content: content.clone(),
        });
        Ok(popup)
    }

    fn close_popup(&mut self, popup: PopupId) {
        let mut log = self.log();
        log.record(SurfaceCommand::ClosePopup(popup));
        log.popups.remove(&popup.0);
    }

    fn fit_bounds(&mut self, bounds: &Bounds, options: &FitConfig) {
        self.log().record(SurfaceCommand::FitBounds {
            bounds: *bounds,
            options: *options,
        });
    }

    fn fly_to(&mut self, flight: &CameraFlight) {
        self.log().record(SurfaceCommand::FlyTo(flight.clone()));
    }

    fn destroy(&mut self) {
        let mut log = self.log();
        log.record(SurfaceCommand::Destroy);
        log.live.clear();
        log.popups.clear();
        log.destroyed = true;
    }
}

#[derive(Debug, Default)]
struct ProviderLog {
    surfaces: Vec<MockSurface>,
    options: Vec<SurfaceOptions>,
}

/// Mock map provider.
///
/// Hands out [`MockSurface`]s and keeps a handle to each.
#[derive(Debug, Clone, Default)]
pub struct MockMapProvider {
    available: bool,
    failing_loads: Arc<AtomicUsize>,
    load_attempts: Arc<AtomicUsize>,
    surface_error: Option<String>,
    refuse_controls: bool,
    log: Arc<Mutex<ProviderLog>>,
}

impl MockMapProvider {
    /// Provider whose runtime asset still has to be loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose runtime asset is already present.
    #[must_use]
    pub fn available() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    /// Fail the first `count` asset loads.
    #[must_use]
    pub fn with_failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every surface construction.
    #[must_use]
    pub fn with_surface_error(mut self, message: impl Into<String>) -> Self {
        self.surface_error = Some(message.into());
        self
    }

    /// Hand out surfaces that refuse controls.
    #[must_use]
    pub const fn with_refused_controls(mut self) -> Self {
        self.refuse_controls = true;
        self
    }

    fn log(&self) -> MutexGuard<'_, ProviderLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of asset loads attempted.
    #[must_use]
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// Probe of the most recently constructed surface.
    #[must_use]
    pub fn surface(&self) -> Option<MockSurface> {
        self.log().surfaces.last().cloned()
    }

    /// Number of surfaces constructed.
    #[must_use]
    pub fn surfaces_created(&self) -> usize {
        self.log().surfaces.len()
    }

    /// Options of every construction, in order.
    #[must_use]
    pub fn surface_options(&self) -> Vec<SurfaceOptions> {
        self.log().options.clone()
    }
}

impl MapProvider for MockMapProvider {
    type Surface = MockSurface;

    fn is_available(&self) -> bool {
        self.available
    }

    fn load(&self) -> impl Future<Output = Result<()>> + Send {
        let attempt = self.load_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        async move {
            if fail {
                Err(MapError::ProviderLoad(format!("asset unreachable (attempt {attempt})")))
            } else {
                Ok(())
            }
        }
    }

    fn create_surface(&self, options: &SurfaceOptions) -> Result<MockSurface> {
        let mut log = self.log();
        log.options.push(options.clone());
        if let Some(message) = &self.surface_error {
            return Err(MapError::SurfaceInit(message.clone()));
        }
        let surface = MockSurface::new();
        if self.refuse_controls {
            surface.refuse_controls();
        }
        log.surfaces.push(surface.clone());
        Ok(surface)
    }
}
