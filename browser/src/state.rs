//! Listing browser state.

use crate::error::MapError;
use crate::geo::Bounds;
use crate::listing::{Listing, ListingFilter, ListingId};
use crate::providers::ContainerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map surface lifecycle.
///
/// ```text
/// Uninitialized ─▶ ProviderLoading ─▶ ProviderReady ─▶ SurfaceInitializing ─▶ SurfaceReady
///       │                                  ▲
///       └──────────(asset present)─────────┘            any phase ─▶ Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfacePhase {
    /// The view has not been mounted.
    #[default]
    Uninitialized,
    /// Waiting for the provider runtime asset.
    ProviderLoading,
    /// Provider runtime available, no surface yet.
    ProviderReady,
    /// Surface constructed, waiting for its own load to finish.
    SurfaceInitializing,
    /// Markers may be synchronized.
    SurfaceReady,
    /// The view was unmounted. Terminal.
    Destroyed,
}

impl SurfacePhase {
    /// Whether moving to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::ProviderLoading | Self::ProviderReady)
                | (Self::ProviderLoading, Self::ProviderReady)
                | (Self::ProviderReady, Self::SurfaceInitializing)
                | (Self::SurfaceInitializing, Self::SurfaceReady)
                | (
                    Self::Uninitialized
                        | Self::ProviderLoading
                        | Self::ProviderReady
                        | Self::SurfaceInitializing
                        | Self::SurfaceReady,
                    Self::Destroyed
                )
        )
    }

    /// Whether marker synchronization may run.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::SurfaceReady)
    }

    /// Whether the view is gone.
    #[must_use]
    pub const fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

impl std::fmt::Display for SurfacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::ProviderLoading => "provider_loading",
            Self::ProviderReady => "provider_ready",
            Self::SurfaceInitializing => "surface_initializing",
            Self::SurfaceReady => "surface_ready",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Identifies one listing fetch, in initiation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch-{}", self.0)
    }
}

/// Tracks listing fetches so that only the latest initiated one applies.
///
/// A result is accepted when its request is the most recently begun one and
/// has not completed yet. Anything else is stale, whatever order results
/// arrive in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTracker {
    issued: u64,
    latest: Option<RequestId>,
    in_flight: bool,
}

impl FetchTracker {
    /// Start a new fetch, superseding any in flight.
    pub const fn begin(&mut self) -> RequestId {
        self.issued += 1;
        let request = RequestId(self.issued);
        self.latest = Some(request);
        self.in_flight = true;
        request
    }

    /// Whether a result for `request` should be applied.
    #[must_use]
    pub fn is_current(&self, request: RequestId) -> bool {
        self.in_flight && self.latest == Some(request)
    }

    /// Record a result. Returns `false` if the result is stale.
    pub fn complete(&mut self, request: RequestId) -> bool {
        if self.is_current(request) {
            self.in_flight = false;
            true
        } else {
            false
        }
    }

    /// Ignore every outstanding fetch.
    pub const fn cancel(&mut self) {
        self.in_flight = false;
    }

    /// Whether the latest fetch is still outstanding.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Most recently begun fetch.
    #[must_use]
    pub const fn latest(&self) -> Option<RequestId> {
        self.latest
    }
}

/// Listing browser state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserState {
    /// Surface lifecycle phase.
    pub phase: SurfacePhase,
    /// Display container, known once mounted.
    pub container: Option<ContainerId>,
    /// Current listing set, in display order, ids unique.
    pub listings: Vec<Listing>,
    /// At most one selected listing.
    pub selection: Option<ListingId>,
    /// Incremented on every selection change; orders observer notices.
    pub selection_sequence: u64,
    /// Filter of the latest search.
    pub filter: ListingFilter,
    /// Listing fetch bookkeeping.
    pub fetch: FetchTracker,
    /// Last viewport reported by the surface.
    pub viewport: Option<Bounds>,
    /// Incremented for every render cycle issued.
    pub render_generation: u64,
    /// Consecutive provider asset load failures.
    pub provider_failures: usize,
    /// Most recent failure, cleared when the surface becomes ready.
    pub last_error: Option<MapError>,
    /// When the current listing set was applied.
    pub listings_updated_at: Option<DateTime<Utc>>,
}

impl BrowserState {
    /// Create a new, unmounted state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `next` if the transition is legal.
    ///
    /// Returns whether the phase changed.
    pub fn transition(&mut self, next: SurfacePhase) -> bool {
        if self.phase.can_transition_to(next) {
            tracing::debug!(from = %self.phase, to = %next, "Surface phase transition");
            self.phase = next;
            true
        } else {
            tracing::warn!(from = %self.phase, to = %next, "Ignoring illegal surface phase transition");
            false
        }
    }

    /// Whether a listing fetch is outstanding.
    #[must_use]
    pub const fn is_loading_listings(&self) -> bool {
        self.fetch.in_flight()
    }

    /// Whether the map area should show a loading indicator.
    ///
    /// True in every phase before the surface is ready, including the
    /// degraded states a provider or surface failure leaves behind.
    #[must_use]
    pub const fn shows_map_loading(&self) -> bool {
        !matches!(self.phase, SurfacePhase::SurfaceReady | SurfacePhase::Destroyed)
    }

    /// The selected listing, if it is part of the current set.
    #[must_use]
    pub fn selected_listing(&self) -> Option<&Listing> {
        let selection = self.selection.as_ref()?;
        self.listings.iter().find(|listing| &listing.id == selection)
    }

    /// Ids of the listings that should have a marker.
    #[must_use]
    pub fn mappable_ids(&self) -> Vec<ListingId> {
        self.listings
            .iter()
            .filter(|listing| listing.position().is_some())
            .map(|listing| listing.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        use SurfacePhase::*;

        assert!(Uninitialized.can_transition_to(ProviderLoading));
        assert!(Uninitialized.can_transition_to(ProviderReady));
        assert!(ProviderLoading.can_transition_to(ProviderReady));
        assert!(ProviderReady.can_transition_to(SurfaceInitializing));
        assert!(SurfaceInitializing.can_transition_to(SurfaceReady));
        assert!(SurfaceReady.can_transition_to(Destroyed));
        assert!(ProviderLoading.can_transition_to(Destroyed));

        assert!(!Uninitialized.can_transition_to(SurfaceReady));
        assert!(!SurfaceReady.can_transition_to(ProviderLoading));
        assert!(!Destroyed.can_transition_to(Uninitialized));
        assert!(!Destroyed.can_transition_to(Destroyed));
    }

    #[test]
    fn test_illegal_transition_keeps_phase() {
        let mut state = BrowserState::new();
        assert!(!state.transition(SurfacePhase::SurfaceReady));
        assert_eq!(state.phase, SurfacePhase::Uninitialized);
    }

    #[test]
    fn test_only_latest_fetch_is_current() {
        let mut fetch = FetchTracker::default();
        let a = fetch.begin();
        let b = fetch.begin();

        assert!(!fetch.is_current(a));
        assert!(fetch.complete(b));
        assert!(!fetch.complete(a));
        assert!(!fetch.in_flight());
    }

    #[test]
    fn test_completed_fetch_is_not_applied_twice() {
        let mut fetch = FetchTracker::default();
        let a = fetch.begin();
        assert!(fetch.complete(a));
        assert!(!fetch.complete(a));
    }

    #[test]
    fn test_cancel_discards_outstanding_fetch() {
        let mut fetch = FetchTracker::default();
        let a = fetch.begin();
        fetch.cancel();
        assert!(!fetch.complete(a));
        assert_eq!(fetch.latest(), Some(a));
    }

    #[test]
    fn test_map_loading_indicator() {
        let mut state = BrowserState::new();
        assert!(state.shows_map_loading());
        state.phase = SurfacePhase::SurfaceInitializing;
        assert!(state.shows_map_loading());
        state.phase = SurfacePhase::SurfaceReady;
        assert!(!state.shows_map_loading());
    }

    #[test]
    fn test_selected_listing_must_be_in_set() {
        let mut state = BrowserState::new();
        state.listings = vec![Listing::new("1", "Loft", 75.0, "New York, NY").at(40.71, -74.01)];

        state.selection = Some(ListingId::from("1"));
        assert_eq!(state.selected_listing().map(|l| l.title.as_str()), Some("Loft"));

        state.selection = Some(ListingId::from("9"));
        assert_eq!(state.selected_listing(), None);
    }
}
