//! Property tests for marker synchronization.
//!
//! Drives the marker layer directly with arbitrary listing sets and
//! selections, the way the browser does on every render cycle.

use proptest::prelude::*;
use spacemap_browser::config::MapConfig;
use spacemap_browser::layer::MarkerLayer;
use spacemap_browser::mocks::{MockSurface, SurfaceCommand};
use spacemap_browser::sync::{plan_focus, plan_markers};
use spacemap_browser::{Listing, ListingId};

fn listing() -> impl Strategy<Value = Listing> {
    let coordinates = prop_oneof![
        3 => (-90.0..=90.0f64, -180.0..=180.0f64).prop_map(Some),
        1 => Just(None),
        1 => (90.1..200.0f64, -180.0..=180.0f64).prop_map(Some),
    ];
    (0u8..12, 1.0..500.0f64, coordinates).prop_map(|(id, rate, coordinates)| {
        let listing = Listing::new(id.to_string(), format!("Space {id}"), rate, "Somewhere");
        match coordinates {
            Some((lat, lng)) => listing.at(lat, lng),
            None => listing,
        }
    })
}

/// Unique ids, as the browser guarantees after deduplication.
fn listing_set() -> impl Strategy<Value = Vec<Listing>> {
    prop::collection::vec(listing(), 0..10).prop_map(|mut listings| {
        spacemap_browser::sync::dedupe(&mut listings);
        listings
    })
}

fn selection() -> impl Strategy<Value = Option<ListingId>> {
    prop::option::of((0u8..14).prop_map(|id| ListingId::new(id.to_string())))
}

fn mappable(listings: &[Listing]) -> Vec<ListingId> {
    let mut ids: Vec<_> = listings
        .iter()
        .filter(|l| l.coordinates.is_some_and(|c| c.is_valid()))
        .map(|l| l.id.clone())
        .collect();
    ids.sort();
    ids
}

proptest! {
    #[test]
    fn markers_always_match_the_latest_set(
        cycles in prop::collection::vec((listing_set(), selection()), 1..6)
    ) {
        let config = MapConfig::default();
        let surface = MockSurface::new();
        let mut layer = MarkerLayer::new();
        prop_assert!(layer.attach(surface.clone()).is_ok());

        for (generation, (listings, selection)) in (1u64..).zip(cycles) {
            let plan = plan_markers(generation, &listings, selection.as_ref(), &config);
            let flight = plan_focus(generation, &listings, selection.as_ref(), &config.focus);
            prop_assert!(layer.apply(&plan).is_ok());
            if let Some(flight) = &flight {
                prop_assert_eq!(layer.focus(flight).ok(), Some(true));
            }

            // Exactly the mappable listings, one marker each.
            let mut live = surface.live_listing_ids();
            live.sort();
            prop_assert_eq!(&live, &mappable(&listings));

            // At most one selected marker, and only for the selection.
            let selected: Vec<_> = live
                .iter()
                .filter(|id| surface.marker_for(id).is_some_and(|(_, spec)| spec.style.selected))
                .cloned()
                .collect();
            match &selection {
                Some(id) if live.contains(id) => prop_assert_eq!(selected, vec![id.clone()]),
                _ => prop_assert!(selected.is_empty()),
            }

            // The camera flies only to a selected, mapped listing.
            prop_assert_eq!(
                flight.map(|f| f.listing_id),
                selection.filter(|id| live.contains(id))
            );
        }
    }

    #[test]
    fn superseded_plans_never_touch_the_surface(
        current in listing_set(),
        stale in listing_set(),
    ) {
        let config = MapConfig::default();
        let surface = MockSurface::new();
        let mut layer = MarkerLayer::new();
        prop_assert!(layer.attach(surface.clone()).is_ok());

        prop_assert!(layer.apply(&plan_markers(2, &current, None, &config)).is_ok());
        surface.clear_commands();

        prop_assert_eq!(layer.apply(&plan_markers(1, &stale, None, &config)).ok(), Some(None));
        if let Some(target) = stale.first() {
            let flight = plan_focus(1, &stale, Some(&target.id), &config.focus);
            if let Some(flight) = flight {
                prop_assert_eq!(layer.focus(&flight).ok(), Some(false));
            }
        }

        prop_assert!(surface.commands().is_empty());
        let mut live = surface.live_listing_ids();
        live.sort();
        prop_assert_eq!(live, mappable(&current));
    }
}

#[test]
fn empty_set_clears_markers_without_fitting() {
    let config = MapConfig::default();
    let surface = MockSurface::new();
    let mut layer = MarkerLayer::new();
    assert!(layer.attach(surface.clone()).is_ok());

    let listings = vec![Listing::new("1", "Loft", 75.0, "New York, NY").at(40.71, -74.01)];
    assert!(layer.apply(&plan_markers(1, &listings, None, &config)).is_ok());
    surface.clear_commands();

    assert!(layer.apply(&plan_markers(2, &[], None, &config)).is_ok());

    assert!(surface.live_markers().is_empty());
    assert!(
        !surface
            .commands()
            .iter()
            .any(|c| matches!(c, SurfaceCommand::FitBounds { .. } | SurfaceCommand::FlyTo(_)))
    );
}
