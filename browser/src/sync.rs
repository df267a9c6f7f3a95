//! Marker synchronization planning.
//!
//! Pure functions from (listings, selection, config) to the commands a
//! [`MarkerLayer`](crate::layer::MarkerLayer) issues. Nothing here touches a
//! surface, so every rendering rule is testable without one.
//!
//! A render cycle is one [`MarkerPlan`] followed by an optional
//! [`CameraFlight`]. Both carry the render generation they were planned for;
//! the layer drops anything older than what it has already applied.

use crate::config::{FitConfig, FocusConfig, MapConfig, MarkerPalette};
use crate::format::CurrencyFormat;
use crate::geo::{Bounds, Coordinates};
use crate::listing::{Listing, ListingId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Visual state of one marker.
///
/// A pure function of whether the marker's listing is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    /// Fill color.
    pub fill: String,
    /// Outline color.
    pub border: String,
    /// Label color.
    pub label_color: String,
    /// Short rate label, e.g. `$75`.
    pub label: String,
    /// Whether this is the selected listing.
    pub selected: bool,
}

impl MarkerStyle {
    /// Style a marker.
    #[must_use]
    pub fn new(label: String, selected: bool, palette: &MarkerPalette) -> Self {
        if selected {
            Self {
                fill: palette.accent.clone(),
                border: palette.accent.clone(),
                label_color: palette.inverted_label.clone(),
                label,
                selected,
            }
        } else {
            Self {
                fill: palette.neutral.clone(),
                border: palette.accent.clone(),
                label_color: palette.accent.clone(),
                label,
                selected,
            }
        }
    }
}

/// Hover popup summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    /// Listing title.
    pub title: String,
    /// Location label.
    pub location: String,
    /// Full-precision rate, e.g. `$75.00/hr`.
    pub rate: String,
}

/// One marker to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Listing the marker represents.
    pub listing_id: ListingId,
    /// Where to place it.
    pub position: Coordinates,
    /// How to render it.
    pub style: MarkerStyle,
    /// Popup shown while hovered.
    pub popup: PopupContent,
}

/// The full marker set for one render cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPlan {
    /// Render generation this plan belongs to.
    pub generation: u64,
    /// Markers in listing order.
    pub markers: Vec<MarkerSpec>,
    /// Listings left off the map, either unmapped or invalid.
    pub skipped: Vec<ListingId>,
    /// Viewport fit applied after the markers are created.
    pub fit: FitConfig,
}

impl MarkerPlan {
    /// Region covering every planned marker, `None` when there are none.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::covering(self.markers.iter().map(|marker| marker.position))
    }

    /// Whether the plan places no marker.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Listing ids in marker order.
    #[must_use]
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.markers.iter().map(|m| m.listing_id.clone()).collect()
    }
}

/// Camera animation to the selected listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFlight {
    /// Render generation this flight belongs to.
    pub generation: u64,
    /// Listing being focused.
    pub listing_id: ListingId,
    /// Target center.
    pub center: Coordinates,
    /// Target zoom.
    pub zoom: f64,
    /// Animation duration.
    pub duration: Duration,
}

/// Plan the marker set for a listing set and selection.
///
/// Listings without coordinates are skipped quietly, listings with invalid
/// coordinates are skipped with a warning. Order follows `listings`.
#[must_use]
pub fn plan_markers(
    generation: u64,
    listings: &[Listing],
    selection: Option<&ListingId>,
    config: &MapConfig,
) -> MarkerPlan {
    let mut markers = Vec::with_capacity(listings.len());
    let mut skipped = Vec::new();

    for listing in listings {
        let Some(coordinates) = listing.coordinates else {
            tracing::debug!(listing = %listing.id, "Listing has no coordinates");
            skipped.push(listing.id.clone());
            continue;
        };
        let position = match coordinates.validate() {
            Ok(position) => position,
            Err(error) => {
                tracing::warn!(listing = %listing.id, %error, "Skipping listing");
                skipped.push(listing.id.clone());
                continue;
            },
        };

        let selected = selection == Some(&listing.id);
        markers.push(MarkerSpec {
            listing_id: listing.id.clone(),
            position,
            style: MarkerStyle::new(
                config.currency.marker_label(listing.rate),
                selected,
                &config.palette,
            ),
            popup: popup_content(listing, &config.currency),
        });
    }

    MarkerPlan {
        generation,
        markers,
        skipped,
        fit: config.fit,
    }
}

/// Plan the focus flight for the current selection.
///
/// `None` when nothing is selected, or the selection is not a mappable
/// listing of the current set.
#[must_use]
pub fn plan_focus(
    generation: u64,
    listings: &[Listing],
    selection: Option<&ListingId>,
    focus: &FocusConfig,
) -> Option<CameraFlight> {
    let selected = selection?;
    let listing = listings.iter().find(|listing| &listing.id == selected)?;
    let center = listing.position()?;

    Some(CameraFlight {
        generation,
        listing_id: listing.id.clone(),
        center,
        zoom: focus.zoom,
        duration: focus.duration(),
    })
}

fn popup_content(listing: &Listing, currency: &CurrencyFormat) -> PopupContent {
    PopupContent {
        title: listing.title.clone(),
        location: listing.location.clone(),
        rate: currency.hourly(listing.rate),
    }
}

/// Drop listings whose id already appeared, keeping the first.
///
/// Returns the ids that were dropped.
pub fn dedupe(listings: &mut Vec<Listing>) -> Vec<ListingId> {
    let mut seen = HashSet::with_capacity(listings.len());
    let mut dropped = Vec::new();
    listings.retain(|listing| {
        if seen.insert(listing.id.clone()) {
            true
        } else {
            dropped.push(listing.id.clone());
            false
        }
    });
    dropped
}
