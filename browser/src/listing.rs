//! Listings as delivered by a listing source, and the filter used to query them.

use crate::geo::{Bounds, Coordinates};
use serde::{Deserialize, Serialize};

/// Opaque, stable listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Wrap an identifier.
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

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ListingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A bookable space. Read-only to the synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique within one listing set.
    pub id: ListingId,
    /// Display title.
    pub title: String,
    /// Price per hour in whole currency units (fractions allowed).
    pub rate: f64,
    /// Human readable location, e.g. "Brooklyn, NY".
    pub location: String,
    /// Absent when the listing is not mappable.
    pub coordinates: Option<Coordinates>,
}

impl Listing {
    /// Create an unmapped listing.
    #[must_use]
    pub fn new(
        id: impl Into<ListingId>,
        title: impl Into<String>,
        rate: f64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rate,
            location: location.into(),
            coordinates: None,
        }
    }

    /// Place the listing on the map.
    #[must_use]
    pub const fn at(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates::new(lat, lng));
        self
    }

    /// Coordinates, if present and valid.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        self.coordinates.filter(Coordinates::is_valid)
    }
}

/// Search criteria for a listing source.
///
/// Every criterion is optional; the default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Case-insensitive substring of the location label.
    pub location: Option<String>,
    /// Inclusive lower bound on the hourly rate.
    pub min_rate: Option<f64>,
    /// Inclusive upper bound on the hourly rate.
    pub max_rate: Option<f64>,
    /// Only listings whose coordinates fall inside this region.
    pub within: Option<Bounds>,
    /// Maximum number of listings returned.
    pub limit: Option<usize>,
}

impl ListingFilter {
    /// Restrict to a location label.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = if location.trim().is_empty() {
            None
        } else {
            Some(location)
        };
        self
    }

    /// Restrict to a rate range; either end may be open.
    #[must_use]
    pub const fn with_rate_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_rate = min;
        self.max_rate = max;
        self
    }

    /// Restrict to a region.
    #[must_use]
    pub const fn within(mut self, bounds: Bounds) -> Self {
        self.within = Some(bounds);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a listing satisfies every criterion (the limit aside).
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(location) = &self.location {
            let needle = location.trim().to_lowercase();
            if !listing.location.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.min_rate.is_some_and(|min| listing.rate < min) {
            return false;
        }
        if self.max_rate.is_some_and(|max| listing.rate > max) {
            return false;
        }
        if let Some(bounds) = &self.within {
            return listing.position().is_some_and(|point| bounds.contains(point));
        }
        true
    }

    /// Filter listings in order, then apply the limit.
    #[must_use]
    pub fn apply<I>(&self, listings: I) -> Vec<Listing>
    where
        I: IntoIterator<Item = Listing>,
    {
        let matching = listings.into_iter().filter(|listing| self.matches(listing));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
