//! Geographic primitives: coordinates and bounding regions.

use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lng: f64,
}

impl Coordinates {
    /// Create a point without validating it.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Return the point if it is mappable.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidCoordinates`] for non-finite or out of range values.
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(MapError::InvalidCoordinates {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// An axis-aligned region on the map.
///
/// Regions built with [`Bounds::around`] and [`Bounds::extend`] never wrap
/// the antimeridian: `west <= east` holds. A viewport reported by the
/// surface may wrap; [`Bounds::unwrapped`] turns it into a region that
/// does not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Western edge (minimum longitude).
    pub west: f64,
    /// Northern edge (maximum latitude).
    pub north: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
}

impl Bounds {
    /// The degenerate region containing a single point.
    #[must_use]
    pub const fn around(point: Coordinates) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Build a region from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: Coordinates, b: Coordinates) -> Self {
        let mut bounds = Self::around(a);
        bounds.extend(b);
        bounds
    }

    /// The minimal region covering every point, or `None` for no points.
    #[must_use]
    pub fn covering<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let mut points = points.into_iter();
        let mut bounds = Self::around(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow the region to include `point`.
    pub fn extend(&mut self, point: Coordinates) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    /// Whether `point` lies inside the region, edges included.
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }

    /// Whether the region crosses the antimeridian.
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.west > self.east || self.west < -180.0 || self.east > 180.0
    }

    /// The region with `west <= east` and longitudes inside `-180..=180`.
    ///
    /// A wrapping region widens to every longitude, so nothing it covers
    /// is lost.
    #[must_use]
    pub fn unwrapped(self) -> Self {
        if self.wraps() {
            Self {
                west: -180.0,
                east: 180.0,
                ..self
            }
        } else {
            self
        }
    }

    /// Center of the region.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// South-west corner.
    #[must_use]
    pub const fn south_west(&self) -> Coordinates {
        Coordinates::new(self.south, self.west)
    }

    /// North-east corner.
    #[must_use]
    pub const fn north_east(&self) -> Coordinates {
        Coordinates::new(self.north, self.east)
    }
}
