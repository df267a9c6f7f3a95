//! Error types for the listing browser.

use thiserror::Error;

/// Result type for listing browser operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Listing browser errors.
///
/// None of these reach the user as a failure: the synchronizer turns each
/// one into a degraded state plus a log line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// The map provider's runtime asset could not be loaded.
    #[error("Map provider failed to load: {0}")]
    ProviderLoad(String),

    /// The provider could not construct a surface, or reported an internal
    /// error while loading one.
    #[error("Map surface failed to initialize: {0}")]
    SurfaceInit(String),

    /// A command was issued while no surface is attached.
    #[error("No map surface is attached")]
    SurfaceDetached,

    /// The surface refused to create a marker for one listing.
    #[error("Marker for listing {listing} was rejected: {reason}")]
    MarkerRejected {
        /// Listing whose marker failed.
        listing: String,
        /// Provider-supplied reason.
        reason: String,
    },

    /// Coordinates outside the valid WGS84 range or not finite.
    #[error("Invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates {
        /// Latitude as received.
        lat: f64,
        /// Longitude as received.
        lng: f64,
    },

    /// The listing source failed to deliver listings.
    #[error("Listing fetch failed: {0}")]
    ListingFetch(String),

    /// The HTTP transport of a remote listing source failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A remote payload could not be decoded.
    #[error("Failed to decode listings: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for MapError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Http(error.to_string())
        }
    }
}
