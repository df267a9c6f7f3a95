//! Design defaults for the listing map.

/// Initial camera latitude (geographic center of the contiguous US).
pub const INITIAL_LAT: f64 = 39.8283;

/// Initial camera longitude.
pub const INITIAL_LNG: f64 = -98.5795;

/// Initial camera zoom, continental scale.
pub const INITIAL_ZOOM: f64 = 3.5;

/// Light base style.
pub const BASE_STYLE: &str = "mapbox://styles/mapbox/light-v11";

/// Padding around the listing set when fitting the viewport, in display units.
pub const FIT_PADDING: u32 = 50;

/// Zoom ceiling when fitting the viewport to the listing set.
pub const FIT_MAX_ZOOM: f64 = 12.0;

/// Zoom used when flying to a selected listing.
pub const FOCUS_ZOOM: f64 = 14.0;

/// Duration of the fly-to animation, in milliseconds.
pub const FOCUS_DURATION_MS: u64 = 1000;

/// Accent color for selected markers and unselected marker outlines.
pub const ACCENT_COLOR: &str = "#0ea5e9";

/// Neutral fill for unselected markers.
pub const NEUTRAL_COLOR: &str = "#ffffff";

/// Label color on an accent fill.
pub const INVERTED_LABEL_COLOR: &str = "#ffffff";

/// Currency symbol used for rate labels.
pub const CURRENCY_SYMBOL: &str = "$";

/// Highest zoom level any supported provider renders.
pub const MAX_ZOOM_LEVEL: f64 = 22.0;

/// Largest accepted fit padding.
pub const MAX_FIT_PADDING: u32 = 1000;

/// Default page size requested from a remote listing source.
pub const DEFAULT_LISTING_LIMIT: usize = 100;

/// Environment variable prefix for configuration.
pub const ENV_PREFIX: &str = "SPACEMAP_";
