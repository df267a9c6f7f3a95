//! Metrics recorded by the listing browser.
//!
//! Recorded through the `metrics` facade; call [`describe_metrics`] once
//! after installing a recorder (see `spacemap_runtime::metrics::MetricsServer`).

use metrics::describe_counter;

/// Render cycles that reached the marker layer.
pub const SYNC_RUNS: &str = "map.sync.runs";
/// Markers created on a surface.
pub const MARKERS_CREATED: &str = "map.markers.created";
/// Markers a surface refused.
pub const MARKERS_REJECTED: &str = "map.markers.rejected";
/// Camera flights to a selected listing.
pub const FOCUS_FLIGHTS: &str = "map.focus.flights";
/// Listing sets dropped because a newer fetch was issued.
pub const FETCH_STALE_DISCARDED: &str = "listings.fetch.stale_discarded";
/// Listing fetches that failed.
pub const FETCH_FAILED: &str = "listings.fetch.failed";
/// Provider asset loads that failed.
pub const PROVIDER_LOAD_FAILURES: &str = "map.provider.load_failures";

/// Register descriptions for the browser metrics.
pub fn describe_metrics() {
    describe_counter!(SYNC_RUNS, "Marker synchronizations run against a surface");
    describe_counter!(MARKERS_CREATED, "Markers created on the map surface");
    describe_counter!(MARKERS_REJECTED, "Markers the map surface refused to create");
    describe_counter!(FOCUS_FLIGHTS, "Camera flights to the selected listing");
    describe_counter!(
        FETCH_STALE_DISCARDED,
        "Listing sets discarded because a newer fetch was initiated"
    );
    describe_counter!(FETCH_FAILED, "Listing fetches that failed");
    describe_counter!(PROVIDER_LOAD_FAILURES, "Map provider asset loads that failed");
}
