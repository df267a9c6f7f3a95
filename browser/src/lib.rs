//! # Spacemap Listing Browser
//!
//! Keeps an interactive map of bookable spaces consistent with the listing
//! set a user is browsing. Built on the spacemap reducer runtime.
//!
//! ## Features
//!
//! - **Consistent**: every listing with valid coordinates has exactly one
//!   marker, nothing else does
//! - **Race-free**: only the most recently initiated fetch is ever applied
//! - **Bidirectional**: marker clicks and list rows drive one selection
//! - **Degrades gracefully**: provider and fetch failures never crash the view
//! - **Testable**: mock surfaces record every command in memory
//!
//! ## Architecture
//!
//! ```text
//! SurfaceEvent / host call → BrowserAction → BrowserReducer
//!     → (BrowserState, Effects) → MarkerLayer commands → MapSurface
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use spacemap_browser::*;
//!
//! let env = BrowserEnvironment::new(provider, RestListingSource::new(&source_config));
//! let browser = ListingBrowser::new(MapConfig::from_env()?, env);
//!
//! browser.mount(ContainerId::new("map")).await?;
//! // Vendor binding forwards native events:
//! browser.surface_event(SurfaceEvent::Loaded).await?;
//! browser.select(Some(ListingId::new("42")), SelectionOrigin::ListRow).await?;
//!
//! browser.unmount().await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod actions;
pub mod browser;
pub mod config;
pub mod constants;
pub mod effects;
pub mod environment;
pub mod error;
pub mod format;
pub mod geo;
pub mod layer;
pub mod listing;
pub mod metrics;
pub mod providers;
pub mod reducer;
pub mod state;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{BrowserAction, SelectionOrigin, SurfaceEvent};
pub use browser::{BrowserStore, ListingBrowser};
pub use config::{ConfigError, MapConfig};
pub use environment::BrowserEnvironment;
pub use error::{MapError, Result};
pub use geo::{Bounds, Coordinates};
pub use listing::{Listing, ListingFilter, ListingId};
pub use providers::{
    ContainerId, ListingSource, MapProvider, MapSurface, MarkerId, OrderedObserver,
    RestListingSource, ViewObserver,
};
pub use reducer::BrowserReducer;
pub use state::{BrowserState, SurfacePhase};
