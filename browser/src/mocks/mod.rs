//! Mock collaborator implementations for testing.
//!
//! In-memory implementations of every provider trait, for unit and
//! integration tests and the demo binary.

pub mod listing_source;
pub mod observer;
pub mod surface;

pub use listing_source::MockListingSource;
pub use observer::MockViewObserver;
pub use surface::{MockMapProvider, MockSurface, SurfaceCommand};
