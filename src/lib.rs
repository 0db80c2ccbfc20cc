//! # Geokit
//!
//! A small kit for giving host UI screens access to device location without
//! re-implementing platform boilerplate. A screen implements one capability
//! trait, forwards its visibility lifecycle to a controller, and receives
//! every delivered fix through a single extension point; connection
//! lifecycle, permission prompts and provider checks are handled for it.
//!
//! ## Features
//!
//! Geokit is modular. Enable only the pieces you need:
//!
//! - `location`: the location client lifecycle controller.
//! - `permission`: runtime permission vocabulary.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geokit = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use geokit::location::{
//!     Fix, LocationAware, LocationController, RequestCodes, UpdateRequest,
//! };
//!
//! struct MapScreen;
//!
//! impl LocationAware for MapScreen {
//!     fn on_location_retrieved(&self, fix: Fix) {
//!         println!("latitude: {} longitude: {}", fix.latitude, fix.longitude);
//!     }
//! }
//!
//! fn attach(backend: Arc<dyn geokit::location::LocationBackend>) {
//!     let controller = LocationController::new(
//!         backend,
//!         Arc::new(MapScreen),
//!         UpdateRequest::default(),
//!         RequestCodes::default(),
//!     );
//!     controller.on_visible();
//! }
//! ```

#[cfg(feature = "location")]
pub use geokit_location as location;

#[cfg(feature = "permission")]
pub use geokit_permission as permission;
