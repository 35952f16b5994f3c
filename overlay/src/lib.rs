//! Live location overlay and map-pin layer for the gas price map.
//!
//! This crate sits between the device location service and the map renderer.
//! It converts fixes into map units, decides whether the static dot or the
//! directional arrow is visible, sizes the accuracy ring, and submits animated
//! transitions between fixes. It also places image pins at geographic
//! coordinates. The renderer and the location service are reached only through
//! the [`scene::Scene`], [`geo::Projection`], [`assets::IconSource`] and
//! [`feed::LocationService`] traits; in-memory implementations of each are
//! included for tests and replay.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`location`] | Fix ingestion and the marker state machine ([`location::LocationOverlay`]) |
//! | [`pins`] | Static pin placement and lifetime ([`pins::PinManager`]) |
//! | [`circle`] | Accuracy ring template and scale |
//! | [`assets`] | Icon rasterization with scoped raster release |
//! | [`geo`] | Geographic and map-unit coordinates, Web Mercator |
//! | [`scene`] | Scene capability trait, animation batches, in-memory scene |
//! | [`feed`] | Location service boundary and fix replay |
//! | [`config`] | Overlay settings from defaults or environment |
//! | [`error`] | [`error::OverlayError`] |
//! | [`consts`] | Shared numeric constants (template radius, priorities, etc.) |

pub mod assets;
pub mod circle;
pub mod config;
pub mod consts;
pub mod error;
pub mod feed;
pub mod geo;
pub mod location;
pub mod pins;
pub mod scene;

pub use config::OverlayConfig;
pub use error::OverlayError;
pub use location::{Fix, LocationOverlay, OverlayState};
pub use pins::{Pin, PinHandle, PinManager};
