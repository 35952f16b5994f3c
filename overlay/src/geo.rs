//! Geographic and map-unit coordinates, and conversions between them.
//!
//! Map projection belongs to the rendering engine. The core only validates its
//! inputs and calls through a [`Projection`]; [`WebMercator`] is the reference
//! projection used by the in-memory scene.

#[cfg(test)]
#[path = "geo_test.rs"]
mod geo_test;

use std::f64::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::consts::{EARTH_CIRCUMFERENCE_M, MAP_WORLD_SIZE, MERCATOR_MAX_LAT};
use crate::error::OverlayError;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A point in the rendering engine's planar map-unit space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Engine-provided conversion from geographic space into map units.
pub trait Projection {
    /// Project a geographic coordinate into map units.
    fn to_map_units(&self, point: GeoPoint) -> MapPoint;

    /// Convert a ground distance into map units for the given display scale.
    fn meters_to_map_units(&self, meters: f64, screen_scale: f64) -> f64;
}

impl<P: Projection + ?Sized> Projection for &P {
    fn to_map_units(&self, point: GeoPoint) -> MapPoint {
        (**self).to_map_units(point)
    }

    fn meters_to_map_units(&self, meters: f64, screen_scale: f64) -> f64 {
        (**self).meters_to_map_units(meters, screen_scale)
    }
}

impl<P: Projection + ?Sized> Projection for Rc<P> {
    fn to_map_units(&self, point: GeoPoint) -> MapPoint {
        (**self).to_map_units(point)
    }

    fn meters_to_map_units(&self, meters: f64, screen_scale: f64) -> f64 {
        (**self).meters_to_map_units(meters, screen_scale)
    }
}

/// Project `point` into map units through the engine's projection.
///
/// # Errors
///
/// Returns [`OverlayError::InvalidArgument`] when latitude or longitude is not
/// finite or lies outside ±90° / ±180°.
pub fn to_map_units<P: Projection + ?Sized>(projection: &P, point: GeoPoint) -> Result<MapPoint, OverlayError> {
    if !point.lat.is_finite() || point.lat.abs() > 90.0 {
        return Err(OverlayError::invalid("latitude", point.lat));
    }
    if !point.lon.is_finite() || point.lon.abs() > 180.0 {
        return Err(OverlayError::invalid("longitude", point.lon));
    }
    Ok(projection.to_map_units(point))
}

/// Convert a ground distance in meters into map units.
///
/// # Errors
///
/// Returns [`OverlayError::InvalidArgument`] for NaN, infinite or negative
/// meters, for a non-positive screen scale, or when the projection yields a
/// non-finite distance.
pub fn meters_to_map_units<P: Projection + ?Sized>(
    projection: &P,
    meters: f64,
    screen_scale: f64,
) -> Result<f64, OverlayError> {
    if !meters.is_finite() || meters < 0.0 {
        return Err(OverlayError::invalid("distance in meters", meters));
    }
    if !screen_scale.is_finite() || screen_scale <= 0.0 {
        return Err(OverlayError::invalid("screen scale", screen_scale));
    }
    let units = projection.meters_to_map_units(meters, screen_scale);
    if !units.is_finite() || units < 0.0 {
        return Err(OverlayError::invalid("map-unit distance", units));
    }
    Ok(units)
}

/// Spherical Web Mercator over a square world of [`MAP_WORLD_SIZE`] units.
///
/// `x` grows eastward from the antimeridian and `y` grows southward from the
/// northern Mercator limit. Ground distances are converted at a fixed reference
/// latitude, normally the map center.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebMercator {
    reference_lat: f64,
}

impl WebMercator {
    /// Projection with distances measured at the equator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection with distances measured at `lat`, clamped to the Mercator limit.
    #[must_use]
    pub fn with_reference_lat(lat: f64) -> Self {
        let reference_lat = if lat.is_finite() { lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT) } else { 0.0 };
        Self { reference_lat }
    }

    #[must_use]
    pub fn reference_lat(&self) -> f64 {
        self.reference_lat
    }

    /// Map units per ground meter at the reference latitude.
    #[must_use]
    pub fn units_per_meter(&self) -> f64 {
        MAP_WORLD_SIZE / (EARTH_CIRCUMFERENCE_M * self.reference_lat.to_radians().cos())
    }
}

impl Projection for WebMercator {
    fn to_map_units(&self, point: GeoPoint) -> MapPoint {
        let lat = point.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
        let x = (point.lon + 180.0) / 360.0 * MAP_WORLD_SIZE;
        let y = (1.0 - lat.tan().asinh() / PI) / 2.0 * MAP_WORLD_SIZE;
        MapPoint { x, y }
    }

    // Ground distance does not depend on display density.
    fn meters_to_map_units(&self, meters: f64, _screen_scale: f64) -> f64 {
        meters * self.units_per_meter()
    }
}
