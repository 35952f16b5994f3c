//! Accuracy ring: a 100-vertex circle registered once and rescaled per fix.

#[cfg(test)]
#[path = "circle_test.rs"]
mod circle_test;

use std::f64::consts::TAU;

use crate::consts::{CIRCLE_SAMPLES, CIRCLE_TEMPLATE_RADIUS, RING_PRIORITY};
use crate::error::OverlayError;
use crate::geo::MapPoint;
use crate::scene::{DrawableId, PolygonDrawable, PolygonStyle, Scene};

/// Vertices of the circle template, centered on the origin.
///
/// Vertex `i` sits at angle `θ = 2π·i/100` with coordinates `(R₀·sin θ, R₀·cos θ)`,
/// so the outline starts due north and winds clockwise on a y-down map.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn circle_template() -> Vec<MapPoint> {
    (0..CIRCLE_SAMPLES)
        .map(|i| {
            let theta = TAU * i as f64 / CIRCLE_SAMPLES as f64;
            MapPoint::new(CIRCLE_TEMPLATE_RADIUS * theta.sin(), CIRCLE_TEMPLATE_RADIUS * theta.cos())
        })
        .collect()
}

/// Uniform scale that stretches the template to `radius_map_units`.
///
/// # Errors
///
/// Returns [`OverlayError::InvalidArgument`] for a negative or non-finite radius.
pub fn ring_scale(radius_map_units: f64) -> Result<f64, OverlayError> {
    if !radius_map_units.is_finite() || radius_map_units < 0.0 {
        return Err(OverlayError::invalid("accuracy radius", radius_map_units));
    }
    Ok(radius_map_units / CIRCLE_TEMPLATE_RADIUS)
}

/// Handle to the accuracy ring polygon registered with a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccuracyRing {
    id: DrawableId,
}

impl AccuracyRing {
    /// Register the template polygon, hidden, with `style`.
    ///
    /// # Errors
    ///
    /// Propagates [`OverlayError::Scene`] if the scene refuses the polygon.
    pub fn register<S: Scene + ?Sized>(scene: &S, style: PolygonStyle) -> Result<Self, OverlayError> {
        let id = scene.add_polygon(PolygonDrawable {
            outline: circle_template(),
            style,
            position: MapPoint::default(),
            hidden: true,
            priority: RING_PRIORITY,
        })?;
        Ok(Self { id })
    }

    #[must_use]
    pub fn id(&self) -> DrawableId {
        self.id
    }
}
