//! Static map pins anchored at geographic coordinates.

#[cfg(test)]
#[path = "pins_test.rs"]
mod pins_test;

use serde::Serialize;
use tracing::{debug, info};

use crate::assets::{Anchor, IconSource, MarkerAssetCache};
use crate::consts::MARKER_PRIORITY;
use crate::error::OverlayError;
use crate::geo::{self, GeoPoint};
use crate::scene::{DrawableId, Scene};

/// Handle to a pin placed by a [`PinManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PinHandle(DrawableId);

impl PinHandle {
    /// The scene drawable backing this pin.
    #[must_use]
    pub fn drawable_id(self) -> DrawableId {
        self.0
    }
}

/// A placed pin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    pub handle: PinHandle,
    pub position: GeoPoint,
    pub icon: String,
}

/// Places image pins on a scene and owns them until removed.
///
/// Pins are kept in insertion order. Dropping the manager removes every pin it
/// still tracks.
pub struct PinManager<S: Scene, I: IconSource> {
    scene: S,
    assets: MarkerAssetCache<I>,
    pins: Vec<Pin>,
}

impl<S: Scene, I: IconSource> PinManager<S, I> {
    #[must_use]
    pub fn new(scene: S, icons: I) -> Self {
        let assets = MarkerAssetCache::new(icons, scene.screen_scale());
        Self { scene, assets, pins: Vec::new() }
    }

    /// Place one pin whose tip touches `(lat, lon)`.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::InvalidArgument`] for an out-of-range coordinate
    /// - [`OverlayError::RenderAsset`] if `icon` cannot be rendered
    /// - [`OverlayError::Scene`] if the scene refuses the marker
    ///
    /// On error nothing is added and the tracked count is unchanged.
    pub fn add_pin(&mut self, lat: f64, lon: f64, icon: &str) -> Result<PinHandle, OverlayError> {
        let position = GeoPoint::new(lat, lon);
        let point = geo::to_map_units(&self.scene, position)?;
        let marker = self.assets.render(icon, Anchor::Tip)?;
        let id = self.scene.add_image(marker.image(point, false, MARKER_PRIORITY))?;
        drop(marker);

        let handle = PinHandle(id);
        self.pins.push(Pin { handle, position, icon: icon.to_string() });
        debug!(%id, lat, lon, icon, count = self.pins.len(), "pin added");
        Ok(handle)
    }

    /// Place one pin per coordinate, in order.
    ///
    /// Stops at the first failure; pins placed before it stay on the scene.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`add_pin`](Self::add_pin).
    pub fn add_pins(&mut self, points: &[(f64, f64)], icon: &str) -> Result<Vec<PinHandle>, OverlayError> {
        points
            .iter()
            .map(|&(lat, lon)| self.add_pin(lat, lon, icon))
            .collect()
    }

    /// Remove one pin. Returns `false` if the handle is not tracked here.
    pub fn remove(&mut self, handle: PinHandle) -> bool {
        let Some(index) = self.pins.iter().position(|p| p.handle == handle) else {
            return false;
        };
        let pin = self.pins.remove(index);
        self.scene.remove(pin.handle.0);
        true
    }

    /// Remove every tracked pin. Safe to call repeatedly.
    pub fn remove_all(&mut self) {
        if self.pins.is_empty() {
            return;
        }
        let count = self.pins.len();
        for pin in self.pins.drain(..) {
            self.scene.remove(pin.handle.0);
        }
        info!(count, "removed all pins");
    }

    /// Tracked pins in insertion order.
    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }
}

impl<S: Scene, I: IconSource> Drop for PinManager<S, I> {
    fn drop(&mut self) {
        self.remove_all();
    }
}
