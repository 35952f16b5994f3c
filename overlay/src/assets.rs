//! Icon rasterization for markers.
//!
//! An [`IconSource`] turns a named vector asset into a [`Raster`] at a given
//! display scale. [`MarkerAssetCache`] is the single render entry point used by
//! the location overlay and the pin manager: it renders fresh on every call,
//! computes the anchor offset, and hands back a [`RenderedMarker`] guard that
//! returns the raster to its source when dropped. Callers copy the raster into
//! the scene while the guard is alive, and the raster is released on every
//! exit path, including scene registration failures.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{DEFAULT_DIRECTIONAL_ICON, DEFAULT_STATIC_ICON};
use crate::error::OverlayError;
use crate::geo::MapPoint;
use crate::scene::ImageDrawable;

/// An RGBA8 bitmap produced by an [`IconSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Pixel offset of a marker's anchor from the raster's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

/// Which point of the raster sits on the marker's geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Raster center; used for the location dot and arrow.
    Center,
    /// Bottom center; used for pins whose tip touches the location.
    Tip,
}

impl Anchor {
    #[must_use]
    pub fn offset(self, width: u32, height: u32) -> Offset {
        match self {
            Self::Center => Offset { x: width / 2, y: height / 2 },
            Self::Tip => Offset { x: width / 2, y: height },
        }
    }
}

/// Source of rasterized icon assets.
pub trait IconSource {
    /// Rasterize the asset `name` at display `scale`.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::RenderAsset`] if the asset is missing or cannot
    /// be rasterized.
    fn render_icon(&self, name: &str, scale: f64) -> Result<Raster, OverlayError>;

    /// Give a raster back once the scene holds its own copy.
    fn release(&self, raster: Raster);
}

impl<I: IconSource + ?Sized> IconSource for &I {
    fn render_icon(&self, name: &str, scale: f64) -> Result<Raster, OverlayError> {
        (**self).render_icon(name, scale)
    }

    fn release(&self, raster: Raster) {
        (**self).release(raster);
    }
}

impl<I: IconSource + ?Sized> IconSource for Rc<I> {
    fn render_icon(&self, name: &str, scale: f64) -> Result<Raster, OverlayError> {
        (**self).render_icon(name, scale)
    }

    fn release(&self, raster: Raster) {
        (**self).release(raster);
    }
}

/// A freshly rendered marker raster. Releases the raster when dropped.
pub struct RenderedMarker<'a, I: IconSource + ?Sized> {
    source: &'a I,
    raster: Raster,
    offset: Offset,
}

impl<I: IconSource + ?Sized> RenderedMarker<'_, I> {
    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Registration request for this raster at `position`.
    #[must_use]
    pub fn image(&self, position: MapPoint, hidden: bool, priority: i32) -> ImageDrawable<'_> {
        ImageDrawable { raster: &self.raster, offset: self.offset, position, hidden, priority }
    }
}

impl<I: IconSource + ?Sized> Drop for RenderedMarker<'_, I> {
    fn drop(&mut self) {
        self.source.release(std::mem::take(&mut self.raster));
    }
}

/// Renders marker icons at a display scale fixed at construction.
///
/// Nothing is cached between calls.
pub struct MarkerAssetCache<I> {
    icons: I,
    screen_scale: f64,
}

impl<I: IconSource> MarkerAssetCache<I> {
    #[must_use]
    pub fn new(icons: I, screen_scale: f64) -> Self {
        Self { icons, screen_scale }
    }

    #[must_use]
    pub fn screen_scale(&self) -> f64 {
        self.screen_scale
    }

    /// Render `name` and compute its anchor offset.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::RenderAsset`] if the source fails or produces an
    /// empty raster. An empty raster is released before returning.
    pub fn render(&self, name: &str, anchor: Anchor) -> Result<RenderedMarker<'_, I>, OverlayError> {
        let raster = match self.icons.render_icon(name, self.screen_scale) {
            Ok(raster) => raster,
            Err(e) => {
                warn!(icon = name, error = %e, "icon render failed");
                return Err(e);
            }
        };
        let offset = anchor.offset(raster.width, raster.height);
        let marker = RenderedMarker { source: &self.icons, raster, offset };
        if marker.raster.width == 0 || marker.raster.height == 0 {
            warn!(icon = name, "icon rendered to an empty raster");
            return Err(OverlayError::RenderAsset { name: name.to_string(), reason: "empty raster".into() });
        }
        Ok(marker)
    }
}

// =============================================================
// In-memory icon source
// =============================================================

/// Icon source backed by a table of asset names and base pixel sizes.
///
/// Rendering produces a blank raster scaled by the display density. The
/// source counts renders and releases so callers can verify that every
/// raster was returned.
#[derive(Debug, Default)]
pub struct MemoryIcons {
    sizes: HashMap<String, (u32, u32)>,
    rendered: Cell<usize>,
    released: Cell<usize>,
}

impl MemoryIcons {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The overlay's dot and arrow plus a `pin.svg` map pin.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_icon(DEFAULT_STATIC_ICON, 24, 24)
            .with_icon(DEFAULT_DIRECTIONAL_ICON, 24, 24)
            .with_icon("pin.svg", 32, 48)
    }

    /// Add an asset with its size at scale 1.0.
    #[must_use]
    pub fn with_icon(mut self, name: &str, width: u32, height: u32) -> Self {
        self.sizes.insert(name.to_string(), (width, height));
        self
    }

    /// Number of rasters handed out.
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.rendered.get()
    }

    /// Number of rasters handed out and not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.rendered.get() - self.released.get()
    }
}

impl IconSource for MemoryIcons {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render_icon(&self, name: &str, scale: f64) -> Result<Raster, OverlayError> {
        let Some(&(base_w, base_h)) = self.sizes.get(name) else {
            return Err(OverlayError::RenderAsset { name: name.to_string(), reason: "asset not found".into() });
        };
        if !scale.is_finite() || scale <= 0.0 {
            return Err(OverlayError::RenderAsset { name: name.to_string(), reason: format!("invalid scale {scale}") });
        }
        let width = (f64::from(base_w) * scale).round() as u32;
        let height = (f64::from(base_h) * scale).round() as u32;
        self.rendered.set(self.rendered.get() + 1);
        Ok(Raster { width, height, pixels: vec![0; width as usize * height as usize * 4] })
    }

    fn release(&self, _raster: Raster) {
        self.released.set(self.released.get() + 1);
    }
}
