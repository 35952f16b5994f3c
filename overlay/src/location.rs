//! Live location overlay: the fix-driven marker state machine.
//!
//! A [`LocationOverlay`] owns three drawables registered at construction, all
//! hidden: a static dot, a directional arrow, and the accuracy ring. Each
//! ingested [`Fix`] moves them to the new position, picks which marker is
//! visible, and rescales the ring to the fix's accuracy radius.
//!
//! States: `NoFix` (initial), then `HasFixStatic` or `HasFixDirectional`
//! depending on whether the latest fix carried a bearing. There is no exit
//! state; dropping the overlay removes its drawables from the scene.
//!
//! The first fix is applied immediately so the markers never glide in from an
//! undefined origin. Every later fix submits exactly one animation batch that
//! carries every position, scale and rotation change, so they interpolate in
//! lock-step. Fixes are never queued or dropped: a batch submitted mid-flight
//! starts from the drawables' current values.

#[cfg(test)]
#[path = "location_test.rs"]
mod location_test;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assets::{Anchor, IconSource, MarkerAssetCache};
use crate::circle::{self, AccuracyRing};
use crate::config::OverlayConfig;
use crate::consts::MARKER_PRIORITY;
use crate::error::OverlayError;
use crate::feed::LocationResult;
use crate::geo::{self, GeoPoint, MapPoint};
use crate::scene::{AnimationBatch, DrawableId, PolygonStyle, Property, Scene};

/// One position sample from the location service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub position: GeoPoint,
    /// Compass bearing in degrees, when the device reports one.
    #[serde(default)]
    pub bearing: Option<f64>,
    /// Radius of the 68% confidence circle, in meters.
    pub accuracy_m: f64,
    /// Sample time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub time_ms: i64,
}

impl Fix {
    #[must_use]
    pub fn new(lat: f64, lon: f64, accuracy_m: f64) -> Self {
        Self { position: GeoPoint::new(lat, lon), bearing: None, accuracy_m, time_ms: 0 }
    }

    #[must_use]
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// Presence of a bearing, regardless of its value.
    #[must_use]
    pub fn has_bearing(&self) -> bool {
        self.bearing.is_some()
    }
}

/// Which representation the overlay is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    /// No fix received yet; nothing is visible.
    NoFix,
    /// Showing the static dot.
    HasFixStatic,
    /// Showing the bearing-rotated arrow.
    HasFixDirectional,
}

/// Fix values converted into scene units.
struct Target {
    position: MapPoint,
    ring_scale: f64,
    rotation: Option<f64>,
}

/// Drives the location markers and accuracy ring on a scene.
pub struct LocationOverlay<S: Scene> {
    scene: S,
    config: OverlayConfig,
    screen_scale: f64,
    static_marker: DrawableId,
    directional_marker: DrawableId,
    ring: AccuracyRing,
    state: OverlayState,
    last_fix: Option<Fix>,
}

impl<S: Scene> LocationOverlay<S> {
    /// Render the marker icons and register all drawables, hidden.
    ///
    /// The display scale is read from the scene once and used for every later
    /// conversion.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::InvalidArgument`] if the scene's screen scale is not positive
    /// - [`OverlayError::RenderAsset`] if either icon cannot be rendered
    /// - [`OverlayError::Scene`] if the scene refuses a drawable
    ///
    /// Drawables registered before the failure are removed again.
    pub fn new<I: IconSource>(scene: S, icons: I, config: OverlayConfig) -> Result<Self, OverlayError> {
        let screen_scale = scene.screen_scale();
        if !screen_scale.is_finite() || screen_scale <= 0.0 {
            return Err(OverlayError::invalid("screen scale", screen_scale));
        }
        let assets = MarkerAssetCache::new(icons, screen_scale);

        let static_marker = register_marker(&scene, &assets, &config.static_icon)?;
        let directional_marker = match register_marker(&scene, &assets, &config.directional_icon) {
            Ok(id) => id,
            Err(e) => {
                scene.remove(static_marker);
                return Err(e);
            }
        };
        let ring = match AccuracyRing::register(&scene, PolygonStyle::accuracy_ring()) {
            Ok(ring) => ring,
            Err(e) => {
                scene.remove(static_marker);
                scene.remove(directional_marker);
                return Err(e);
            }
        };

        info!(
            %static_marker,
            %directional_marker,
            ring = %ring.id(),
            screen_scale,
            "location overlay attached"
        );
        Ok(Self {
            scene,
            config,
            screen_scale,
            static_marker,
            directional_marker,
            ring,
            state: OverlayState::NoFix,
            last_fix: None,
        })
    }

    /// Ingest one fix.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidArgument`] for an out-of-range position,
    /// a negative or non-finite accuracy, or a non-finite bearing. A rejected
    /// fix leaves the overlay untouched.
    pub fn on_location_changed(&mut self, fix: Fix) -> Result<(), OverlayError> {
        let target = match self.convert(&fix) {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, lat = fix.position.lat, lon = fix.position.lon, "fix rejected");
                return Err(e);
            }
        };

        if self.last_fix.is_none() {
            self.place(&target);
        } else {
            self.show(target.rotation.is_some());
            self.animate_to(&target);
        }

        let next = if fix.has_bearing() { OverlayState::HasFixDirectional } else { OverlayState::HasFixStatic };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "overlay state changed");
        }
        self.state = next;
        self.last_fix = Some(fix);
        Ok(())
    }

    /// Ingest the most recent fix of a delivered batch. Empty batches are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`on_location_changed`](Self::on_location_changed).
    pub fn on_location_result(&mut self, result: &LocationResult) -> Result<(), OverlayError> {
        match result.last_fix() {
            Some(fix) => self.on_location_changed(fix),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn state(&self) -> OverlayState {
        self.state
    }

    #[must_use]
    pub fn last_fix(&self) -> Option<Fix> {
        self.last_fix
    }

    #[must_use]
    pub fn static_marker(&self) -> DrawableId {
        self.static_marker
    }

    #[must_use]
    pub fn directional_marker(&self) -> DrawableId {
        self.directional_marker
    }

    #[must_use]
    pub fn accuracy_ring(&self) -> DrawableId {
        self.ring.id()
    }

    #[must_use]
    pub fn screen_scale(&self) -> f64 {
        self.screen_scale
    }

    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    fn convert(&self, fix: &Fix) -> Result<Target, OverlayError> {
        let position = geo::to_map_units(&self.scene, fix.position)?;
        let radius = geo::meters_to_map_units(&self.scene, fix.accuracy_m, self.screen_scale)?;
        let ring_scale = circle::ring_scale(radius)?;
        let rotation = match fix.bearing {
            Some(b) if !b.is_finite() => return Err(OverlayError::invalid("bearing", b)),
            Some(b) => Some(self.config.rotation.rotation_for(b)),
            None => None,
        };
        Ok(Target { position, ring_scale, rotation })
    }

    /// First fix: jump straight to the target.
    fn place(&self, target: &Target) {
        let pos = Property::Position(target.position);
        self.scene.set(self.static_marker, pos);
        self.scene.set(self.directional_marker, pos);
        self.scene.set(self.ring.id(), pos);
        self.scene.set(self.ring.id(), Property::Scale(target.ring_scale));
        if let Some(rotation) = target.rotation {
            self.scene.set(self.directional_marker, Property::Rotation(rotation));
        }
        self.scene.set(self.ring.id(), Property::Hidden(false));
        self.show(target.rotation.is_some());
        debug!(x = target.position.x, y = target.position.y, scale = target.ring_scale, "first fix placed");
    }

    /// Hide the outgoing marker before revealing the incoming one, so no frame
    /// shows both.
    fn show(&self, directional: bool) {
        let (incoming, outgoing) = if directional {
            (self.directional_marker, self.static_marker)
        } else {
            (self.static_marker, self.directional_marker)
        };
        self.scene.set(outgoing, Property::Hidden(true));
        self.scene.set(incoming, Property::Hidden(false));
    }

    fn animate_to(&self, target: &Target) {
        let pos = Property::Position(target.position);
        let mut batch = AnimationBatch::new(self.config.animation_secs, self.config.easing);
        batch.push(self.directional_marker, pos);
        batch.push(self.static_marker, pos);
        batch.push(self.ring.id(), pos);
        batch.push(self.ring.id(), Property::Scale(target.ring_scale));
        if let Some(rotation) = target.rotation {
            batch.push(self.directional_marker, Property::Rotation(rotation));
        }
        debug!(changes = batch.len(), duration = batch.duration_secs, "animating to fix");
        self.scene.animate(batch);
    }
}

impl<S: Scene> Drop for LocationOverlay<S> {
    fn drop(&mut self) {
        self.scene.remove(self.static_marker);
        self.scene.remove(self.directional_marker);
        self.scene.remove(self.ring.id());
        info!("location overlay detached");
    }
}

fn register_marker<S: Scene, I: IconSource>(
    scene: &S,
    assets: &MarkerAssetCache<I>,
    icon: &str,
) -> Result<DrawableId, OverlayError> {
    let marker = assets.render(icon, Anchor::Center)?;
    scene.add_image(marker.image(MapPoint::default(), true, MARKER_PRIORITY))
}
