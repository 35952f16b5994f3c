//! Scene capability interface and an in-memory reference engine.
//!
//! The overlay never talks to a concrete map renderer. Everything it needs is
//! expressed by [`Scene`]: register an image or polygon drawable, mutate a
//! drawable property immediately, or submit an [`AnimationBatch`] whose changes
//! interpolate together. Projection comes from the [`Projection`] supertrait.
//!
//! [`MemoryScene`] implements the interface without a GPU. It keeps the state
//! of every drawable, an append-only [`SceneOp`] log, and a small linear
//! timeline driven by [`MemoryScene::advance`]. Tests and the replay binary use
//! it as the engine.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::assets::{Offset, Raster};
use crate::consts::{RING_COLOR, RING_STROKE_PT};
use crate::error::OverlayError;
use crate::geo::{GeoPoint, MapPoint, Projection, WebMercator};

/// Identifier the scene assigns to a registered drawable.
pub type DrawableId = Uuid;

/// The kind of a registered drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawableKind {
    Image,
    Polygon,
}

/// Registration request for an image drawable.
///
/// The raster is borrowed: the scene copies the pixels it needs during
/// [`Scene::add_image`] and must not keep the reference.
#[derive(Debug, Clone, Copy)]
pub struct ImageDrawable<'a> {
    pub raster: &'a Raster,
    /// Pixel offset of the anchor point from the raster's top-left corner.
    pub offset: Offset,
    pub position: MapPoint,
    pub hidden: bool,
    pub priority: i32,
}

/// Fill and outline style for a polygon drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonStyle {
    /// Fill color as an RGBA hex string.
    pub fill: String,
    /// Outline color as an RGBA hex string.
    pub stroke: String,
    /// Outline width in points.
    pub stroke_width_pt: f64,
}

impl PolygonStyle {
    /// Translucent blue used for the location accuracy ring.
    #[must_use]
    pub fn accuracy_ring() -> Self {
        Self { fill: RING_COLOR.to_string(), stroke: RING_COLOR.to_string(), stroke_width_pt: RING_STROKE_PT }
    }
}

/// Registration request for a closed polygon drawable.
///
/// Vertices are relative to the drawable's position and are multiplied by its
/// scale, so the outline can be registered once and transformed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonDrawable {
    pub outline: Vec<MapPoint>,
    pub style: PolygonStyle,
    pub position: MapPoint,
    pub hidden: bool,
    pub priority: i32,
}

/// A drawable property value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Property {
    Position(MapPoint),
    /// Rotation in degrees.
    Rotation(f64),
    /// Uniform scale factor.
    Scale(f64),
    Hidden(bool),
}

impl Property {
    fn same_slot(&self, other: &Property) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// One property change targeting one drawable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub id: DrawableId,
    pub property: Property,
}

/// Interpolation curve for an animation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// A set of property changes that interpolate in lock-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationBatch {
    pub duration_secs: f64,
    pub easing: Easing,
    pub changes: Vec<PropertyChange>,
}

impl AnimationBatch {
    #[must_use]
    pub fn new(duration_secs: f64, easing: Easing) -> Self {
        Self { duration_secs, easing, changes: Vec::new() }
    }

    /// Append a change to the batch.
    pub fn push(&mut self, id: DrawableId, property: Property) {
        self.changes.push(PropertyChange { id, property });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Rendering-engine capabilities consumed by the overlay.
pub trait Scene: Projection {
    /// Display density the scene renders at (1.0 = baseline).
    fn screen_scale(&self) -> f64;

    /// Register an image drawable.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Scene`] if the engine refuses the drawable.
    fn add_image(&self, image: ImageDrawable<'_>) -> Result<DrawableId, OverlayError>;

    /// Register a polygon drawable.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Scene`] if the engine refuses the drawable.
    fn add_polygon(&self, polygon: PolygonDrawable) -> Result<DrawableId, OverlayError>;

    /// Unregister a drawable. Returns `false` if it was not registered.
    fn remove(&self, id: DrawableId) -> bool;

    /// Change a property immediately, without animation.
    fn set(&self, id: DrawableId, property: Property);

    /// Submit a batch of changes to interpolate together. Returns immediately.
    fn animate(&self, batch: AnimationBatch);
}

impl<S: Scene + ?Sized> Scene for &S {
    fn screen_scale(&self) -> f64 {
        (**self).screen_scale()
    }

    fn add_image(&self, image: ImageDrawable<'_>) -> Result<DrawableId, OverlayError> {
        (**self).add_image(image)
    }

    fn add_polygon(&self, polygon: PolygonDrawable) -> Result<DrawableId, OverlayError> {
        (**self).add_polygon(polygon)
    }

    fn remove(&self, id: DrawableId) -> bool {
        (**self).remove(id)
    }

    fn set(&self, id: DrawableId, property: Property) {
        (**self).set(id, property);
    }

    fn animate(&self, batch: AnimationBatch) {
        (**self).animate(batch);
    }
}

impl<S: Scene + ?Sized> Scene for Rc<S> {
    fn screen_scale(&self) -> f64 {
        (**self).screen_scale()
    }

    fn add_image(&self, image: ImageDrawable<'_>) -> Result<DrawableId, OverlayError> {
        (**self).add_image(image)
    }

    fn add_polygon(&self, polygon: PolygonDrawable) -> Result<DrawableId, OverlayError> {
        (**self).add_polygon(polygon)
    }

    fn remove(&self, id: DrawableId) -> bool {
        (**self).remove(id)
    }

    fn set(&self, id: DrawableId, property: Property) {
        (**self).set(id, property);
    }

    fn animate(&self, batch: AnimationBatch) {
        (**self).animate(batch);
    }
}

// =============================================================
// In-memory engine
// =============================================================

/// Snapshot of one drawable held by [`MemoryScene`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawableState {
    pub id: DrawableId,
    pub kind: DrawableKind,
    pub position: MapPoint,
    pub rotation: f64,
    pub scale: f64,
    pub hidden: bool,
    pub priority: i32,
    /// Raster size in pixels; zero for polygons.
    pub width: u32,
    pub height: u32,
    pub offset: Offset,
    /// Template outline for polygons; empty for images.
    pub outline: Vec<MapPoint>,
    pub style: Option<PolygonStyle>,
}

impl DrawableState {
    fn get(&self, slot: &Property) -> Property {
        match slot {
            Property::Position(_) => Property::Position(self.position),
            Property::Rotation(_) => Property::Rotation(self.rotation),
            Property::Scale(_) => Property::Scale(self.scale),
            Property::Hidden(_) => Property::Hidden(self.hidden),
        }
    }

    fn put(&mut self, property: Property) {
        match property {
            Property::Position(p) => self.position = p,
            Property::Rotation(r) => self.rotation = r,
            Property::Scale(s) => self.scale = s,
            Property::Hidden(h) => self.hidden = h,
        }
    }
}

/// An entry in the [`MemoryScene`] operation log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneOp {
    Added { id: DrawableId, kind: DrawableKind },
    Removed { id: DrawableId },
    Set(PropertyChange),
    Animated(AnimationBatch),
}

/// An in-flight interpolation of one property.
#[derive(Debug, Clone)]
struct Track {
    id: DrawableId,
    from: Property,
    to: Property,
    easing: Easing,
    elapsed: f64,
    duration: f64,
}

impl Track {
    fn value_at(&self, t: f64) -> Property {
        let k = self.easing.apply(t);
        let lerp = |a: f64, b: f64| a + (b - a) * k;
        match (self.from, self.to) {
            (Property::Position(a), Property::Position(b)) => {
                Property::Position(MapPoint::new(lerp(a.x, b.x), lerp(a.y, b.y)))
            }
            (Property::Rotation(a), Property::Rotation(b)) => Property::Rotation(lerp(a, b)),
            (Property::Scale(a), Property::Scale(b)) => Property::Scale(lerp(a, b)),
            _ => self.to,
        }
    }
}

#[derive(Default)]
struct SceneState {
    drawables: HashMap<DrawableId, DrawableState>,
    tracks: Vec<Track>,
    log: Vec<SceneOp>,
    refuse_adds: bool,
}

impl SceneState {
    fn register(&mut self, state: DrawableState) -> Result<DrawableId, OverlayError> {
        if self.refuse_adds {
            warn!(kind = ?state.kind, "scene refused drawable");
            return Err(OverlayError::Scene("scene is not accepting drawables".into()));
        }
        let id = state.id;
        self.log.push(SceneOp::Added { id, kind: state.kind });
        self.drawables.insert(id, state);
        Ok(id)
    }
}

/// In-memory [`Scene`] over a [`WebMercator`] projection.
///
/// Animation targets are reached by calling [`advance`](Self::advance) or
/// [`settle`](Self::settle); a new batch starts from the current, possibly
/// mid-flight, value and supersedes older tracks for the same property.
pub struct MemoryScene {
    projection: WebMercator,
    screen_scale: f64,
    state: RefCell<SceneState>,
}

impl MemoryScene {
    /// Scene at the given display density, measuring distances at the equator.
    #[must_use]
    pub fn new(screen_scale: f64) -> Self {
        Self::with_projection(WebMercator::new(), screen_scale)
    }

    /// Scene centered on `center`; ground distances are measured at its latitude.
    #[must_use]
    pub fn centered_on(center: GeoPoint, screen_scale: f64) -> Self {
        Self::with_projection(WebMercator::with_reference_lat(center.lat), screen_scale)
    }

    #[must_use]
    pub fn with_projection(projection: WebMercator, screen_scale: f64) -> Self {
        Self { projection, screen_scale, state: RefCell::new(SceneState::default()) }
    }

    /// Make subsequent `add_*` calls fail, as an engine out of resources would.
    pub fn refuse_new_drawables(&self, refuse: bool) {
        self.state.borrow_mut().refuse_adds = refuse;
    }

    /// Snapshot of a registered drawable.
    #[must_use]
    pub fn drawable(&self, id: DrawableId) -> Option<DrawableState> {
        self.state.borrow().drawables.get(&id).cloned()
    }

    /// All registered drawables sorted by `(priority, id)` for draw order.
    #[must_use]
    pub fn drawables(&self) -> Vec<DrawableState> {
        let mut all: Vec<DrawableState> = self.state.borrow().drawables.values().cloned().collect();
        all.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Number of registered drawables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().drawables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().drawables.is_empty()
    }

    /// Copy of the operation log.
    #[must_use]
    pub fn ops(&self) -> Vec<SceneOp> {
        self.state.borrow().log.clone()
    }

    /// Number of animation batches submitted so far.
    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|op| matches!(op, SceneOp::Animated(_)))
            .count()
    }

    /// The most recently submitted animation batch.
    #[must_use]
    pub fn last_animation(&self) -> Option<AnimationBatch> {
        self.state.borrow().log.iter().rev().find_map(|op| match op {
            SceneOp::Animated(batch) => Some(batch.clone()),
            _ => None,
        })
    }

    /// Number of property interpolations still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.borrow().tracks.len()
    }

    /// Drop the operation log, keeping drawable state.
    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Move every running interpolation forward by `dt_secs`.
    pub fn advance(&self, dt_secs: f64) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let mut finished = Vec::new();
        for (i, track) in state.tracks.iter_mut().enumerate() {
            track.elapsed += dt_secs.max(0.0);
            let t = (track.elapsed / track.duration).min(1.0);
            if let Some(drawable) = state.drawables.get_mut(&track.id) {
                drawable.put(track.value_at(t));
            }
            if t >= 1.0 {
                finished.push(i);
            }
        }
        for i in finished.into_iter().rev() {
            state.tracks.swap_remove(i);
        }
    }

    /// Jump every running interpolation to its target.
    pub fn settle(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        for track in state.tracks.drain(..) {
            if let Some(drawable) = state.drawables.get_mut(&track.id) {
                drawable.put(track.to);
            }
        }
    }
}

impl Projection for MemoryScene {
    fn to_map_units(&self, point: GeoPoint) -> MapPoint {
        self.projection.to_map_units(point)
    }

    fn meters_to_map_units(&self, meters: f64, screen_scale: f64) -> f64 {
        self.projection.meters_to_map_units(meters, screen_scale)
    }
}

impl Scene for MemoryScene {
    fn screen_scale(&self) -> f64 {
        self.screen_scale
    }

    fn add_image(&self, image: ImageDrawable<'_>) -> Result<DrawableId, OverlayError> {
        self.state.borrow_mut().register(DrawableState {
            id: Uuid::new_v4(),
            kind: DrawableKind::Image,
            position: image.position,
            rotation: 0.0,
            scale: 1.0,
            hidden: image.hidden,
            priority: image.priority,
            width: image.raster.width,
            height: image.raster.height,
            offset: image.offset,
            outline: Vec::new(),
            style: None,
        })
    }

    fn add_polygon(&self, polygon: PolygonDrawable) -> Result<DrawableId, OverlayError> {
        if polygon.outline.len() < 3 {
            return Err(OverlayError::Scene(format!("polygon needs 3 vertices, got {}", polygon.outline.len())));
        }
        self.state.borrow_mut().register(DrawableState {
            id: Uuid::new_v4(),
            kind: DrawableKind::Polygon,
            position: polygon.position,
            rotation: 0.0,
            scale: 1.0,
            hidden: polygon.hidden,
            priority: polygon.priority,
            width: 0,
            height: 0,
            offset: Offset::default(),
            outline: polygon.outline,
            style: Some(polygon.style),
        })
    }

    fn remove(&self, id: DrawableId) -> bool {
        let mut state = self.state.borrow_mut();
        if state.drawables.remove(&id).is_none() {
            return false;
        }
        state.tracks.retain(|t| t.id != id);
        state.log.push(SceneOp::Removed { id });
        true
    }

    fn set(&self, id: DrawableId, property: Property) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(drawable) = state.drawables.get_mut(&id) else {
            return;
        };
        drawable.put(property);
        state.tracks.retain(|t| !(t.id == id && t.to.same_slot(&property)));
        state.log.push(SceneOp::Set(PropertyChange { id, property }));
    }

    fn animate(&self, batch: AnimationBatch) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        for change in &batch.changes {
            let Some(drawable) = state.drawables.get_mut(&change.id) else {
                continue;
            };
            let instant = matches!(change.property, Property::Hidden(_)) || batch.duration_secs <= 0.0;
            state
                .tracks
                .retain(|t| !(t.id == change.id && t.to.same_slot(&change.property)));
            if instant {
                drawable.put(change.property);
                continue;
            }
            state.tracks.push(Track {
                id: change.id,
                from: drawable.get(&change.property),
                to: change.property,
                easing: batch.easing,
                elapsed: 0.0,
                duration: batch.duration_secs,
            });
        }
        state.log.push(SceneOp::Animated(batch));
    }
}
