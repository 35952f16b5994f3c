//! Shared numeric constants for the overlay crate.

// ── Projection ──────────────────────────────────────────────────

/// Width and height of the square Mercator world in map units (2³¹).
pub const MAP_WORLD_SIZE: f64 = 2_147_483_648.0;

/// Equatorial circumference of the WGS84 ellipsoid in meters.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Latitude beyond which Web Mercator is undefined, in degrees.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

// ── Accuracy ring ───────────────────────────────────────────────

/// Number of vertices in the accuracy circle template.
pub const CIRCLE_SAMPLES: usize = 100;

/// Radius of the accuracy circle template in map units (R₀).
pub const CIRCLE_TEMPLATE_RADIUS: f64 = 2048.0;

/// Fill and stroke color of the accuracy ring (RGBA hex).
pub const RING_COLOR: &str = "#3D99FA26";

/// Stroke width of the accuracy ring outline, in points.
pub const RING_STROKE_PT: f64 = 1.0;

// ── Draw priorities ─────────────────────────────────────────────

/// Draw priority for location markers and pins.
pub const MARKER_PRIORITY: i32 = 100;

/// Draw priority for the accuracy ring; sits just below the markers.
pub const RING_PRIORITY: i32 = 99;

// ── Location overlay defaults ───────────────────────────────────

/// Duration of a fix-to-fix transition, in seconds.
pub const DEFAULT_ANIMATION_SECS: f64 = 1.0;

/// Icon shown when the fix carries no bearing.
pub const DEFAULT_STATIC_ICON: &str = "circle_new.svg";

/// Icon shown when the fix carries a bearing.
pub const DEFAULT_DIRECTIONAL_ICON: &str = "arrow_new.svg";

// ── Location feed ───────────────────────────────────────────────

/// Requested interval between location updates, in milliseconds.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;
