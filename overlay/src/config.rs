//! Overlay configuration with defaults and environment overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::collections::HashMap;
use std::env::{self, VarError};

use crate::consts::{DEFAULT_ANIMATION_SECS, DEFAULT_DIRECTIONAL_ICON, DEFAULT_STATIC_ICON};
use crate::error::OverlayError;
use crate::scene::Easing;

const ENV_KEYS: [&str; 5] = [
    "OVERLAY_ANIMATION_SECS",
    "OVERLAY_EASING",
    "OVERLAY_ROTATION",
    "OVERLAY_STATIC_ICON",
    "OVERLAY_DIRECTIONAL_ICON",
];

/// How a compass bearing maps onto the engine's rotation angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationConvention {
    /// Rotation is the negated bearing (counter-clockwise engine angles).
    #[default]
    Inverted,
    /// Rotation equals the bearing.
    Compass,
}

impl RotationConvention {
    /// Engine rotation in degrees for a compass bearing.
    #[must_use]
    pub fn rotation_for(self, bearing_deg: f64) -> f64 {
        match self {
            Self::Inverted => -bearing_deg,
            Self::Compass => bearing_deg,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Duration of each fix-to-fix transition, in seconds.
    pub animation_secs: f64,
    pub easing: Easing,
    pub rotation: RotationConvention,
    /// Icon asset for the marker shown without a bearing.
    pub static_icon: String,
    /// Icon asset for the marker shown with a bearing.
    pub directional_icon: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            animation_secs: DEFAULT_ANIMATION_SECS,
            easing: Easing::Linear,
            rotation: RotationConvention::Inverted,
            static_icon: DEFAULT_STATIC_ICON.to_string(),
            directional_icon: DEFAULT_DIRECTIONAL_ICON.to_string(),
        }
    }
}

impl OverlayConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `OVERLAY_ANIMATION_SECS`: default 1.0, finite and non-negative
    /// - `OVERLAY_EASING`: `linear` (default) or `ease_in_out`
    /// - `OVERLAY_ROTATION`: `inverted` (default) or `compass`
    /// - `OVERLAY_STATIC_ICON`: default `circle_new.svg`
    /// - `OVERLAY_DIRECTIONAL_ICON`: default `arrow_new.svg`
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Config`] for any unparseable or non-UTF-8 value.
    pub fn from_env() -> Result<Self, OverlayError> {
        let mut values = HashMap::new();
        for key in ENV_KEYS {
            if let Some(value) = env_value(key, env::var(key))? {
                values.insert(key, value);
            }
        }
        Self::from_lookup(|key| values.get(key).cloned())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Config`] for any unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OverlayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let animation_secs = match lookup("OVERLAY_ANIMATION_SECS") {
            Some(raw) => parse_duration(&raw)?,
            None => defaults.animation_secs,
        };
        let easing = parse_easing(lookup("OVERLAY_EASING").as_deref())?;
        let rotation = parse_rotation(lookup("OVERLAY_ROTATION").as_deref())?;
        let static_icon = lookup("OVERLAY_STATIC_ICON").unwrap_or(defaults.static_icon);
        let directional_icon = lookup("OVERLAY_DIRECTIONAL_ICON").unwrap_or(defaults.directional_icon);

        Ok(Self { animation_secs, easing, rotation, static_icon, directional_icon })
    }
}

/// An unset variable falls back to its default; a set but non-UTF-8 one is an error.
fn env_value(key: &str, raw: Result<String, VarError>) -> Result<Option<String>, OverlayError> {
    match raw {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(OverlayError::Config(format!("{key} is not valid UTF-8"))),
    }
}

fn parse_duration(raw: &str) -> Result<f64, OverlayError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| OverlayError::Config(format!("OVERLAY_ANIMATION_SECS is not a number: {raw}")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(OverlayError::Config(format!("OVERLAY_ANIMATION_SECS must be finite and >= 0, got {raw}")));
    }
    Ok(secs)
}

fn parse_easing(raw: Option<&str>) -> Result<Easing, OverlayError> {
    match raw.unwrap_or("linear") {
        "linear" => Ok(Easing::Linear),
        "ease_in_out" => Ok(Easing::EaseInOut),
        other => Err(OverlayError::Config(format!("unknown OVERLAY_EASING: {other}"))),
    }
}

fn parse_rotation(raw: Option<&str>) -> Result<RotationConvention, OverlayError> {
    match raw.unwrap_or("inverted") {
        "inverted" => Ok(RotationConvention::Inverted),
        "compass" => Ok(RotationConvention::Compass),
        other => Err(OverlayError::Config(format!("unknown OVERLAY_ROTATION: {other}"))),
    }
}
