//! Error type shared by every overlay component.

/// Errors raised by the overlay core and its collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverlayError {
    /// A numeric input was NaN, infinite, negative, or out of range.
    #[error("invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: f64 },
    /// A named icon asset could not be located or rasterized.
    #[error("cannot render icon asset '{name}': {reason}")]
    RenderAsset { name: String, reason: String },
    /// The rendering engine refused to register a drawable.
    #[error("scene rejected drawable: {0}")]
    Scene(String),
    /// The location service cannot deliver fixes.
    #[error("location permission unavailable")]
    PermissionUnavailable,
    /// A configuration value could not be parsed.
    #[error("config parse error: {0}")]
    Config(String),
}

impl OverlayError {
    pub(crate) fn invalid(what: &'static str, value: f64) -> Self {
        Self::InvalidArgument { what, value }
    }
}
