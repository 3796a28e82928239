//! Error types for the playback core.
//!
//! Playback operations themselves never fail: superseding, stopping and missing
//! content are all expressed as no-ops or immediate completion. Errors only come
//! from validating inputs handed to the core (configuration, keyframe lists).

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PlaybackError {
    /// Configuration could not be parsed or is out of bounds
    #[error("Invalid player configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Keyframe list violates the knot ordering/range contract
    #[error("Invalid keyframes: {reason}")]
    InvalidKeyframes { reason: String },
}

impl PlaybackError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn invalid_keyframes(reason: impl Into<String>) -> Self {
        Self::InvalidKeyframes {
            reason: reason.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "config",
            Self::InvalidKeyframes { .. } => "keyframes",
        }
    }
}

impl From<serde_json::Error> for PlaybackError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_map_to_config() {
        let err: PlaybackError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PlaybackError::InvalidConfig { .. }));
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn display_includes_reason() {
        let err = PlaybackError::invalid_keyframes("empty knot list");
        assert_eq!(err.to_string(), "Invalid keyframes: empty knot list");
        assert_eq!(err.category(), "keyframes");
    }
}
