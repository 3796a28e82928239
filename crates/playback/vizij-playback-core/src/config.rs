//! Player configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Configuration for a [`crate::PlaybackCoordinator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Plays shorter than this jump straight to their start progress and
    /// complete without creating an engine animation.
    pub min_animated_duration_ms: u64,

    /// Start a looping 0..1 play whenever content is loaded and nothing plays.
    pub auto_play: bool,

    /// Initial playback rate. Negative rates play from the end backwards.
    pub playback_rate: f64,

    /// Whether the host environment supports progress playback at all. When
    /// false, every operation is a no-op and plays resolve immediately.
    pub playback_supported: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_animated_duration_ms: 20,
            auto_play: true,
            playback_rate: 1.0,
            playback_supported: true,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let cfg: PlayerConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.playback_rate.is_finite() {
            return Err(PlaybackError::invalid_config(format!(
                "playback_rate must be finite, got {}",
                self.playback_rate
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn min_animated_duration(&self) -> Duration {
        Duration::from_millis(self.min_animated_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_contract() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.min_animated_duration(), Duration::from_millis(20));
        assert!(cfg.auto_play);
        assert_eq!(cfg.playback_rate, 1.0);
        assert!(cfg.playback_supported);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = PlayerConfig::from_json(r#"{ "auto_play": false, "playback_rate": -2.0 }"#)
            .expect("parse config");
        assert!(!cfg.auto_play);
        assert_eq!(cfg.playback_rate, -2.0);
        assert_eq!(cfg.min_animated_duration_ms, 20);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = PlayerConfig::from_json(r#"{ "min_animated_duration_ms": -1 }"#).unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidConfig { .. }));
    }
}
