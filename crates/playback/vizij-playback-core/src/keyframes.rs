//! Keyframe model for the progress channel and the builder that turns a
//! progress interval into a time-based animation.
//!
//! Knot times are normalized to [0,1] over the animation's duration; knot values
//! are progress values in [0,1]. A wrap-around interval (`from > to`) plays to the
//! end, jumps back to 0 on the next representable instant, then plays to `to`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Easing applied on arrival at a knot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Whatever the engine uses when no easing is given.
    #[default]
    EngineDefault,
    Linear,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    /// Normalized time in [0,1] within the animation duration.
    pub time: f32,
    /// Progress value reached at `time`.
    pub value: f32,
    #[serde(default)]
    pub easing: Easing,
}

impl Knot {
    #[inline]
    pub fn new(time: f32, value: f32, easing: Easing) -> Self {
        Self { time, value, easing }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationBehavior {
    /// Play the knots exactly once; the engine signals completion at the end.
    Once,
    /// Repeat forever; the engine never signals completion.
    Forever,
}

/// A scalar keyframe animation ready to hand to an [`crate::AnimationEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeAnimation {
    pub duration: Duration,
    pub knots: Vec<Knot>,
    pub iteration: IterationBehavior,
}

impl KeyframeAnimation {
    /// Build the animation for a clamped progress interval.
    pub fn for_interval(from: f32, to: f32, looped: bool, duration: Duration) -> Self {
        let mut knots = Vec::with_capacity(4);

        knots.push(Knot::new(0.0, from, Easing::EngineDefault));

        if from > to {
            let time_to_end = wrap_time(from, to);
            knots.push(Knot::new(time_to_end, 1.0, Easing::Linear));
            knots.push(Knot::new(
                (time_to_end + f32::EPSILON).min(1.0),
                0.0,
                Easing::Linear,
            ));
        }

        knots.push(Knot::new(1.0, to, Easing::Linear));

        Self {
            duration,
            knots,
            iteration: if looped {
                IterationBehavior::Forever
            } else {
                IterationBehavior::Once
            },
        }
    }

    #[inline]
    pub fn is_looped(&self) -> bool {
        matches!(self.iteration, IterationBehavior::Forever)
    }

    /// Validate knot invariants (non-empty, finite, times in [0,1], non-decreasing).
    pub fn validate(&self) -> crate::Result<()> {
        if self.knots.is_empty() {
            return Err(PlaybackError::invalid_keyframes("knot list is empty"));
        }
        let mut last = -f32::INFINITY;
        for (idx, knot) in self.knots.iter().enumerate() {
            if !knot.time.is_finite() || knot.time < 0.0 || knot.time > 1.0 {
                return Err(PlaybackError::invalid_keyframes(format!(
                    "knot {idx} time {} is outside [0,1]",
                    knot.time
                )));
            }
            if !knot.value.is_finite() {
                return Err(PlaybackError::invalid_keyframes(format!(
                    "knot {idx} value is not finite"
                )));
            }
            if knot.time < last {
                return Err(PlaybackError::invalid_keyframes(format!(
                    "knot {idx} time {} precedes {last}",
                    knot.time
                )));
            }
            last = knot.time;
        }
        Ok(())
    }
}

/// Fraction of the full animation covered by `from..to`, wrapping when `from > to`.
#[inline]
pub fn progress_span(from: f32, to: f32) -> f32 {
    if from > to {
        (1.0 - from) + to
    } else {
        to - from
    }
}

/// Time fraction at which a wrap-around play reaches the end of the animation.
#[inline]
pub fn wrap_time(from: f32, to: f32) -> f32 {
    (1.0 - from) / ((1.0 - from) + to)
}

/// Wall-clock duration of a play covering `span` of an animation lasting `total`.
#[inline]
pub fn play_duration(total: Duration, span: f32) -> Duration {
    total.mul_f64(f64::from(span.clamp(0.0, 1.0)))
}
