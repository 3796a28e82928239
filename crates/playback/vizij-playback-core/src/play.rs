//! One playback session over a progress interval.
//!
//! An `AnimationPlay` lives in the coordinator's single active slot. It owns the
//! engine animation for as long as it is active and the completer of whoever
//! awaits it. It never calls back into the coordinator: the coordinator asks it
//! for a plan or a command, releases its lock, then talks to the engine.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::completion::Completer;
use crate::engine::{AnimationController, AnimationHandle};
use crate::ids::PlayId;
use crate::keyframes::{play_duration, progress_span, KeyframeAnimation};
use crate::pause::{ControllerCommand, PauseEvent, PauseState};

/// Clamp a host-supplied progress into [0,1]. NaN maps to 0.
#[inline]
pub fn clamp_progress(value: f64) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        (value as f32).clamp(0.0, 1.0)
    }
}

/// A normalized, clamped play request. Immutable once built.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    from: f32,
    to: f32,
    looped: bool,
}

impl PlaybackRequest {
    /// Normalize degenerate ranges then clamp.
    ///
    /// `[from..0]` with `from > 0` plays to the very end, so it becomes `[from..1]`;
    /// `[1..to]` with `to > 0` starts at the very beginning, so it becomes `[0..to]`.
    /// Both avoid generating wrap-around keyframes for a plain forward span.
    pub fn new(from: f64, to: f64, looped: bool) -> Self {
        let (mut from, mut to) = (from, to);
        if to == 0.0 && from > 0.0 {
            to = 1.0;
        }
        if to > 0.0 && from == 1.0 {
            from = 0.0;
        }
        Self {
            from: clamp_progress(from),
            to: clamp_progress(to),
            looped,
        }
    }

    #[inline]
    pub fn from(&self) -> f32 {
        self.from
    }

    #[inline]
    pub fn to(&self) -> f32 {
        self.to
    }

    #[inline]
    pub fn looped(&self) -> bool {
        self.looped
    }

    /// Fraction of the animation this request covers.
    #[inline]
    pub fn span(&self) -> f32 {
        progress_span(self.from, self.to)
    }
}

/// Diagnostic view of the active play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaySnapshot {
    pub id: PlayId,
    pub from: f32,
    pub to: f32,
    pub looped: bool,
    pub duration: Option<Duration>,
    pub started: bool,
    pub animating: bool,
    pub pause: PauseState,
}

/// How a play should be started.
pub(crate) enum StartPlan {
    /// Too short to animate: jump to `from` and complete.
    Degenerate { from: f32 },
    Animate { animation: KeyframeAnimation },
}

struct EngineAttachment {
    handle: Box<dyn AnimationHandle>,
    controller: Arc<dyn AnimationController>,
}

impl Drop for EngineAttachment {
    fn drop(&mut self) {
        self.handle.cancel_completion();
    }
}

pub(crate) struct AnimationPlay {
    id: PlayId,
    request: PlaybackRequest,
    duration: Option<Duration>,
    pause: PauseState,
    started: bool,
    engine: Option<EngineAttachment>,
    completer: Completer,
}

impl AnimationPlay {
    /// `total` is the content duration when content is already loaded; otherwise
    /// the play duration is fixed when the play starts.
    pub(crate) fn new(
        id: PlayId,
        request: PlaybackRequest,
        total: Option<Duration>,
        hidden: bool,
        completer: Completer,
    ) -> Self {
        Self {
            id,
            duration: total.map(|t| play_duration(t, request.span())),
            request,
            pause: PauseState::from_flags(false, hidden),
            started: false,
            engine: None,
            completer,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> PlayId {
        self.id
    }

    #[inline]
    pub(crate) fn from_progress(&self) -> f32 {
        self.request.from()
    }

    #[inline]
    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    /// Either pause source holds the play.
    #[inline]
    pub(crate) fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub(crate) fn controller(&self) -> Option<Arc<dyn AnimationController>> {
        self.engine.as_ref().map(|e| e.controller.clone())
    }

    /// Mark the play started and decide how to run it. Starting twice is a bug.
    pub(crate) fn plan_start(&mut self, total: Duration, min_animated: Duration) -> StartPlan {
        debug_assert!(!self.started, "{} started twice", self.id);
        self.started = true;

        let span = self.request.span();
        let duration = *self
            .duration
            .get_or_insert_with(|| play_duration(total, span));

        if duration < min_animated {
            return StartPlan::Degenerate {
                from: self.request.from(),
            };
        }

        StartPlan::Animate {
            animation: KeyframeAnimation::for_interval(
                self.request.from(),
                self.request.to(),
                self.request.looped(),
                duration,
            ),
        }
    }

    /// Take ownership of the running engine animation.
    pub(crate) fn attach(&mut self, handle: Box<dyn AnimationHandle>) -> Arc<dyn AnimationController> {
        debug_assert!(self.engine.is_none(), "{} attached twice", self.id);
        let controller = handle.controller();
        self.engine = Some(EngineAttachment {
            handle,
            controller: controller.clone(),
        });
        controller
    }

    /// Record a pause/visibility event. Before start the state is only queued; the
    /// returned command is for a controller that already exists.
    pub(crate) fn apply(
        &mut self,
        event: PauseEvent,
    ) -> Option<(ControllerCommand, Arc<dyn AnimationController>)> {
        let (next, command) = self.pause.transition(event);
        trace!(play = %self.id, ?event, from = ?self.pause, to = ?next, "pause transition");
        self.pause = next;
        let command = command?;
        self.controller().map(|c| (command, c))
    }

    /// Unsubscribe from engine completion and release the controller.
    pub(crate) fn release_engine(&mut self) {
        self.engine.take();
    }

    /// Resolve the awaiter. Consumes the play: nothing may use it afterwards.
    pub(crate) fn resolve(mut self) {
        self.release_engine();
        self.completer.resolve();
    }

    pub(crate) fn snapshot(&self) -> PlaySnapshot {
        PlaySnapshot {
            id: self.id,
            from: self.request.from(),
            to: self.request.to(),
            looped: self.request.looped(),
            duration: self.duration,
            started: self.started,
            animating: self.engine.is_some(),
            pause: self.pause,
        }
    }
}

impl ControllerCommand {
    pub(crate) fn apply_to(self, controller: &dyn AnimationController) {
        match self {
            ControllerCommand::Pause => controller.pause(),
            ControllerCommand::Resume => controller.resume(),
        }
    }
}
