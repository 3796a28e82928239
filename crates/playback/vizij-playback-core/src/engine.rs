//! Collaborator contracts: the animation engine that drives the progress channel
//! and the store that holds the channel's current value.
//!
//! Implementations live in adapters (compositor bindings, test fakes). All
//! methods take `&self`; implementations use interior mutability because the
//! engine may signal completion from its own thread.

use std::sync::Arc;

use crate::keyframes::KeyframeAnimation;

/// Invoked by the engine, at most once, when a finite animation finishes all of
/// its iterations. May run on any thread.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Live control over a running animation.
pub trait AnimationController: Send + Sync {
    fn pause(&self);
    fn resume(&self);
    fn set_playback_rate(&self, rate: f32);
    /// Move the playhead to a normalized position in [0,1].
    fn seek(&self, progress: f32);
}

/// Ownership of one running engine animation. Dropping the handle releases the
/// controller.
pub trait AnimationHandle: Send + Sync {
    fn controller(&self) -> Arc<dyn AnimationController>;

    /// Detach the completion callback registered at start, if it has not fired.
    fn cancel_completion(&self);
}

/// Time-based keyframe animation over the player's progress channel.
pub trait AnimationEngine: Send + Sync {
    /// Start `animation` on the progress channel, pre-empting whatever animation
    /// currently drives it. `on_complete` is only supplied for finite animations;
    /// looping animations never complete on their own.
    fn start_keyframe_animation(
        &self,
        animation: KeyframeAnimation,
        on_complete: Option<CompletionCallback>,
    ) -> Box<dyn AnimationHandle>;
}

/// Scalar progress channel.
pub trait ProgressStore: Send + Sync {
    /// Overwrite the value. Pre-empts any animation driving the channel.
    fn write(&self, value: f32);

    fn value(&self) -> f32;

    /// Continuously mirror `source` into this channel.
    fn bind_expression(&self, source: Arc<dyn ProgressStore>);
}
