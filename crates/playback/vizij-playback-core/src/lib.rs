//! Vizij Playback Core (engine-agnostic)
//!
//! Drives playback of a progress-parameterized animated visual. A host asks the
//! [`PlaybackCoordinator`] to play a normalized progress interval; the coordinator
//! builds a keyframe animation over the single scalar "progress" channel, hands it
//! to an [`AnimationEngine`], and returns a [`PlayCompletion`] future that resolves
//! when the play finishes, is superseded, stopped, or its progress is overridden.
//!
//! Collaborators (engine, progress store, content source) are traits so adapters
//! can bind the coordinator to a real compositor or to in-memory fakes.

pub mod completion;
pub mod config;
pub mod content;
pub mod coordinator;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod keyframes;
pub mod pause;
pub mod play;
pub mod visibility;

// Re-exports for consumers (adapters)
pub use completion::PlayCompletion;
pub use config::PlayerConfig;
pub use content::{AnimatedVisual, AnimatedVisualSource, ContentState, Size};
pub use coordinator::PlaybackCoordinator;
pub use dispatch::{Dispatcher, InlineDispatcher, OwnerQueue, Task};
pub use engine::{
    AnimationController, AnimationEngine, AnimationHandle, CompletionCallback, ProgressStore,
};
pub use error::PlaybackError;
pub use events::{ObserverId, PlayerEvent};
pub use ids::PlayId;
pub use keyframes::{Easing, IterationBehavior, KeyframeAnimation, Knot};
pub use pause::{ControllerCommand, PauseEvent, PauseState};
pub use play::{PlaySnapshot, PlaybackRequest};
pub use visibility::{VisibilityEdge, VisibilityGate};

/// Playback core result type
pub type Result<T> = core::result::Result<T, PlaybackError>;
