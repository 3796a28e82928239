//! Content provider contracts and the coordinator's view of loaded content.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::ProgressStore;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    #[inline]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// A visual whose appearance is a function of a single progress value.
pub trait AnimatedVisual: Send + Sync {
    /// Time taken to play progress 0..1 at rate 1.
    fn duration(&self) -> Duration;

    fn size(&self) -> Size;

    /// The visual's own progress channel; `None` when the visual has no root.
    fn progress_channel(&self) -> Option<Arc<dyn ProgressStore>>;

    /// The visual will no longer be used.
    fn close(&self) {}
}

pub trait AnimatedVisualSource: Send + Sync {
    /// `None` means creation failed.
    fn try_create_animated_visual(&self) -> Option<Arc<dyn AnimatedVisual>>;
}

/// What the coordinator knows about its content.
#[derive(Clone, Default)]
pub enum ContentState {
    #[default]
    Unloaded,
    Loaded {
        visual: Arc<dyn AnimatedVisual>,
        duration: Duration,
        size: Size,
    },
}

impl ContentState {
    pub fn loaded(visual: Arc<dyn AnimatedVisual>) -> Self {
        Self::Loaded {
            duration: visual.duration(),
            size: visual.size(),
            visual,
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// Zero while unloaded.
    #[inline]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Loaded { duration, .. } => *duration,
            Self::Unloaded => Duration::ZERO,
        }
    }

    #[inline]
    pub fn size(&self) -> Size {
        match self {
            Self::Loaded { size, .. } => *size,
            Self::Unloaded => Size::ZERO,
        }
    }

    pub fn visual(&self) -> Option<&Arc<dyn AnimatedVisual>> {
        match self {
            Self::Loaded { visual, .. } => Some(visual),
            Self::Unloaded => None,
        }
    }
}

impl std::fmt::Debug for ContentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => f.write_str("Unloaded"),
            Self::Loaded { duration, size, .. } => f
                .debug_struct("Loaded")
                .field("duration", duration)
                .field("size", size)
                .finish_non_exhaustive(),
        }
    }
}
