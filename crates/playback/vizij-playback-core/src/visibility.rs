//! Visibility gate: folds app suspend/resume and host visibility into a single
//! hide/unhide edge.

use serde::{Deserialize, Serialize};

use crate::pause::PauseEvent;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibilityEdge {
    Hiding,
    Unhiding,
}

impl From<VisibilityEdge> for PauseEvent {
    fn from(edge: VisibilityEdge) -> Self {
        match edge {
            VisibilityEdge::Hiding => PauseEvent::Hide,
            VisibilityEdge::Unhiding => PauseEvent::Unhide,
        }
    }
}

/// Tracks the two visibility signals. Content is hidden while the app is
/// suspended or the host is invisible; only changes of that condition produce
/// an edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityGate {
    suspended: bool,
    host_visible: bool,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self {
            suspended: false,
            host_visible: true,
        }
    }
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.suspended || !self.host_visible
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    #[inline]
    pub fn is_host_visible(&self) -> bool {
        self.host_visible
    }

    pub fn set_suspended(&mut self, suspended: bool) -> Option<VisibilityEdge> {
        self.update(|gate| gate.suspended = suspended)
    }

    pub fn set_host_visible(&mut self, visible: bool) -> Option<VisibilityEdge> {
        self.update(|gate| gate.host_visible = visible)
    }

    fn update(&mut self, change: impl FnOnce(&mut Self)) -> Option<VisibilityEdge> {
        let was_hidden = self.is_hidden();
        change(self);
        match (was_hidden, self.is_hidden()) {
            (false, true) => Some(VisibilityEdge::Hiding),
            (true, false) => Some(VisibilityEdge::Unhiding),
            _ => None,
        }
    }
}
