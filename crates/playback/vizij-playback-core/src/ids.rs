//! Identifiers for plays and observers.

use serde::{Deserialize, Serialize};

/// Identifies one [`crate::play::AnimationPlay`] for the lifetime of a coordinator.
/// Deferred work (engine completion, start after content load) refers to plays by
/// id so it becomes a no-op once the play has left the active slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PlayId(pub u64);

impl std::fmt::Display for PlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "play#{}", self.0)
    }
}

/// Monotonic allocator for PlayId and observer ids.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_play: u64,
    next_observer: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_play(&mut self) -> PlayId {
        let id = PlayId(self.next_play);
        self.next_play = self.next_play.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_observer(&mut self) -> u64 {
        let id = self.next_observer;
        self.next_observer = self.next_observer.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_play(), PlayId(0));
        assert_eq!(alloc.alloc_play(), PlayId(1));
        assert_eq!(alloc.alloc_observer(), 0);
        assert_eq!(alloc.alloc_observer(), 1);
    }

    #[test]
    fn display_is_tagged() {
        assert_eq!(PlayId(7).to_string(), "play#7");
    }
}
