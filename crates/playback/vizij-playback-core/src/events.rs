//! Observable player events.
//!
//! Observers run after the coordinator has released its state lock, so they may
//! call straight back into the coordinator (play, stop, set progress...).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::PlayId;

/// Discrete signals emitted by the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PlayerEvent {
    /// A play was constructed and installed as the active play.
    PlayRequested {
        play: PlayId,
        from: f32,
        to: f32,
        looped: bool,
    },
    /// The play's engine animation is running.
    PlayStarted { play: PlayId },
    /// The play left the active slot and its awaiter was resolved.
    PlayCompleted { play: PlayId },
    IsPlayingChanged { is_playing: bool },
    ContentLoadedChanged { loaded: bool },
    /// The progress channel was written directly.
    ProgressWritten { value: f32 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

pub(crate) type Observer = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Registered observers in subscription order.
#[derive(Default)]
pub(crate) struct ObserverList {
    entries: Vec<(ObserverId, Observer)>,
}

impl ObserverList {
    pub(crate) fn insert(&mut self, id: ObserverId, observer: Observer) {
        self.entries.push((id, observer));
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(oid, _)| *oid != id);
        before != self.entries.len()
    }

    /// Clone out the observers so they can be called without holding a lock.
    pub(crate) fn snapshot(&self) -> Vec<Observer> {
        self.entries.iter().map(|(_, o)| o.clone()).collect()
    }
}
