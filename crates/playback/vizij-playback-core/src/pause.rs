//! Two-source pause state for a play.
//!
//! A play can be paused by the user, hidden by visibility (app suspended or host
//! invisible), both, or neither. The engine controller only sees the edges of the
//! combined state: it is paused when the first source appears and resumed when
//! the last one clears. Neither source can override the other.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseState {
    #[default]
    Running,
    User,
    Hidden,
    Both,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseEvent {
    Pause,
    Resume,
    Hide,
    Unhide,
}

/// What the engine controller has to do after a transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerCommand {
    Pause,
    Resume,
}

impl PauseState {
    #[inline]
    pub fn from_flags(user: bool, hidden: bool) -> Self {
        match (user, hidden) {
            (false, false) => Self::Running,
            (true, false) => Self::User,
            (false, true) => Self::Hidden,
            (true, true) => Self::Both,
        }
    }

    #[inline]
    pub fn user_paused(self) -> bool {
        matches!(self, Self::User | Self::Both)
    }

    #[inline]
    pub fn hidden(self) -> bool {
        matches!(self, Self::Hidden | Self::Both)
    }

    /// Effective pause: either source holds the play.
    #[inline]
    pub fn is_paused(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Apply an event, returning the new state and the controller command needed
    /// to reflect it. Repeated events are no-ops.
    pub fn transition(self, event: PauseEvent) -> (PauseState, Option<ControllerCommand>) {
        let (user, hidden) = (self.user_paused(), self.hidden());
        let next = match event {
            PauseEvent::Pause => Self::from_flags(true, hidden),
            PauseEvent::Resume => Self::from_flags(false, hidden),
            PauseEvent::Hide => Self::from_flags(user, true),
            PauseEvent::Unhide => Self::from_flags(user, false),
        };
        let command = match (self.is_paused(), next.is_paused()) {
            (false, true) => Some(ControllerCommand::Pause),
            (true, false) => Some(ControllerCommand::Resume),
            _ => None,
        };
        (next, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_never_overrides_hide() {
        let (s, cmd) = PauseState::Running.transition(PauseEvent::Hide);
        assert_eq!((s, cmd), (PauseState::Hidden, Some(ControllerCommand::Pause)));

        let (s, cmd) = s.transition(PauseEvent::Pause);
        assert_eq!((s, cmd), (PauseState::Both, None));

        let (s, cmd) = s.transition(PauseEvent::Resume);
        assert_eq!((s, cmd), (PauseState::Hidden, None));

        let (s, cmd) = s.transition(PauseEvent::Unhide);
        assert_eq!((s, cmd), (PauseState::Running, Some(ControllerCommand::Resume)));
    }

    #[test]
    fn unhide_never_overrides_user_pause() {
        let (s, _) = PauseState::Running.transition(PauseEvent::Pause);
        let (s, cmd) = s.transition(PauseEvent::Hide);
        assert_eq!((s, cmd), (PauseState::Both, None));
        let (s, cmd) = s.transition(PauseEvent::Unhide);
        assert_eq!((s, cmd), (PauseState::User, None));
        let (s, cmd) = s.transition(PauseEvent::Resume);
        assert_eq!((s, cmd), (PauseState::Running, Some(ControllerCommand::Resume)));
    }

    #[test]
    fn repeated_events_are_idempotent() {
        for state in [
            PauseState::Running,
            PauseState::User,
            PauseState::Hidden,
            PauseState::Both,
        ] {
            for event in [
                PauseEvent::Pause,
                PauseEvent::Resume,
                PauseEvent::Hide,
                PauseEvent::Unhide,
            ] {
                let (once, _) = state.transition(event);
                let (twice, cmd) = once.transition(event);
                assert_eq!(once, twice);
                assert_eq!(cmd, None, "{state:?} + {event:?} twice");
            }
        }
    }
}
