//! The playback coordinator.
//!
//! Owns at most one active [`AnimationPlay`] and serializes requests against it.
//! Every entry point may be re-entered from an observer or a store write, so no
//! lock is held while calling the engine, the progress store, or observers. Any
//! work that outlives a call is keyed by [`PlayId`] and dropped when the play it
//! names is no longer active.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::completion::{self, PlayCompletion};
use crate::config::PlayerConfig;
use crate::content::{AnimatedVisualSource, ContentState, Size};
use crate::dispatch::{Dispatcher, InlineDispatcher};
use crate::engine::{AnimationEngine, CompletionCallback, ProgressStore};
use crate::events::{ObserverId, ObserverList, PlayerEvent};
use crate::ids::{IdAllocator, PlayId};
use crate::keyframes::KeyframeAnimation;
use crate::pause::PauseEvent;
use crate::play::{clamp_progress, AnimationPlay, PlaySnapshot, PlaybackRequest, StartPlan};
use crate::visibility::{VisibilityEdge, VisibilityGate};

struct PlayerState {
    ids: IdAllocator,
    active: Option<AnimationPlay>,
    /// Bumped by every `play` call. A `play` that observes a different value
    /// after re-entrant work has been superseded.
    request_version: u64,
    playback_rate: f64,
    is_playing: bool,
    auto_play: bool,
    visibility: VisibilityGate,
    source: Option<Arc<dyn AnimatedVisualSource>>,
    content: ContentState,
}

impl PlayerState {
    fn new(config: &PlayerConfig) -> Self {
        Self {
            ids: IdAllocator::new(),
            active: None,
            request_version: 0,
            playback_rate: config.playback_rate,
            is_playing: false,
            auto_play: config.auto_play,
            visibility: VisibilityGate::new(),
            source: None,
            content: ContentState::Unloaded,
        }
    }

    fn active_id(&self) -> Option<PlayId> {
        self.active.as_ref().map(AnimationPlay::id)
    }

    /// Returns true when the flag changed.
    fn set_playing(&mut self, playing: bool) -> bool {
        let changed = self.is_playing != playing;
        self.is_playing = playing;
        changed
    }
}

struct Inner {
    config: PlayerConfig,
    engine: Arc<dyn AnimationEngine>,
    store: Arc<dyn ProgressStore>,
    dispatcher: Arc<dyn Dispatcher>,
    state: Mutex<PlayerState>,
    observers: Mutex<ObserverList>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(play) = self.state.get_mut().active.take() {
            warn!(play = %play.id(), "coordinator dropped with an active play; resolving it");
            play.resolve();
        }
    }
}

/// Coordinates playback of one animated visual's progress.
///
/// Cheap to clone; clones share the same player.
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<Inner>,
}

impl PlaybackCoordinator {
    /// Engine completions are handled on whatever thread signals them.
    pub fn new(
        config: PlayerConfig,
        engine: Arc<dyn AnimationEngine>,
        store: Arc<dyn ProgressStore>,
    ) -> crate::Result<Self> {
        Self::with_dispatcher(config, engine, store, Arc::new(InlineDispatcher))
    }

    /// Engine completions are routed through `dispatcher` before they touch
    /// player state.
    pub fn with_dispatcher(
        config: PlayerConfig,
        engine: Arc<dyn AnimationEngine>,
        store: Arc<dyn ProgressStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> crate::Result<Self> {
        if let Err(err) = config.validate() {
            warn!(category = err.category(), %err, "rejecting player config");
            return Err(err);
        }
        debug!(?config, "playback coordinator created");
        let state = PlayerState::new(&config);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                engine,
                store,
                dispatcher,
                state: Mutex::new(state),
                observers: Mutex::new(ObserverList::default()),
            }),
        })
    }

    #[inline]
    fn supported(&self) -> bool {
        self.inner.config.playback_supported
    }

    // ---------- play lifecycle ----------

    /// Play `from..to`, wrapping past 1 when `from > to`.
    ///
    /// Any current play completes first. The returned future resolves when this
    /// play completes, or immediately if a newer request superseded it before it
    /// was installed.
    pub fn play(&self, from: f64, to: f64, looped: bool) -> PlayCompletion {
        if !self.supported() {
            return PlayCompletion::resolved();
        }

        let version = {
            let mut state = self.inner.state.lock();
            state.request_version += 1;
            state.request_version
        };
        debug!(version, from, to, looped, "play requested");

        // Return the store to the current play's start. May re-enter.
        self.stop();
        if self.is_superseded(version) {
            debug!(version, "play superseded while stopping");
            return PlayCompletion::resolved();
        }

        // A play that was never started has nothing to stop. May re-enter.
        self.complete_current_play();
        if self.is_superseded(version) {
            debug!(version, "play superseded while completing previous play");
            return PlayCompletion::resolved();
        }

        let request = PlaybackRequest::new(from, to, looped);
        let (completer, completion) = completion::channel();
        let (id, start_now) = {
            let mut state = self.inner.state.lock();
            debug_assert!(state.active.is_none(), "more than one active play");
            let id = state.ids.alloc_play();
            let loaded = state.content.is_loaded();
            let total = loaded.then(|| state.content.duration());
            let hidden = state.visibility.is_hidden();
            state.active = Some(AnimationPlay::new(id, request, total, hidden, completer));
            (id, loaded)
        };

        self.emit(PlayerEvent::PlayRequested {
            play: id,
            from: request.from(),
            to: request.to(),
            looped: request.looped(),
        });

        if start_now {
            self.start_play(id);
        } else {
            debug!(play = %id, "content not loaded; play pending");
        }
        completion
    }

    fn is_superseded(&self, version: u64) -> bool {
        self.inner.state.lock().request_version != version
    }

    fn start_play(&self, id: PlayId) {
        let plan = {
            let mut state = self.inner.state.lock();
            let total = state.content.duration();
            let min_animated = self.inner.config.min_animated_duration();
            match state.active.as_mut() {
                Some(play) if play.id() == id => play.plan_start(total, min_animated),
                _ => {
                    trace!(play = %id, "start for inactive play ignored");
                    return;
                }
            }
        };

        match plan {
            StartPlan::Degenerate { from } => {
                debug!(play = %id, from, "play below animation floor; jumping to start");
                self.write_progress(from, Some(id));
            }
            StartPlan::Animate { animation } => self.start_animation(id, animation),
        }
    }

    fn start_animation(&self, id: PlayId, animation: KeyframeAnimation) {
        let duration = animation.duration;
        // Looped animations never complete on their own.
        let on_complete = (!animation.is_looped()).then(|| self.completion_callback(id));
        let handle = self
            .inner
            .engine
            .start_keyframe_animation(animation, on_complete);

        let (controller, paused, rate, changed) = {
            let mut state = self.inner.state.lock();
            let rate = state.playback_rate;
            let attached = match state.active.as_mut().filter(|p| p.id() == id) {
                Some(play) => Ok((play.attach(handle), play.is_paused())),
                None => Err(handle),
            };
            match attached {
                Ok((controller, paused)) => (controller, paused, rate, state.set_playing(true)),
                Err(handle) => {
                    drop(state);
                    debug!(play = %id, "play superseded while engine started; releasing animation");
                    handle.cancel_completion();
                    return;
                }
            }
        };

        if paused {
            controller.pause();
        }
        controller.set_playback_rate(rate as f32);
        if rate < 0.0 {
            // Reverse playback starts from the end of the keyframes.
            controller.seek(1.0);
        }
        debug!(play = %id, duration_ms = duration.as_millis() as u64, rate, paused, "play started");

        // Observers of either event may supersede the play, and an engine
        // completion may land in between; never announce a play that has left
        // the slot.
        if changed && self.is_playing_id(id) {
            self.emit(PlayerEvent::IsPlayingChanged { is_playing: true });
        }
        if self.is_playing_id(id) {
            self.emit(PlayerEvent::PlayStarted { play: id });
        } else {
            debug!(play = %id, "play left the slot before its start was announced");
        }
    }

    fn is_playing_id(&self, id: PlayId) -> bool {
        let state = self.inner.state.lock();
        state.is_playing && state.active_id() == Some(id)
    }

    /// Engine callback: hop through the dispatcher, then complete `id` if the
    /// player still exists and `id` is still active.
    fn completion_callback(&self, id: PlayId) -> CompletionCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let dispatcher = self.inner.dispatcher.clone();
        Box::new(move || {
            dispatcher.dispatch(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    trace!(play = %id, "engine completion after player dropped");
                    return;
                };
                trace!(play = %id, "engine completion");
                PlaybackCoordinator { inner }.complete_play(id);
            }));
        })
    }

    /// Complete `id` if it is the active play. Stale ids are ignored.
    fn complete_play(&self, id: PlayId) {
        let (play, changed) = {
            let mut state = self.inner.state.lock();
            if state.active_id() != Some(id) {
                trace!(play = %id, "completion for inactive play ignored");
                return;
            }
            let Some(play) = state.active.take() else {
                return;
            };
            (play, state.set_playing(false))
        };

        debug!(play = %id, "play completed");
        if changed {
            self.emit(PlayerEvent::IsPlayingChanged { is_playing: false });
        }
        // Resolving also releases the engine animation.
        play.resolve();
        self.emit(PlayerEvent::PlayCompleted { play: id });
    }

    fn complete_current_play(&self) {
        let active = self.inner.state.lock().active_id();
        if let Some(id) = active {
            self.complete_play(id);
        }
    }

    /// Write the current play's `from` to the store, completing it.
    pub fn stop(&self) {
        if !self.supported() {
            return;
        }
        let target = {
            let state = self.inner.state.lock();
            state.active.as_ref().map(|p| (p.id(), p.from_progress()))
        };
        if let Some((id, from)) = target {
            debug!(play = %id, from, "stopping play");
            self.write_progress(from, Some(id));
        }
    }

    /// Write `progress` (clamped to [0,1]) to the store and complete the play
    /// that was active when the call began.
    pub fn set_progress(&self, progress: f64) {
        if !self.supported() {
            return;
        }
        let value = clamp_progress(progress);
        let target = self.inner.state.lock().active_id();
        self.write_progress(value, target);
    }

    fn write_progress(&self, value: f32, target: Option<PlayId>) {
        // A direct write interrupts any engine animation on the store.
        self.inner.store.write(value);
        trace!(value, "progress written");
        self.emit(PlayerEvent::ProgressWritten { value });
        // Looped plays never complete on their own.
        if let Some(id) = target {
            self.complete_play(id);
        }
    }

    // ---------- pause and visibility ----------

    pub fn pause(&self) {
        if self.supported() {
            self.apply_pause_event(PauseEvent::Pause);
        }
    }

    pub fn resume(&self) {
        if self.supported() {
            self.apply_pause_event(PauseEvent::Resume);
        }
    }

    fn apply_pause_event(&self, event: PauseEvent) {
        let command = {
            let mut state = self.inner.state.lock();
            state.active.as_mut().and_then(|p| p.apply(event))
        };
        if let Some((command, controller)) = command {
            trace!(?command, "controller command");
            command.apply_to(controller.as_ref());
        }
    }

    /// Application is being suspended.
    pub fn app_suspending(&self) {
        self.update_visibility(|gate| gate.set_suspended(true));
    }

    pub fn app_resuming(&self) {
        self.update_visibility(|gate| gate.set_suspended(false));
    }

    /// The host element's visibility changed.
    pub fn host_visibility_changed(&self, visible: bool) {
        self.update_visibility(|gate| gate.set_host_visible(visible));
    }

    fn update_visibility(&self, change: impl FnOnce(&mut VisibilityGate) -> Option<VisibilityEdge>) {
        let command = {
            let mut state = self.inner.state.lock();
            let Some(edge) = change(&mut state.visibility) else {
                return;
            };
            debug!(
                ?edge,
                suspended = state.visibility.is_suspended(),
                host_visible = state.visibility.is_host_visible(),
                "visibility edge"
            );
            state.active.as_mut().and_then(|p| p.apply(edge.into()))
        };
        if let Some((command, controller)) = command {
            trace!(?command, "controller command");
            command.apply_to(controller.as_ref());
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.state.lock().visibility.is_hidden()
    }

    // ---------- rate, autoplay, accessors ----------

    /// Applies to the running animation immediately and to later plays.
    /// Non-finite rates are ignored.
    pub fn set_playback_rate(&self, rate: f64) {
        if !self.supported() {
            return;
        }
        if !rate.is_finite() {
            warn!(rate, "ignoring non-finite playback rate");
            return;
        }
        let controller = {
            let mut state = self.inner.state.lock();
            state.playback_rate = rate;
            state.active.as_ref().and_then(AnimationPlay::controller)
        };
        if let Some(controller) = controller {
            controller.set_playback_rate(rate as f32);
        }
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.state.lock().playback_rate
    }

    /// True between a play's engine start and its completion.
    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing
    }

    /// Current value of the progress store.
    pub fn progress(&self) -> f32 {
        self.inner.store.value()
    }

    pub fn active_play(&self) -> Option<PlaySnapshot> {
        self.inner.state.lock().active.as_ref().map(AnimationPlay::snapshot)
    }

    pub fn auto_play(&self) -> bool {
        self.inner.state.lock().auto_play
    }

    /// Enabling autoplay with content loaded and nothing active starts a looped
    /// full-range play.
    pub fn set_auto_play(&self, enabled: bool) {
        let should_play = {
            let mut state = self.inner.state.lock();
            state.auto_play = enabled;
            enabled && state.content.is_loaded() && state.active.is_none()
        };
        if should_play {
            debug!("autoplay enabled; starting looped play");
            drop(self.play(0.0, 1.0, true));
        }
    }

    // ---------- content ----------

    /// Replace the content source and reload. `None` leaves the player empty.
    pub fn set_source(&self, source: Option<Arc<dyn AnimatedVisualSource>>) {
        self.complete_current_play();
        self.inner.state.lock().source = source;
        self.update_content();
    }

    /// The source's content changed; rebuild the visual.
    pub fn invalidate_content(&self) {
        debug!("content invalidated");
        self.update_content();
    }

    pub fn is_content_loaded(&self) -> bool {
        self.inner.state.lock().content.is_loaded()
    }

    /// Zero while no content is loaded.
    pub fn duration(&self) -> Duration {
        self.inner.state.lock().content.duration()
    }

    pub fn content_size(&self) -> Size {
        self.inner.state.lock().content.size()
    }

    fn update_content(&self) {
        self.unload_content();
        if !self.supported() {
            return;
        }

        let source = self.inner.state.lock().source.clone();
        let Some(source) = source else {
            debug!("no content source");
            return;
        };

        let Some(visual) = source.try_create_animated_visual() else {
            warn!("content source failed to create an animated visual");
            // A play requested during loading must not be left pending.
            self.complete_current_play();
            return;
        };

        let Some(channel) = visual.progress_channel() else {
            debug!("animated visual has no root; nothing to load");
            return;
        };
        if visual.size().is_zero() {
            debug!("animated visual is empty; nothing to load");
            return;
        }

        // The visual follows the player's store from here on.
        channel.write(0.0);
        channel.bind_expression(self.inner.store.clone());

        let content = ContentState::loaded(visual);
        debug!(?content, "content loaded");
        self.inner.state.lock().content = content;
        // May re-enter.
        self.emit(PlayerEvent::ContentLoadedChanged { loaded: true });

        let (pending, auto_play) = {
            let state = self.inner.state.lock();
            let pending = state
                .active
                .as_ref()
                .filter(|p| !p.is_started())
                .map(AnimationPlay::id);
            let idle = state.active.is_none() && state.content.is_loaded();
            (pending, state.auto_play && idle)
        };
        if let Some(id) = pending {
            debug!(play = %id, "starting pending play");
            self.start_play(id);
        } else if auto_play {
            debug!("autoplay starting looped play");
            drop(self.play(0.0, 1.0, true));
        }
    }

    fn unload_content(&self) {
        if !self.supported() || !self.is_content_loaded() {
            return;
        }

        // Completes the active play.
        self.stop();

        let previous = std::mem::take(&mut self.inner.state.lock().content);
        // A play started by an observer while stopping would target the old visual.
        self.complete_current_play();
        if let Some(visual) = previous.visual() {
            visual.close();
        }
        debug!("content unloaded");
        self.emit(PlayerEvent::ContentLoadedChanged { loaded: false });
    }

    // ---------- observers ----------

    /// Register an observer. It runs on whichever thread produced the event,
    /// with no player lock held.
    ///
    /// The player owns its observers. An observer that captures a clone of
    /// this coordinator keeps the player alive until it is unsubscribed or
    /// [`close`](Self::close) runs; until then dropping the handles does not
    /// tear the player down.
    pub fn subscribe(&self, observer: impl Fn(&PlayerEvent) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.inner.state.lock().ids.alloc_observer());
        self.inner.observers.lock().insert(id, Arc::new(observer));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.inner.observers.lock().remove(id)
    }

    /// Tear the player down: complete the active play and drop every observer.
    ///
    /// Breaks reference cycles formed by observers holding a coordinator clone.
    /// The player stays usable, with no observers.
    pub fn close(&self) {
        self.complete_current_play();
        let dropped = std::mem::take(&mut *self.inner.observers.lock());
        debug!("player closed");
        drop(dropped);
    }

    fn emit(&self, event: PlayerEvent) {
        let observers = self.inner.observers.lock().snapshot();
        for observer in observers {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlaybackCoordinator")
            .field("active", &state.active_id())
            .field("is_playing", &state.is_playing)
            .field("playback_rate", &state.playback_rate)
            .field("visibility", &state.visibility)
            .field("content", &state.content)
            .finish_non_exhaustive()
    }
}
