use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use vizij_playback_core::{
    AnimatedVisual, AnimatedVisualSource, AnimationController, AnimationEngine, AnimationHandle,
    CompletionCallback, Dispatcher, KeyframeAnimation, PlaybackCoordinator, PlayerConfig,
    PlayerEvent, ProgressStore, Size,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenarios: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// A single play request against freshly loaded content, with its expected
/// outcome.
#[derive(Clone, Debug, Deserialize)]
pub struct PlayScenario {
    pub total_ms: u64,
    pub from: f64,
    pub to: f64,
    #[serde(default)]
    pub looped: bool,
    pub expect: ScenarioExpectation,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioExpectation {
    /// Normalized request as seen by the player.
    pub from: f32,
    pub to: f32,
    /// None means no engine animation is created.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// `[time, value]` pairs.
    #[serde(default)]
    pub knots: Vec<[f32; 2]>,
    /// Store value written directly, if any.
    #[serde(default)]
    pub store_writes: Vec<f32>,
    /// The play resolves within the `play` call.
    #[serde(default)]
    pub completes_synchronously: bool,
}

pub mod scenarios {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.scenarios.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.scenarios, "scenario", name)?;
        read_to_string(rel)
    }

    pub fn load(name: &str) -> Result<PlayScenario> {
        let rel = lookup(&MANIFEST.scenarios, "scenario", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.scenarios, "scenario", name)?;
        Ok(resolve_path(rel))
    }
}

// ---------- progress store ----------

type WriteHook = Arc<dyn Fn(f32) + Send + Sync>;

#[derive(Default)]
struct StoreState {
    value: f32,
    writes: Vec<f32>,
    bound_to: Option<Arc<dyn ProgressStore>>,
}

/// In-memory progress channel. A bound store reads through to its source.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    on_write: Mutex<Option<WriteHook>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every direct write, in order.
    pub fn writes(&self) -> Vec<f32> {
        self.state.lock().writes.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().bound_to.is_some()
    }

    /// Run `hook` after each write, with no store lock held.
    pub fn on_write(&self, hook: impl Fn(f32) + Send + Sync + 'static) {
        *self.on_write.lock() = Some(Arc::new(hook));
    }
}

impl ProgressStore for FakeStore {
    fn write(&self, value: f32) {
        {
            let mut state = self.state.lock();
            state.value = value;
            state.writes.push(value);
        }
        let hook = self.on_write.lock().clone();
        if let Some(hook) = hook {
            hook(value);
        }
    }

    fn value(&self) -> f32 {
        let state = self.state.lock();
        match &state.bound_to {
            Some(source) => source.value(),
            None => state.value,
        }
    }

    fn bind_expression(&self, source: Arc<dyn ProgressStore>) {
        self.state.lock().bound_to = Some(source);
    }
}

// ---------- animation engine ----------

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ControllerCall {
    Pause,
    Resume,
    SetRate(f32),
    Seek(f32),
}

struct AnimationRecord {
    animation: KeyframeAnimation,
    calls: Vec<ControllerCall>,
    on_complete: Option<CompletionCallback>,
    subscribed: bool,
    released: bool,
}

type SharedRecord = Arc<Mutex<AnimationRecord>>;

struct FakeController {
    record: SharedRecord,
}

impl FakeController {
    fn push(&self, call: ControllerCall) {
        self.record.lock().calls.push(call);
    }
}

impl AnimationController for FakeController {
    fn pause(&self) {
        self.push(ControllerCall::Pause);
    }

    fn resume(&self) {
        self.push(ControllerCall::Resume);
    }

    fn set_playback_rate(&self, rate: f32) {
        self.push(ControllerCall::SetRate(rate));
    }

    fn seek(&self, progress: f32) {
        self.push(ControllerCall::Seek(progress));
    }
}

struct FakeHandle {
    record: SharedRecord,
    controller: Arc<FakeController>,
}

impl AnimationHandle for FakeHandle {
    fn controller(&self) -> Arc<dyn AnimationController> {
        self.controller.clone()
    }

    fn cancel_completion(&self) {
        self.record.lock().on_complete = None;
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.record.lock().released = true;
    }
}

/// Records every animation started and every controller call made on it.
/// Completion fires only when a test asks for it.
#[derive(Default)]
pub struct FakeEngine {
    animations: Mutex<Vec<SharedRecord>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> usize {
        self.animations.lock().len()
    }

    fn record(&self, index: usize) -> SharedRecord {
        self.animations
            .lock()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no animation #{index} was started"))
    }

    pub fn animation(&self, index: usize) -> KeyframeAnimation {
        self.record(index).lock().animation.clone()
    }

    pub fn calls(&self, index: usize) -> Vec<ControllerCall> {
        self.record(index).lock().calls.clone()
    }

    /// Completion was requested when the animation started.
    pub fn subscribed(&self, index: usize) -> bool {
        self.record(index).lock().subscribed
    }

    /// The player dropped its handle.
    pub fn is_released(&self, index: usize) -> bool {
        self.record(index).lock().released
    }

    /// Fire the completion callback on this thread. Returns false when there
    /// was none (looped, cancelled, or already fired).
    pub fn complete(&self, index: usize) -> bool {
        let callback = self.record(index).lock().on_complete.take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Fire the completion callback on a fresh thread, the way a compositor
    /// signals batch completion.
    pub fn complete_on_thread(&self, index: usize) -> Option<JoinHandle<()>> {
        let callback = self.record(index).lock().on_complete.take()?;
        Some(std::thread::spawn(callback))
    }
}

impl AnimationEngine for FakeEngine {
    fn start_keyframe_animation(
        &self,
        animation: KeyframeAnimation,
        on_complete: Option<CompletionCallback>,
    ) -> Box<dyn AnimationHandle> {
        if let Err(err) = animation.validate() {
            panic!("player built invalid keyframes: {err}");
        }
        let record = Arc::new(Mutex::new(AnimationRecord {
            animation,
            calls: Vec::new(),
            subscribed: on_complete.is_some(),
            on_complete,
            released: false,
        }));
        self.animations.lock().push(record.clone());
        Box::new(FakeHandle {
            controller: Arc::new(FakeController {
                record: record.clone(),
            }),
            record,
        })
    }
}

// ---------- content ----------

pub struct FakeVisual {
    duration: Duration,
    size: Size,
    channel: Option<Arc<FakeStore>>,
    closed: AtomicBool,
}

impl FakeVisual {
    pub fn channel(&self) -> Option<&Arc<FakeStore>> {
        self.channel.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AnimatedVisual for FakeVisual {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn size(&self) -> Size {
        self.size
    }

    fn progress_channel(&self) -> Option<Arc<dyn ProgressStore>> {
        self.channel
            .clone()
            .map(|c| c as Arc<dyn ProgressStore>)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceBehavior {
    Ok,
    /// Creation fails.
    Fails,
    /// The visual has no root.
    NoRoot,
    /// The visual has zero size.
    Empty,
}

/// Creates a fresh [`FakeVisual`] on every call and keeps them for inspection.
pub struct FakeSource {
    duration: Duration,
    behavior: Mutex<SourceBehavior>,
    created: Mutex<Vec<Arc<FakeVisual>>>,
    attempts: AtomicUsize,
}

impl FakeSource {
    pub fn new(duration_ms: u64) -> Arc<Self> {
        Self::with_behavior(duration_ms, SourceBehavior::Ok)
    }

    pub fn with_behavior(duration_ms: u64, behavior: SourceBehavior) -> Arc<Self> {
        Arc::new(Self {
            duration: Duration::from_millis(duration_ms),
            behavior: Mutex::new(behavior),
            created: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: SourceBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn visuals(&self) -> Vec<Arc<FakeVisual>> {
        self.created.lock().clone()
    }

    pub fn latest(&self) -> Option<Arc<FakeVisual>> {
        self.created.lock().last().cloned()
    }
}

impl AnimatedVisualSource for FakeSource {
    fn try_create_animated_visual(&self) -> Option<Arc<dyn AnimatedVisual>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock();
        if behavior == SourceBehavior::Fails {
            return None;
        }
        let visual = Arc::new(FakeVisual {
            duration: self.duration,
            size: if behavior == SourceBehavior::Empty {
                Size::ZERO
            } else {
                Size::new(100.0, 100.0)
            },
            channel: (behavior != SourceBehavior::NoRoot).then(FakeStore::new),
            closed: AtomicBool::new(false),
        });
        self.created.lock().push(visual.clone());
        Some(visual)
    }
}

// ---------- observation ----------

/// Collects every event a coordinator emits.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl EventLog {
    pub fn attach(player: &PlaybackCoordinator) -> Self {
        let log = Self::default();
        let sink = log.events.clone();
        player.subscribe(move |event| sink.lock().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Events other than progress writes, which most ordering checks ignore.
    pub fn lifecycle(&self) -> Vec<PlayerEvent> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, PlayerEvent::ProgressWritten { .. }))
            .collect()
    }
}

/// A coordinator wired to fresh fakes.
pub struct Rig {
    pub engine: Arc<FakeEngine>,
    pub store: Arc<FakeStore>,
    pub player: PlaybackCoordinator,
    pub log: EventLog,
}

impl Rig {
    /// Autoplay off so tests control every play.
    pub fn new() -> Self {
        Self::with_config(PlayerConfig {
            auto_play: false,
            ..PlayerConfig::default()
        })
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let engine = FakeEngine::new();
        let store = FakeStore::new();
        let player = PlaybackCoordinator::new(config, engine.clone(), store.clone())
            .expect("rig config should validate");
        let log = EventLog::attach(&player);
        Self {
            engine,
            store,
            player,
            log,
        }
    }

    pub fn with_dispatcher(config: PlayerConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let engine = FakeEngine::new();
        let store = FakeStore::new();
        let player =
            PlaybackCoordinator::with_dispatcher(config, engine.clone(), store.clone(), dispatcher)
                .expect("rig config should validate");
        let log = EventLog::attach(&player);
        Self {
            engine,
            store,
            player,
            log,
        }
    }

    /// Load content of the given duration and return its source.
    pub fn load(&self, duration_ms: u64) -> Arc<FakeSource> {
        let source = FakeSource::new(duration_ms);
        self.player.set_source(Some(source.clone()));
        source
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_entries_resolve() {
        for key in scenarios::keys() {
            let path = scenarios::path(&key).expect("scenario path");
            assert!(path.exists(), "missing scenario file for {key}");
            let text = scenarios::json(&key).expect("scenario text");
            assert!(text.contains("\"expect\""), "{key} has no expectation");
            scenarios::load(&key).unwrap_or_else(|e| panic!("scenario {key}: {e:#}"));
        }
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        let err = scenarios::load("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("unknown scenario fixture"));
    }

    #[test]
    fn bound_store_reads_through() {
        let player = FakeStore::new();
        let visual = FakeStore::new();
        visual.bind_expression(player.clone());
        player.write(0.25);
        assert_eq!(visual.value(), 0.25);
        assert!(visual.writes().is_empty());
    }
}
