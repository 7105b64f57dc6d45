//! The game loop and its state machine.
//!
//! [`Engine`] is owned by the thread that runs the loop. Other threads talk to it
//! through an [`EngineHandle`]: they change state, request exit, register state
//! callbacks and reach the thread registry.
//!
//! Each frame runs four phases, every one wrapped in a profiler scope:
//!
//! 1. `ProcessInput`: the input subsystem, unless exiting
//! 2. `FixedUpdate`: drain the accumulator in fixed steps; physics only while racing
//! 3. `Update`: the subsystems the current state calls for, plus audio
//! 4. `Render`: the rendering subsystem, unless exiting

use std::{
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
    thread,
    time::Duration,
};

use dashmap::DashMap;
use log::{debug, error, info, warn};

use super::{
    config::EngineConfig,
    error::EngineError,
    log as logging,
    profiler::{Profiler, profile_scope},
    state::EngineState,
    subsystem::{Slot, Subsystem, Subsystems},
    thread::{ThreadPriority, ThreadRegistry},
    time::{Clock, FrameTiming, SystemClock},
};
use crate::sync::AtomicState;

const TAG: &str = "GameEngine";

/// Pool created at startup for general background work.
pub const GENERAL_POOL: &str = "GeneralPool";

/// Frames shorter than this yield the loop thread for a millisecond.
const MIN_FRAME_TIME: f64 = 0.001;

type StateCallback = Arc<dyn Fn(&EngineHandle) + Send + Sync>;

struct Shared {
    state: AtomicState<EngineState>,
    callbacks: DashMap<EngineState, StateCallback>,
    exit_requested: AtomicBool,
    exit_code: AtomicI32,
    registry: ThreadRegistry,
}

/// Cloneable, thread-safe access to a running [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    pub fn state(&self) -> EngineState {
        self.shared.state.get()
    }

    /// Move to `state` and run its callback on the calling thread. Setting the
    /// current state again does nothing.
    pub fn set_state(&self, state: EngineState) {
        let previous = self.shared.state.replace(state);
        if previous == state {
            return;
        }
        info!(target: TAG, "Game state changed from {previous} to {state}");

        // Cloned out so the callback may itself change state or re-register.
        let callback = self
            .shared
            .callbacks
            .get(&state)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(callback) = callback {
            callback(self);
        }
    }

    /// Run `callback` whenever the engine enters `state`, replacing any previous
    /// callback for it. Callbacks run synchronously and must not block.
    pub fn register_state_callback<F>(&self, state: EngineState, callback: F)
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.shared.callbacks.insert(state, Arc::new(callback));
    }

    /// Ask the loop to finish its current frame, shut down and return `code`.
    pub fn request_exit(&self, code: i32) {
        info!(target: TAG, "Exit requested with code {code}");
        self.shared.exit_code.store(code, Ordering::Release);
        self.shared.exit_requested.store(true, Ordering::Release);
    }

    pub fn exit_requested(&self) -> bool {
        self.shared.exit_requested.load(Ordering::Acquire)
    }

    pub fn exit_code(&self) -> i32 {
        self.shared.exit_code.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.shared.registry
    }
}

/// What a single call to [`Engine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// State at the start of the frame
    pub state: EngineState,
    /// Clamped frame delta in seconds
    pub delta: f64,
    /// Fixed steps drained from the accumulator
    pub fixed_steps: u32,
    /// Fixed steps delivered to physics
    pub physics_steps: u32,
}

pub struct Engine {
    shared: Arc<Shared>,
    config: EngineConfig,
    timing: FrameTiming,
    clock: Box<dyn Clock>,
    subsystems: Subsystems,
    /// Slots whose `initialize` succeeded, in order
    initialized: Vec<Slot>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }

    /// An engine whose frame deltas come from `clock`.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let config = EngineConfig::default();
        Self {
            shared: Arc::new(Shared {
                state: AtomicState::new(EngineState::Uninitialized),
                callbacks: DashMap::new(),
                exit_requested: AtomicBool::new(false),
                exit_code: AtomicI32::new(0),
                registry: ThreadRegistry::new(),
            }),
            timing: FrameTiming::new(config.timing.fixed_time_step, config.timing.max_time_step),
            config,
            clock: Box::new(clock),
            subsystems: Subsystems::default(),
            initialized: Vec::new(),
        }
    }

    /// Place `subsystem` in `slot`, returning whatever was there. Subsystems are
    /// initialized by [`initialize`](Self::initialize), so attach them first.
    pub fn attach(&mut self, slot: Slot, subsystem: Box<dyn Subsystem>) -> Option<Box<dyn Subsystem>> {
        self.subsystems.attach(slot, subsystem)
    }

    pub fn initialize(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        if self.state() != EngineState::Uninitialized {
            warn!(target: TAG, "Already initialized");
            return Err(EngineError::AlreadyInitialized);
        }

        logging::init(&config.logging).map_err(|source| EngineError::LogFile {
            path: config.logging.file.clone().unwrap_or_default(),
            source,
        })?;
        info!(target: TAG, "Initializing game engine");
        Profiler::global().set_enabled(config.profiling.enabled);
        let _scope = profile_scope("Initialize");

        self.timing = FrameTiming::new(config.timing.fixed_time_step, config.timing.max_time_step);
        self.clock.restart();
        self.config = config;

        if let Err(err) = self.initialize_subsystems() {
            error!(target: TAG, "Failed to initialize subsystems: {err}");
            self.teardown();
            return Err(err);
        }

        self.set_state(EngineState::Loading);
        info!(target: TAG, "Game engine initialized successfully");
        Ok(())
    }

    fn initialize_subsystems(&mut self) -> Result<(), EngineError> {
        let registry = &self.shared.registry;
        registry.initialize(self.config.threads.resolved_max_threads())?;
        registry.create_pool(
            GENERAL_POOL,
            self.config.threads.general_pool_size,
            ThreadPriority::Normal,
        )?;

        for slot in self.subsystems.in_init_order() {
            if let Some(subsystem) = self.subsystems.get_mut(slot) {
                info!(target: TAG, "Initializing {}", subsystem.name());
                subsystem.initialize()?;
                self.initialized.push(slot);
            }
        }
        Ok(())
    }

    /// Shut down initialized subsystems in reverse order, then the registry.
    fn teardown(&mut self) {
        for slot in mem::take(&mut self.initialized).into_iter().rev() {
            self.subsystems.with(slot, |subsystem| {
                info!(target: TAG, "Shutting down {}", subsystem.name());
                subsystem.shutdown();
            });
        }
        info!(target: TAG, "Shutting down thread registry");
        self.shared.registry.shutdown();
    }

    /// Run frames until exit is requested, then shut down. Returns the exit
    /// code, or `-1` if the engine was never initialized.
    pub fn run(&mut self) -> i32 {
        if self.state() == EngineState::Uninitialized {
            error!(target: TAG, "Cannot run uninitialized game engine");
            return -1;
        }

        info!(target: TAG, "Starting main game loop");
        while !self.shared.exit_requested.load(Ordering::Acquire) {
            let frame = self.step();
            if frame.delta < MIN_FRAME_TIME {
                thread::sleep(Duration::from_millis(1));
            }
        }
        info!(target: TAG, "Main game loop exited");

        let code = self.shared.exit_code.load(Ordering::Acquire);
        self.shutdown();
        code
    }

    /// Run one frame timed by the engine clock.
    pub fn step(&mut self) -> Frame {
        let raw = self.clock.elapsed();
        self.step_with(raw)
    }

    /// Run one frame with an explicit unclamped delta in seconds.
    pub fn step_with(&mut self, raw_delta: f64) -> Frame {
        let _scope = profile_scope("GameLoop");
        let delta = self.timing.begin_frame(raw_delta);
        if let Some(fps) = self.timing.tick_frame_rate() {
            debug!(target: TAG, "FPS: {fps:.1}");
        }

        let state = self.state();
        if state != EngineState::Exiting {
            let _scope = profile_scope("ProcessInput");
            self.subsystems.with(Slot::Input, |input| input.process_input());
        }

        let (fixed_steps, physics_steps) = {
            let _scope = profile_scope("FixedUpdate");
            self.fixed_update(delta)
        };

        {
            let _scope = profile_scope("Update");
            self.update(delta);
        }

        if self.state() != EngineState::Exiting {
            let _scope = profile_scope("Render");
            self.subsystems.with(Slot::Rendering, |rendering| rendering.render());
        }

        Frame {
            state,
            delta,
            fixed_steps,
            physics_steps,
        }
    }

    fn fixed_update(&mut self, delta: f64) -> (u32, u32) {
        self.timing.accumulate(delta);
        let step = self.timing.fixed_time_step();
        let mut fixed_steps = 0;
        let mut physics_steps = 0;
        while self.timing.consume_fixed() {
            fixed_steps += 1;
            if self.state() == EngineState::Racing && self.subsystems.is_attached(Slot::Physics) {
                self.subsystems.with(Slot::Physics, |physics| physics.fixed_update(step));
                physics_steps += 1;
            }
        }
        (fixed_steps, physics_steps)
    }

    fn update(&mut self, delta: f64) {
        let state = self.state();
        let active: &[Slot] = match state {
            EngineState::Loading => &[Slot::Loader],
            EngineState::MainMenu => &[Slot::MainMenu],
            EngineState::RaceSetup => &[Slot::RaceSetup],
            EngineState::Racing => &[Slot::Race, Slot::Ai],
            EngineState::RaceFinished => &[Slot::RaceResults],
            EngineState::Paused | EngineState::Exiting | EngineState::Uninitialized => &[],
        };
        for slot in active {
            self.subsystems.with(*slot, |subsystem| subsystem.update(delta));
        }

        if state != EngineState::Exiting {
            self.subsystems.with(Slot::Audio, |audio| audio.update(delta));
        }
    }

    /// Tear everything down and return to `Uninitialized`. Does nothing if the
    /// engine is not initialized.
    pub fn shutdown(&mut self) {
        if self.state() == EngineState::Uninitialized {
            return;
        }

        info!(
            target: TAG,
            "Shutting down game engine after {} frames and {} fixed steps",
            self.timing.frame_count(),
            self.timing.fixed_count()
        );
        self.set_state(EngineState::Exiting);
        self.teardown();

        self.shared.state.set(EngineState::Uninitialized);
        self.shared.exit_requested.store(false, Ordering::Release);
        self.shared.exit_code.store(0, Ordering::Release);

        let profiler = Profiler::global();
        if profiler.is_enabled() {
            let profiling = &self.config.profiling;
            if let Err(err) = profiler.save_report(&profiling.report_path, profiling.sort) {
                warn!(
                    target: TAG,
                    "Failed to write profiling report {}: {err}",
                    profiling.report_path.display()
                );
            }
        }

        info!(target: TAG, "Game engine shut down successfully");
        logging::shutdown();
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> EngineState {
        self.shared.state.get()
    }

    pub fn set_state(&self, state: EngineState) {
        self.handle().set_state(state);
    }

    pub fn register_state_callback<F>(&self, state: EngineState, callback: F)
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.handle().register_state_callback(state, callback);
    }

    pub fn request_exit(&self, code: i32) {
        self.handle().request_exit(code);
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clamped delta of the last frame.
    pub fn delta_time(&self) -> f64 {
        self.timing.delta()
    }

    pub fn fixed_time_step(&self) -> f64 {
        self.timing.fixed_time_step()
    }

    /// Floored at one millisecond.
    pub fn set_fixed_time_step(&mut self, step: f64) {
        self.timing.set_fixed_time_step(step);
        self.config.timing.fixed_time_step = self.timing.fixed_time_step();
    }

    pub fn frame_rate(&self) -> f64 {
        self.timing.frame_rate()
    }

    pub fn resize_window(&mut self, width: u32, height: u32) {
        let window = &mut self.config.window;
        if window.width == width && window.height == height {
            return;
        }
        window.width = width;
        window.height = height;
        info!(target: TAG, "Window resized to {width}x{height}");
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.config.window.fullscreen == fullscreen {
            return;
        }
        self.config.window.fullscreen = fullscreen;
        if fullscreen {
            info!(target: TAG, "Switched to fullscreen mode");
        } else {
            info!(target: TAG, "Switched to windowed mode");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        error::SubsystemError,
        log::{Level, LogConfig},
        time::ManualClock,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records every call it receives as `"<name>.<method>"`.
    struct Recorder {
        name: &'static str,
        journal: Journal,
        fail_init: bool,
    }

    impl Recorder {
        fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Subsystem> {
            Box::new(Self {
                name,
                journal: Arc::clone(journal),
                fail_init: false,
            })
        }

        fn note(&self, method: &str) {
            self.journal.lock().push(format!("{}.{method}", self.name));
        }
    }

    impl Subsystem for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(&mut self) -> Result<(), SubsystemError> {
            self.note("initialize");
            if self.fail_init {
                return Err(SubsystemError::new(self.name, "device lost"));
            }
            Ok(())
        }

        fn update(&mut self, _dt: f64) {
            self.note("update");
        }

        fn fixed_update(&mut self, _dt: f64) {
            self.note("fixed_update");
        }

        fn render(&mut self) {
            self.note("render");
        }

        fn process_input(&mut self) {
            self.note("process_input");
        }

        fn shutdown(&mut self) {
            self.note("shutdown");
        }
    }

    fn quiet_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.logging = LogConfig {
            console: false,
            file: None,
            level: Level::Debug,
        };
        config.profiling.enabled = false;
        config.threads.max_threads = 8;
        config
    }

    fn count(journal: &Journal, entry: &str) -> usize {
        journal.lock().iter().filter(|e| *e == entry).count()
    }

    fn engine_with_all_slots(journal: &Journal) -> Engine {
        let mut engine = Engine::new();
        let names = [
            (Slot::Physics, "physics"),
            (Slot::Rendering, "rendering"),
            (Slot::Ai, "ai"),
            (Slot::Audio, "audio"),
            (Slot::Input, "input"),
            (Slot::Race, "race"),
            (Slot::Loader, "loader"),
            (Slot::MainMenu, "menu"),
            (Slot::RaceSetup, "setup"),
            (Slot::RaceResults, "results"),
        ];
        for (slot, name) in names {
            engine.attach(slot, Recorder::boxed(name, journal));
        }
        engine
    }

    #[test]
    fn initialize_moves_to_loading_and_creates_general_pool() {
        let mut engine = Engine::new();
        engine.initialize(quiet_config()).unwrap();

        assert_eq!(engine.state(), EngineState::Loading);
        assert_eq!(
            engine.registry().pool_workers(GENERAL_POOL).unwrap(),
            ["GeneralPool_Worker0", "GeneralPool_Worker1"]
        );
        assert!(matches!(
            engine.initialize(quiet_config()),
            Err(EngineError::AlreadyInitialized)
        ));

        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.registry().is_initialized());
        assert!(engine.registry().worker_names().is_empty());
    }

    #[test]
    fn subsystems_start_in_order_and_stop_in_reverse() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();
        engine.shutdown();

        let entries = journal.lock().clone();
        let inits: Vec<_> = entries.iter().filter(|e| e.ends_with(".initialize")).cloned().collect();
        let shutdowns: Vec<_> = entries.iter().filter(|e| e.ends_with(".shutdown")).cloned().collect();
        let order = [
            "physics", "rendering", "ai", "audio", "input", "race", "loader", "menu", "setup", "results",
        ];
        assert_eq!(inits, order.map(|n| format!("{n}.initialize")));
        let mut reversed = order.map(|n| format!("{n}.shutdown"));
        reversed.reverse();
        assert_eq!(shutdowns, reversed);
    }

    #[test]
    fn failed_subsystem_tears_down_what_started() {
        let journal = Journal::default();
        let mut engine = Engine::new();
        engine.attach(Slot::Physics, Recorder::boxed("physics", &journal));
        engine.attach(
            Slot::Audio,
            Box::new(Recorder {
                name: "audio",
                journal: Arc::clone(&journal),
                fail_init: true,
            }),
        );

        let err = engine.initialize(quiet_config()).unwrap_err();
        assert!(matches!(err, EngineError::Subsystem(ref e) if e.name == "audio"));
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.registry().is_initialized());
        assert_eq!(count(&journal, "physics.shutdown"), 1);
        assert_eq!(count(&journal, "audio.shutdown"), 0);
    }

    #[test]
    fn undersized_thread_cap_fails_initialization() {
        let mut config = quiet_config();
        config.threads.max_threads = 1;
        let mut engine = Engine::new();
        let err = engine.initialize(config).unwrap_err();
        assert!(matches!(err, EngineError::Threads(_)));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn run_refuses_uninitialized_engine() {
        let mut engine = Engine::new();
        assert_eq!(engine.run(), -1);
    }

    #[test]
    fn callbacks_fire_once_per_transition() {
        let engine = Engine::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        engine.register_state_callback(EngineState::Racing, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.set_state(EngineState::Racing);
        engine.set_state(EngineState::Racing);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        engine.set_state(EngineState::Paused);
        engine.set_state(EngineState::Racing);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn registering_again_replaces_callback() {
        let engine = Engine::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let hits = Arc::clone(&hits);
            engine.register_state_callback(EngineState::MainMenu, move |_| hits.lock().push(tag));
        }
        engine.set_state(EngineState::MainMenu);
        assert_eq!(*hits.lock(), ["second"]);
    }

    #[test]
    fn callback_may_change_state() {
        let mut engine = Engine::new();
        engine.register_state_callback(EngineState::Loading, |handle| {
            handle.set_state(EngineState::MainMenu);
        });
        engine.initialize(quiet_config()).unwrap();
        assert_eq!(engine.state(), EngineState::MainMenu);
    }

    #[test]
    fn state_changes_from_other_threads() {
        let engine = Engine::new();
        let handle = engine.handle();
        thread::spawn(move || handle.set_state(EngineState::RaceSetup))
            .join()
            .unwrap();
        assert_eq!(engine.state(), EngineState::RaceSetup);
    }

    #[test]
    fn half_step_frames_tick_physics_sixty_times() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();
        engine.set_state(EngineState::Racing);

        let physics_steps: u32 = (0..120).map(|_| engine.step_with(1.0 / 120.0).physics_steps).sum();
        assert_eq!(physics_steps, 60);
        assert_eq!(count(&journal, "physics.fixed_update"), 60);
        assert_eq!(count(&journal, "race.update"), 120);
        assert_eq!(count(&journal, "ai.update"), 120);
    }

    #[test]
    fn long_frame_is_clamped_to_two_ticks() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();
        engine.set_state(EngineState::Racing);

        let frame = engine.step_with(0.250);
        assert_eq!(frame.delta, 1.0 / 30.0);
        assert_eq!(frame.physics_steps, 2);
        assert_eq!(engine.delta_time(), 1.0 / 30.0);
    }

    #[test]
    fn physics_only_runs_while_racing() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();
        engine.set_state(EngineState::Paused);

        let frame = engine.step_with(1.0 / 30.0);
        assert_eq!(frame.fixed_steps, 2);
        assert_eq!(frame.physics_steps, 0);
        assert_eq!(count(&journal, "physics.fixed_update"), 0);
        assert_eq!(count(&journal, "audio.update"), 1);
        assert_eq!(count(&journal, "race.update"), 0);
        assert_eq!(count(&journal, "menu.update"), 0);
    }

    #[test]
    fn update_dispatches_by_state() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();

        let cases = [
            (EngineState::Loading, "loader.update"),
            (EngineState::MainMenu, "menu.update"),
            (EngineState::RaceSetup, "setup.update"),
            (EngineState::RaceFinished, "results.update"),
        ];
        for (state, expected) in cases {
            journal.lock().clear();
            engine.set_state(state);
            engine.step_with(0.01);
            let updates: Vec<_> = journal.lock().iter().filter(|e| e.ends_with(".update")).cloned().collect();
            assert_eq!(updates, [expected, "audio.update"], "state {state}");
            assert_eq!(count(&journal, "input.process_input"), 1);
            assert_eq!(count(&journal, "rendering.render"), 1);
        }
    }

    #[test]
    fn exiting_skips_input_update_and_render() {
        let journal = Journal::default();
        let mut engine = engine_with_all_slots(&journal);
        engine.initialize(quiet_config()).unwrap();
        engine.set_state(EngineState::Exiting);
        journal.lock().clear();

        engine.step_with(0.01);
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn step_reads_the_engine_clock() {
        let clock = ManualClock::new();
        let journal = Journal::default();
        let mut engine = Engine::with_clock(clock.clone());
        engine.attach(Slot::Physics, Recorder::boxed("physics", &journal));
        engine.initialize(quiet_config()).unwrap();
        engine.set_state(EngineState::Racing);

        for _ in 0..120 {
            clock.advance_secs(1.0 / 120.0);
            engine.step();
        }
        assert_eq!(count(&journal, "physics.fixed_update"), 60);
    }

    #[test]
    fn run_returns_requested_exit_code_and_resets() {
        let mut engine = Engine::new();
        engine.initialize(quiet_config()).unwrap();
        let handle = engine.handle();
        let exiter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            handle.set_state(EngineState::Racing);
            handle.request_exit(3);
        });

        assert_eq!(engine.run(), 3);
        exiter.join().unwrap();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.handle().exit_requested());
        assert_eq!(engine.handle().exit_code(), 0);
    }

    #[test]
    fn loading_callback_can_hand_work_to_general_pool() {
        let mut engine = Engine::new();
        engine.register_state_callback(EngineState::Loading, |handle| {
            let loaded = handle.clone();
            handle
                .registry()
                .submit(GENERAL_POOL, move || loaded.set_state(EngineState::MainMenu))
                .unwrap();
        });
        engine.initialize(quiet_config()).unwrap();

        for _ in 0..2000 {
            if engine.state() == EngineState::MainMenu {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(engine.state(), EngineState::MainMenu);
    }

    #[test]
    fn fixed_step_floor_and_window_changes() {
        let mut engine = Engine::new();
        engine.set_fixed_time_step(0.0001);
        assert_eq!(engine.fixed_time_step(), 0.001);

        engine.resize_window(1920, 1080);
        assert_eq!((engine.config().window.width, engine.config().window.height), (1920, 1080));
        engine.set_fullscreen(true);
        assert!(engine.config().window.fullscreen);
    }

    #[test]
    fn shutdown_is_a_noop_when_uninitialized() {
        let mut engine = Engine::new();
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }
}
