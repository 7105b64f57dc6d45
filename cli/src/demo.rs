use std::{
    thread,
    time::{Duration, Instant},
};

use log::info;
use racing_engine::core::{EngineHandle, EngineState, ThreadError, ThreadPriority};

const TAG: &str = "Demo";

/// Longest single sleep of the driver, so a stop request is noticed promptly.
const POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoAction {
    Enter(EngineState),
    Exit(i32),
}

/// Wait `after`, then perform `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoStep {
    pub after: Duration,
    pub action: DemoAction,
}

impl DemoStep {
    pub const fn new(after_ms: u64, action: DemoAction) -> Self {
        Self {
            after: Duration::from_millis(after_ms),
            action,
        }
    }
}

/// The scripted session: a full race with a pause, then back to the menu and
/// exit.
pub const SCRIPT: [DemoStep; 7] = [
    DemoStep::new(3000, DemoAction::Enter(EngineState::RaceSetup)),
    DemoStep::new(2000, DemoAction::Enter(EngineState::Racing)),
    DemoStep::new(5000, DemoAction::Enter(EngineState::Paused)),
    DemoStep::new(2000, DemoAction::Enter(EngineState::Racing)),
    DemoStep::new(5000, DemoAction::Enter(EngineState::RaceFinished)),
    DemoStep::new(3000, DemoAction::Enter(EngineState::MainMenu)),
    DemoStep::new(2000, DemoAction::Exit(0)),
];

/// Plays [`SCRIPT`] against an engine, standing in for a player. The script
/// starts once the engine reaches the main menu.
pub struct DemoDriver {
    engine: EngineHandle,
    steps: Vec<DemoStep>,
    next: usize,
    due: Option<Instant>,
    started: bool,
}

impl DemoDriver {
    /// Registry name of the driver's worker.
    pub const WORKER: &'static str = "DemoDriver";

    pub fn new(engine: EngineHandle) -> Self {
        Self::with_steps(engine, SCRIPT.to_vec())
    }

    pub fn with_steps(engine: EngineHandle, steps: Vec<DemoStep>) -> Self {
        Self {
            engine,
            steps,
            next: 0,
            due: None,
            started: false,
        }
    }

    /// Scale every delay by `factor`; `0.0` plays the script back to back.
    pub fn with_pacing(mut self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        for step in &mut self.steps {
            step.after = step.after.mul_f64(factor);
        }
        self
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }

    /// Advance the script by at most one step. Sleeps for at most [`POLL`].
    /// Returns `false` once the script is finished.
    pub fn tick(&mut self) -> bool {
        if self.is_finished() {
            thread::sleep(POLL);
            return false;
        }

        if !self.started {
            if self.engine.state() != EngineState::MainMenu {
                thread::sleep(POLL);
                return true;
            }
            info!(target: TAG, "Simulating user starting a race");
            self.started = true;
        }

        let now = Instant::now();
        let step = self.steps[self.next];
        let due = *self.due.get_or_insert(now + step.after);
        if now < due {
            thread::sleep((due - now).min(POLL));
            return true;
        }

        match step.action {
            DemoAction::Enter(state) => self.engine.set_state(state),
            DemoAction::Exit(code) => self.engine.request_exit(code),
        }
        self.next += 1;
        self.due = None;
        !self.is_finished()
    }

    /// Run the driver on a looping registry worker named [`WORKER`](Self::WORKER).
    pub fn spawn(mut self) -> Result<(), ThreadError> {
        let engine = self.engine.clone();
        engine.registry().create_looping_worker(
            Self::WORKER,
            move || {
                self.tick();
            },
            ThreadPriority::Low,
        )
    }
}
