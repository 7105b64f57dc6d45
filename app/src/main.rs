use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    process,
    thread,
    time::Duration,
};

use clap::Parser;
use log::{info, warn};
use racing_cli::{Console, DemoDriver};
use racing_engine::{
    core::{Engine, EngineConfig, EngineHandle, EngineState, GENERAL_POOL, log as logging},
    fatal,
};

const TAG: &str = "Main";

/// How long the simulated asset load takes.
const LOAD_TIME: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(version, about = "Car racing simulation")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    fullscreen: bool,
    /// Append log records to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Drive the engine from a command console instead of the scripted demo
    #[arg(long)]
    interactive: bool,
    /// Disable the profiler and its report
    #[arg(long)]
    no_profile: bool,
    /// Scale the demo's delays (0 runs it back to back)
    #[arg(long, default_value_t = 1.0)]
    pacing: f64,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig, String> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path).map_err(|err| err.to_string())?,
            None => EngineConfig::default(),
        };
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.fullscreen {
            config.window.fullscreen = true;
        }
        if let Some(path) = &self.log_file {
            config.logging.file = Some(path.clone());
        }
        if self.no_profile {
            config.profiling.enabled = false;
        }
        if self.interactive {
            // The console prints the log between prompts.
            config.logging.console = false;
        }
        Ok(config)
    }
}

fn register_state_callbacks(engine: &Engine) {
    engine.register_state_callback(EngineState::Loading, |engine| {
        info!(target: TAG, "Loading game resources...");
        let loaded = engine.clone();
        let submitted = engine.registry().submit(GENERAL_POOL, move || {
            thread::sleep(LOAD_TIME);
            loaded.set_state(EngineState::MainMenu);
        });
        if submitted.is_err() {
            warn!(target: TAG, "Loading in the foreground");
            engine.set_state(EngineState::MainMenu);
        }
    });
    engine.register_state_callback(EngineState::MainMenu, |_| info!(target: TAG, "Entered main menu"));
    engine.register_state_callback(EngineState::RaceSetup, |_| info!(target: TAG, "Setting up race"));
    engine.register_state_callback(EngineState::Racing, |_| info!(target: TAG, "Race started"));
    engine.register_state_callback(EngineState::Paused, |_| info!(target: TAG, "Game paused"));
    engine.register_state_callback(EngineState::RaceFinished, |_| info!(target: TAG, "Race finished"));
    engine.register_state_callback(EngineState::Exiting, |_| info!(target: TAG, "Exiting game"));
}

fn start_driver(engine: EngineHandle, args: &Args) -> Result<(), String> {
    if args.interactive {
        let console = Console::new(engine).with_log_tail(logging::capture());
        // Detached: a pending read must not hold up process exit.
        console.spawn().map(drop).map_err(|err| err.to_string())
    } else {
        DemoDriver::new(engine)
            .with_pacing(args.pacing)
            .spawn()
            .map_err(|err| err.to_string())
    }
}

fn run(args: &Args) -> i32 {
    let config = match args.engine_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Fatal error: {err}");
            return 1;
        }
    };

    let mut engine = Engine::new();
    register_state_callbacks(&engine);
    if let Err(err) = engine.initialize(config) {
        fatal!(target: TAG, "Failed to initialize game engine: {err}");
        eprintln!("Fatal error: {err}");
        return 1;
    }
    info!(target: TAG, "Car Racing Simulation starting up");

    if let Err(err) = start_driver(engine.handle(), args) {
        fatal!(target: TAG, "Failed to start driver: {err}");
        engine.shutdown();
        return 1;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| engine.run())) {
        Ok(code) => code,
        Err(payload) => report_panic(&mut engine, payload.as_ref()),
    }
}

/// Log a panic that escaped the main loop, then shut the engine down. The
/// engine closes the log last.
fn report_panic(engine: &mut Engine, payload: &(dyn Any + Send)) -> i32 {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    fatal!(target: TAG, "Unhandled panic: {message}");
    eprintln!("Fatal error: {message}");
    engine.shutdown();
    1
}

fn main() {
    let args = Args::parse();
    process::exit(run(&args));
}
