use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    error::ConfigError,
    log::LogConfig,
    profiler::SortBy,
    time::{FIXED_TIMESTEP, MAX_TIMESTEP},
};

/// Engine configuration. Every section is optional in TOML and falls back to
/// its defaults.
///
/// ```toml
/// app_name = "Racing Game"
///
/// [window]
/// width = 1920
/// height = 1080
///
/// [timing]
/// fixed_time_step = 0.008333
///
/// [logging]
/// file = "race.log"
/// level = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub threads: ThreadConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
}

fn default_app_name() -> String {
    "Racing Game".to_owned()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            window: WindowConfig::default(),
            timing: TimingConfig::default(),
            threads: ThreadConfig::default(),
            logging: LogConfig::default(),
            profiling: ProfilingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub fullscreen: bool,
}

fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fullscreen: false,
        }
    }
}

/// Loop timing, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_fixed_time_step")]
    pub fixed_time_step: f64,
    #[serde(default = "default_max_time_step")]
    pub max_time_step: f64,
}

fn default_fixed_time_step() -> f64 {
    FIXED_TIMESTEP
}
fn default_max_time_step() -> f64 {
    MAX_TIMESTEP
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: default_fixed_time_step(),
            max_time_step: default_max_time_step(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Cap on live workers; `0` uses the hardware concurrency.
    #[serde(default)]
    pub max_threads: usize,
    /// Worker count of the `GeneralPool` created at startup.
    #[serde(default = "default_general_pool_size")]
    pub general_pool_size: usize,
}

fn default_general_pool_size() -> usize {
    2
}

impl ThreadConfig {
    /// The worker cap to apply. `0` resolves to the hardware concurrency, never
    /// less than 2 and always leaving room for one worker beside `GeneralPool`.
    pub fn resolved_max_threads(&self) -> usize {
        if self.max_threads == 0 {
            num_cpus::get().max(2).max(self.general_pool_size + 1)
        } else {
            self.max_threads
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            general_pool_size: default_general_pool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    #[serde(default = "default_profiling_enabled")]
    pub enabled: bool,
    /// Written at shutdown when profiling is enabled.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default)]
    pub sort: SortBy,
}

fn default_profiling_enabled() -> bool {
    true
}
fn default_report_path() -> PathBuf {
    PathBuf::from("profiling_report.txt")
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: default_profiling_enabled(),
            report_path: default_report_path(),
            sort: SortBy::default(),
        }
    }
}
