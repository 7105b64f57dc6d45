//! Named-section wall-clock profiler.
//!
//! Sections are timed with an RAII guard:
//!
//! ```rust,ignore
//! {
//!     let _scope = profiler::profile_scope("FixedUpdate");
//!     // ... work ...
//! } // recorded here
//! ```
//!
//! The profiler is process-wide and disabled until [`Profiler::set_enabled`] is
//! called; a disabled profiler hands out inert guards. [`Profiler::report`] renders
//! a fixed-width table (calls, total, average, min, max in milliseconds).

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::Write as _,
    fs, io,
    path::Path,
    sync::{
        OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Row order for [`Profiler::report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    #[default]
    Total,
    Average,
}

impl TryFrom<u8> for SortBy {
    type Error = u8;

    /// `0` name, `1` total, `2` average.
    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        match selector {
            0 => Ok(SortBy::Name),
            1 => Ok(SortBy::Total),
            2 => Ok(SortBy::Average),
            other => Err(other),
        }
    }
}

/// Accumulated timings for one section.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SectionStats {
    pub calls: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl SectionStats {
    fn record(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.total += elapsed;
        if self.calls == 1 {
            self.min = elapsed;
            self.max = elapsed;
        } else {
            self.min = self.min.min(elapsed);
            self.max = self.max.max(elapsed);
        }
    }

    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((self.total.as_nanos() / u128::from(self.calls)) as u64)
        }
    }
}

pub struct Profiler {
    enabled: AtomicBool,
    sections: Mutex<HashMap<String, SectionStats>>,
}

static PROFILER: OnceLock<Profiler> = OnceLock::new();

impl Profiler {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            sections: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide profiler.
    pub fn global() -> &'static Profiler {
        PROFILER.get_or_init(Profiler::new)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Start timing `name`; the section is recorded when the guard drops.
    pub fn scope(&self, name: impl Into<Cow<'static, str>>) -> ProfileScope<'_> {
        let active = self.is_enabled().then(|| (name.into(), Instant::now()));
        ProfileScope {
            profiler: self,
            active,
        }
    }

    /// Add one timed call to `name`.
    pub fn record(&self, name: &str, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let mut sections = self.sections.lock();
        match sections.get_mut(name) {
            Some(stats) => stats.record(elapsed),
            None => {
                let mut stats = SectionStats::default();
                stats.record(elapsed);
                sections.insert(name.to_owned(), stats);
            }
        }
    }

    pub fn section(&self, name: &str) -> Option<SectionStats> {
        self.sections.lock().get(name).copied()
    }

    pub fn reset(&self) {
        self.sections.lock().clear();
    }

    pub fn report(&self, sort: SortBy) -> String {
        if !self.is_enabled() {
            return "Profiler is disabled".to_owned();
        }

        let mut rows: Vec<(String, SectionStats)> = self
            .sections
            .lock()
            .iter()
            .map(|(name, stats)| (name.clone(), *stats))
            .collect();

        match sort {
            SortBy::Name => rows.sort_by(|a, b| a.0.cmp(&b.0)),
            SortBy::Total => rows.sort_by(|a, b| b.1.total.cmp(&a.1.total)),
            SortBy::Average => rows.sort_by(|a, b| b.1.average().cmp(&a.1.average())),
        }

        let mut out = String::new();
        let _ = writeln!(out, "======== Profiling Report ========");
        let _ = writeln!(
            out,
            "{:<30}{:>10}{:>15}{:>15}{:>15}{:>15}",
            "Section", "Calls", "Total (ms)", "Avg (ms)", "Min (ms)", "Max (ms)"
        );
        let _ = writeln!(out, "{}", "-".repeat(100));
        for (name, stats) in &rows {
            let _ = writeln!(
                out,
                "{:<30}{:>10}{:>15.3}{:>15.3}{:>15.3}{:>15.3}",
                name,
                stats.calls,
                millis(stats.total),
                millis(stats.average()),
                millis(stats.min),
                millis(stats.max),
            );
        }
        let _ = writeln!(out, "==================================");
        out
    }

    pub fn save_report(&self, path: impl AsRef<Path>, sort: SortBy) -> io::Result<()> {
        fs::write(path, self.report(sort))
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Times the enclosing scope on the global profiler.
pub fn profile_scope(name: impl Into<Cow<'static, str>>) -> ProfileScope<'static> {
    Profiler::global().scope(name)
}

/// RAII timer returned by [`Profiler::scope`].
#[must_use = "the section is timed until the guard is dropped"]
pub struct ProfileScope<'a> {
    profiler: &'a Profiler,
    active: Option<(Cow<'static, str>, Instant)>,
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        if let Some((name, start)) = self.active.take() {
            self.profiler.record(&name, start.elapsed());
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
