//! Wall-clock statistics over engine frames.
//!
//! [`measure_engine`] drives an [`Engine`] through a number of frames with a
//! fixed simulated delta and records how long each `step` took on the host,
//! alongside how many fixed steps the accumulator produced.

use std::{
    fmt,
    time::{Duration, Instant},
};

use racing_engine::core::Engine;

/// Summary of a set of frame durations.
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub frames: usize,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Ascending, for percentiles
    sorted: Vec<Duration>,
}

impl FrameStats {
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort_unstable();
        Self {
            frames: samples.len(),
            total: samples.iter().sum(),
            min: samples.first().copied().unwrap_or_default(),
            max: samples.last().copied().unwrap_or_default(),
            sorted: samples,
        }
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.frames) {
            Ok(0) => Duration::ZERO,
            Ok(frames) => self.total / frames,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.frames as f64),
        }
    }

    /// Nearest-rank percentile; `p` is clamped to `0..=100`.
    pub fn percentile(&self, p: u8) -> Duration {
        if self.sorted.is_empty() {
            return Duration::ZERO;
        }
        let p = usize::from(p.min(100));
        let rank = (self.sorted.len() * p).div_ceil(100).max(1);
        self.sorted[rank - 1]
    }

    pub fn median(&self) -> Duration {
        self.percentile(50)
    }

    pub fn p95(&self) -> Duration {
        self.percentile(95)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99)
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> Duration {
        if self.frames < 2 {
            return Duration::ZERO;
        }
        let mean = self.mean().as_secs_f64();
        let sum_sq: f64 = self
            .sorted
            .iter()
            .map(|sample| (sample.as_secs_f64() - mean).powi(2))
            .sum();
        Duration::from_secs_f64((sum_sq / (self.frames - 1) as f64).sqrt())
    }

    /// Frames per second implied by the mean frame time.
    pub fn fps(&self) -> f64 {
        let mean = self.mean();
        if mean.is_zero() { 0.0 } else { 1.0 / mean.as_secs_f64() }
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        write!(
            f,
            "{} frames, mean {:.3}ms ({:.0} fps), p50 {:.3}ms, p99 {:.3}ms, max {:.3}ms",
            self.frames,
            ms(self.mean()),
            self.fps(),
            ms(self.median()),
            ms(self.p99()),
            ms(self.max),
        )
    }
}

/// Records the duration between `begin` and `end` of each frame.
#[derive(Debug, Default)]
pub struct FrameTimer {
    samples: Vec<Duration>,
    started: Option<Instant>,
}

impl FrameTimer {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            samples: Vec::with_capacity(frames),
            started: None,
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Ignored without a matching [`begin`](Self::begin).
    pub fn end(&mut self) {
        if let Some(started) = self.started.take() {
            self.samples.push(started.elapsed());
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn finish(self) -> FrameStats {
        FrameStats::from_samples(self.samples)
    }
}

/// Outcome of [`measure_engine`].
#[derive(Debug, Clone)]
pub struct EngineRun {
    /// Host time spent in each `step`
    pub frames: FrameStats,
    pub fixed_steps: u64,
    pub physics_steps: u64,
}

/// Step `engine` `frames` times, each with a simulated delta of `delta` seconds.
pub fn measure_engine(engine: &mut Engine, frames: usize, delta: f64) -> EngineRun {
    let mut timer = FrameTimer::with_capacity(frames);
    let mut fixed_steps = 0;
    let mut physics_steps = 0;
    for _ in 0..frames {
        timer.begin();
        let frame = engine.step_with(delta);
        timer.end();
        fixed_steps += u64::from(frame.fixed_steps);
        physics_steps += u64::from(frame.physics_steps);
    }
    EngineRun {
        frames: timer.finish(),
        fixed_steps,
        physics_steps,
    }
}
