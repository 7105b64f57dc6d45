use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Default simulation tick length in seconds.
pub const FIXED_TIMESTEP: f64 = 1.0 / 60.0;
/// Largest frame delta the loop will accept; longer stalls are clamped to this.
pub const MAX_TIMESTEP: f64 = 1.0 / 30.0;
/// Floor for [`FrameTiming::set_fixed_time_step`].
pub const MIN_FIXED_TIMESTEP: f64 = 0.001;
/// Length of the window the frame rate is averaged over.
pub const FRAME_RATE_WINDOW: f64 = 1.0;

/// Source of frame deltas for the game loop.
pub trait Clock: Send {
    /// Start measuring from now; the next [`elapsed`](Self::elapsed) counts from here.
    fn restart(&mut self);

    /// Seconds since the previous call or [`restart`](Self::restart).
    fn elapsed(&mut self) -> f64;
}

/// Wall clock backed by `Instant`.
pub struct SystemClock {
    last: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { last: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn restart(&mut self) {
        self.last = Instant::now();
    }

    fn elapsed(&mut self) -> f64 {
        let now = Instant::now();
        let secs = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        secs
    }
}

/// Clock that only moves when told to. Clones share the same pending time, so a
/// test can keep one and hand the other to the engine.
///
/// Time is kept in `f64` seconds: one `advance_secs(dt)` per frame reads back
/// as exactly `dt`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Bits of the `f64` seconds not yet read by `elapsed`
    pending: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.advance_secs(by.as_secs_f64());
    }

    pub fn advance_secs(&self, secs: f64) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + secs).to_bits())
            });
    }
}

impl Clock for ManualClock {
    fn restart(&mut self) {
        self.pending.store(0.0f64.to_bits(), Ordering::Release);
    }

    fn elapsed(&mut self) -> f64 {
        f64::from_bits(self.pending.swap(0.0f64.to_bits(), Ordering::AcqRel))
    }
}

/// Timing state of the game loop. Captures the clamped delta of each frame, the
/// accumulator owed to the fixed-step simulation, and a rolling frame rate.
///
/// A frame is driven as:
///
/// ```rust,ignore
/// let dt = timing.begin_frame(clock.elapsed());
/// timing.accumulate(dt);
/// while timing.consume_fixed() {
///     physics.fixed_update(timing.fixed_time_step());
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    fixed_time_step: f64,
    max_time_step: f64,
    /// Clamped delta of the current frame
    delta: f64,
    /// Unsimulated time owed to the fixed step
    accumulator: f64,
    frame_count: u64,
    fixed_count: u64,
    window_frames: u32,
    window_time: f64,
    frame_rate: f64,
}

impl FrameTiming {
    /// Steps are in seconds. A non-finite fixed step falls back to
    /// [`FIXED_TIMESTEP`] and is floored at [`MIN_FIXED_TIMESTEP`]. A
    /// non-finite or non-positive max step falls back to [`MAX_TIMESTEP`], and
    /// the max step is never below the fixed step.
    pub fn new(fixed_time_step: f64, max_time_step: f64) -> Self {
        let fixed_time_step = sanitize_fixed(fixed_time_step);
        let max_time_step = if max_time_step.is_finite() && max_time_step > 0.0 {
            max_time_step
        } else {
            MAX_TIMESTEP
        };
        Self {
            fixed_time_step,
            max_time_step: max_time_step.max(fixed_time_step),
            delta: 0.0,
            accumulator: 0.0,
            frame_count: 0,
            fixed_count: 0,
            window_frames: 0,
            window_time: 0.0,
            frame_rate: 0.0,
        }
    }

    /// Open a new frame with an unclamped delta; returns the clamped delta.
    pub fn begin_frame(&mut self, raw_delta: f64) -> f64 {
        let delta = if raw_delta.is_finite() {
            raw_delta.clamp(0.0, self.max_time_step)
        } else {
            0.0
        };
        self.delta = delta;
        self.frame_count += 1;
        delta
    }

    /// Count the current frame towards the frame rate window. Returns the new
    /// frame rate whenever a full window has elapsed.
    pub fn tick_frame_rate(&mut self) -> Option<f64> {
        self.window_time += self.delta;
        self.window_frames += 1;
        if self.window_time >= FRAME_RATE_WINDOW {
            self.frame_rate = f64::from(self.window_frames) / self.window_time;
            self.window_frames = 0;
            self.window_time = 0.0;
            Some(self.frame_rate)
        } else {
            None
        }
    }

    pub fn accumulate(&mut self, delta: f64) {
        self.accumulator += delta;
    }

    /// Take one fixed step out of the accumulator if enough time is owed.
    pub fn consume_fixed(&mut self) -> bool {
        if self.accumulator >= self.fixed_time_step {
            self.accumulator -= self.fixed_time_step;
            self.fixed_count += 1;
            true
        } else {
            false
        }
    }

    pub fn set_fixed_time_step(&mut self, step: f64) {
        self.fixed_time_step = sanitize_fixed(step);
    }

    pub fn fixed_time_step(&self) -> f64 {
        self.fixed_time_step
    }

    pub fn max_time_step(&self) -> f64 {
        self.max_time_step
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fixed_count(&self) -> u64 {
        self.fixed_count
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }
}

fn sanitize_fixed(step: f64) -> f64 {
    if step.is_finite() {
        step.max(MIN_FIXED_TIMESTEP)
    } else {
        FIXED_TIMESTEP
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(FIXED_TIMESTEP, MAX_TIMESTEP)
    }
}
