use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl FrameTime {
    /// Delta time in milliseconds, the unit the particle animation accumulates in.
    #[inline]
    pub fn dt_millis(&self) -> f32 {
        self.dt * 1000.0
    }
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per hosted particle field, so separate windows do not share
/// delta-time state.
///
/// Delta time is clamped to avoid pathological values when the window is
/// occluded, minimized, or the process is paused by a debugger.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Creates a new clock with default clamps (0.1 ms .. 250 ms).
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Resets the clock baseline.
    ///
    /// Called when the frame loop starts so the first tick measures from loop
    /// start rather than from clock construction.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// Resets the clock baseline to an explicit instant.
    pub fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }

    /// Advances the clock to `now` and returns a new `FrameTime`.
    ///
    /// The caller supplies the timestamp (the frame loop passes the instant
    /// the redraw was delivered), so timing can be driven deterministically.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_measures_from_baseline() {
        let base = Instant::now();
        let mut clock = FrameClock::new();
        clock.reset_at(base);

        let ft = clock.tick_at(base + Duration::from_millis(16));
        assert!((ft.dt_millis() - 16.0).abs() < 1e-3);
        assert_eq!(ft.frame_index, 0);

        let ft = clock.tick_at(base + Duration::from_millis(32));
        assert!((ft.dt_millis() - 16.0).abs() < 1e-3);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn long_stall_is_clamped() {
        let base = Instant::now();
        let mut clock = FrameClock::new();
        clock.reset_at(base);

        let ft = clock.tick_at(base + Duration::from_secs(5));
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn backwards_time_uses_minimum() {
        let base = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::new();
        clock.reset_at(base);

        let ft = clock.tick_at(base - Duration::from_millis(10));
        assert!((ft.dt - 0.0001).abs() < 1e-7);
    }
}
