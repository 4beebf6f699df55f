use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Wall-clock time of the tick in milliseconds since the UNIX epoch.
    pub now_ms: f64,

    /// Time elapsed since the previous tick, in seconds.
    pub dt: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl FrameTime {
    /// Snapshot at an explicit timestamp. Used by hosts that drive frames
    /// themselves.
    pub fn at(now_ms: f64) -> Self {
        Self {
            now_ms,
            dt: 0.0,
            frame_index: 0,
        }
    }
}

/// Milliseconds since the UNIX epoch.
///
/// A clock set before 1970 yields 0 rather than failing; the glint only needs
/// a steadily advancing value.
pub fn wall_clock_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped so a stalled loop does not report huge steps.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;

        let ft = FrameTime {
            now_ms: wall_clock_ms(),
            dt: dt.as_secs_f32(),
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
