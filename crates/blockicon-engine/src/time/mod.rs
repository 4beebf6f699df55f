//! Frame timing.
//!
//! One `FrameClock` per frame loop. Timestamps are wall-clock milliseconds so
//! glint animations of independent renderers stay in phase.

mod frame_clock;

pub use frame_clock::{wall_clock_ms, FrameClock, FrameTime};
