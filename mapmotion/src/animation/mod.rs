//! Path-following marker animation.
//!
//! - [`PathMetrics`] - segment lengths and the cumulative distance table
//! - [`PathCursor`] - monotonic position lookup for a progress value
//! - [`FrameScheduler`] - rendering-loop callback source
//! - [`TrackAnimator`] - drives a marker (and optional trail) over time

mod cursor;
mod metrics;
mod scheduler;
mod track;

pub use cursor::{PathCursor, PathSample};
pub use metrics::PathMetrics;
pub use scheduler::{
    FrameCallback, FrameId, FrameScheduler, ManualFrameScheduler, TokioFrameScheduler,
    DEFAULT_FRAME_INTERVAL,
};
pub use track::{TrackAnimator, TrackHandle, TrackOptions, DEFAULT_DURATION_MS};
