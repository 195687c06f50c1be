//! Marker animation along a path.
//!
//! A [`TrackAnimator`] moves one marker along a polyline over a fixed
//! duration, optionally drawing the part of the path already traveled and
//! rotating the marker icon to the current heading.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──► frame ──► frame ──► ... ──► t = 1 ──┬─► finished (overlay stays)
//!                ▲                               │
//!                └──────── loop: reset ◄─────────┘
//!
//! stop() at any point: cancel the pending frame, remove the overlay
//! ```
//!
//! The start timestamp is latched by the first frame, not by `start()`, so
//! the first frame always renders the first path point.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::cursor::{PathCursor, PathSample};
use super::metrics::PathMetrics;
use super::scheduler::{FrameId, FrameScheduler};
use crate::coord::Coord;
use crate::error::MotionError;
use crate::feature::{Geometry, LayerId};
use crate::map::{MapView, OverlayFeature, Style};

/// Default animation duration in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 2000;

/// Name given to the overlay layer holding the marker and trail.
const OVERLAY_NAME: &str = "track-animation";

/// Options for a track animation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOptions {
    /// Time to travel the whole path once, in milliseconds.
    pub duration_ms: u64,
    /// Draw the traveled part of the path.
    pub show_trailing_path: bool,
    /// Restart from the beginning after reaching the end.
    pub looping: bool,
    /// Rotate the marker icon to the current segment direction.
    pub auto_rotate_marker: bool,
    pub marker_style: Style,
    pub trailing_path_style: Style,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            show_trailing_path: false,
            looping: false,
            auto_rotate_marker: false,
            marker_style: Style::marker(),
            trailing_path_style: Style::trailing_path(),
        }
    }
}

/// Starts track animations on a map.
///
/// # Example
///
/// ```ignore
/// let animator = TrackAnimator::new(scheduler)
///     .with_map(map.clone())
///     .with_options(TrackOptions { looping: true, ..Default::default() });
/// let handle = animator.start(&path)?;
/// // ...
/// handle.stop();
/// ```
pub struct TrackAnimator {
    scheduler: Arc<dyn FrameScheduler>,
    map: Option<Arc<dyn MapView>>,
    options: TrackOptions,
}

impl TrackAnimator {
    pub fn new(scheduler: Arc<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            map: None,
            options: TrackOptions::default(),
        }
    }

    pub fn with_map(mut self, map: Arc<dyn MapView>) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_options(mut self, options: TrackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// Starts animating a marker along `path`.
    ///
    /// A single-point path places a static marker and schedules nothing.
    ///
    /// # Errors
    ///
    /// [`MotionError::InvalidArgument`] if the path is empty, no map was
    /// supplied, or the duration is zero. Nothing is scheduled or drawn in
    /// that case.
    pub fn start(&self, path: &[Coord]) -> Result<TrackHandle, MotionError> {
        let map = self
            .map
            .clone()
            .ok_or_else(|| MotionError::invalid("a map is required to animate a track"))?;
        if path.is_empty() {
            return Err(MotionError::invalid("path must contain at least one point"));
        }
        if self.options.duration_ms == 0 {
            return Err(MotionError::invalid("duration must be positive"));
        }

        let metrics = PathMetrics::compute(path);
        let overlay = map.add_overlay(OVERLAY_NAME);
        let run = Arc::new(AnimationRun {
            path: path.to_vec(),
            metrics,
            options: self.options.clone(),
            map,
            scheduler: Arc::clone(&self.scheduler),
            overlay,
            state: Mutex::new(RunState::default()),
        });

        if path.len() == 1 {
            run.render_static();
            debug!(overlay = %overlay, "Static marker placed");
        } else {
            debug!(
                overlay = %overlay,
                points = path.len(),
                total_length = run.metrics.total,
                duration_ms = self.options.duration_ms,
                looping = self.options.looping,
                "Track animation started"
            );
            AnimationRun::schedule(&run, &mut run.state.lock());
        }

        Ok(TrackHandle { run })
    }
}

#[derive(Debug, Default)]
struct RunState {
    start_ms: Option<f64>,
    progress: f64,
    cursor: PathCursor,
    last_sample: Option<PathSample>,
    pending_frame: Option<FrameId>,
    stopped: bool,
    finished: bool,
    laps: u64,
}

struct AnimationRun {
    path: Vec<Coord>,
    metrics: PathMetrics,
    options: TrackOptions,
    map: Arc<dyn MapView>,
    scheduler: Arc<dyn FrameScheduler>,
    overlay: LayerId,
    state: Mutex<RunState>,
}

impl AnimationRun {
    fn schedule(run: &Arc<Self>, state: &mut RunState) {
        let next = Arc::clone(run);
        let id = run
            .scheduler
            .request_frame(Box::new(move |now| next.on_frame(now)));
        state.pending_frame = Some(id);
    }

    fn on_frame(self: Arc<Self>, now_ms: f64) {
        let mut state = self.state.lock();
        state.pending_frame = None;
        if state.stopped {
            return;
        }

        let start = *state.start_ms.get_or_insert(now_ms);
        let t = ((now_ms - start) / self.options.duration_ms as f64).clamp(0.0, 1.0);
        state.progress = t;

        let Some(sample) = state.cursor.sample(&self.path, &self.metrics, t) else {
            return;
        };
        state.last_sample = Some(sample);
        self.render(&sample);

        if t < 1.0 {
            Self::schedule(&self, &mut state);
        } else if self.options.looping {
            state.start_ms = None;
            state.cursor.reset();
            state.progress = 0.0;
            state.laps += 1;
            debug!(overlay = %self.overlay, laps = state.laps, "Track animation looped");
            Self::schedule(&self, &mut state);
        } else {
            state.finished = true;
            debug!(overlay = %self.overlay, "Track animation finished");
        }
    }

    fn marker_style(&self, heading: f64) -> Style {
        if self.options.auto_rotate_marker {
            self.options.marker_style.rotated(heading)
        } else {
            self.options.marker_style.clone()
        }
    }

    fn render(&self, sample: &PathSample) {
        let mut features = Vec::with_capacity(2);
        if self.options.show_trailing_path {
            features.push(OverlayFeature::new(
                Geometry::LineString(sample.traveled(&self.path)),
                self.options.trailing_path_style.clone(),
            ));
        }
        features.push(OverlayFeature::new(
            Geometry::Point(sample.position),
            self.marker_style(sample.heading),
        ));
        self.map.set_overlay_features(self.overlay, features);
    }

    fn render_static(&self) {
        let mut state = self.state.lock();
        let position = self.path[0];
        state.last_sample = Some(PathSample {
            segment: 0,
            ratio: 0.0,
            position,
            heading: 0.0,
        });
        state.progress = 1.0;
        state.finished = true;
        self.map.set_overlay_features(
            self.overlay,
            vec![OverlayFeature::new(
                Geometry::Point(position),
                self.options.marker_style.clone(),
            )],
        );
    }

    fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.stopped {
            return false;
        }
        state.stopped = true;
        if let Some(id) = state.pending_frame.take() {
            self.scheduler.cancel_frame(id);
        }
        self.map.remove_overlay(self.overlay);
        true
    }
}

/// Control handle for a running track animation.
///
/// Dropping the handle does not stop the animation; call
/// [`TrackHandle::stop`].
#[derive(Clone)]
pub struct TrackHandle {
    run: Arc<AnimationRun>,
}

impl std::fmt::Debug for TrackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackHandle")
            .field("overlay", &self.run.overlay)
            .finish_non_exhaustive()
    }
}

impl TrackHandle {
    /// Stops the animation and removes the marker and trail.
    ///
    /// Safe to call before the first frame and any number of times.
    pub fn stop(&self) {
        if self.run.stop() {
            debug!(overlay = %self.run.overlay, "Track animation stopped");
        }
    }

    /// Progress of the current lap in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.run.state.lock().progress
    }

    /// True once a non-looping animation has reached the end of the path.
    pub fn is_finished(&self) -> bool {
        self.run.state.lock().finished
    }

    pub fn is_stopped(&self) -> bool {
        self.run.state.lock().stopped
    }

    /// Overlay layer holding the marker (and trail).
    pub fn overlay(&self) -> LayerId {
        self.run.overlay
    }

    /// Marker position as of the last rendered frame.
    pub fn current_position(&self) -> Option<Coord> {
        self.run.state.lock().last_sample.map(|s| s.position)
    }

    /// Segment the marker was on in the last rendered frame.
    pub fn segment_index(&self) -> usize {
        self.run.state.lock().cursor.segment()
    }

    /// Number of completed laps of a looping animation.
    pub fn laps(&self) -> u64 {
        self.run.state.lock().laps
    }

    pub fn metrics(&self) -> &PathMetrics {
        &self.run.metrics
    }
}
