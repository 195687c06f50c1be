//! Position lookup along a path.

use super::metrics::PathMetrics;
use crate::coord::Coord;

/// Where the marker is for a given progress value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    /// Index of the segment the marker is on.
    pub segment: usize,
    /// Fraction of that segment already traveled, in `[0, 1]`.
    pub ratio: f64,
    /// Interpolated marker position.
    pub position: Coord,
    /// Direction of the current segment, `atan2(dy, dx)` in radians.
    pub heading: f64,
}

impl PathSample {
    /// The traveled part of `path`: every vertex up to the current segment
    /// start, then the marker position.
    pub fn traveled(&self, path: &[Coord]) -> Vec<Coord> {
        let end = (self.segment + 1).min(path.len());
        let mut points = Vec::with_capacity(end + 1);
        points.extend_from_slice(&path[..end]);
        points.push(self.position);
        points
    }
}

/// Monotonic segment search.
///
/// Remembers the last segment index so that each lookup continues from where
/// the previous one stopped. Within one run the index only moves forward;
/// [`PathCursor::reset`] starts over for a new lap.
#[derive(Debug, Clone, Default)]
pub struct PathCursor {
    segment: usize,
}

impl PathCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current segment index.
    pub fn segment(&self) -> usize {
        self.segment
    }

    pub fn reset(&mut self) {
        self.segment = 0;
    }

    /// Samples `path` at progress `t`.
    ///
    /// `t` is clamped to `[0, 1]`; a non-finite `t` counts as `0`. At `t = 0`
    /// the position is exactly the first point and at `t = 1` exactly the
    /// last one. Returns `None` for an empty path.
    pub fn sample(&mut self, path: &[Coord], metrics: &PathMetrics, t: f64) -> Option<PathSample> {
        let first = *path.first()?;
        if metrics.is_degenerate() || path.len() < 2 {
            return Some(PathSample {
                segment: 0,
                ratio: 0.0,
                position: first,
                heading: 0.0,
            });
        }

        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let target = t * metrics.total;
        let last_segment = metrics.segment_count() - 1;

        let mut i = self.segment.min(last_segment);
        while i < last_segment && metrics.cumulative[i + 1] < target {
            i += 1;
        }
        self.segment = i;

        let length = metrics.segment_lengths[i];
        let ratio = if length == 0.0 {
            0.0
        } else if t >= 1.0 {
            1.0
        } else {
            ((target - metrics.cumulative[i]) / length).clamp(0.0, 1.0)
        };

        let (from, to) = (path[i], path[i + 1]);
        Some(PathSample {
            segment: i,
            ratio,
            position: from.lerp(to, ratio),
            heading: from.heading_to(to),
        })
    }
}
