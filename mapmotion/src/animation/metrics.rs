//! Path length tables.

use crate::coord::Coord;

/// Precomputed distances along a polyline.
///
/// Distances are Euclidean in the path's native units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathMetrics {
    /// Length of segment `i` (from `path[i]` to `path[i + 1]`).
    pub segment_lengths: Vec<f64>,
    /// Distance from the start to `path[i]`. Always starts with `0.0`.
    pub cumulative: Vec<f64>,
    /// Total path length.
    pub total: f64,
}

impl PathMetrics {
    /// Computes the tables for `path`.
    ///
    /// Paths with fewer than two points have no segments and zero length.
    pub fn compute(path: &[Coord]) -> Self {
        let segment_lengths: Vec<f64> = path.windows(2).map(|w| w[0].distance_to(w[1])).collect();

        let mut cumulative = Vec::with_capacity(segment_lengths.len() + 1);
        let mut running = 0.0;
        cumulative.push(running);
        for length in &segment_lengths {
            running += length;
            cumulative.push(running);
        }

        Self {
            segment_lengths,
            cumulative,
            total: running,
        }
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segment_lengths.len()
    }

    /// True when the path has no length to travel.
    pub fn is_degenerate(&self) -> bool {
        self.segment_lengths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[[f64; 2]]) -> Vec<Coord> {
        points.iter().copied().map(Coord::from).collect()
    }

    #[test]
    fn test_l_shaped_path() {
        let metrics = PathMetrics::compute(&path(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]));
        assert_eq!(metrics.segment_lengths, vec![10.0, 10.0]);
        assert_eq!(metrics.cumulative, vec![0.0, 10.0, 20.0]);
        assert_eq!(metrics.total, 20.0);
        assert_eq!(metrics.segment_count(), 2);
    }

    #[test]
    fn test_short_paths_have_no_segments() {
        for points in [vec![], path(&[[3.0, 4.0]])] {
            let metrics = PathMetrics::compute(&points);
            assert!(metrics.segment_lengths.is_empty());
            assert_eq!(metrics.cumulative, vec![0.0]);
            assert_eq!(metrics.total, 0.0);
            assert!(metrics.is_degenerate());
        }
    }

    #[test]
    fn test_repeated_point_is_zero_length_segment() {
        let metrics = PathMetrics::compute(&path(&[[0.0, 0.0], [0.0, 0.0], [3.0, 4.0]]));
        assert_eq!(metrics.segment_lengths, vec![0.0, 5.0]);
        assert_eq!(metrics.cumulative, vec![0.0, 0.0, 5.0]);
    }

    // Property-based tests using proptest
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_path() -> impl Strategy<Value = Vec<Coord>> {
            prop::collection::vec((-1.0e6..1.0e6_f64, -1.0e6..1.0e6_f64), 0..32)
                .prop_map(|points| points.into_iter().map(Coord::from).collect())
        }

        proptest! {
            #[test]
            fn test_table_shapes(points in arb_path()) {
                let metrics = PathMetrics::compute(&points);
                let segments = points.len().saturating_sub(1);

                prop_assert_eq!(metrics.segment_lengths.len(), segments);
                prop_assert_eq!(metrics.cumulative.len(), segments + 1);
                prop_assert_eq!(metrics.cumulative[0], 0.0);
                prop_assert_eq!(metrics.cumulative[segments], metrics.total);
            }

            #[test]
            fn test_cumulative_is_running_sum(points in arb_path()) {
                let metrics = PathMetrics::compute(&points);

                for i in 0..metrics.segment_count() {
                    prop_assert!(metrics.segment_lengths[i] >= 0.0);
                    prop_assert!(
                        metrics.cumulative[i + 1] >= metrics.cumulative[i],
                        "cumulative decreased at {}: {:?}", i, metrics.cumulative
                    );
                    prop_assert_eq!(
                        metrics.cumulative[i + 1],
                        metrics.cumulative[i] + metrics.segment_lengths[i]
                    );
                }
            }

            #[test]
            fn test_total_matches_sum(points in arb_path()) {
                let metrics = PathMetrics::compute(&points);
                let sum: f64 = metrics.segment_lengths.iter().sum();
                prop_assert!(
                    (metrics.total - sum).abs() <= 1e-9 * sum.max(1.0),
                    "total {} vs sum {}", metrics.total, sum
                );
            }
        }
    }
}
