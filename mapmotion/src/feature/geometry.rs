//! GeoJSON geometries and the distance queries used for hit-testing.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;

/// A GeoJSON geometry.
///
/// `GeometryCollection` is not supported; a payload containing one fails to
/// parse and is treated like any other malformed remote response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    /// Shortest distance from `at` to this geometry.
    ///
    /// Points inside a polygon (outside its holes) are at distance zero.
    /// Empty geometries are infinitely far away.
    pub fn distance_to(&self, at: Coord) -> f64 {
        match self {
            Geometry::Point(p) => p.distance_to(at),
            Geometry::MultiPoint(points) => points
                .iter()
                .map(|p| p.distance_to(at))
                .fold(f64::INFINITY, f64::min),
            Geometry::LineString(line) => polyline_distance(line, at),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .map(|l| polyline_distance(l, at))
                .fold(f64::INFINITY, f64::min),
            Geometry::Polygon(rings) => polygon_distance(rings, at),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .map(|p| polygon_distance(p, at))
                .fold(f64::INFINITY, f64::min),
        }
    }
}

fn segment_distance(a: Coord, b: Coord, p: Coord) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a.distance_to(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    a.lerp(b, t).distance_to(p)
}

fn polyline_distance(line: &[Coord], p: Coord) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => only.distance_to(p),
        _ => line
            .windows(2)
            .map(|w| segment_distance(w[0], w[1], p))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Even-odd ray casting.
fn ring_contains(ring: &[Coord], p: Coord) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn polygon_distance(rings: &[Vec<Coord>], p: Coord) -> f64 {
    let Some((outer, holes)) = rings.split_first() else {
        return f64::INFINITY;
    };
    if ring_contains(outer, p) && !holes.iter().any(|h| ring_contains(h, p)) {
        return 0.0;
    }
    rings
        .iter()
        .map(|r| polyline_distance(r, p))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<Coord> {
        vec![
            Coord::new(min, min),
            Coord::new(max, min),
            Coord::new(max, max),
            Coord::new(min, max),
            Coord::new(min, min),
        ]
    }

    #[test]
    fn test_point_distance() {
        let g = Geometry::Point(Coord::new(0.0, 0.0));
        assert_eq!(g.distance_to(Coord::new(0.0, 2.0)), 2.0);
    }

    #[test]
    fn test_line_distance_projects_onto_segment() {
        let g = Geometry::LineString(vec![Coord::new(0.0, 0.0), Coord::new(10.0, 0.0)]);
        assert_eq!(g.distance_to(Coord::new(5.0, 3.0)), 3.0);
        // Beyond the end the nearest point is the endpoint.
        assert_eq!(g.distance_to(Coord::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn test_polygon_inside_outside_and_hole() {
        let g = Geometry::Polygon(vec![square(0.0, 10.0), square(4.0, 6.0)]);
        assert_eq!(g.distance_to(Coord::new(2.0, 2.0)), 0.0);
        assert_eq!(g.distance_to(Coord::new(12.0, 5.0)), 2.0);
        // Inside the hole: distance to the hole's edge.
        assert_eq!(g.distance_to(Coord::new(5.0, 5.0)), 1.0);
    }

    #[test]
    fn test_empty_geometries_are_unreachable() {
        assert!(Geometry::LineString(vec![])
            .distance_to(Coord::default())
            .is_infinite());
        assert!(Geometry::Polygon(vec![])
            .distance_to(Coord::default())
            .is_infinite());
    }

    #[test]
    fn test_geojson_round_trip_shape() {
        let json = r#"{"type":"LineString","coordinates":[[0.0,0.0],[1.0,1.0]]}"#;
        let g: Geometry = serde_json::from_str(json).unwrap();
        assert_eq!(
            g,
            Geometry::LineString(vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)])
        );
        assert_eq!(serde_json::to_string(&g).unwrap(), json);
    }
}
