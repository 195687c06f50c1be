//! Planar coordinates and view state.
//!
//! All coordinates handled by the engine are expressed in the host map's
//! active linear projection. No geographic correction is applied anywhere:
//! callers project lon/lat into a linear space before handing paths over.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the map's projected coordinate space.
///
/// Serializes as a GeoJSON position (`[x, y]`). Deserialization accepts
/// positions with extra ordinates (`[x, y, z]`) and drops them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Coord {
    /// Easting / horizontal ordinate.
    pub x: f64,
    /// Northing / vertical ordinate.
    pub y: f64,
}

impl Coord {
    /// Creates a coordinate.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Coord) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear blend towards `other`.
    ///
    /// Written as `a * (1 - r) + b * r` so that `ratio == 0.0` returns `self`
    /// and `ratio == 1.0` returns `other` bit-for-bit.
    pub fn lerp(&self, other: Coord, ratio: f64) -> Coord {
        let inv = 1.0 - ratio;
        Coord {
            x: self.x * inv + other.x * ratio,
            y: self.y * inv + other.y * ratio,
        }
    }

    /// Direction angle of the vector from `self` to `other`, `atan2(dy, dx)`
    /// in radians.
    pub fn heading_to(&self, other: Coord) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl From<[f64; 2]> for Coord {
    fn from(value: [f64; 2]) -> Self {
        Coord::new(value[0], value[1])
    }
}

impl From<(f64, f64)> for Coord {
    fn from(value: (f64, f64)) -> Self {
        Coord::new(value.0, value.1)
    }
}

impl From<Coord> for [f64; 2] {
    fn from(value: Coord) -> Self {
        [value.x, value.y]
    }
}

impl TryFrom<Vec<f64>> for Coord {
    type Error = String;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [x, y, ..] => Ok(Coord::new(*x, *y)),
            other => Err(format!(
                "position needs at least 2 ordinates, got {}",
                other.len()
            )),
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// A screen position in CSS pixels relative to the map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Snapshot of the map view needed to build remote queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Map units per pixel.
    pub resolution: f64,
    /// Projection code, e.g. `EPSG:3857`.
    pub projection: String,
}

impl ViewState {
    pub fn new(resolution: f64, projection: impl Into<String>) -> Self {
        Self {
            resolution,
            projection: projection.into(),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(1.0, "EPSG:3857")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
    }

    #[test]
    fn test_lerp_endpoints_are_exact() {
        let a = Coord::new(0.1, 0.7);
        let b = Coord::new(0.3, -12.25);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(10.0, 0.0);
        assert_eq!(a.lerp(b, 0.5), Coord::new(5.0, 0.0));
    }

    #[test]
    fn test_heading() {
        let origin = Coord::new(0.0, 0.0);
        assert_eq!(origin.heading_to(Coord::new(1.0, 0.0)), 0.0);
        let north = origin.heading_to(Coord::new(0.0, 1.0));
        assert!((north - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_2d_and_3d_positions() {
        let c: Coord = serde_json::from_str("[1.5, 2.5]").unwrap();
        assert_eq!(c, Coord::new(1.5, 2.5));

        let c: Coord = serde_json::from_str("[1.5, 2.5, 100.0]").unwrap();
        assert_eq!(c, Coord::new(1.5, 2.5));

        assert!(serde_json::from_str::<Coord>("[1.5]").is_err());
    }

    #[test]
    fn test_serialize_as_position() {
        let json = serde_json::to_string(&Coord::new(1.0, -2.0)).unwrap();
        assert_eq!(json, "[1.0,-2.0]");
    }

    #[test]
    fn test_display() {
        assert_eq!(Coord::new(5.0, 0.0).to_string(), "[5, 0]");
    }
}
