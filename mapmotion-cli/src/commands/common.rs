//! Common helpers shared across CLI commands.

use std::path::Path;

use mapmotion::config::ConfigFile;
use mapmotion::coord::Coord;
use mapmotion::feature::{Feature, Geometry};

use crate::error::CliError;

/// Loads the config from `--config` if given, else from the default location.
///
/// A missing file yields the defaults in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) if path.exists() => Ok(ConfigFile::load_from(path)?),
        Some(_) => Ok(ConfigFile::default()),
        None => Ok(ConfigFile::load()?),
    }
}

/// Reads a path from a JSON file.
///
/// Accepted shapes:
/// - an array of positions: `[[0, 0], [10, 0]]`
/// - a GeoJSON `LineString` geometry
/// - a GeoJSON `Feature` with a `LineString` geometry
pub fn read_path(path: &Path) -> Result<Vec<Coord>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadPath {
        path: path.to_path_buf(),
        source,
    })?;
    parse_path(&text).map_err(|message| CliError::InvalidPath {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses path JSON. See [`read_path`] for the accepted shapes.
pub fn parse_path(text: &str) -> Result<Vec<Coord>, String> {
    let coords = if let Ok(coords) = serde_json::from_str::<Vec<Coord>>(text) {
        coords
    } else if let Ok(geometry) = serde_json::from_str::<Geometry>(text) {
        line_coords(geometry)?
    } else {
        let feature: Feature = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let geometry = feature
            .geometry
            .ok_or_else(|| "feature has no geometry".to_string())?;
        line_coords(geometry)?
    };

    if coords.is_empty() {
        return Err("path is empty".to_string());
    }
    Ok(coords)
}

fn line_coords(geometry: Geometry) -> Result<Vec<Coord>, String> {
    match geometry {
        Geometry::LineString(coords) => Ok(coords),
        other => Err(format!("expected a LineString, got {}", kind(&other))),
    }
}

fn kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_position_array() {
        let coords = parse_path("[[0, 0], [10, 0], [10, 10, 3]]").unwrap();
        assert_eq!(
            coords,
            vec![
                Coord::new(0.0, 0.0),
                Coord::new(10.0, 0.0),
                Coord::new(10.0, 10.0)
            ]
        );
    }

    #[test]
    fn test_parse_linestring_geometry() {
        let coords =
            parse_path(r#"{"type": "LineString", "coordinates": [[1, 2], [3, 4]]}"#).unwrap();
        assert_eq!(coords, vec![Coord::new(1.0, 2.0), Coord::new(3.0, 4.0)]);
    }

    #[test]
    fn test_parse_feature() {
        let text = r#"{
            "type": "Feature",
            "properties": {"name": "route 1"},
            "geometry": {"type": "LineString", "coordinates": [[1, 2], [3, 4]]}
        }"#;
        assert_eq!(parse_path(text).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_other_geometries() {
        let err = parse_path(r#"{"type": "Point", "coordinates": [1, 2]}"#).unwrap_err();
        assert!(err.contains("Point"));
    }

    #[test]
    fn test_parse_rejects_empty_path() {
        assert_eq!(parse_path("[]").unwrap_err(), "path is empty");
    }

    #[test]
    fn test_read_path_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[[0, 0], [3, 4]]").unwrap();

        let coords = read_path(file.path()).unwrap();
        assert_eq!(coords.len(), 2);
    }

    #[test]
    fn test_load_config_missing_override_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.ini"))).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_config_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[select]\nmulti = yes\n").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(config.select.multi);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_path(Path::new("/nonexistent/route.json")).unwrap_err();
        assert!(matches!(err, CliError::ReadPath { .. }));
    }
}
