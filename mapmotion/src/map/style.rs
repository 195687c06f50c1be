//! Overlay styles.
//!
//! Styles are opaque to the engine: they are attached to overlay features and
//! handed to the host map unchanged. Only the marker rotation is written by
//! the engine itself.

/// Stroke appearance for lines and outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

/// Fill appearance for areas.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
}

/// Image marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Icon {
    pub src: String,
    /// Pixel offset into the image (sprite offset).
    pub offset: [f64; 2],
    /// Clockwise rotation in radians.
    pub rotation: f64,
}

/// Composite style for one overlay feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub stroke: Option<Stroke>,
    pub fill: Option<Fill>,
    pub icon: Option<Icon>,
    /// Radius of the circle drawn for point geometries without an icon.
    pub point_radius: Option<f64>,
    pub z_index: Option<i32>,
}

impl Style {
    /// Default style for the traveled path behind an animated marker.
    pub fn trailing_path() -> Self {
        Self {
            stroke: Some(Stroke {
                color: "#3399CC".to_string(),
                width: 2.0,
            }),
            fill: Some(Fill {
                color: "rgba(51,153,204,0.2)".to_string(),
            }),
            ..Default::default()
        }
    }

    /// Default style for an animated marker: a filled circle.
    pub fn marker() -> Self {
        Self {
            stroke: Some(Stroke {
                color: "#FFFFFF".to_string(),
                width: 2.0,
            }),
            fill: Some(Fill {
                color: "#3399CC".to_string(),
            }),
            point_radius: Some(6.0),
            z_index: Some(1000),
            ..Default::default()
        }
    }

    /// Default style for selected and hovered features.
    pub fn highlight() -> Self {
        Self {
            stroke: Some(Stroke {
                color: "#FFCC33".to_string(),
                width: 3.0,
            }),
            fill: Some(Fill {
                color: "rgba(255,204,51,0.25)".to_string(),
            }),
            point_radius: Some(7.0),
            z_index: Some(999),
            ..Default::default()
        }
    }

    /// Returns a copy whose icon (if any) is rotated to `rotation` radians.
    pub fn rotated(&self, rotation: f64) -> Self {
        let mut style = self.clone();
        if let Some(icon) = style.icon.as_mut() {
            icon.rotation = rotation;
        }
        style
    }
}
