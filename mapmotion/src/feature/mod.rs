//! Feature model shared by local hit-testing and remote queries.
//!
//! Remote servers answer GetFeatureInfo requests with GeoJSON, so the model
//! follows GeoJSON closely: a [`Feature`] has an optional id, an optional
//! geometry and a free-form property bag.

mod geometry;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use geometry::Geometry;

/// Free-form feature attributes.
pub type Properties = Map<String, Value>;

/// Identifier of a map layer, unique within one host map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A layer reference attached to every selection and hover result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
}

impl LayerInfo {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// GeoJSON feature id (string or integer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{}", n),
            FeatureId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::Text(value.to_string())
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        FeatureId::Number(value)
    }
}

/// A single feature, either held by the local index or returned remotely.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,

    #[serde(default)]
    pub geometry: Option<Geometry>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,
}

impl Feature {
    /// Creates a feature with a geometry and no attributes.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: Properties::new(),
        }
    }

    /// Sets the feature id.
    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds one attribute.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Looks up one attribute.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A GeoJSON feature collection as returned by GetFeatureInfo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One result of a synchronous hit-test: a feature and its owning layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHit {
    pub feature: Feature,
    pub layer: LayerInfo,
}

impl FeatureHit {
    pub fn new(feature: Feature, layer: LayerInfo) -> Self {
        Self { feature, layer }
    }

    /// True when both hits refer to the same feature on the same layer.
    pub fn same_target(&self, other: &FeatureHit) -> bool {
        self.layer.id == other.layer.id && self.feature == other.feature
    }
}

/// GeoJSON allows `"properties": null`; treat it as an empty bag.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}
