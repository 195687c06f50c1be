//! Remote layer and client traits.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::coord::{Coord, ViewState};
use crate::feature::{FeatureCollection, LayerInfo};

/// Failure of one remote feature query.
///
/// These never reach subscribers: the query helpers log them and treat the
/// layer as having returned zero features.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The body was not a GeoJSON feature collection.
    #[error("Failed to parse feature collection: {0}")]
    Parse(String),
}

/// Fetches and decodes a feature-info response.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock clients in tests.
pub trait FeatureInfoClient: Send + Sync {
    /// Performs a GET request and parses the body as GeoJSON.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FeatureCollection, QueryError>>;
}

/// A server-rendered layer that can answer "what is at this point".
pub trait RemoteLayer: Send + Sync {
    /// Layer identity used to tag results.
    fn info(&self) -> &LayerInfo;

    /// Hidden layers are never queried.
    fn is_visible(&self) -> bool;

    /// Builds the query URL for a coordinate in the current view, or `None`
    /// if the layer cannot be queried there.
    fn feature_info_url(&self, coordinate: Coord, view: &ViewState) -> Option<String>;

    /// Client used to run this layer's queries.
    fn client(&self) -> &dyn FeatureInfoClient;
}
