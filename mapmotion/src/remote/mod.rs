//! Remote feature query abstraction
//!
//! Layers whose data is rendered server-side cannot be hit-tested locally.
//! This module provides the seam for asking the server instead:
//!
//! - [`RemoteLayer`] builds a query URL for a coordinate.
//! - [`FeatureInfoClient`] fetches and decodes the answer.
//! - [`query_all`] / [`query_first`] are the two query strategies used by
//!   the selection and hover aggregators.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mapmotion::remote::{query_all, ReqwestFeatureClient, WmsLayer};
//!
//! let client = Arc::new(ReqwestFeatureClient::new()?);
//! let layer = Arc::new(WmsLayer::new(info, "https://gis.example.com/wms", "roads", client));
//! let hits = query_all(&[layer], coordinate, &map.view_state()).await;
//! ```

mod http;
mod query;
mod types;
mod wms;

pub use http::{parse_collection, ReqwestFeatureClient, DEFAULT_TIMEOUT_SECS};
pub use query::{query_all, query_first, query_layer, RemoteHit};
pub use types::{FeatureInfoClient, QueryError, RemoteLayer};
pub use wms::{WmsLayer, DEFAULT_FEATURE_COUNT, DEFAULT_INFO_FORMAT};
