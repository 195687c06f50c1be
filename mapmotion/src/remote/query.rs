//! Remote query strategies.
//!
//! Two deliberately different shapes are offered:
//!
//! - [`query_all`] fans out one request per layer and joins all of them.
//!   Used by clicks, where every layer's answer belongs in the selection.
//! - [`query_first`] walks the layers sequentially in priority order and
//!   stops at the first layer that returns something. Used by hover, where
//!   one answer is enough and fewer requests means less flicker.
//!
//! In both, a failing layer counts as an empty layer: the error is logged and
//! the remaining layers are unaffected.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::types::{QueryError, RemoteLayer};
use crate::coord::{Coord, ViewState};
use crate::feature::{Feature, LayerInfo};

/// Features returned by one remote layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteHit {
    pub layer: LayerInfo,
    pub features: Vec<Feature>,
}

/// Queries a single layer.
///
/// A layer that cannot build a URL for the coordinate yields no features.
pub async fn query_layer(
    layer: &dyn RemoteLayer,
    coordinate: Coord,
    view: &ViewState,
) -> Result<Vec<Feature>, QueryError> {
    let Some(url) = layer.feature_info_url(coordinate, view) else {
        debug!(layer = %layer.info().name, "Layer produced no feature info URL");
        return Ok(Vec::new());
    };

    let start = Instant::now();
    let collection = layer.client().fetch(&url).await?;
    debug!(
        layer = %layer.info().name,
        features = collection.features.len(),
        duration_ms = start.elapsed().as_millis(),
        "Remote feature query completed"
    );
    Ok(collection.features)
}

/// Runs one layer's query, absorbing failures.
async fn query_or_empty(layer: Arc<dyn RemoteLayer>, coordinate: Coord, view: ViewState) -> RemoteHit {
    let features = match query_layer(layer.as_ref(), coordinate, &view).await {
        Ok(features) => features,
        Err(e) => {
            warn!(layer = %layer.info().name, error = %e, "Remote feature query failed");
            Vec::new()
        }
    };
    RemoteHit {
        layer: layer.info().clone(),
        features,
    }
}

/// Queries every layer concurrently and waits for all of them.
///
/// Results keep the order of `layers`; layers that failed or returned
/// nothing are left out.
pub async fn query_all(
    layers: &[Arc<dyn RemoteLayer>],
    coordinate: Coord,
    view: &ViewState,
) -> Vec<RemoteHit> {
    let requests = layers
        .iter()
        .map(|layer| query_or_empty(Arc::clone(layer), coordinate, view.clone()));

    join_all(requests)
        .await
        .into_iter()
        .filter(|hit| !hit.features.is_empty())
        .collect()
}

/// Queries layers one after another, returning the first non-empty answer.
///
/// `cancel` is checked before each request: once it fires no further layers
/// are queried. A request already in flight is allowed to finish.
pub async fn query_first(
    layers: &[Arc<dyn RemoteLayer>],
    coordinate: Coord,
    view: &ViewState,
    cancel: &CancellationToken,
) -> Option<RemoteHit> {
    for layer in layers {
        if cancel.is_cancelled() {
            debug!("Sequential remote query abandoned");
            return None;
        }
        let hit = query_or_empty(Arc::clone(layer), coordinate, view.clone()).await;
        if !hit.features.is_empty() {
            return Some(hit);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureCollection, FeatureId, LayerId};
    use crate::remote::FeatureInfoClient;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Layer that answers with a canned response after a delay.
    struct ScriptedLayer {
        info: LayerInfo,
        response: Result<Vec<Feature>, QueryError>,
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedLayer {
        fn new(id: u64, response: Result<Vec<Feature>, QueryError>, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                info: LayerInfo::new(LayerId(id), format!("layer-{}", id)),
                response,
                delay: Duration::from_millis(delay_ms),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    impl FeatureInfoClient for ScriptedLayer {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FeatureCollection, QueryError>> {
            Box::pin(async move {
                self.calls.lock().push(url.to_string());
                tokio::time::sleep(self.delay).await;
                self.response
                    .clone()
                    .map(|features| FeatureCollection { features })
            })
        }
    }

    impl RemoteLayer for ScriptedLayer {
        fn info(&self) -> &LayerInfo {
            &self.info
        }

        fn is_visible(&self) -> bool {
            true
        }

        fn feature_info_url(&self, coordinate: Coord, _view: &ViewState) -> Option<String> {
            Some(format!("mock://{}?x={}&y={}", self.info.name, coordinate.x, coordinate.y))
        }

        fn client(&self) -> &dyn FeatureInfoClient {
            self
        }
    }

    fn feature(id: i64) -> Feature {
        Feature::default().with_id(id)
    }

    fn as_dyn(layers: &[Arc<ScriptedLayer>]) -> Vec<Arc<dyn RemoteLayer>> {
        layers
            .iter()
            .map(|l| Arc::clone(l) as Arc<dyn RemoteLayer>)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_all_joins_in_layer_order() {
        // The slow first layer still comes first in the result.
        let layers = vec![
            ScriptedLayer::new(1, Ok(vec![feature(10)]), 300),
            ScriptedLayer::new(2, Err(QueryError::Http("refused".to_string())), 10),
            ScriptedLayer::new(3, Ok(vec![]), 10),
            ScriptedLayer::new(4, Ok(vec![feature(40)]), 50),
        ];

        let hits = query_all(&as_dyn(&layers), Coord::new(1.0, 2.0), &ViewState::default()).await;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].layer.id, LayerId(1));
        assert_eq!(hits[0].features[0].id, Some(FeatureId::Number(10)));
        assert_eq!(hits[1].layer.id, LayerId(4));
        assert!(layers.iter().all(|l| l.call_count() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_all_runs_concurrently() {
        let layers = vec![
            ScriptedLayer::new(1, Ok(vec![feature(1)]), 200),
            ScriptedLayer::new(2, Ok(vec![feature(2)]), 200),
        ];

        let start = tokio::time::Instant::now();
        let hits = query_all(&as_dyn(&layers), Coord::default(), &ViewState::default()).await;

        assert_eq!(hits.len(), 2);
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_first_short_circuits() {
        let layers = vec![
            ScriptedLayer::new(1, Err(QueryError::Parse("html".to_string())), 10),
            ScriptedLayer::new(2, Ok(vec![feature(20)]), 10),
            ScriptedLayer::new(3, Ok(vec![feature(30)]), 10),
        ];

        let hit = query_first(
            &as_dyn(&layers),
            Coord::default(),
            &ViewState::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(hit.layer.id, LayerId(2));
        assert_eq!(layers[0].call_count(), 1);
        assert_eq!(layers[1].call_count(), 1);
        assert_eq!(layers[2].call_count(), 0, "Lower priority layer must not be queried");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_first_stops_when_cancelled() {
        let layers = vec![ScriptedLayer::new(1, Ok(vec![feature(1)]), 10)];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let hit = query_first(&as_dyn(&layers), Coord::default(), &ViewState::default(), &cancel).await;

        assert!(hit.is_none());
        assert_eq!(layers[0].call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_first_none_when_all_empty() {
        let layers = vec![
            ScriptedLayer::new(1, Ok(vec![]), 0),
            ScriptedLayer::new(2, Ok(vec![]), 0),
        ];
        let hit = query_first(
            &as_dyn(&layers),
            Coord::default(),
            &ViewState::default(),
            &CancellationToken::new(),
        )
        .await;
        assert!(hit.is_none());
    }
}
