//! WMS GetFeatureInfo layer.
//!
//! Builds WMS 1.3.0 `GetFeatureInfo` requests the same way a browser map
//! client does for a click: a 101×101 pixel query window is centred on the
//! coordinate and the feature at the centre pixel (`I=50`, `J=50`) is
//! requested as GeoJSON.
//!
//! # URL Pattern
//!
//! `{base}?SERVICE=WMS&VERSION=1.3.0&REQUEST=GetFeatureInfo&LAYERS=..&QUERY_LAYERS=..
//! &INFO_FORMAT=application/json&FEATURE_COUNT=1&I=50&J=50&WIDTH=101&HEIGHT=101
//! &CRS=EPSG:3857&BBOX=minx,miny,maxx,maxy`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::Url;
use tracing::warn;

use super::types::{FeatureInfoClient, RemoteLayer};
use crate::coord::{Coord, ViewState};
use crate::feature::LayerInfo;

/// Width and height of the query window in pixels.
const QUERY_WINDOW_PX: u32 = 101;

/// Default `INFO_FORMAT`; anything else cannot be decoded into features.
pub const DEFAULT_INFO_FORMAT: &str = "application/json";

/// Default number of features requested per query.
pub const DEFAULT_FEATURE_COUNT: u32 = 1;

/// WMS protocol version used for requests.
const WMS_VERSION: &str = "1.3.0";

/// A WMS layer queried with GetFeatureInfo.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use mapmotion::remote::{ReqwestFeatureClient, WmsLayer};
///
/// let client = Arc::new(ReqwestFeatureClient::new()?);
/// let info = map.allocate_layer("roads");
/// let layer = WmsLayer::new(info, "https://gis.example.com/geoserver/wms", "city:roads", client)
///     .with_cql_filter("status = 'open'");
/// map.add_remote_layer(Arc::new(layer));
/// ```
pub struct WmsLayer {
    info: LayerInfo,
    base_url: String,
    layers: String,
    info_format: String,
    feature_count: u32,
    cql_filter: Option<String>,
    extra_params: Vec<(String, String)>,
    visible: AtomicBool,
    client: Arc<dyn FeatureInfoClient>,
}

impl WmsLayer {
    /// Creates a visible WMS layer.
    ///
    /// # Arguments
    ///
    /// * `info` - Identity used to tag results
    /// * `base_url` - WMS endpoint, with or without existing query parameters
    /// * `layers` - Value of the `LAYERS`/`QUERY_LAYERS` parameters
    /// * `client` - Client used to run queries
    pub fn new(
        info: LayerInfo,
        base_url: impl Into<String>,
        layers: impl Into<String>,
        client: Arc<dyn FeatureInfoClient>,
    ) -> Self {
        Self {
            info,
            base_url: base_url.into(),
            layers: layers.into(),
            info_format: DEFAULT_INFO_FORMAT.to_string(),
            feature_count: DEFAULT_FEATURE_COUNT,
            cql_filter: None,
            extra_params: Vec::new(),
            visible: AtomicBool::new(true),
            client,
        }
    }

    /// Sets `FEATURE_COUNT`.
    pub fn with_feature_count(mut self, count: u32) -> Self {
        self.feature_count = count.max(1);
        self
    }

    /// Sets `INFO_FORMAT`.
    pub fn with_info_format(mut self, format: impl Into<String>) -> Self {
        self.info_format = format.into();
        self
    }

    /// Sets a GeoServer `CQL_FILTER`.
    pub fn with_cql_filter(mut self, filter: impl Into<String>) -> Self {
        self.cql_filter = Some(filter.into());
        self
    }

    /// Adds a vendor parameter to every request.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    /// Query window for `coordinate`, as `[minx, miny, maxx, maxy]`.
    fn query_extent(coordinate: Coord, resolution: f64) -> [f64; 4] {
        let half = resolution * f64::from(QUERY_WINDOW_PX) / 2.0;
        [
            coordinate.x - half,
            coordinate.y - half,
            coordinate.x + half,
            coordinate.y + half,
        ]
    }

    /// WMS 1.3.0 uses latitude/longitude axis order for EPSG:4326.
    fn bbox_param(extent: [f64; 4], projection: &str) -> String {
        let [minx, miny, maxx, maxy] = extent;
        if projection.eq_ignore_ascii_case("EPSG:4326") {
            format!("{},{},{},{}", miny, minx, maxy, maxx)
        } else {
            format!("{},{},{},{}", minx, miny, maxx, maxy)
        }
    }
}

impl RemoteLayer for WmsLayer {
    fn info(&self) -> &LayerInfo {
        &self.info
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    fn feature_info_url(&self, coordinate: Coord, view: &ViewState) -> Option<String> {
        if !(view.resolution.is_finite() && view.resolution > 0.0) {
            return None;
        }

        let mut url = match Url::parse(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(layer = %self.info.name, url = %self.base_url, error = %e, "Invalid WMS base URL");
                return None;
            }
        };

        let extent = Self::query_extent(coordinate, view.resolution);
        let center = (QUERY_WINDOW_PX / 2).to_string();
        let size = QUERY_WINDOW_PX.to_string();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("SERVICE", "WMS")
                .append_pair("VERSION", WMS_VERSION)
                .append_pair("REQUEST", "GetFeatureInfo")
                .append_pair("FORMAT", "image/png")
                .append_pair("TRANSPARENT", "true")
                .append_pair("LAYERS", &self.layers)
                .append_pair("QUERY_LAYERS", &self.layers)
                .append_pair("STYLES", "")
                .append_pair("INFO_FORMAT", &self.info_format)
                .append_pair("FEATURE_COUNT", &self.feature_count.to_string())
                .append_pair("I", &center)
                .append_pair("J", &center)
                .append_pair("WIDTH", &size)
                .append_pair("HEIGHT", &size)
                .append_pair("CRS", &view.projection)
                .append_pair("BBOX", &Self::bbox_param(extent, &view.projection));
            if let Some(filter) = &self.cql_filter {
                query.append_pair("CQL_FILTER", filter);
            }
            for (key, value) in &self.extra_params {
                query.append_pair(key, value);
            }
        }

        Some(url.into())
    }

    fn client(&self) -> &dyn FeatureInfoClient {
        self.client.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureCollection, LayerId};
    use crate::remote::QueryError;
    use futures::future::BoxFuture;

    struct NoopClient;

    impl FeatureInfoClient for NoopClient {
        fn fetch<'a>(
            &'a self,
            _url: &'a str,
        ) -> BoxFuture<'a, Result<FeatureCollection, QueryError>> {
            Box::pin(async { Ok(FeatureCollection::default()) })
        }
    }

    fn layer(base: &str) -> WmsLayer {
        WmsLayer::new(
            LayerInfo::new(LayerId(3), "roads"),
            base,
            "city:roads",
            Arc::new(NoopClient),
        )
    }

    fn params(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param(url: &str, key: &str) -> Option<String> {
        params(url).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn test_url_contains_protocol_params() {
        let url = layer("https://gis.example.com/geoserver/wms")
            .feature_info_url(Coord::new(1000.0, 2000.0), &ViewState::new(2.0, "EPSG:3857"))
            .unwrap();

        assert!(url.starts_with("https://gis.example.com/geoserver/wms?"));
        assert_eq!(param(&url, "REQUEST").as_deref(), Some("GetFeatureInfo"));
        assert_eq!(param(&url, "VERSION").as_deref(), Some("1.3.0"));
        assert_eq!(param(&url, "QUERY_LAYERS").as_deref(), Some("city:roads"));
        assert_eq!(param(&url, "INFO_FORMAT").as_deref(), Some("application/json"));
        assert_eq!(param(&url, "FEATURE_COUNT").as_deref(), Some("1"));
        assert_eq!(param(&url, "I").as_deref(), Some("50"));
        assert_eq!(param(&url, "J").as_deref(), Some("50"));
        assert_eq!(param(&url, "CRS").as_deref(), Some("EPSG:3857"));
        // 101 px * 2 units/px = 202 units wide, centred on the coordinate.
        assert_eq!(param(&url, "BBOX").as_deref(), Some("899,1899,1101,2101"));
    }

    #[test]
    fn test_geographic_bbox_is_lat_lon_ordered() {
        let url = layer("https://gis.example.com/wms")
            .feature_info_url(Coord::new(10.0, 50.0), &ViewState::new(0.02, "EPSG:4326"))
            .unwrap();
        let bbox = param(&url, "BBOX").unwrap();
        let values: Vec<f64> = bbox.split(',').map(|v| v.parse().unwrap()).collect();
        assert!((values[0] - 48.99).abs() < 1e-9, "miny first, got {}", bbox);
        assert!((values[1] - 8.99).abs() < 1e-9, "minx second, got {}", bbox);
    }

    #[test]
    fn test_existing_query_and_vendor_params_are_kept() {
        let url = layer("https://gis.example.com/wms?token=abc")
            .with_cql_filter("status = 'open'")
            .with_feature_count(5)
            .with_param("buffer", "10")
            .feature_info_url(Coord::new(0.0, 0.0), &ViewState::default())
            .unwrap();

        assert_eq!(param(&url, "token").as_deref(), Some("abc"));
        assert_eq!(param(&url, "CQL_FILTER").as_deref(), Some("status = 'open'"));
        assert_eq!(param(&url, "FEATURE_COUNT").as_deref(), Some("5"));
        assert_eq!(param(&url, "buffer").as_deref(), Some("10"));
    }

    #[test]
    fn test_invalid_inputs_produce_no_url() {
        assert!(layer("not a url")
            .feature_info_url(Coord::default(), &ViewState::default())
            .is_none());
        assert!(layer("https://gis.example.com/wms")
            .feature_info_url(Coord::default(), &ViewState::new(0.0, "EPSG:3857"))
            .is_none());
    }

    #[test]
    fn test_visibility_toggle() {
        let wms = layer("https://gis.example.com/wms");
        assert!(wms.is_visible());
        wms.set_visible(false);
        assert!(!wms.is_visible());
    }
}
