//! Probe command - issue one GetFeatureInfo request against a WMS endpoint.

use std::sync::Arc;

use mapmotion::config::ConfigFile;
use mapmotion::coord::{Coord, ViewState};
use mapmotion::feature::{Feature, LayerId, LayerInfo};
use mapmotion::remote::{query_layer, RemoteLayer, WmsLayer};
use tracing::info;

use crate::error::CliError;

/// Arguments for the probe command.
pub struct ProbeArgs {
    pub url: String,
    pub layers: String,
    pub x: f64,
    pub y: f64,
    pub resolution: f64,
    pub projection: String,
    pub cql_filter: Option<String>,
    pub feature_count: Option<u32>,
    pub print_url: bool,
}

/// Run the probe command.
pub fn run(args: ProbeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::RuntimeCreation(e.to_string()))?;

    let layer = build_layer(&args, config)?;
    let coordinate = Coord::new(args.x, args.y);
    let view = ViewState::new(args.resolution, args.projection.clone());

    if args.print_url {
        match layer.feature_info_url(coordinate, &view) {
            Some(url) => println!("{}", url),
            None => println!("(layer cannot be queried here)"),
        }
    }

    info!(url = %args.url, layers = %args.layers, %coordinate, "Probing WMS layer");
    let features = runtime.block_on(query_layer(&layer, coordinate, &view))?;
    print!("{}", render_features(&features));
    Ok(())
}

fn build_layer(args: &ProbeArgs, config: &ConfigFile) -> Result<WmsLayer, CliError> {
    let client = Arc::new(config.http_client()?);
    let info = LayerInfo::new(LayerId(1), args.layers.clone());
    let mut layer = WmsLayer::new(info, args.url.clone(), args.layers.clone(), client)
        .with_info_format(config.remote.info_format.clone())
        .with_feature_count(args.feature_count.unwrap_or(config.remote.feature_count));
    if let Some(filter) = &args.cql_filter {
        layer = layer.with_cql_filter(filter.clone());
    }
    Ok(layer)
}

fn render_features(features: &[Feature]) -> String {
    if features.is_empty() {
        return "No features found\n".to_string();
    }

    let mut out = format!("{} feature(s)\n", features.len());
    for (i, feature) in features.iter().enumerate() {
        let id = feature
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(no id)".to_string());
        out.push_str(&format!("\n[{}] id: {}\n", i, id));
        for (key, value) in &feature.properties {
            out.push_str(&format!("    {} = {}\n", key, value));
        }
    }
    out
}
