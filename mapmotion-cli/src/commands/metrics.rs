//! Metrics command - print the segment table of a path.

use std::path::PathBuf;

use mapmotion::animation::PathMetrics;
use mapmotion::coord::Coord;

use super::common::read_path;
use crate::error::CliError;

/// Arguments for the metrics command.
pub struct MetricsArgs {
    pub path: PathBuf,
    pub json: bool,
}

/// Run the metrics command.
pub fn run(args: MetricsArgs) -> Result<(), CliError> {
    let coords = read_path(&args.path)?;
    let metrics = PathMetrics::compute(&coords);

    if args.json {
        println!("{}", to_json(&coords, &metrics));
    } else {
        print!("{}", render_table(&coords, &metrics));
    }
    Ok(())
}

/// Human-readable segment table.
fn render_table(coords: &[Coord], metrics: &PathMetrics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Points: {}  Segments: {}  Total length: {:.3}\n",
        coords.len(),
        metrics.segment_count(),
        metrics.total
    ));
    if metrics.is_degenerate() {
        out.push_str("(degenerate path: the marker never moves)\n");
    }
    if metrics.segment_count() == 0 {
        return out;
    }

    out.push('\n');
    out.push_str(&format!(
        "{:>4}  {:>24}  {:>24}  {:>12}  {:>12}\n",
        "#", "from", "to", "length", "cumulative"
    ));
    for (i, length) in metrics.segment_lengths.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:>24}  {:>24}  {:>12.3}  {:>12.3}\n",
            i,
            coords[i].to_string(),
            coords[i + 1].to_string(),
            length,
            metrics.cumulative[i + 1]
        ));
    }
    out
}

fn to_json(coords: &[Coord], metrics: &PathMetrics) -> serde_json::Value {
    serde_json::json!({
        "points": coords,
        "segment_lengths": metrics.segment_lengths,
        "cumulative": metrics.cumulative,
        "total": metrics.total,
    })
}
