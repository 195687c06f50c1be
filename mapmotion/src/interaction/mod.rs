//! Hybrid selection and hover.
//!
//! Both aggregators merge two sources of "what is under the pointer":
//!
//! - the host map's synchronous [`FeatureIndex`](crate::map::FeatureIndex)
//!   hit-test, and
//! - asynchronous remote queries against server-rendered layers.
//!
//! # Architecture
//!
//! ```text
//!   MapView events ──► listener task ──► state (Mutex) ──► subscribers
//!                          ▲    │
//!          timer / remote  │    ▼
//!          results (mpsc) ─┘  spawned timers and remote batches
//! ```
//!
//! Each aggregator owns one listener task. Remote batches and debounce
//! timers run on their own tasks and report back to the listener, so every
//! notification is delivered by the listener in arrival order.
//! `clear()` and `destroy()` act on the shared state directly and take
//! effect before they return.

mod debounce;
mod hover;
mod select;
mod style;
mod subscribers;

use std::sync::Arc;

use crate::feature::{FeatureHit, LayerId, LayerInfo};
use crate::map::{MapView, OverlayFeature};
use crate::remote::RemoteLayer;

pub use debounce::{spawn_timer, DebounceSlot, DebounceTicket};
pub use hover::{HoverAggregator, HoverOptions, HoverResult, DEFAULT_HOVER_DEBOUNCE};
pub use select::{SelectOptions, SelectPhase, SelectResult, SelectionAggregator};
pub use style::{StyleFn, StyleResolver};
pub use subscribers::{SubscriberSet, Subscription};

/// Where a selection or hover result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSource {
    /// The host map's local hit-test.
    Local,
    /// A remote feature query.
    Remote,
}

/// Keeps hits on targeted layers, never on the aggregator's own overlay.
fn filter_hits(
    hits: Vec<FeatureHit>,
    targets: Option<&[LayerId]>,
    own_overlay: LayerId,
) -> Vec<FeatureHit> {
    hits.into_iter()
        .filter(|hit| hit.layer.id != own_overlay)
        .filter(|hit| targets.map_or(true, |t| t.contains(&hit.layer.id)))
        .collect()
}

/// Visible remote layers eligible for querying.
///
/// With explicit targets the result follows the target order, otherwise
/// the map's layer order.
fn visible_remote_layers(map: &dyn MapView, targets: Option<&[LayerId]>) -> Vec<Arc<dyn RemoteLayer>> {
    let visible = map
        .remote_layers()
        .into_iter()
        .filter(|layer| layer.is_visible());

    match targets {
        None => visible.collect(),
        Some(targets) => {
            let visible: Vec<_> = visible.collect();
            targets
                .iter()
                .filter_map(|id| visible.iter().find(|l| l.info().id == *id).cloned())
                .collect()
        }
    }
}

/// Overlay content for a set of highlighted features.
///
/// Features without geometry cannot be drawn and are skipped.
fn highlight_features<'a, I>(items: I, style: &StyleResolver) -> Vec<OverlayFeature>
where
    I: IntoIterator<Item = (&'a LayerInfo, &'a crate::feature::Feature)>,
{
    items
        .into_iter()
        .filter_map(|(layer, feature)| {
            feature
                .geometry
                .clone()
                .map(|geometry| OverlayFeature::new(geometry, style.resolve(&layer.name, feature)))
        })
        .collect()
}
