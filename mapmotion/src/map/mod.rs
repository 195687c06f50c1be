//! Host map contract.
//!
//! The engine never draws anything itself. Everything it needs from the host
//! map is expressed by two traits:
//!
//! - [`FeatureIndex`] - the synchronous local hit-test.
//! - [`MapView`] - view state, remote layers, overlay layers, the cursor and
//!   the stream of pointer events.
//!
//! [`MemoryMap`] implements both for headless use (CLI replay, tests).

mod memory;
mod style;

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::coord::{Coord, Pixel, ViewState};
use crate::feature::{FeatureHit, Geometry, LayerId};
use crate::remote::RemoteLayer;

pub use memory::{MemoryMap, DEFAULT_EVENT_CAPACITY, DEFAULT_HIT_TOLERANCE_PX};
pub use style::{Fill, Icon, Stroke, Style};

/// A pointer sample delivered by the host map.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Position in map coordinates.
    pub coordinate: Coord,
    /// Position in viewport pixels.
    pub pixel: Pixel,
    /// True while the pointer is performing a drag/pan gesture.
    pub dragging: bool,
}

impl PointerEvent {
    /// Creates a non-dragging event whose pixel position is unknown.
    pub fn at(coordinate: Coord) -> Self {
        Self {
            coordinate,
            pixel: Pixel::default(),
            dragging: false,
        }
    }

    /// Marks the event as part of a drag gesture.
    pub fn dragging(mut self) -> Self {
        self.dragging = true;
        self
    }
}

/// Discrete and continuous user input observed on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A single click (not part of a double click).
    Click(PointerEvent),
    /// A pointer movement sample.
    PointerMove(PointerEvent),
}

/// Mouse cursor shapes the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// A styled geometry placed on an overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFeature {
    pub geometry: Geometry,
    pub style: Style,
}

impl OverlayFeature {
    pub fn new(geometry: Geometry, style: Style) -> Self {
        Self { geometry, style }
    }
}

/// Synchronous local hit-testing.
///
/// Returns the features under the pointer, topmost first. How the host
/// resolves overlapping features is opaque to the engine; consumers that
/// want a single winner take the first entry.
pub trait FeatureIndex: Send + Sync {
    fn hit_test(&self, event: &PointerEvent) -> Vec<FeatureHit>;
}

/// Everything the engine needs from a host map.
///
/// All methods are called from the engine's listener tasks and must not
/// block.
pub trait MapView: FeatureIndex {
    /// Current resolution and projection.
    fn view_state(&self) -> ViewState;

    /// Server-rendered layers that can answer feature-info queries, in
    /// layer order.
    fn remote_layers(&self) -> Vec<Arc<dyn RemoteLayer>>;

    /// Subscribes to the map's pointer event stream.
    fn subscribe(&self) -> broadcast::Receiver<MapEvent>;

    /// Adds an empty overlay layer and returns its id.
    fn add_overlay(&self, name: &str) -> LayerId;

    /// Replaces the contents of an overlay layer.
    fn set_overlay_features(&self, overlay: LayerId, features: Vec<OverlayFeature>);

    /// Removes an overlay layer. Unknown ids are ignored.
    fn remove_overlay(&self, overlay: LayerId);

    /// Changes the mouse cursor over the map viewport.
    fn set_cursor(&self, cursor: Cursor);
}
