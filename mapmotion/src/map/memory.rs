//! In-memory host map.
//!
//! `MemoryMap` keeps vector layers, remote layers and overlays in plain
//! collections and broadcasts events pushed with [`MemoryMap::emit`]. It is
//! what the CLI replays animations against, and what integration tests drive
//! aggregators with.
//!
//! Hit-testing uses a pixel tolerance converted to map units with the current
//! resolution. Later layers draw on top of earlier ones, and within a layer
//! later features draw on top, so hits are returned in reverse insertion
//! order. Overlay layers are never hit-tested.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use super::{Cursor, FeatureIndex, MapEvent, MapView, OverlayFeature, PointerEvent};
use crate::coord::ViewState;
use crate::feature::{Feature, FeatureHit, LayerId, LayerInfo};
use crate::remote::RemoteLayer;

/// Default hit tolerance in pixels.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 5.0;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
struct VectorLayer {
    info: LayerInfo,
    features: Vec<Feature>,
    visible: bool,
}

#[derive(Debug)]
struct Overlay {
    name: String,
    features: Vec<OverlayFeature>,
}

struct MapState {
    view: ViewState,
    hit_tolerance_px: f64,
    vector_layers: Vec<VectorLayer>,
    remote_layers: Vec<Arc<dyn RemoteLayer>>,
    overlays: BTreeMap<LayerId, Overlay>,
    cursor: Cursor,
}

/// A headless [`MapView`].
pub struct MemoryMap {
    state: RwLock<MapState>,
    events: broadcast::Sender<MapEvent>,
    next_layer_id: AtomicU64,
}

impl MemoryMap {
    /// Creates an empty map with the given view.
    pub fn new(view: ViewState) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            state: RwLock::new(MapState {
                view,
                hit_tolerance_px: DEFAULT_HIT_TOLERANCE_PX,
                vector_layers: Vec::new(),
                remote_layers: Vec::new(),
                overlays: BTreeMap::new(),
                cursor: Cursor::Default,
            }),
            events,
            next_layer_id: AtomicU64::new(1),
        }
    }

    /// Reserves a layer id without adding a layer.
    ///
    /// Remote layers are constructed outside the map and need their id
    /// before they are registered with [`MemoryMap::add_remote_layer`].
    pub fn allocate_layer(&self, name: impl Into<String>) -> LayerInfo {
        let id = LayerId(self.next_layer_id.fetch_add(1, Ordering::Relaxed));
        LayerInfo::new(id, name)
    }

    /// Adds a vector layer on top of the existing ones.
    pub fn add_vector_layer(&self, name: impl Into<String>, features: Vec<Feature>) -> LayerInfo {
        let info = self.allocate_layer(name);
        self.state.write().vector_layers.push(VectorLayer {
            info: info.clone(),
            features,
            visible: true,
        });
        info
    }

    /// Registers a remote layer on top of the existing remote layers.
    pub fn add_remote_layer(&self, layer: Arc<dyn RemoteLayer>) {
        self.state.write().remote_layers.push(layer);
    }

    /// Shows or hides a vector layer. Returns false for unknown layers.
    pub fn set_layer_visible(&self, id: LayerId, visible: bool) -> bool {
        let mut state = self.state.write();
        match state.vector_layers.iter_mut().find(|l| l.info.id == id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn set_view(&self, view: ViewState) {
        self.state.write().view = view;
    }

    pub fn set_hit_tolerance(&self, pixels: f64) {
        self.state.write().hit_tolerance_px = pixels;
    }

    /// Publishes an event to every subscriber. Returns the number of
    /// receivers that got it.
    pub fn emit(&self, event: MapEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Convenience for `emit(MapEvent::Click(..))`.
    pub fn click(&self, event: PointerEvent) -> usize {
        self.emit(MapEvent::Click(event))
    }

    /// Convenience for `emit(MapEvent::PointerMove(..))`.
    pub fn pointer_move(&self, event: PointerEvent) -> usize {
        self.emit(MapEvent::PointerMove(event))
    }

    /// Number of live event subscribers.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Contents of an overlay, or `None` if it does not exist.
    pub fn overlay_features(&self, overlay: LayerId) -> Option<Vec<OverlayFeature>> {
        self.state
            .read()
            .overlays
            .get(&overlay)
            .map(|o| o.features.clone())
    }

    pub fn has_overlay(&self, overlay: LayerId) -> bool {
        self.state.read().overlays.contains_key(&overlay)
    }

    pub fn overlay_count(&self) -> usize {
        self.state.read().overlays.len()
    }

    /// Names of the live overlays in creation order.
    pub fn overlay_names(&self) -> Vec<String> {
        self.state
            .read()
            .overlays
            .values()
            .map(|o| o.name.clone())
            .collect()
    }

    pub fn cursor(&self) -> Cursor {
        self.state.read().cursor
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new(ViewState::default())
    }
}

impl FeatureIndex for MemoryMap {
    fn hit_test(&self, event: &PointerEvent) -> Vec<FeatureHit> {
        let state = self.state.read();
        let tolerance = state.hit_tolerance_px * state.view.resolution;

        state
            .vector_layers
            .iter()
            .rev()
            .filter(|layer| layer.visible)
            .flat_map(|layer| {
                layer
                    .features
                    .iter()
                    .rev()
                    .filter(move |f| {
                        f.geometry
                            .as_ref()
                            .is_some_and(|g| g.distance_to(event.coordinate) <= tolerance)
                    })
                    .map(move |f| FeatureHit::new(f.clone(), layer.info.clone()))
            })
            .collect()
    }
}

impl MapView for MemoryMap {
    fn view_state(&self) -> ViewState {
        self.state.read().view.clone()
    }

    fn remote_layers(&self) -> Vec<Arc<dyn RemoteLayer>> {
        self.state.read().remote_layers.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.events.subscribe()
    }

    fn add_overlay(&self, name: &str) -> LayerId {
        let info = self.allocate_layer(name);
        self.state.write().overlays.insert(
            info.id,
            Overlay {
                name: info.name,
                features: Vec::new(),
            },
        );
        debug!(overlay = %info.id, name, "Overlay added");
        info.id
    }

    fn set_overlay_features(&self, overlay: LayerId, features: Vec<OverlayFeature>) {
        if let Some(o) = self.state.write().overlays.get_mut(&overlay) {
            o.features = features;
        }
    }

    fn remove_overlay(&self, overlay: LayerId) {
        if self.state.write().overlays.remove(&overlay).is_some() {
            debug!(overlay = %overlay, "Overlay removed");
        }
    }

    fn set_cursor(&self, cursor: Cursor) {
        self.state.write().cursor = cursor;
    }
}
