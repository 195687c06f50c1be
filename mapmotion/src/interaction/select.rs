//! Click selection merging local hits with joined remote queries.
//!
//! # Click flow
//!
//! ```text
//! IDLE ──► SYNC_RESOLVED ──► AWAITING_REMOTE ──► MERGED ──► IDLE
//!            native hit          one query per      remote results
//!            applied             visible layer,     appended, one
//!                                all joined         notification
//! ```
//!
//! A listener task moves every click off the map event stream into an
//! unbounded queue as soon as it arrives. A worker task processes that queue
//! one click at a time, finishing a click (including its remote queries)
//! before it looks at the next one. Each click therefore produces exactly one
//! notification, local results of a click always precede its remote results,
//! and pointer-move traffic during a slow query cannot push clicks out of the
//! bounded event stream.
//!
//! Remote results are appended in layer order as returned, without toggling
//! or de-duplication.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::subscribers::{SubscriberSet, Subscription};
use super::{filter_hits, highlight_features, visible_remote_layers, HitSource, StyleResolver};
use crate::error::MotionError;
use crate::feature::{Feature, FeatureHit, LayerId, LayerInfo, Properties};
use crate::map::{MapEvent, MapView, PointerEvent};
use crate::remote::{query_all, RemoteHit};

/// Name given to the selection highlight overlay.
const OVERLAY_NAME: &str = "select-highlight";

/// Options for a [`SelectionAggregator`].
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Restricts hit-testing and remote queries to these layers.
    pub target_layers: Option<Vec<LayerId>>,
    /// Highlight style of selected features.
    pub style: StyleResolver,
    /// Toggle features in and out of the selection instead of replacing it.
    pub multi: bool,
}

/// One selected feature.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectResult {
    pub feature: Feature,
    pub layer: LayerInfo,
    /// The click that selected the feature.
    pub event: PointerEvent,
    pub source: HitSource,
}

impl SelectResult {
    pub fn properties(&self) -> &Properties {
        &self.feature.properties
    }

    fn local(hit: FeatureHit, event: &PointerEvent) -> Self {
        Self {
            feature: hit.feature,
            layer: hit.layer,
            event: event.clone(),
            source: HitSource::Local,
        }
    }

    fn same_target(&self, layer: LayerId, feature: &Feature) -> bool {
        self.layer.id == layer && self.feature == *feature
    }
}

/// Where the aggregator is in processing a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectPhase {
    #[default]
    Idle,
    SyncResolved,
    AwaitingRemote,
    Merged,
}

#[derive(Debug, Default)]
struct SelectState {
    selection: Vec<SelectResult>,
    phase: SelectPhase,
    destroyed: bool,
}

struct SelectShared {
    map: Arc<dyn MapView>,
    options: SelectOptions,
    overlay: LayerId,
    state: Mutex<SelectState>,
    subscribers: SubscriberSet<Option<Vec<SelectResult>>>,
}

/// Selection state for one map.
///
/// Dropping the aggregator destroys it.
///
/// # Example
///
/// ```ignore
/// let select = SelectionAggregator::create(map.clone(), SelectOptions::default())?;
/// let _sub = select.on_select(|selection| match selection {
///     Some(results) => println!("{} selected", results.len()),
///     None => println!("selection cleared"),
/// });
/// ```
pub struct SelectionAggregator {
    shared: Arc<SelectShared>,
    shutdown: CancellationToken,
}

impl SelectionAggregator {
    /// Attaches a selection aggregator to `map`.
    ///
    /// Adds the highlight overlay and starts the click listener.
    ///
    /// # Errors
    ///
    /// [`MotionError::RuntimeUnavailable`] when called outside a tokio
    /// runtime.
    pub fn create(map: Arc<dyn MapView>, options: SelectOptions) -> Result<Self, MotionError> {
        let handle =
            Handle::try_current().map_err(|e| MotionError::RuntimeUnavailable(e.to_string()))?;

        let overlay = map.add_overlay(OVERLAY_NAME);
        let events = map.subscribe();
        let shared = Arc::new(SelectShared {
            map,
            options,
            overlay,
            state: Mutex::new(SelectState::default()),
            subscribers: SubscriberSet::new(),
        });
        let shutdown = CancellationToken::new();

        let (click_tx, click_rx) = mpsc::unbounded_channel();
        handle.spawn(Self::receive_clicks(overlay, events, click_tx, shutdown.clone()));
        handle.spawn(Self::run(Arc::clone(&shared), click_rx, shutdown.clone()));
        debug!(overlay = %overlay, multi = shared.options.multi, "Selection aggregator created");

        Ok(Self { shared, shutdown })
    }

    /// Registers a selection callback.
    ///
    /// The callback receives the full selection after every click, or
    /// `None` when the selection is empty.
    pub fn on_select<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Option<Vec<SelectResult>>) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Empties the selection and its highlight without notifying.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return;
        }
        state.selection.clear();
        self.shared.map.set_overlay_features(self.shared.overlay, Vec::new());
    }

    /// Detaches from the map. Idempotent.
    pub fn destroy(&self) {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.selection.clear();
        self.shutdown.cancel();
        self.shared.map.remove_overlay(self.shared.overlay);
        self.shared.subscribers.clear();
        debug!(overlay = %self.shared.overlay, "Selection aggregator destroyed");
    }

    /// Snapshot of the current selection.
    pub fn selection(&self) -> Vec<SelectResult> {
        self.shared.state.lock().selection.clone()
    }

    pub fn phase(&self) -> SelectPhase {
        self.shared.state.lock().phase
    }

    /// Overlay layer holding the selection highlight.
    pub fn overlay(&self) -> LayerId {
        self.shared.overlay
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    /// Forwards clicks from the map event stream to the click worker.
    ///
    /// Must not await click processing.
    async fn receive_clicks(
        overlay: LayerId,
        mut events: broadcast::Receiver<MapEvent>,
        clicks: mpsc::UnboundedSender<PointerEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                event = events.recv() => match event {
                    Ok(MapEvent::Click(click)) => {
                        if clicks.send(click).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Selection listener lagged behind map events");
                    }
                    Err(RecvError::Closed) => {
                        info!("Map event stream closed");
                        break;
                    }
                },
            }
        }
        debug!(overlay = %overlay, "Selection listener stopped");
    }

    /// Processes queued clicks one at a time.
    async fn run(
        shared: Arc<SelectShared>,
        mut clicks: mpsc::UnboundedReceiver<PointerEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                click = clicks.recv() => match click {
                    Some(click) => {
                        tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => break,
                            _ = shared.handle_click(click) => {}
                        }
                    }
                    None => break,
                },
            }
        }
        debug!(overlay = %shared.overlay, "Selection worker stopped");
    }
}

impl Drop for SelectionAggregator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl SelectShared {
    fn targets(&self) -> Option<&[LayerId]> {
        self.options.target_layers.as_deref()
    }

    async fn handle_click(&self, click: PointerEvent) {
        let hits = filter_hits(self.map.hit_test(&click), self.targets(), self.overlay);
        let remote_layers = visible_remote_layers(self.map.as_ref(), self.targets());

        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            self.apply_native(&mut state, hits, &click);
            state.phase = SelectPhase::SyncResolved;
            self.refresh_highlight(&state);
            if !remote_layers.is_empty() {
                state.phase = SelectPhase::AwaitingRemote;
            }
        }

        if !remote_layers.is_empty() {
            let view = self.map.view_state();
            let remote = query_all(&remote_layers, click.coordinate, &view).await;

            let mut state = self.state.lock();
            if state.destroyed {
                debug!("Remote selection results discarded after destroy");
                return;
            }
            for hit in remote {
                let RemoteHit { layer, features } = hit;
                state
                    .selection
                    .extend(features.into_iter().map(|feature| SelectResult {
                        feature,
                        layer: layer.clone(),
                        event: click.clone(),
                        source: HitSource::Remote,
                    }));
            }
            state.phase = SelectPhase::Merged;
            self.refresh_highlight(&state);
        }

        let snapshot = {
            let mut state = self.state.lock();
            state.phase = SelectPhase::Idle;
            if state.destroyed {
                return;
            }
            (!state.selection.is_empty()).then(|| state.selection.clone())
        };
        debug!(
            selected = snapshot.as_ref().map_or(0, Vec::len),
            "Selection changed"
        );
        self.subscribers.notify(&snapshot);
    }

    fn apply_native(&self, state: &mut SelectState, hits: Vec<FeatureHit>, click: &PointerEvent) {
        if self.options.multi {
            for hit in hits {
                let existing = state
                    .selection
                    .iter()
                    .position(|r| r.same_target(hit.layer.id, &hit.feature));
                match existing {
                    Some(index) => {
                        state.selection.remove(index);
                    }
                    None => state.selection.push(SelectResult::local(hit, click)),
                }
            }
        } else {
            state.selection = hits
                .into_iter()
                .next()
                .map(|hit| SelectResult::local(hit, click))
                .into_iter()
                .collect();
        }
    }

    fn refresh_highlight(&self, state: &SelectState) {
        let features = highlight_features(
            state.selection.iter().map(|r| (&r.layer, &r.feature)),
            &self.options.style,
        );
        self.map.set_overlay_features(self.overlay, features);
    }
}
