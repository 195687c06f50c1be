//! Debounced hover merging local hits with sequential remote queries.
//!
//! # Per pointer sample
//!
//! ```text
//!   dragging? ──► ignored
//!   local hit ──► invalidate pending work ──► new target? ──► highlight + notify
//!   miss      ──► clear current target (notify None) ──► arm debounce timer
//!
//!   timer fired (current) ──► query remote layers in priority order,
//!                             first non-empty layer wins
//!   batch resolved (current) ──► highlight + notify
//! ```
//!
//! Every pointer sample supersedes all earlier ones: timers and remote
//! batches belonging to an older sample are cancelled, and any result they
//! still deliver is dropped by the generation check.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::debounce::{spawn_timer, DebounceSlot, DebounceTicket};
use super::subscribers::{SubscriberSet, Subscription};
use super::{filter_hits, highlight_features, visible_remote_layers, HitSource, StyleResolver};
use crate::coord::Coord;
use crate::error::MotionError;
use crate::feature::{Feature, LayerId, LayerInfo, Properties};
use crate::map::{Cursor, MapEvent, MapView, PointerEvent};
use crate::remote::{query_first, RemoteHit};

/// Default delay between the last miss and the remote queries.
pub const DEFAULT_HOVER_DEBOUNCE: Duration = Duration::from_millis(200);

/// Name given to the hover highlight overlay.
const OVERLAY_NAME: &str = "hover-highlight";

/// Options for a [`HoverAggregator`].
#[derive(Debug, Clone)]
pub struct HoverOptions {
    /// Restricts hit-testing and remote queries to these layers. Remote
    /// layers are queried in this order.
    pub target_layers: Option<Vec<LayerId>>,
    /// Highlight style of the hovered feature.
    pub style: StyleResolver,
    /// Quiet time after a miss before remote layers are queried.
    pub debounce: Duration,
    /// Switch to the pointer cursor while something is hovered.
    pub change_cursor: bool,
}

impl Default for HoverOptions {
    fn default() -> Self {
        Self {
            target_layers: None,
            style: StyleResolver::default(),
            debounce: DEFAULT_HOVER_DEBOUNCE,
            change_cursor: true,
        }
    }
}

/// The hovered feature.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverResult {
    pub feature: Feature,
    pub layer: LayerInfo,
    /// Pointer position of the sample that found the feature.
    pub coordinate: Coord,
    pub source: HitSource,
}

impl HoverResult {
    pub fn properties(&self) -> &Properties {
        &self.feature.properties
    }

    fn same_target(&self, layer: &LayerInfo, feature: &Feature) -> bool {
        self.layer.id == layer.id && self.feature == *feature
    }
}

/// Work reported back to the listener by spawned tasks.
enum HoverMessage {
    TimerFired {
        ticket: DebounceTicket,
        coordinate: Coord,
    },
    RemoteResolved {
        ticket: DebounceTicket,
        coordinate: Coord,
        hit: Option<RemoteHit>,
    },
}

#[derive(Debug, Default)]
struct HoverState {
    current: Option<HoverResult>,
    pending: DebounceSlot,
    destroyed: bool,
}

struct HoverShared {
    map: Arc<dyn MapView>,
    options: HoverOptions,
    overlay: LayerId,
    state: Mutex<HoverState>,
    subscribers: SubscriberSet<Option<HoverResult>>,
    messages: mpsc::UnboundedSender<HoverMessage>,
}

/// Hover state for one map.
///
/// Dropping the aggregator destroys it.
///
/// # Example
///
/// ```ignore
/// let hover = HoverAggregator::create(map.clone(), HoverOptions::default())?;
/// let _sub = hover.on_hover(|hovered| {
///     if let Some(result) = hovered {
///         println!("{} on {}", result.feature.id.as_ref().map_or("?".into(), |id| id.to_string()), result.layer.name);
///     }
/// });
/// ```
pub struct HoverAggregator {
    shared: Arc<HoverShared>,
    shutdown: CancellationToken,
}

impl HoverAggregator {
    /// Attaches a hover aggregator to `map`.
    ///
    /// # Errors
    ///
    /// [`MotionError::RuntimeUnavailable`] when called outside a tokio
    /// runtime.
    pub fn create(map: Arc<dyn MapView>, options: HoverOptions) -> Result<Self, MotionError> {
        let handle =
            Handle::try_current().map_err(|e| MotionError::RuntimeUnavailable(e.to_string()))?;

        let overlay = map.add_overlay(OVERLAY_NAME);
        let events = map.subscribe();
        let (messages, inbox) = mpsc::unbounded_channel();
        let shared = Arc::new(HoverShared {
            map,
            options,
            overlay,
            state: Mutex::new(HoverState::default()),
            subscribers: SubscriberSet::new(),
            messages,
        });
        let shutdown = CancellationToken::new();

        handle.spawn(Self::run(Arc::clone(&shared), events, inbox, shutdown.clone()));
        debug!(
            overlay = %overlay,
            debounce_ms = shared.options.debounce.as_millis(),
            "Hover aggregator created"
        );

        Ok(Self { shared, shutdown })
    }

    /// Registers a hover callback.
    ///
    /// Called with the new target whenever it changes, and with `None` when
    /// the pointer leaves the hovered feature.
    pub fn on_hover<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Option<HoverResult>) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Resets hover state, highlight and cursor without notifying, and
    /// discards pending remote work.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return;
        }
        state.pending.invalidate();
        state.current = None;
        self.shared.reset_visuals();
    }

    /// Detaches from the map. Idempotent.
    pub fn destroy(&self) {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.pending.invalidate();
        state.current = None;
        self.shutdown.cancel();
        if self.shared.options.change_cursor {
            self.shared.map.set_cursor(Cursor::Default);
        }
        self.shared.map.remove_overlay(self.shared.overlay);
        self.shared.subscribers.clear();
        debug!(overlay = %self.shared.overlay, "Hover aggregator destroyed");
    }

    /// The hovered feature, if any.
    pub fn current(&self) -> Option<HoverResult> {
        self.shared.state.lock().current.clone()
    }

    /// True while a debounce timer or remote batch is outstanding.
    pub fn has_pending(&self) -> bool {
        self.shared.state.lock().pending.is_armed()
    }

    /// Overlay layer holding the hover highlight.
    pub fn overlay(&self) -> LayerId {
        self.shared.overlay
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    async fn run(
        shared: Arc<HoverShared>,
        mut events: broadcast::Receiver<MapEvent>,
        mut inbox: mpsc::UnboundedReceiver<HoverMessage>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                // Pointer samples first: a newer sample supersedes any
                // queued timer or batch result.
                event = events.recv() => match event {
                    Ok(MapEvent::PointerMove(sample)) => shared.handle_move(sample),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(skipped, "Hover listener lagged");
                    }
                    Err(RecvError::Closed) => {
                        info!("Map event stream closed");
                        break;
                    }
                },

                Some(message) = inbox.recv() => shared.handle_message(message),
            }
        }
        debug!(overlay = %shared.overlay, "Hover listener stopped");
    }
}

impl Drop for HoverAggregator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl HoverShared {
    fn targets(&self) -> Option<&[LayerId]> {
        self.options.target_layers.as_deref()
    }

    fn handle_move(&self, sample: PointerEvent) {
        if sample.dragging {
            return;
        }
        let hit = filter_hits(self.map.hit_test(&sample), self.targets(), self.overlay)
            .into_iter()
            .next();

        let notification = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }

            match hit {
                Some(hit) => {
                    state.pending.invalidate();
                    if state
                        .current
                        .as_ref()
                        .is_some_and(|c| c.same_target(&hit.layer, &hit.feature))
                    {
                        return;
                    }
                    let result = HoverResult {
                        feature: hit.feature,
                        layer: hit.layer,
                        coordinate: sample.coordinate,
                        source: HitSource::Local,
                    };
                    Some(self.show(&mut state, result))
                }
                None => {
                    let left = state.current.take().is_some();
                    if left {
                        self.reset_visuals();
                    }
                    self.arm_timer(&mut state, sample.coordinate);
                    left.then_some(None)
                }
            }
        };

        if let Some(value) = notification {
            self.notify(value);
        }
    }

    fn arm_timer(&self, state: &mut HoverState, coordinate: Coord) {
        if visible_remote_layers(self.map.as_ref(), self.targets()).is_empty() {
            state.pending.invalidate();
            return;
        }

        let ticket = state.pending.arm();
        trace!(generation = ticket.generation(), "Hover debounce armed");
        let messages = self.messages.clone();
        spawn_timer(self.options.debounce, ticket, move |ticket| async move {
            let _ = messages.send(HoverMessage::TimerFired { ticket, coordinate });
        });
    }

    fn handle_message(&self, message: HoverMessage) {
        match message {
            HoverMessage::TimerFired { ticket, coordinate } => self.start_batch(ticket, coordinate),
            HoverMessage::RemoteResolved {
                ticket,
                coordinate,
                hit,
            } => self.finish_batch(ticket, coordinate, hit),
        }
    }

    fn start_batch(&self, ticket: DebounceTicket, coordinate: Coord) {
        let state = self.state.lock();
        if state.destroyed || !state.pending.is_current(&ticket) {
            debug!(generation = ticket.generation(), "Stale hover timer discarded");
            return;
        }

        let layers = visible_remote_layers(self.map.as_ref(), self.targets());
        let view = self.map.view_state();
        let messages = self.messages.clone();
        debug!(
            generation = ticket.generation(),
            layers = layers.len(),
            "Hover remote query started"
        );
        tokio::spawn(async move {
            let hit = query_first(&layers, coordinate, &view, ticket.token()).await;
            let _ = messages.send(HoverMessage::RemoteResolved {
                ticket,
                coordinate,
                hit,
            });
        });
    }

    fn finish_batch(&self, ticket: DebounceTicket, coordinate: Coord, hit: Option<RemoteHit>) {
        let notification = {
            let mut state = self.state.lock();
            if state.destroyed || !state.pending.complete(&ticket) {
                debug!(generation = ticket.generation(), "Stale hover result discarded");
                return;
            }

            let Some(RemoteHit { layer, features }) = hit else {
                return;
            };
            let Some(feature) = features.into_iter().next() else {
                return;
            };
            if state
                .current
                .as_ref()
                .is_some_and(|c| c.same_target(&layer, &feature))
            {
                return;
            }
            let result = HoverResult {
                feature,
                layer,
                coordinate,
                source: HitSource::Remote,
            };
            self.show(&mut state, result)
        };
        self.notify(notification);
    }

    fn show(&self, state: &mut HoverState, result: HoverResult) -> Option<HoverResult> {
        let features = highlight_features([(&result.layer, &result.feature)], &self.options.style);
        self.map.set_overlay_features(self.overlay, features);
        if self.options.change_cursor {
            self.map.set_cursor(Cursor::Pointer);
        }
        state.current = Some(result.clone());
        Some(result)
    }

    fn reset_visuals(&self) {
        self.map.set_overlay_features(self.overlay, Vec::new());
        if self.options.change_cursor {
            self.map.set_cursor(Cursor::Default);
        }
    }

    fn notify(&self, value: Option<HoverResult>) {
        debug!(
            layer = value.as_ref().map(|r| r.layer.name.as_str()),
            source = ?value.as_ref().map(|r| r.source),
            "Hover changed"
        );
        self.subscribers.notify(&value);
    }
}
