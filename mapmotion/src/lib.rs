//! mapmotion - interaction and motion engine for map hosts
//!
//! This library provides the stateful, timing-sensitive parts of a web-map
//! convenience layer, independent of any particular rendering engine:
//!
//! - [`animation`] - path metrics and a frame-driven marker animator that
//!   follows a polyline and draws the traveled path behind it.
//! - [`interaction`] - a selection aggregator that merges local hit-testing
//!   with joined remote "feature info" queries, and a hover aggregator with
//!   debounced, cancelable remote lookups.
//! - [`remote`] - the remote feature query seam (WMS GetFeatureInfo over
//!   HTTP).
//! - [`map`] - the host map contract ([`map::MapView`]) plus an in-memory
//!   implementation for headless use and tests.
//!
//! # Architecture
//!
//! ```text
//!   PathMetrics ──► PathCursor ──► TrackAnimator ──► FrameScheduler
//!                                        │
//!                                        ▼
//!                                     MapView ◄── SelectionAggregator ──► RemoteLayer (join all)
//!                                        ▲
//!                                        └─────── HoverAggregator ─────► RemoteLayer (first hit)
//! ```

pub mod animation;
pub mod config;
pub mod coord;
pub mod error;
pub mod feature;
pub mod interaction;
pub mod logging;
pub mod map;
pub mod remote;

pub use error::MotionError;
