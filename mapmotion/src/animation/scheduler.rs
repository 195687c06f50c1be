//! Frame scheduling abstraction.
//!
//! The animator never sleeps or polls on its own: it asks a
//! [`FrameScheduler`] for "the next frame" and is called back with a
//! millisecond timestamp, the way a browser calls `requestAnimationFrame`
//! callbacks. This keeps the animation logic independent of the clock that
//! drives it.
//!
//! # Implementors
//!
//! - [`TokioFrameScheduler`] - fixed refresh interval on the tokio timer
//! - [`ManualFrameScheduler`] - caller supplies each frame timestamp;
//!   used for headless replay and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::MotionError;

/// Default frame interval (~60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Handle to one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Callback invoked with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send + 'static>;

/// Rendering-loop callback source.
///
/// Each requested frame is delivered at most once. Timestamps are
/// monotonic for a given scheduler.
pub trait FrameScheduler: Send + Sync {
    /// Schedules `callback` for the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    /// Cancels a requested frame. Unknown or already delivered frames are
    /// ignored.
    fn cancel_frame(&self, id: FrameId);
}

/// Frame scheduler driven by the tokio timer.
///
/// Every requested frame is delivered on a spawned task one interval after
/// it was requested. Timestamps are milliseconds since the scheduler was
/// created.
pub struct TokioFrameScheduler {
    inner: Arc<TokioSchedulerInner>,
}

struct TokioSchedulerInner {
    handle: Handle,
    interval: Duration,
    epoch: Instant,
    next_id: AtomicU64,
    pending: Mutex<HashMap<FrameId, CancellationToken>>,
}

impl TokioFrameScheduler {
    /// Creates a scheduler with the default frame interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self, MotionError> {
        Self::with_interval(DEFAULT_FRAME_INTERVAL)
    }

    /// Creates a scheduler with a custom frame interval.
    pub fn with_interval(interval: Duration) -> Result<Self, MotionError> {
        if interval.is_zero() {
            return Err(MotionError::invalid("frame interval must be positive"));
        }
        let handle =
            Handle::try_current().map_err(|e| MotionError::RuntimeUnavailable(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(TokioSchedulerInner {
                handle,
                interval,
                epoch: Instant::now(),
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Number of frames requested but not yet delivered.
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let id = FrameId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.inner.pending.lock().insert(id, token.clone());

        let inner = Arc::clone(&self.inner);
        self.inner.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(frame = id.0, "Frame cancelled");
                }
                _ = tokio::time::sleep(inner.interval) => {
                    if inner.pending.lock().remove(&id).is_some() {
                        let now_ms = inner.epoch.elapsed().as_secs_f64() * 1000.0;
                        callback(now_ms);
                    }
                }
            }
        });
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        if let Some(token) = self.inner.pending.lock().remove(&id) {
            token.cancel();
        }
    }
}

/// Frame scheduler advanced by hand.
///
/// Requested frames queue up until [`ManualFrameScheduler::run_frame`] is
/// called with a timestamp.
///
/// # Example
///
/// ```
/// use mapmotion::animation::{FrameScheduler, ManualFrameScheduler};
///
/// let scheduler = ManualFrameScheduler::new();
/// scheduler.request_frame(Box::new(|now| assert_eq!(now, 16.0)));
/// assert_eq!(scheduler.run_frame(16.0), 1);
/// ```
#[derive(Default)]
pub struct ManualFrameScheduler {
    next_id: AtomicU64,
    queue: Mutex<Vec<(FrameId, FrameCallback)>>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers every frame queued so far with timestamp `now_ms`.
    ///
    /// Frames requested by the callbacks themselves wait for the next call.
    /// Returns the number of callbacks invoked.
    pub fn run_frame(&self, now_ms: f64) -> usize {
        let due = std::mem::take(&mut *self.queue.lock());
        let count = due.len();
        for (_, callback) in due {
            callback(now_ms);
        }
        count
    }

    /// Number of frames waiting for [`ManualFrameScheduler::run_frame`].
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let id = FrameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.queue.lock().push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        self.queue.lock().retain(|(queued, _)| *queued != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_manual_frames_run_once() {
        let scheduler = ManualFrameScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        scheduler.request_frame(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.run_frame(10.0), 1);
        assert_eq!(scheduler.run_frame(20.0), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualFrameScheduler::new();
        let id = scheduler.request_frame(Box::new(|_| panic!("cancelled frame ran")));
        scheduler.cancel_frame(id);
        scheduler.cancel_frame(id);
        assert_eq!(scheduler.run_frame(0.0), 0);
    }

    #[test]
    fn test_manual_reentrant_request_waits_for_next_frame() {
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&scheduler);
        let log = Arc::clone(&seen);
        scheduler.request_frame(Box::new(move |now| {
            log.lock().push(now);
            let log = Arc::clone(&log);
            s.request_frame(Box::new(move |now| log.lock().push(now)));
        }));

        assert_eq!(scheduler.run_frame(1.0), 1);
        assert_eq!(scheduler.run_frame(2.0), 1);
        assert_eq!(*seen.lock(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(matches!(
            TokioFrameScheduler::new(),
            Err(MotionError::RuntimeUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_frame_delivered_after_interval() {
        let scheduler = TokioFrameScheduler::with_interval(Duration::from_millis(20)).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        scheduler.request_frame(Box::new(move |now| {
            let _ = tx.send(now);
        }));
        assert_eq!(scheduler.pending(), 1);

        let now = rx.await.unwrap();
        assert!(now >= 20.0, "frame delivered early at {}", now);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_cancelled_frame_never_runs() {
        let scheduler = TokioFrameScheduler::with_interval(Duration::from_millis(20)).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&ran);
        let id = scheduler.request_frame(Box::new(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler.cancel_frame(id);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        assert!(matches!(
            TokioFrameScheduler::with_interval(Duration::ZERO),
            Err(MotionError::InvalidArgument(_))
        ));
    }
}
