//! Single-slot debounce and cancellation.
//!
//! A [`DebounceSlot`] holds at most one piece of pending work. Arming the
//! slot hands out a [`DebounceTicket`] and invalidates whatever was armed
//! before: the previous ticket's token is cancelled and its generation no
//! longer matches. Work that completes with a stale ticket is discarded by
//! the owner.
//!
//! Two mechanisms are combined because they cover different races:
//!
//! - the token stops timers and sequential queries that have not yet
//!   reached their next await point;
//! - the generation catches results that were already on their way back
//!   when the slot moved on.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Proof of arming a [`DebounceSlot`].
#[derive(Debug, Clone)]
pub struct DebounceTicket {
    generation: u64,
    token: CancellationToken,
}

impl DebounceTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token cancelled when the ticket is superseded or invalidated.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// At most one pending unit of work, identified by a generation counter.
#[derive(Debug, Default)]
pub struct DebounceSlot {
    generation: u64,
    armed: Option<CancellationToken>,
}

impl DebounceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates any pending work and arms the slot again.
    pub fn arm(&mut self) -> DebounceTicket {
        self.invalidate();
        let token = CancellationToken::new();
        self.armed = Some(token.clone());
        DebounceTicket {
            generation: self.generation,
            token,
        }
    }

    /// Cancels pending work. Outstanding tickets become stale.
    pub fn invalidate(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// True if `ticket` belongs to the work currently armed.
    pub fn is_current(&self, ticket: &DebounceTicket) -> bool {
        self.armed.is_some() && ticket.generation == self.generation
    }

    /// Disarms the slot if `ticket` is current.
    ///
    /// Returns false for stale tickets, whose results must be discarded.
    pub fn complete(&mut self, ticket: &DebounceTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.armed = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Runs `fire` after `delay` unless `ticket` is cancelled first.
pub fn spawn_timer<F, Fut>(delay: Duration, ticket: DebounceTicket, fire: F) -> JoinHandle<()>
where
    F: FnOnce(DebounceTicket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let token = ticket.token().clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => fire(ticket).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_arm_supersedes_previous_ticket() {
        let mut slot = DebounceSlot::new();
        let first = slot.arm();
        let second = slot.arm();

        assert!(first.is_cancelled());
        assert!(!slot.is_current(&first));
        assert!(slot.is_current(&second));
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_invalidate_makes_ticket_stale() {
        let mut slot = DebounceSlot::new();
        let ticket = slot.arm();
        slot.invalidate();

        assert!(ticket.is_cancelled());
        assert!(!slot.is_current(&ticket));
        assert!(!slot.complete(&ticket));
        assert!(!slot.is_armed());
    }

    #[test]
    fn test_complete_disarms_once() {
        let mut slot = DebounceSlot::new();
        let ticket = slot.arm();

        assert!(slot.complete(&ticket));
        assert!(!slot.is_armed());
        assert!(!slot.complete(&ticket));
        // Completion is not cancellation.
        assert!(!ticket.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let mut slot = DebounceSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&fired);
        let handle = spawn_timer(Duration::from_millis(200), slot.arm(), move |_| async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(199)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_timer_never_fires() {
        let mut slot = DebounceSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let f = Arc::clone(&fired);
            handles.push(spawn_timer(Duration::from_millis(200), slot.arm(), move |ticket| async move {
                f.fetch_add(ticket.generation() as usize, Ordering::SeqCst);
            }));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        for handle in handles {
            handle.await.unwrap();
        }
        // Only the last armed ticket's timer ran.
        assert_eq!(fired.load(Ordering::SeqCst), slot.generation() as usize);
    }
}
