//! Proactive refresh scheduler for the RentalPS auth client.
//!
//! Refreshes the session shortly *before* the access token expires, so
//! requests rarely hit a `401` in the first place. The unauthorized
//! interceptor stays in place as the safety net.
//!
//! # Ownership
//!
//! The scheduler is owned by the session container, not by any UI
//! element. The container arms it on every successful session commit and
//! cancels it on every clear:
//!
//! ```text
//! set_session(expires_at) ──→ arm(expires_at − now − buffer)
//!          │                         │
//!          │                    (timer fires)
//!          │                         ▼
//!          └────────────────── refresh_session() ──→ set_session(...)
//! clear_session() ──→ cancel()
//! ```
//!
//! At most one timer is armed at any time. Arming replaces (aborts) the
//! previous timer, so a timer computed for a superseded session never
//! fires.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// How long before expiry the refresh fires. Covers clock skew between
    /// client and server plus the round-trip of the refresh call itself.
    ///
    /// Default: 5 seconds.
    pub buffer: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            buffer: Self::DEFAULT_BUFFER,
        }
    }
}

impl RefreshConfig {
    pub const DEFAULT_BUFFER: Duration = Duration::from_secs(5);

    pub fn with_buffer(buffer: Duration) -> Self {
        Self { buffer }
    }
}

/// Computes `max(0, expires_at − now − buffer)`.
///
/// An expiry already in the past (or inside the buffer) yields zero: the
/// refresh should fire immediately.
pub fn refresh_delay(expires_at: OffsetDateTime, now: OffsetDateTime, buffer: Duration) -> Duration {
    let buffer = time::Duration::try_from(buffer).unwrap_or(time::Duration::MAX);
    (expires_at - now)
        .checked_sub(buffer)
        .and_then(|remaining| Duration::try_from(remaining).ok())
        .unwrap_or(Duration::ZERO)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The currently armed timer.
#[derive(Debug)]
struct Armed {
    handle: JoinHandle<()>,
    delay: Duration,
    deadline: TokioInstant,
}

/// One-shot, re-armable refresh timer.
///
/// Methods take `&self` so the scheduler can live inside a shared session
/// container; the armed timer sits behind a short-lived lock that is never
/// held across an `.await`.
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    config: RefreshConfig,
    armed: Mutex<Option<Armed>>,
}

impl RefreshScheduler {
    pub fn new(config: RefreshConfig) -> Self {
        debug!(buffer_ms = config.buffer.as_millis() as u64, "refresh scheduler created");
        Self {
            config,
            armed: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Arms `task` to run `buffer` before `expires_at`. Returns the delay.
    ///
    /// Replaces any previously armed timer.
    pub fn arm_for_expiry<F>(&self, expires_at: OffsetDateTime, task: F) -> Option<Duration>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = refresh_delay(expires_at, OffsetDateTime::now_utc(), self.config.buffer);
        self.arm_after(delay, task).then_some(delay)
    }

    /// Arms `task` to run after `delay`. Replaces any previously armed timer.
    ///
    /// Returns `false` (and arms nothing) when called outside a tokio
    /// runtime: there is nothing to drive the timer.
    pub fn arm_after<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime, proactive refresh not scheduled");
            self.cancel();
            return false;
        };

        let deadline = TokioInstant::now() + delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            trace!("refresh timer fired");
            task.await;
        });

        // The previous timer may be the task calling us (a timer-driven
        // refresh re-arms on commit). Aborting it is still correct: it has
        // no further await points once its refresh has committed.
        if let Some(previous) = self.lock().replace(Armed {
            handle,
            delay,
            deadline,
        }) {
            previous.handle.abort();
        }

        debug!(delay_ms = delay.as_millis() as u64, "proactive refresh armed");
        true
    }

    /// Cancels the armed timer, if any. Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(armed) => {
                let pending = !armed.handle.is_finished();
                armed.handle.abort();
                if pending {
                    debug!("proactive refresh cancelled");
                }
                pending
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }

    /// The delay the current timer was armed with.
    pub fn armed_delay(&self) -> Option<Duration> {
        self.lock().as_ref().map(|armed| armed.delay)
    }

    /// When the current timer fires (tokio clock).
    pub fn deadline(&self) -> Option<TokioInstant> {
        self.lock().as_ref().map(|armed| armed.deadline)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        // The guarded value is a plain handle; a panic elsewhere can't
        // leave it half-written.
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
