//! Render rate limiting
//!
//! Each session renders at most once per interval. A request that arrives
//! too early arms a single deferred render for the rest of the interval;
//! further requests while it is pending fold into it.
//!
//! The scheduler only decides. The owner performs renders and runs the
//! timer, reporting back through [`RenderScheduler::arm`],
//! [`RenderScheduler::fire`] and [`RenderScheduler::rendered`].

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

/// What to do with a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDecision {
    /// Render right away
    Immediate,
    /// Start a timer for `delay`; when it fires, call `fire(token)`
    Defer { token: u64, delay: Duration },
    /// A deferred render is already pending and will pick this request up
    Pending,
}

struct PendingRender {
    token: u64,
    timer: Option<AbortHandle>,
}

/// Per-session render scheduler
pub struct RenderScheduler {
    interval: Duration,
    last_render: Option<Instant>,
    pending: Option<PendingRender>,
    next_token: u64,
}

impl RenderScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_render: None,
            pending: None,
            next_token: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Decide how to serve a render request made at `now`
    pub fn request(&mut self, now: Instant) -> RenderDecision {
        let elapsed = self.last_render.map(|last| now.saturating_duration_since(last));

        match elapsed {
            Some(elapsed) if elapsed < self.interval => {
                if self.pending.is_some() {
                    return RenderDecision::Pending;
                }
                self.next_token += 1;
                let token = self.next_token;
                self.pending = Some(PendingRender { token, timer: None });
                RenderDecision::Defer { token, delay: self.interval - elapsed }
            }
            _ => {
                // The immediate render supersedes any deferred one
                self.cancel();
                RenderDecision::Immediate
            }
        }
    }

    /// Attach the running timer to the pending render it serves
    pub fn arm(&mut self, token: u64, timer: AbortHandle) {
        match &mut self.pending {
            Some(pending) if pending.token == token => pending.timer = Some(timer),
            // Superseded before it was armed
            _ => timer.abort(),
        }
    }

    /// A timer fired. Returns true if it still owns the pending render.
    pub fn fire(&mut self, token: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Record a completed render
    pub fn rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    /// Drop any pending render and stop its timer
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(timer) = pending.timer {
                timer.abort();
            }
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
