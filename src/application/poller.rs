// Recurring-fetch lifecycle for one feed
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Epoch token handed to in-flight work so results from a superseded poller
/// run can be recognized and discarded at apply time. Stopping a poller bumps
/// the epoch; anything still carrying the old value is a zombie.
#[derive(Debug, Clone)]
pub struct Generation {
    epoch: Arc<AtomicU64>,
    issued: u64,
}

impl Generation {
    /// A generation that is never invalidated, for one-shot fetches that run
    /// outside any poller.
    pub fn detached() -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            issued: 0,
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.issued
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    /// Terminal. A stopped poller is not restarted; build a new one.
    Stopped,
}

/// Owns the recurring tick schedule for one feed. Each firing spawns the tick
/// as its own task, so a slow tick never delays the next firing and
/// overlapping in-flight ticks for the same feed are possible.
pub struct Poller {
    state: PollerState,
    epoch: Arc<AtomicU64>,
    trigger: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new() -> Self {
        Self {
            state: PollerState::Idle,
            epoch: Arc::new(AtomicU64::new(0)),
            trigger: Arc::new(Notify::new()),
            handle: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Shared view of the epoch counter, for apply-time filtering.
    pub fn epoch_handle(&self) -> Arc<AtomicU64> {
        self.epoch.clone()
    }

    /// A token pinned to the poller's current epoch.
    pub fn generation(&self) -> Generation {
        Generation {
            epoch: self.epoch.clone(),
            issued: self.epoch.load(Ordering::SeqCst),
        }
    }

    /// Idle → Running. Fires one tick immediately, then at fixed wall-clock
    /// intervals regardless of how long each tick takes.
    pub fn start<F, Fut>(&mut self, interval: Duration, tick: F)
    where
        F: Fn(Generation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.state != PollerState::Idle {
            tracing::warn!(state = ?self.state, "ignoring start on a non-idle poller");
            return;
        }
        self.state = PollerState::Running;

        let generation = self.generation();
        let trigger = self.trigger.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = trigger.notified() => {}
                }
                tokio::spawn(tick(generation.clone()));
            }
        }));
    }

    /// Fire an immediate out-of-band tick (used for paging intents).
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Running → Stopped. Cancels the schedule and invalidates every
    /// generation issued so far; in-flight ticks may still complete but their
    /// results no longer pass the epoch check.
    pub fn stop(&mut self) {
        if self.state == PollerState::Stopped {
            return;
        }
        self.state = PollerState::Stopped;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
