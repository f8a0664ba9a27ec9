use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::NotifyConfig;

/// Callback invoked with the latest coalesced value.
pub type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

struct BurstState<T> {
    latest: Option<T>,
    /// First trigger of the current burst; anchors the throttle ceiling
    window_start: Option<Instant>,
    deadline: Option<Instant>,
    timer_running: bool,
}

/// Debounce+throttle coalescer for one (signal, observer) pair.
///
/// `dispatch` never blocks and never invokes the observer inline; the
/// observer runs on a timer task once the tracked deadline passes.
pub struct Coalescer<T> {
    debounce: Duration,
    throttle: Duration,
    observer: Observer<T>,
    state: Arc<Mutex<BurstState<T>>>,
    cancel: CancellationToken,
}

impl<T: Clone + Send + 'static> Coalescer<T> {
    pub fn new(
        config: &NotifyConfig,
        observer: Observer<T>,
    ) -> Self {
        Self {
            debounce: config.debounce(),
            throttle: config.throttle(),
            observer,
            state: Arc::new(Mutex::new(BurstState {
                latest: None,
                window_start: None,
                deadline: None,
                timer_running: false,
            })),
            cancel: CancellationToken::new(),
        }
    }

    /// Records the value and (re)arms the burst deadline. Later dispatches
    /// within the burst supersede earlier values.
    pub fn dispatch(
        &self,
        value: T,
    ) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.latest = Some(value);
        let window_start = *state.window_start.get_or_insert(now);
        state.deadline = Some(cmp::min(now + self.debounce, window_start + self.throttle));

        if state.timer_running {
            return;
        }
        state.timer_running = true;
        drop(state);

        let state = self.state.clone();
        let observer = self.observer.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                // Copy the deadline out: a guard held in the match scrutinee
                // would live across the second lock below and self-deadlock.
                let deadline = state.lock().deadline;
                let deadline = match deadline {
                    Some(deadline) => deadline,
                    // Cleared concurrently; nothing left to publish
                    None => {
                        state.lock().timer_running = false;
                        return;
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        state.lock().timer_running = false;
                        return;
                    }
                    _ = sleep_until(deadline) => {}
                }

                let fired = {
                    let mut guard = state.lock();
                    match guard.deadline {
                        // A later dispatch pushed the deadline out; keep waiting
                        Some(deadline) if Instant::now() < deadline => None,
                        _ => {
                            guard.window_start = None;
                            guard.deadline = None;
                            guard.timer_running = false;
                            guard.latest.take()
                        }
                    }
                };

                if let Some(value) = fired {
                    (observer)(value);
                    return;
                }
            }
        });
    }

    /// Drops any pending publish. Idempotent.
    pub fn dispose(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock();
        state.latest = None;
        state.window_start = None;
        state.deadline = None;
    }
}

impl<T> Drop for Coalescer<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
