use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::scheduler::{Scheduler, ThreadScheduler};
use crate::time::{MonotonicTimeSource, TimeSource};

/// Tick period used when nothing else is configured
pub const DEFAULT_INTERVAL_MS: u64 = 43;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("clock has not been started")]
    NotStarted,
    #[error("clock is already running")]
    AlreadyRunning,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ClockState {
    running: bool,
    started_at: Option<u64>,
    // always None while running
    ended_at: Option<u64>,
}

impl ClockState {
    fn elapsed(&self, now: u64) -> Result<u64, ClockError> {
        let start = self.started_at.ok_or(ClockError::NotStarted)?;
        let end = if self.running {
            now
        } else {
            self.ended_at.ok_or(ClockError::NotStarted)?
        };
        Ok(end.saturating_sub(start))
    }
}

/// Stopwatch that reports elapsed milliseconds on a fixed period while running
pub struct Clock<T: TimeSource, S: Scheduler> {
    state: Arc<Mutex<ClockState>>,
    time: Arc<T>,
    scheduler: S,
    ticker: Option<S::Handle>,
    interval: Duration,
}

impl Clock<MonotonicTimeSource, ThreadScheduler> {
    /// Wall clock driven by a background tick thread
    pub fn system(interval: Duration) -> Self {
        Self::new(MonotonicTimeSource::new(), ThreadScheduler::new(), interval)
    }
}

impl<T: TimeSource, S: Scheduler> Clock<T, S> {
    pub fn new(time: T, scheduler: S, interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState::default())),
            time: Arc::new(time),
            scheduler,
            ticker: None,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start timing and call `on_tick` with the elapsed time on every period.
    ///
    /// Fails with [`ClockError::AlreadyRunning`] if a run is in progress; the
    /// running schedule is left as it was.
    pub fn start<F>(&mut self, mut on_tick: F) -> Result<(), ClockError>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let now = self.time.now_ms();
        {
            let mut state = self.state();
            if state.running {
                return Err(ClockError::AlreadyRunning);
            }
            *state = ClockState {
                running: true,
                started_at: Some(now),
                ended_at: None,
            };
        }

        let state = Arc::clone(&self.state);
        let time = Arc::clone(&self.time);
        let handle = self.scheduler.schedule(
            self.interval,
            Box::new(move || {
                let elapsed = {
                    let state = state.lock().unwrap_or_else(|e| e.into_inner());
                    if !state.running {
                        return;
                    }
                    state.elapsed(time.now_ms())
                };
                if let Ok(ms) = elapsed {
                    trace!(elapsed_ms = ms, "tick");
                    on_tick(ms);
                }
            }),
        );
        self.ticker = Some(handle);

        let interval_ms = self.interval.as_millis() as u64;
        debug!(started_at = now, interval_ms, "clock started");
        Ok(())
    }

    /// Stop timing and return the elapsed time of the run.
    ///
    /// Stopping an already stopped clock returns the same value again.
    pub fn stop(&mut self) -> Result<u64, ClockError> {
        self.cancel_ticker();

        let now = self.time.now_ms();
        let mut state = self.state();
        if state.started_at.is_none() {
            return Err(ClockError::NotStarted);
        }
        if state.running {
            state.running = false;
            state.ended_at = Some(now);
            debug!(ended_at = now, "clock stopped");
        }
        state.elapsed(now)
    }

    /// Stop any run and forget both timestamps
    pub fn reset(&mut self) {
        self.cancel_ticker();
        *self.state() = ClockState::default();
        debug!("clock reset");
    }

    pub fn elapsed(&self) -> Result<u64, ClockError> {
        self.state().elapsed(self.time.now_ms())
    }

    pub fn running(&self) -> bool {
        self.state().running
    }

    pub fn started_at(&self) -> Option<u64> {
        self.state().started_at
    }

    pub fn ended_at(&self) -> Option<u64> {
        self.state().ended_at
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl<T: TimeSource, S: Scheduler> Drop for Clock<T, S> {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

impl<T: TimeSource, S: Scheduler> std::fmt::Debug for Clock<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *self.state();
        f.debug_struct("Clock")
            .field("running", &state.running)
            .field("started_at", &state.started_at)
            .field("ended_at", &state.ended_at)
            .field("interval", &self.interval)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}
