use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Work run on every period of a schedule
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Periodic scheduling primitive the clock drives its ticks through
pub trait Scheduler {
    type Handle;

    /// Run `task` every `period` until the returned handle is cancelled.
    fn schedule(&mut self, period: Duration, task: Task) -> Self::Handle;

    /// Stop a schedule. Once this returns the task will not run again.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Runs each schedule on its own background thread
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

#[derive(Debug)]
pub struct ThreadHandle {
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ThreadScheduler {
    type Handle = ThreadHandle;

    fn schedule(&mut self, period: Duration, mut task: Task) -> ThreadHandle {
        let (cancel, cancel_rx) = mpsc::channel();

        // waiting on the cancel channel instead of sleeping lets cancel() wake us at once
        let thread = thread::spawn(move || loop {
            match cancel_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => task(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        ThreadHandle { cancel, thread }
    }

    fn cancel(&mut self, handle: ThreadHandle) {
        let _ = handle.cancel.send(());
        if handle.thread.join().is_err() {
            tracing::warn!("tick thread panicked before cancellation");
        }
    }
}

struct ManualEntry {
    id: u64,
    period: Duration,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    entries: Vec<ManualEntry>,
}

/// Scheduler whose tasks only run when a test calls [`ManualScheduler::fire`].
///
/// Clones share their schedules, so the test keeps a handle while the clock
/// owns another.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManualHandle(u64);

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every live task once. Returns how many ran.
    pub fn fire(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for entry in state.entries.iter_mut() {
            (entry.task)();
        }
        state.entries.len()
    }

    /// Number of schedules that have not been cancelled
    pub fn active(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.entries.len())
            .unwrap_or_default()
    }

    /// Period of every live schedule, oldest first
    pub fn periods(&self) -> Vec<Duration> {
        self.state
            .lock()
            .map(|s| s.entries.iter().map(|e| e.period).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("active", &self.active())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&mut self, period: Duration, task: Task) -> ManualHandle {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(ManualEntry { id, period, task });
        ManualHandle(id)
    }

    fn cancel(&mut self, handle: ManualHandle) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.retain(|e| e.id != handle.0);
    }
}
