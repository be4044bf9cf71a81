use std::sync::mpsc::{self, Receiver, RecvError, Sender};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum CubeEvent {
    Key(KeyEvent),
    Resize,
    /// Elapsed milliseconds reported by a running clock
    Tick(u64),
}

/// Source of terminal events (keyboard, resize) and clock ticks.
///
/// Ticks are posted through [`CubeEventSource::sender`] so they share the
/// queue, and therefore the ordering, of key events.
pub trait CubeEventSource: Send + 'static {
    /// Block until the next event arrives.
    fn recv(&self) -> Result<CubeEvent, RecvError>;

    /// A handle for posting events into this source's queue
    fn sender(&self) -> Sender<CubeEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<CubeEvent>,
    rx: Receiver<CubeEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => CubeEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => CubeEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "terminal event reader stopped");
                    break;
                }
            };
            if reader_tx.send(evt).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CubeEventSource for CrosstermEventSource {
    fn recv(&self) -> Result<CubeEvent, RecvError> {
        self.rx.recv()
    }

    fn sender(&self) -> Sender<CubeEvent> {
        self.tx.clone()
    }
}

/// Channel-backed event source for tests and headless runs
pub struct TestEventSource {
    tx: Sender<CubeEvent>,
    rx: Receiver<CubeEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Drain everything queued right now without blocking
    pub fn pending(&self) -> Vec<CubeEvent> {
        self.rx.try_iter().collect()
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CubeEventSource for TestEventSource {
    fn recv(&self) -> Result<CubeEvent, RecvError> {
        self.rx.recv()
    }

    fn sender(&self) -> Sender<CubeEvent> {
        self.tx.clone()
    }
}
