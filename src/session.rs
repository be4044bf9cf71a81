use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::clock::{Clock, ClockError, DEFAULT_INTERVAL_MS};
use crate::format::{FormattedTime, TimeFormat, TimeFormatter};
use crate::run_log::RunLog;
use crate::runtime::CubeEvent;
use crate::scheduler::Scheduler;
use crate::scramble::{Scramble, ScrambleGenerator, DEFAULT_SCRAMBLE_LENGTH};
use crate::time::TimeSource;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub interval: Duration,
    pub scramble_length: usize,
    pub time_format: TimeFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            scramble_length: DEFAULT_SCRAMBLE_LENGTH,
            time_format: TimeFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// start key held down, waiting for release
    Armed,
    Running,
}

/// How a finished run compares with the rest of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Best,
    Worst,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub time_ms: u64,
    pub display: String,
    pub finished_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub runs: usize,
    pub mean: String,
    pub trimmed_runs: usize,
    pub trimmed_mean: String,
}

/// Drives one timing session: key input in, display state out.
///
/// All collaborators are injected: the clock (with its time source and
/// scheduler), the scramble generator and the channel ticks are posted to.
pub struct Session<T: TimeSource, S: Scheduler> {
    clock: Clock<T, S>,
    log: RunLog,
    formatter: TimeFormatter,
    scrambler: ScrambleGenerator,
    scramble: Scramble,
    phase: Phase,
    display: FormattedTime,
    entries: Vec<RunEntry>,
    summary: Option<Summary>,
    ticks: Sender<CubeEvent>,
}

impl<T: TimeSource, S: Scheduler> Session<T, S> {
    pub fn new(
        clock: Clock<T, S>,
        formatter: TimeFormatter,
        mut scrambler: ScrambleGenerator,
        ticks: Sender<CubeEvent>,
    ) -> Self {
        let scramble = scrambler.generate();
        let display = formatter.format(0, None);
        Self {
            clock,
            log: RunLog::new(),
            formatter,
            scrambler,
            scramble,
            phase: Phase::Idle,
            display,
            entries: vec![],
            summary: None,
            ticks,
        }
    }

    pub fn from_config(
        config: &SessionConfig,
        time: T,
        scheduler: S,
        ticks: Sender<CubeEvent>,
    ) -> Self {
        Self::new(
            Clock::new(time, scheduler, config.interval),
            TimeFormatter::new(config.time_format),
            ScrambleGenerator::new(config.scramble_length),
            ticks,
        )
    }

    /// Start key pressed. Arms the timer unless a run is in progress.
    pub fn key_down(&mut self) {
        if self.clock.running() {
            return;
        }
        self.clock.reset();
        self.display = self.formatter.format(0, None);
        self.phase = Phase::Armed;
    }

    /// Start key released. Stops a running timer and returns the run time,
    /// otherwise starts a new run and returns `None`.
    pub fn key_up(&mut self) -> Result<Option<u64>, ClockError> {
        if self.clock.running() {
            let time_ms = self.clock.stop()?;
            self.record(time_ms);
            return Ok(Some(time_ms));
        }

        let tx = self.ticks.clone();
        self.clock.start(move |elapsed| {
            let _ = tx.send(CubeEvent::Tick(elapsed));
        })?;
        self.phase = Phase::Running;
        Ok(None)
    }

    /// A key press from a terminal that does not report releases
    pub fn press(&mut self) -> Result<Option<u64>, ClockError> {
        self.key_down();
        self.key_up()
    }

    /// Elapsed time from the clock. Ticks that arrive once the run is over are dropped.
    pub fn on_tick(&mut self, elapsed: u64) {
        if self.phase == Phase::Running && self.clock.running() {
            self.display = self.formatter.format(elapsed, None);
        }
    }

    pub fn new_scramble(&mut self) {
        if self.phase == Phase::Running {
            return;
        }
        self.scramble = self.scrambler.generate();
    }

    fn record(&mut self, time_ms: u64) {
        self.display = self.formatter.format(time_ms, None);
        self.log.add(time_ms);
        self.entries.push(RunEntry {
            time_ms,
            display: self.display.to_string(),
            finished_at: Local::now(),
        });
        self.summary = Some(self.summarize());
        self.scramble = self.scrambler.generate();
        self.phase = Phase::Idle;

        info!(time_ms, runs = self.log.count(), "run recorded");
        debug!(summary = ?self.summary, "summary updated");
    }

    fn summarize(&self) -> Summary {
        let trimmed = self.log.trimmed();
        Summary {
            runs: self.log.count(),
            mean: self.format_opt(self.log.mean()),
            trimmed_runs: trimmed.count,
            trimmed_mean: self.format_opt(trimmed.mean()),
        }
    }

    fn format_opt(&self, ms: Option<u64>) -> String {
        ms.map(|ms| self.formatter.format(ms, None).to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Shortest run is checked first, so a lone run counts as best
    pub fn standing(&self, entry: &RunEntry) -> Standing {
        if Some(entry.time_ms) == self.log.shortest() {
            Standing::Best
        } else if Some(entry.time_ms) == self.log.longest() {
            Standing::Worst
        } else {
            Standing::Plain
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn display(&self) -> &FormattedTime {
        &self.display
    }

    pub fn scramble(&self) -> &Scramble {
        &self.scramble
    }

    pub fn entries(&self) -> &[RunEntry] {
        &self.entries
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn clock(&self) -> &Clock<T, S> {
        &self.clock
    }
}

impl<T: TimeSource, S: Scheduler> std::fmt::Debug for Session<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("clock", &self.clock)
            .field("phase", &self.phase)
            .field("display", &self.display)
            .field("runs", &self.log.count())
            .finish()
    }
}
