/// Sum and count of the runs left after dropping the extremes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trimmed {
    pub time: u64,
    pub count: usize,
}

impl Trimmed {
    pub fn mean(&self) -> Option<u64> {
        match self.count {
            0 => None,
            n => Some(self.time / n as u64),
        }
    }
}

/// Completed runs of a session, in the order they finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLog {
    runs: Vec<u64>,
    longest: Option<u64>,
    shortest: Option<u64>,
    total: u64,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, time_ms: u64) {
        self.runs.push(time_ms);
        if self.longest.map_or(true, |longest| time_ms >= longest) {
            self.longest = Some(time_ms);
        }
        if self.shortest.map_or(true, |shortest| time_ms <= shortest) {
            self.shortest = Some(time_ms);
        }
        self.total += time_ms;
    }

    pub fn count(&self) -> usize {
        self.runs.len()
    }

    pub fn runs(&self) -> &[u64] {
        &self.runs
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn longest(&self) -> Option<u64> {
        self.longest
    }

    pub fn shortest(&self) -> Option<u64> {
        self.shortest
    }

    /// Legacy name for [`RunLog::longest`]: the value the timer has always
    /// reported as "fastest" is the largest run.
    pub fn fastest(&self) -> Option<u64> {
        self.longest
    }

    /// Legacy name for [`RunLog::shortest`]
    pub fn slowest(&self) -> Option<u64> {
        self.shortest
    }

    pub fn mean(&self) -> Option<u64> {
        match self.count() {
            0 => None,
            n => Some(self.total / n as u64),
        }
    }

    /// All runs while fewer than three exist; afterwards every run equal to
    /// the longest or shortest value is left out.
    pub fn trimmed(&self) -> Trimmed {
        if self.count() < 3 {
            return Trimmed {
                time: self.total,
                count: self.count(),
            };
        }

        self.runs
            .iter()
            .filter(|&&t| Some(t) != self.longest && Some(t) != self.shortest)
            .fold(Trimmed::default(), |acc, &t| Trimmed {
                time: acc.time + t,
                count: acc.count + 1,
            })
    }
}
