use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MS_PER_SEC: u64 = 1_000;
const MS_PER_MIN: u64 = 60 * MS_PER_SEC;
const MS_PER_HOUR: u64 = 60 * MS_PER_MIN;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed time format override: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Minimum width and number of trailing characters to drop for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFormat {
    pub digits: usize,
    pub trim: usize,
}

impl FieldFormat {
    pub const fn new(digits: usize, trim: usize) -> Self {
        Self { digits, trim }
    }

    /// Zero-pad to `digits`, then cut `trim` characters off the end.
    /// Trimming past the start leaves an empty string.
    pub fn apply(&self, value: u64) -> String {
        let mut text = format!("{value:0width$}", width = self.digits);
        text.truncate(text.len().saturating_sub(self.trim));
        text
    }
}

/// Per-field formatting for a stopwatch reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFormat {
    pub ms: FieldFormat,
    pub sec: FieldFormat,
    pub min: FieldFormat,
    pub hour: FieldFormat,
    pub day: FieldFormat,
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            // hundredths: three digits with the last one cut
            ms: FieldFormat::new(3, 1),
            sec: FieldFormat::new(2, 0),
            min: FieldFormat::new(1, 0),
            hour: FieldFormat::new(1, 0),
            day: FieldFormat::new(1, 0),
        }
    }
}

impl TimeFormat {
    /// Replace every field the override sets, keep the rest
    pub fn with_override(&self, overrides: &TimeFormatOverride) -> Self {
        Self {
            ms: overrides.ms.unwrap_or(self.ms),
            sec: overrides.sec.unwrap_or(self.sec),
            min: overrides.min.unwrap_or(self.min),
            hour: overrides.hour.unwrap_or(self.hour),
            day: overrides.day.unwrap_or(self.day),
        }
    }
}

/// Partial [`TimeFormat`]; unknown keys are ignored when read from JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFormatOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sec: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<FieldFormat>,
}

impl TimeFormatOverride {
    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A millisecond count split into clock fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeParts {
    pub ms: u64,
    pub sec: u64,
    pub min: u64,
    pub hour: u64,
    /// wraps every 7 days, the epoch day being 0
    pub day: u64,
}

impl TimeParts {
    pub fn from_millis(total: u64) -> Self {
        Self {
            ms: total % MS_PER_SEC,
            sec: (total / MS_PER_SEC) % 60,
            min: (total / MS_PER_MIN) % 60,
            hour: (total / MS_PER_HOUR) % 24,
            day: (total / MS_PER_DAY) % 7,
        }
    }
}

/// Display strings for each field of a reading
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormattedTime {
    pub ms: String,
    pub sec: String,
    pub min: String,
    pub hour: String,
    pub day: String,
}

impl fmt::Display for FormattedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.min, self.sec, self.ms)
    }
}

/// Turns millisecond counts into display fields using a default format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFormatter {
    defaults: TimeFormat,
}

impl TimeFormatter {
    pub fn new(defaults: TimeFormat) -> Self {
        Self { defaults }
    }

    pub fn convert(&self, ms: u64) -> TimeParts {
        TimeParts::from_millis(ms)
    }

    /// Format `ms` with the defaults, layering `overrides` on top for this call only
    pub fn format(&self, ms: u64, overrides: Option<&TimeFormatOverride>) -> FormattedTime {
        let format = match overrides {
            Some(o) => self.defaults.with_override(o),
            None => self.defaults,
        };
        let parts = self.convert(ms);

        FormattedTime {
            ms: format.ms.apply(parts.ms),
            sec: format.sec.apply(parts.sec),
            min: format.min.apply(parts.min),
            hour: format.hour.apply(parts.hour),
            day: format.day.apply(parts.day),
        }
    }
}
