//! A single labeled time block on the day's timeline.
//!
//! Tasks are only created through [`Task::new`] (or [`Task::break_between`]),
//! which validates the duration and snaps both endpoints to the 5-minute grid.
//! After construction the bounds are only changed by the overlap resolution
//! in this module.

use chrono::{DateTime, Duration, DurationRound, Local};
use serde::Serialize;
use std::fmt;

use crate::error::ScheduleError;

/// Tag reserved for free-time blocks.
pub const BREAK_TAG: &str = "break";

/// Description given to synthesized breaks.
pub const BREAK_DESCRIPTION: &str = "Take a break";

/// Grid size for task endpoints, in minutes.
pub const QUANTUM_MINUTES: i64 = 5;

/// Shortest accepted task, in minutes.
pub const MIN_TASK_MINUTES: i64 = 5;

/// Clock format used for display and ingestion.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A labeled interval `[start, end)` on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    description: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    tag: String,
}

impl Task {
    /// Create a validated, quantized task with an empty tag.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidTime`] if the task lasts less than five
    /// minutes, before or after rounding to the 5-minute grid.
    pub fn new(
        description: impl Into<String>,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Self, ScheduleError> {
        let mut task = Self {
            description: description.into(),
            start,
            end,
            tag: String::new(),
        };
        task.quantize()?;
        Ok(task)
    }

    /// Create a break covering `[start, end)`.
    pub fn break_between(start: DateTime<Local>, end: DateTime<Local>) -> Result<Self, ScheduleError> {
        Ok(Self::new(BREAK_DESCRIPTION, start, end)?.with_tag(BREAK_TAG))
    }

    /// Break over a span already on the grid; callers guarantee the bounds.
    pub(crate) fn free_time(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self {
            description: BREAK_DESCRIPTION.to_string(),
            start,
            end,
            tag: BREAK_TAG.to_string(),
        }
    }

    /// Set the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start(&self) -> DateTime<Local> {
        self.start
    }

    pub fn end(&self) -> DateTime<Local> {
        self.end
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether this block is free time.
    pub fn is_break(&self) -> bool {
        self.tag == BREAK_TAG
    }

    /// Whether the task lasts at least the minimum duration.
    pub fn is_valid(&self) -> bool {
        self.duration() >= Duration::minutes(MIN_TASK_MINUTES)
    }

    /// Whether `t` lies within `[start, end]`.
    pub fn contains(&self, t: DateTime<Local>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Whether the two intervals overlap. Touching endpoints do not count.
    pub fn conflicts(&self, other: &Task) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Snap both endpoints to the nearest 5-minute mark. Halfway values round
    /// up. The duration is checked before and after rounding.
    pub(crate) fn quantize(&mut self) -> Result<(), ScheduleError> {
        if !self.is_valid() {
            return Err(ScheduleError::invalid_time(format!(
                "'{}' must last at least {MIN_TASK_MINUTES} minutes ({} to {})",
                self.description,
                self.start.format(TIME_FORMAT),
                self.end.format(TIME_FORMAT),
            )));
        }

        let quantum = Duration::minutes(QUANTUM_MINUTES);
        let start = self
            .start
            .duration_round(quantum)
            .map_err(|e| ScheduleError::invalid_time(format!("cannot round start time: {e}")))?;
        let end = self
            .end
            .duration_round(quantum)
            .map_err(|e| ScheduleError::invalid_time(format!("cannot round end time: {e}")))?;
        self.start = start;
        self.end = end;

        if !self.is_valid() {
            return Err(ScheduleError::invalid_time(format!(
                "'{}' is shorter than {MIN_TASK_MINUTES} minutes once rounded",
                self.description
            )));
        }
        Ok(())
    }

    pub(crate) fn set_end(&mut self, end: DateTime<Local>) {
        self.end = end;
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] {} ({})",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT),
            self.description,
            self.tag
        )
    }
}

/// Cut the part of `old` covered by `new` and return what survives.
///
/// Assumes the two tasks overlap. Returns no fragment when `new` swallows
/// `old`, one fragment when `new` covers one side of it, and two fragments
/// (earlier piece first) when `new` sits strictly inside it. Fragments keep
/// the description and tag of `old`.
pub fn resolve(mut old: Task, new: &Task) -> Vec<Task> {
    if old.start < new.start {
        if old.end <= new.end {
            old.end = new.start;
            return vec![old];
        }
        let post = Task {
            description: old.description.clone(),
            start: new.end,
            end: old.end,
            tag: old.tag.clone(),
        };
        old.end = new.start;
        vec![old, post]
    } else if old.end <= new.end {
        Vec::new()
    } else {
        old.start = new.end;
        vec![old]
    }
}
