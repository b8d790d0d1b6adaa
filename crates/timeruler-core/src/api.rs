//! Records exchanged with an API layer.
//!
//! The transport itself lives outside this crate; these types fix the JSON
//! shapes and map them onto schedule operations.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::ingest::parse_clock_time;
use crate::schedule::Schedule;
use crate::task::{Task, TIME_FORMAT};

/// The active interval, or the body of a "change current task" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentTaskModel {
    pub description: String,
    #[serde(default)]
    pub tag: String,
    /// End of the interval as `HH:MM:SS`.
    pub until: String,
}

impl CurrentTaskModel {
    pub fn from_task(task: &Task) -> Self {
        Self {
            description: task.description().to_string(),
            tag: task.tag().to_string(),
            until: task.end().format(TIME_FORMAT).to_string(),
        }
    }

    /// The freshly cached current task of `schedule`, if any.
    pub fn from_schedule(schedule: &Schedule) -> Option<Self> {
        schedule.current_task().task().map(Self::from_task)
    }

    /// Apply this record as "do this from now until `until`".
    pub fn apply(&self, schedule: &mut Schedule, now: DateTime<Local>) -> Result<(), ScheduleError> {
        let end = parse_clock_time(now.date_naive(), &self.until).map_err(ScheduleError::InvalidTime)?;
        schedule.change_current_task_until_at(&self.description, &self.tag, end, now)
    }
}

/// One entry of a batch time-block update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlockModel {
    pub description: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub tag: String,
}

impl TimeBlockModel {
    pub fn from_task(task: &Task) -> Self {
        Self {
            description: task.description().to_string(),
            start: task.start().format(TIME_FORMAT).to_string(),
            end: task.end().format(TIME_FORMAT).to_string(),
            tag: task.tag().to_string(),
        }
    }

    pub fn to_task(&self, day: NaiveDate) -> Result<Task, ScheduleError> {
        let start = parse_clock_time(day, &self.start).map_err(ScheduleError::InvalidTime)?;
        let end = parse_clock_time(day, &self.end).map_err(ScheduleError::InvalidTime)?;
        Ok(Task::new(self.description.as_str(), start, end)?.with_tag(self.tag.as_str()))
    }

    /// Stamp a batch onto `schedule`. Nothing is applied if any record fails.
    pub fn apply_batch(
        blocks: &[TimeBlockModel],
        schedule: &mut Schedule,
        now: DateTime<Local>,
    ) -> Result<(), ScheduleError> {
        let tasks = blocks
            .iter()
            .map(|block| block.to_task(now.date_naive()))
            .collect::<Result<Vec<_>, _>>()?;
        schedule.update_time_block_at(tasks, now)
    }
}
