//! Day-level schedule: a task list plus the current-task cache.
//!
//! Every mutation runs against a copy of the task list and is committed only
//! once it has fully succeeded, so a failed call leaves the schedule as it
//! was. Each commit bumps a generation counter; a current-task lookup cached
//! under an older generation reads as [`CurrentTask::Stale`].

use chrono::{DateTime, Duration, DurationRound, Local};
use std::fmt;
use tracing::{info, warn};

use crate::error::ScheduleError;
use crate::task::{Task, QUANTUM_MINUTES, TIME_FORMAT};
use crate::timeline::TaskList;

/// Result of reading the current-task cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentTask<'a> {
    /// An entry covered the instant of the last refresh.
    Active { index: usize, task: &'a Task },
    /// Nothing was scheduled at the instant of the last refresh.
    Idle,
    /// Never refreshed, or the schedule changed since.
    Stale,
}

impl<'a> CurrentTask<'a> {
    pub fn task(&self) -> Option<&'a Task> {
        match self {
            Self::Active { task, .. } => Some(task),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Active { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CurrentSlot {
    index: Option<usize>,
    generation: u64,
    refreshed_at: DateTime<Local>,
}

/// A single day's timeline.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    tasks: TaskList,
    current: Option<CurrentSlot>,
    generation: u64,
    removed: Vec<Task>,
}

impl Schedule {
    /// Wrap a task list. An inconsistent list yields an empty schedule.
    pub fn new(tasks: TaskList) -> Self {
        if !tasks.is_consistent() {
            warn!(entries = tasks.len(), "refusing inconsistent task list");
            return Self::default();
        }
        Self {
            tasks,
            ..Self::default()
        }
    }

    /// Build the task list from raw tasks and wrap it.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self, ScheduleError> {
        Ok(Self::new(TaskList::build(tasks)?))
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Incremented on every committed mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Tasks taken out with [`remove_task`](Self::remove_task), oldest first.
    pub fn removed_tasks(&self) -> &[Task] {
        &self.removed
    }

    /// When the current-task cache was last refreshed.
    pub fn refreshed_at(&self) -> Option<DateTime<Local>> {
        self.current.map(|slot| slot.refreshed_at)
    }

    // ── Current task ─────────────────────────────────────────────────

    pub fn update_current_task(&mut self) -> Result<Option<usize>, ScheduleError> {
        self.update_current_task_at(Local::now())
    }

    /// Refresh the cache from the entry covering `now`.
    ///
    /// Outside the schedule's span there is no current task.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidSchedule`] if `now` falls inside the
    /// span but no entry covers it.
    pub fn update_current_task_at(
        &mut self,
        now: DateTime<Local>,
    ) -> Result<Option<usize>, ScheduleError> {
        let index = match self.tasks.task_at(now) {
            Some((index, _)) => Some(index),
            None => {
                if let Some((start, end)) = self.tasks.span() {
                    if start <= now && now <= end {
                        return Err(ScheduleError::invalid_schedule(format!(
                            "no entry covers {}",
                            now.format(TIME_FORMAT)
                        )));
                    }
                }
                None
            }
        };
        self.current = Some(CurrentSlot {
            index,
            generation: self.generation,
            refreshed_at: now,
        });
        Ok(index)
    }

    /// Read the cached current task.
    pub fn current_task(&self) -> CurrentTask<'_> {
        match self.current {
            Some(slot) if slot.generation == self.generation => match slot.index {
                Some(index) => self
                    .tasks
                    .get(index)
                    .map_or(CurrentTask::Stale, |task| CurrentTask::Active { index, task }),
                None => CurrentTask::Idle,
            },
            _ => CurrentTask::Stale,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn change_current_task_until(
        &mut self,
        description: &str,
        tag: &str,
        end: DateTime<Local>,
    ) -> Result<(), ScheduleError> {
        self.change_current_task_until_at(description, tag, end, Local::now())
    }

    /// Replace whatever runs at `now` with a new task lasting until `end`.
    ///
    /// The entry active at `now` is cut short and anything else inside
    /// `now..end` is overwritten.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidTime`] if `end` is not after `now`, is
    /// on another day, or leaves less than five minutes.
    pub fn change_current_task_until_at(
        &mut self,
        description: &str,
        tag: &str,
        end: DateTime<Local>,
        now: DateTime<Local>,
    ) -> Result<(), ScheduleError> {
        if end <= now {
            return Err(ScheduleError::invalid_time("task ends before the current time"));
        }
        if !same_day(end, now) {
            return Err(ScheduleError::invalid_time("task must end on the current day"));
        }

        let task = Task::new(description, now, end)?.with_tag(tag);
        check_within_day(&task, now)?;
        self.stamp(vec![task])
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), ScheduleError> {
        self.add_task_at(task, Local::now())
    }

    /// Place a task in free time only.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidTime`] if the task is invalid or starts
    /// before the current 5-minute slot, and
    /// [`ScheduleError::InvalidSchedule`] if it overlaps a non-break entry.
    pub fn add_task_at(&mut self, task: Task, now: DateTime<Local>) -> Result<(), ScheduleError> {
        if !task.is_valid() {
            return Err(ScheduleError::invalid_time("task times are invalid"));
        }
        let slot_start = now
            .duration_trunc(Duration::minutes(QUANTUM_MINUTES))
            .unwrap_or(now);
        if task.start() < slot_start {
            return Err(ScheduleError::invalid_time("task cannot start in the past"));
        }
        if self.tasks.is_conflict(&task) {
            return Err(ScheduleError::invalid_schedule(format!(
                "'{}' conflicts with the schedule",
                task.description()
            )));
        }
        self.update_time_block_at(vec![task], now)
    }

    pub fn update_time_block(
        &mut self,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Result<(), ScheduleError> {
        self.update_time_block_at(tasks, Local::now())
    }

    /// Stamp each task onto the timeline in order, overwriting what it
    /// overlaps, then repair breaks.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidTime`] if any task is invalid or not
    /// entirely on the current day. Nothing is applied in that case.
    pub fn update_time_block_at(
        &mut self,
        tasks: impl IntoIterator<Item = Task>,
        now: DateTime<Local>,
    ) -> Result<(), ScheduleError> {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        for task in &tasks {
            if !task.is_valid() {
                return Err(ScheduleError::invalid_time(format!(
                    "'{}' has an invalid time",
                    task.description()
                )));
            }
            check_within_day(task, now)?;
        }
        if tasks.is_empty() {
            return Ok(());
        }
        self.stamp(tasks)
    }

    /// Merge neighbouring breaks and fill gaps.
    pub fn fix_breaks(&mut self) {
        let mut tasks = self.tasks.clone();
        tasks.fix_breaks();
        if tasks != self.tasks {
            self.commit(tasks);
        }
    }

    /// Remove the real task at `index` without leaving a hole in the day.
    ///
    /// A neighbouring break absorbs the freed time. A task at either end of
    /// the list with no neighbouring break is simply dropped; one between two
    /// real tasks is replaced by a break.
    ///
    /// # Errors
    /// Returns [`ScheduleError::IndexOutOfBounds`] for an index past the end
    /// and [`ScheduleError::InvalidSchedule`] for a break.
    pub fn remove_task(&mut self, index: usize) -> Result<Task, ScheduleError> {
        let len = self.tasks.len();
        let target = self
            .tasks
            .get(index)
            .ok_or(ScheduleError::IndexOutOfBounds { index, len })?;
        if target.is_break() {
            return Err(ScheduleError::invalid_schedule(
                "can't remove a break (considered empty)",
            ));
        }

        let mut tasks = self.tasks.clone().into_vec();
        let removed = tasks.remove(index);
        let prev_break = index > 0 && tasks[index - 1].is_break();
        let next_break = tasks.get(index).is_some_and(Task::is_break);
        let at_edge = index == 0 || index == len - 1;
        if prev_break || next_break || !at_edge {
            tasks.insert(index, Task::free_time(removed.start(), removed.end()));
        }

        let mut list = TaskList::from_sorted(tasks);
        list.fix_breaks();
        self.commit(list);
        info!(task = %removed, "removed task");
        self.removed.push(removed.clone());
        Ok(removed)
    }

    /// Entries overlapping `[from, to]`, clamped to the schedule's bounds.
    pub fn tasks_within(&self, from: DateTime<Local>, to: DateTime<Local>) -> &[Task] {
        self.tasks.tasks_within(from, to)
    }

    fn stamp(&mut self, tasks: Vec<Task>) -> Result<(), ScheduleError> {
        let mut working = self.tasks.clone();
        for task in tasks {
            info!(task = %task, "stamping time block");
            working = working.resolve_conflicts(task)?;
        }
        working.fix_breaks();
        self.commit(working);
        Ok(())
    }

    fn commit(&mut self, tasks: TaskList) {
        self.tasks = tasks;
        self.generation += 1;
    }
}

fn same_day(a: DateTime<Local>, b: DateTime<Local>) -> bool {
    a.date_naive() == b.date_naive()
}

fn check_within_day(task: &Task, now: DateTime<Local>) -> Result<(), ScheduleError> {
    if !same_day(task.start(), now) {
        return Err(ScheduleError::invalid_time(format!(
            "'{}' must start on the current day",
            task.description()
        )));
    }
    if !same_day(task.end(), now) {
        return Err(ScheduleError::invalid_time(format!(
            "'{}' must end on the current day",
            task.description()
        )));
    }
    Ok(())
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current_task().index();
        for (i, task) in self.tasks.iter().enumerate() {
            let marker = if current == Some(i) { "->" } else { "  " };
            writeln!(f, "{marker}{task}")?;
        }
        Ok(())
    }
}
