//! Sorted, gap-free sequence of tasks.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::gap::{find_gaps, merge_overlapping, subtract, TimeGap};
use crate::error::ScheduleError;
use crate::task::{resolve, Task};

/// Ordered list of tasks covering a stretch of the day.
///
/// Adjacent entries never overlap. After [`fix_breaks`](Self::fix_breaks)
/// they are also contiguous: every gap is filled with a break.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from raw tasks.
    ///
    /// Each task is re-validated and quantized, then the list is sorted and
    /// every gap between entries is filled with a break. Breaks in the input
    /// only keep the time no real task claims.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidSchedule`] if a task is invalid or two
    /// non-break tasks overlap.
    pub fn build(tasks: impl IntoIterator<Item = Task>) -> Result<Self, ScheduleError> {
        let mut real = Vec::new();
        let mut free = Vec::new();
        for mut task in tasks {
            task.quantize()
                .map_err(|e| ScheduleError::invalid_schedule(format!("invalid task given: {e}")))?;
            if task.is_break() {
                free.push(TimeGap::of(&task));
            } else {
                real.push(task);
            }
        }

        real.sort_by_key(|t| t.start());
        if let Some(pair) = real.windows(2).find(|pair| pair[0].end() > pair[1].start()) {
            return Err(ScheduleError::invalid_schedule(format!(
                "'{}' overlaps '{}'",
                pair[0].description(),
                pair[1].description()
            )));
        }

        free.sort_by_key(|g| g.start_time);
        let occupied: Vec<TimeGap> = real.iter().map(TimeGap::of).collect();
        for gap in subtract(&merge_overlapping(&free), &occupied) {
            real.push(Task::free_time(gap.start_time, gap.end_time));
        }

        let mut list = Self { tasks: real };
        list.sort();
        list.fix_breaks();
        debug!(entries = list.len(), "built task list");
        Ok(list)
    }

    pub(crate) fn from_sorted(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    /// First start and last end of the list.
    pub fn span(&self) -> Option<(DateTime<Local>, DateTime<Local>)> {
        Some((self.tasks.first()?.start(), self.tasks.last()?.end()))
    }

    /// The entry covering `t`, with its index.
    ///
    /// Entries are looked up as `[start, end)` so that a boundary instant
    /// belongs to the entry starting there; the end of the last entry is
    /// still inside the list. Returns `None` outside the span or in a gap.
    pub fn task_at(&self, t: DateTime<Local>) -> Option<(usize, &Task)> {
        let idx = self.tasks.partition_point(|task| task.end() <= t);
        match self.tasks.get(idx) {
            Some(task) if task.start() <= t => Some((idx, task)),
            Some(_) => None,
            None => self
                .tasks
                .last()
                .filter(|last| last.end() == t)
                .map(|last| (self.tasks.len() - 1, last)),
        }
    }

    /// Whether `task` overlaps any non-break entry.
    pub fn is_conflict(&self, task: &Task) -> bool {
        self.tasks
            .iter()
            .filter(|t| !t.is_break())
            .any(|t| t.conflicts(task))
    }

    /// Stamp `new_task` onto a copy of the timeline, overwriting whatever it
    /// overlaps, and return the copy.
    ///
    /// Entries overlapping `new_task` are trimmed, split or dropped starting
    /// from the slot containing its start. The result is sorted but breaks
    /// are not repaired; call [`fix_breaks`](Self::fix_breaks) afterwards.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidTime`] if `new_task` is too short.
    pub fn resolve_conflicts(&self, new_task: Task) -> Result<TaskList, ScheduleError> {
        if !new_task.is_valid() {
            return Err(ScheduleError::invalid_time(format!(
                "'{}' is too short to schedule",
                new_task.description()
            )));
        }

        let first = self.tasks.partition_point(|t| t.end() <= new_task.start());
        let mut tasks = Vec::with_capacity(self.tasks.len() + 2);
        tasks.extend_from_slice(&self.tasks[..first]);

        let mut idx = first;
        while idx < self.tasks.len() && self.tasks[idx].conflicts(&new_task) {
            let old = &self.tasks[idx];
            let fragments = resolve(old.clone(), &new_task);
            debug!(
                old = %old,
                new = %new_task,
                fragments = fragments.len(),
                "resolved overlap"
            );
            tasks.extend(fragments);
            idx += 1;
        }

        tasks.extend_from_slice(&self.tasks[idx..]);
        tasks.push(new_task);

        let mut list = Self { tasks };
        list.sort();
        Ok(list)
    }

    /// Order by end, then start.
    pub(crate) fn sort(&mut self) {
        self.tasks
            .sort_by(|a, b| a.end().cmp(&b.end()).then(a.start().cmp(&b.start())));
    }

    /// Merge neighbouring breaks, fill gaps with breaks and drop empty
    /// entries. Running it twice changes nothing the second time.
    pub fn fix_breaks(&mut self) {
        let gaps = find_gaps(&self.tasks);
        let mut fixed: Vec<Task> = Vec::with_capacity(self.tasks.len() + gaps.len());
        let mut gaps = gaps.into_iter().peekable();

        for task in self.tasks.drain(..) {
            while let Some(gap) = gaps.next_if(|g| g.end_time <= task.start()) {
                push_merging(&mut fixed, Task::free_time(gap.start_time, gap.end_time));
            }
            if task.start() < task.end() {
                push_merging(&mut fixed, task);
            }
        }

        self.tasks = fixed;
    }

    /// Whether the list is sorted and free of overlaps.
    pub fn is_consistent(&self) -> bool {
        self.tasks.iter().all(Task::is_valid)
            && self
                .tasks
                .windows(2)
                .all(|pair| pair[0].end() <= pair[1].start())
    }

    /// Whether every entry ends exactly where the next one starts.
    pub fn is_contiguous(&self) -> bool {
        self.tasks
            .windows(2)
            .all(|pair| pair[0].end() == pair[1].start())
    }

    /// Entries whose `[start, end]` intersects `[from, to]`, clamped to the
    /// list's bounds. Entries touching either bound are included.
    pub fn tasks_within(&self, from: DateTime<Local>, to: DateTime<Local>) -> &[Task] {
        let lo = self.tasks.partition_point(|t| t.end() < from);
        let hi = self.tasks.partition_point(|t| t.start() <= to).max(lo);
        &self.tasks[lo..hi]
    }

    pub(crate) fn into_vec(self) -> Vec<Task> {
        self.tasks
    }
}

fn push_merging(fixed: &mut Vec<Task>, task: Task) {
    if let Some(last) = fixed.last_mut() {
        if last.is_break() && task.is_break() && task.start() <= last.end() {
            let end = last.end().max(task.end());
            last.set_end(end);
            return;
        }
    }
    fixed.push(task);
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

impl fmt::Display for TaskList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in &self.tasks {
            writeln!(f, "{task}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::at;
    use chrono::Duration;
    use proptest::prelude::*;

    fn task(desc: &str, start: DateTime<Local>, end: DateTime<Local>) -> Task {
        Task::new(desc, start, end).unwrap()
    }

    fn meals() -> TaskList {
        TaskList::build(vec![
            task("Eat Breakfast", at(9, 0, 0), at(9, 15, 0)).with_tag("food"),
            task("Eat Lunch", at(12, 15, 0), at(12, 45, 0)).with_tag("food"),
            task("Eat Dinner", at(17, 0, 0), at(18, 0, 0)).with_tag("food"),
            task("Go To Sleep", at(23, 30, 0), at(23, 45, 0)),
        ])
        .unwrap()
    }

    fn three_tasks() -> TaskList {
        TaskList::build(vec![
            task("Task 1", at(10, 0, 0), at(10, 30, 0)),
            task("Task 2", at(10, 35, 0), at(10, 45, 0)),
            task("Task 3", at(10, 45, 0), at(10, 55, 0)),
        ])
        .unwrap()
    }

    #[test]
    fn build_interleaves_breaks() {
        let list = meals();
        assert_eq!(list.len(), 7);
        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "[09:00:00-09:15:00] Eat Breakfast (food)",
                "[09:15:00-12:15:00] Take a break (break)",
                "[12:15:00-12:45:00] Eat Lunch (food)",
                "[12:45:00-17:00:00] Take a break (break)",
                "[17:00:00-18:00:00] Eat Dinner (food)",
                "[18:00:00-23:30:00] Take a break (break)",
                "[23:30:00-23:45:00] Go To Sleep ()",
            ]
        );
        assert!(list.is_contiguous());
    }

    #[test]
    fn build_sorts_input() {
        let list = TaskList::build(vec![
            task("later", at(11, 0, 0), at(12, 0, 0)),
            task("earlier", at(9, 0, 0), at(10, 0, 0)),
        ])
        .unwrap();
        assert_eq!(list.get(0).unwrap().description(), "earlier");
        assert!(list.get(1).unwrap().is_break());
        assert_eq!(list.get(2).unwrap().description(), "later");
    }

    #[test]
    fn build_rejects_overlap() {
        let result = TaskList::build(vec![
            task("Task 2", at(10, 35, 0), at(10, 45, 0)),
            task("Task 2.5", at(10, 40, 0), at(10, 50, 0)),
        ]);
        assert!(matches!(result, Err(ScheduleError::InvalidSchedule(_))));
    }

    #[test]
    fn build_keeps_uncovered_part_of_input_breaks() {
        let list = TaskList::build(vec![
            Task::break_between(at(8, 0, 0), at(9, 30, 0)).unwrap(),
            task("Work", at(9, 0, 0), at(10, 0, 0)),
        ])
        .unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.get(0).unwrap().is_break());
        assert_eq!(list.get(0).unwrap().end(), at(9, 0, 0));
        assert_eq!(list.span(), Some((at(8, 0, 0), at(10, 0, 0))));
    }

    #[test]
    fn task_at_finds_containing_entry() {
        let list = three_tasks();
        assert_eq!(list.len(), 4);
        assert_eq!(list.task_at(at(10, 10, 0)).unwrap().1.description(), "Task 1");
        assert_eq!(list.task_at(at(10, 32, 0)).unwrap().1.description(), "Take a break");
        assert_eq!(list.task_at(at(10, 40, 0)).unwrap().1.description(), "Task 2");
        assert_eq!(list.task_at(at(10, 50, 0)).unwrap().1.description(), "Task 3");
        assert!(list.task_at(at(11, 40, 0)).is_none());
        assert!(list.task_at(at(9, 50, 0)).is_none());
    }

    #[test]
    fn task_at_boundaries() {
        let list = three_tasks();
        // start of the list
        assert_eq!(list.task_at(at(10, 0, 0)).unwrap().0, 0);
        // a shared boundary belongs to the entry starting there
        assert_eq!(list.task_at(at(10, 45, 0)).unwrap().1.description(), "Task 3");
        // end of the list is inclusive
        assert_eq!(list.task_at(at(10, 55, 0)).unwrap().0, 3);
        assert!(TaskList::new().task_at(at(10, 0, 0)).is_none());
    }

    #[test]
    fn task_at_reports_gaps() {
        let list = TaskList::from_sorted(vec![
            task("a", at(9, 0, 0), at(10, 0, 0)),
            task("b", at(11, 0, 0), at(12, 0, 0)),
        ]);
        assert!(list.task_at(at(10, 30, 0)).is_none());
    }

    #[test]
    fn is_conflict_ignores_breaks() {
        let list = three_tasks();
        assert!(list.is_conflict(&task("Task 2.5", at(10, 40, 0), at(10, 50, 0))));
        assert!(!list.is_conflict(&task("in break", at(10, 30, 0), at(10, 35, 0))));
        assert!(!list.is_conflict(&task("later", at(18, 0, 0), at(18, 50, 0))));
        assert!(!list.is_conflict(&task("before", at(9, 50, 0), at(10, 0, 0))));
    }

    #[test]
    fn resolve_conflicts_replaces_covered_break() {
        let list = meals();
        let break_slot = list.get(1).unwrap().clone();
        let stamped = list
            .resolve_conflicts(task("Test", break_slot.start(), break_slot.end()))
            .unwrap();
        assert_eq!(stamped.len(), list.len());
        assert_eq!(stamped.get(1).unwrap().description(), "Test");
        assert!(stamped.is_contiguous());
    }

    #[test]
    fn resolve_conflicts_splits_break() {
        let list = meals();
        let slot = list.get(3).unwrap().clone();
        let inner = task(
            "test2",
            slot.start() + Duration::minutes(20),
            slot.end() - Duration::minutes(20),
        );
        let stamped = list.resolve_conflicts(inner).unwrap();
        assert_eq!(stamped.len(), list.len() + 2);
        let names: Vec<&str> = stamped.iter().skip(3).take(4).map(Task::description).collect();
        assert_eq!(names, vec!["Take a break", "test2", "Take a break", "Eat Dinner"]);
        assert!(stamped.is_contiguous());
    }

    #[test]
    fn resolve_conflicts_straddles_entries() {
        let list = meals();
        let stamped = list
            .resolve_conflicts(task("Long lunch", at(12, 0, 0), at(13, 30, 0)))
            .unwrap();
        let rendered: Vec<String> = stamped.iter().skip(1).take(3).map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "[09:15:00-12:00:00] Take a break (break)",
                "[12:00:00-13:30:00] Long lunch ()",
                "[13:30:00-17:00:00] Take a break (break)",
            ]
        );
        assert!(stamped.is_consistent());
        // input list untouched
        assert_eq!(list, meals());
    }

    #[test]
    fn resolve_conflicts_touching_is_not_overwrite() {
        let list = TaskList::build(vec![task("a", at(9, 0, 0), at(10, 0, 0))]).unwrap();
        let stamped = list.resolve_conflicts(task("b", at(10, 0, 0), at(11, 0, 0))).unwrap();
        assert_eq!(stamped.len(), 2);
        assert_eq!(stamped.get(0).unwrap().end(), at(10, 0, 0));
    }

    #[test]
    fn fix_breaks_merges_and_fills() {
        let mut list = TaskList::from_sorted(vec![
            task("a", at(9, 0, 0), at(10, 0, 0)),
            Task::free_time(at(10, 0, 0), at(10, 30, 0)),
            Task::free_time(at(10, 30, 0), at(11, 0, 0)),
            task("b", at(11, 0, 0), at(12, 0, 0)),
            task("c", at(13, 0, 0), at(14, 0, 0)),
        ]);
        list.fix_breaks();
        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "[09:00:00-10:00:00] a ()",
                "[10:00:00-11:00:00] Take a break (break)",
                "[11:00:00-12:00:00] b ()",
                "[12:00:00-13:00:00] Take a break (break)",
                "[13:00:00-14:00:00] c ()",
            ]
        );
    }

    #[test]
    fn fix_breaks_extends_break_next_to_gap() {
        let mut list = TaskList::from_sorted(vec![
            Task::free_time(at(9, 0, 0), at(10, 0, 0)),
            task("b", at(11, 0, 0), at(12, 0, 0)),
        ]);
        list.fix_breaks();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).unwrap().end(), at(11, 0, 0));
    }

    #[test]
    fn tasks_within_clamps() {
        let list = meals();
        assert_eq!(list.tasks_within(at(0, 0, 0), at(23, 59, 0)).len(), 7);
        let lunch_time = list.tasks_within(at(12, 0, 0), at(13, 0, 0));
        assert_eq!(lunch_time.len(), 3);
        assert_eq!(lunch_time[1].description(), "Eat Lunch");
        assert_eq!(list.tasks_within(at(12, 20, 0), at(12, 20, 0)).len(), 1);
        assert!(list.tasks_within(at(13, 0, 0), at(12, 0, 0)).is_empty());
    }

    #[test]
    fn tasks_within_includes_touching_entries() {
        let list = meals();
        let names: Vec<&str> = list
            .tasks_within(at(9, 15, 0), at(10, 0, 0))
            .iter()
            .map(Task::description)
            .collect();
        assert_eq!(names, ["Eat Breakfast", "Take a break"]);

        let lunch = list.tasks_within(at(12, 15, 0), at(12, 45, 0));
        assert_eq!(lunch.len(), 3);
        assert_eq!(lunch[1].description(), "Eat Lunch");

        // a shared boundary touches both neighbours
        assert_eq!(list.tasks_within(at(12, 45, 0), at(12, 45, 0)).len(), 2);
        assert_eq!(list.tasks_within(at(23, 45, 0), at(23, 59, 0)).len(), 1);
        assert!(list.tasks_within(at(23, 50, 0), at(23, 59, 0)).is_empty());
    }

    fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
        // non-overlapping tasks laid out on a 5-minute grid
        proptest::collection::vec((0u32..12, 1u32..12), 0..12).prop_map(|slots| {
            let mut cursor = 6 * 60;
            let mut tasks = Vec::new();
            for (i, (gap, len)) in slots.into_iter().enumerate() {
                let start = cursor + gap * 5;
                let end = start + len * 5;
                if end >= 24 * 60 {
                    break;
                }
                tasks.push(
                    Task::new(
                        format!("task {i}"),
                        at(start / 60, start % 60, 0),
                        at(end / 60, end % 60, 0),
                    )
                    .unwrap(),
                );
                cursor = end;
            }
            tasks
        })
    }

    proptest! {
        #[test]
        fn built_lists_are_gap_free(tasks in arb_tasks()) {
            let list = TaskList::build(tasks).unwrap();
            prop_assert!(list.is_consistent());
            prop_assert!(list.is_contiguous());
        }

        #[test]
        fn fix_breaks_is_idempotent(tasks in arb_tasks(), start in 0u32..200, len in 1u32..40) {
            let list = TaskList::build(tasks).unwrap();
            let start = 6 * 60 + start * 5;
            let end = (start + len * 5).min(23 * 60 + 55);
            prop_assume!(end > start);
            let new = Task::new("new", at(start / 60, start % 60, 0), at(end / 60, end % 60, 0)).unwrap();
            let mut once = list.resolve_conflicts(new).unwrap();
            once.fix_breaks();
            let mut twice = once.clone();
            twice.fix_breaks();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn resolve_conflicts_leaves_no_overlap(tasks in arb_tasks(), start in 0u32..200, len in 1u32..40) {
            let list = TaskList::build(tasks).unwrap();
            let start = 6 * 60 + start * 5;
            let end = (start + len * 5).min(23 * 60 + 55);
            prop_assume!(end > start);
            let new = Task::new("new", at(start / 60, start % 60, 0), at(end / 60, end % 60, 0)).unwrap();
            let mut stamped = list.resolve_conflicts(new.clone()).unwrap();
            prop_assert!(stamped.is_consistent());
            prop_assert_eq!(stamped.iter().filter(|t| t.conflicts(&new)).count(), 1);
            stamped.fix_breaks();
            prop_assert!(stamped.is_contiguous());
            prop_assert!(stamped.iter().any(|t| *t == new));
        }

        #[test]
        fn task_at_covers_whole_span(tasks in arb_tasks(), offsets in proptest::collection::vec(0i64..=1_000_000, 1..16)) {
            let list = TaskList::build(tasks).unwrap();
            prop_assume!(!list.is_empty());
            let (start, end) = list.span().unwrap();
            let span_secs = (end - start).num_seconds();
            for offset in offsets {
                let t = start + Duration::seconds(offset % (span_secs + 1));
                let (idx, found) = list.task_at(t).unwrap();
                prop_assert!(found.contains(t));
                prop_assert_eq!(list.get(idx), Some(found));
                // half-open ownership: exactly one entry owns each instant
                let owners = list
                    .iter()
                    .filter(|task| task.start() <= t && (t < task.end() || task.end() == end))
                    .count();
                prop_assert_eq!(owners, 1);
            }
        }
    }
}
