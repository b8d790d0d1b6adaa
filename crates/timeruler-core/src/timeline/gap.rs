//! Free-time detection between timeline entries.
//!
//! Breaks are derived from the gaps between scheduled tasks, so the same
//! helpers serve list construction and post-mutation repair.

use chrono::{DateTime, Duration, Local};

use crate::task::Task;

/// A half-open stretch of time `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGap {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
}

impl TimeGap {
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// The span covered by a task.
    pub fn of(task: &Task) -> Self {
        Self::new(task.start(), task.end())
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn is_empty(&self) -> bool {
        self.end_time <= self.start_time
    }
}

/// Gaps between consecutive entries of a sorted, non-overlapping slice.
pub fn find_gaps(tasks: &[Task]) -> Vec<TimeGap> {
    tasks
        .windows(2)
        .filter(|pair| pair[0].end() < pair[1].start())
        .map(|pair| TimeGap::new(pair[0].end(), pair[1].start()))
        .collect()
}

/// Merge sorted overlapping/adjacent spans into disjoint spans.
pub fn merge_overlapping(sorted: &[TimeGap]) -> Vec<TimeGap> {
    let mut merged: Vec<TimeGap> = Vec::new();
    for &gap in sorted {
        if let Some(last) = merged.last_mut() {
            if gap.start_time <= last.end_time {
                last.end_time = last.end_time.max(gap.end_time);
                continue;
            }
        }
        merged.push(gap);
    }
    merged
}

/// Remove every span in `to_remove` from `base`. Both inputs must be sorted
/// by start and internally disjoint.
pub fn subtract(base: &[TimeGap], to_remove: &[TimeGap]) -> Vec<TimeGap> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start_time;

        while ri < to_remove.len() && to_remove[ri].end_time <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start_time < b.end_time {
            let r = &to_remove[j];
            if r.start_time > current_start {
                result.push(TimeGap::new(current_start, r.start_time));
            }
            current_start = current_start.max(r.end_time);
            j += 1;
        }

        if current_start < b.end_time {
            result.push(TimeGap::new(current_start, b.end_time));
        }
    }

    result
}
