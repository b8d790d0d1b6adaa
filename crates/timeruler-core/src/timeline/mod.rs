//! Timeline storage and interval surgery.
//!
//! This module provides:
//! - The sorted, gap-free [`TaskList`]
//! - Free-time detection used to synthesize breaks

mod gap;
mod task_list;

pub use gap::{find_gaps, merge_overlapping, subtract, TimeGap};
pub use task_list::TaskList;
