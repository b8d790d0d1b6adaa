//! # Timeruler Core Library
//!
//! This library provides the day-timeline engine behind Timeruler. A day is
//! modelled as a sorted, gap-free list of tasks where every moment not
//! claimed by a real task is covered by a synthesized break. A standalone
//! CLI binary drives the same engine.
//!
//! ## Architecture
//!
//! - **Task**: a quantized interval with description and tag, plus the
//!   interval surgery that carves one task out of another
//! - **Timeline**: the [`TaskList`] invariant keeper and free-time detection
//! - **Schedule**: mutation operations with a current-task cache
//! - **Ingest / API**: delimited-text schedule files and JSON records
//! - **Shared**: a locked schedule handle and the current-task watcher
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Task`]: One interval on the day
//! - [`TaskList`]: Sorted, gap-free container
//! - [`Schedule`]: Mutation and current-task queries
//! - [`Config`]: Application configuration management

pub mod api;
pub mod error;
pub mod ingest;
pub mod schedule;
pub mod shared;
pub mod storage;
pub mod task;
pub mod timeline;

pub use api::{CurrentTaskModel, TimeBlockModel};
pub use error::{ConfigError, CoreError, ScheduleError};
pub use ingest::{load_schedule_file, parse_schedule, save_schedule_file, write_schedule};
pub use schedule::{CurrentTask, Schedule};
pub use shared::{watch_current_task, CurrentTaskNotifier, SharedSchedule};
pub use storage::{data_dir, Config};
pub use task::{resolve, Task, BREAK_DESCRIPTION, BREAK_TAG};
pub use timeline::{TaskList, TimeGap};
