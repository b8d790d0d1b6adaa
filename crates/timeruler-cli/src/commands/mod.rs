pub mod config;
pub mod schedule;
pub mod watch;

use chrono::Local;
use clap::Args;
use std::path::PathBuf;
use timeruler_core::{load_schedule_file, Config, Schedule, TaskList};
use tracing::info;

/// Where the schedule comes from.
#[derive(Args)]
pub struct ScheduleSource {
    /// Schedule file (defaults to `schedule_file` from the config)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl ScheduleSource {
    pub fn path(&self, config: &Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
        match &self.file {
            Some(path) => Ok(path.clone()),
            None => Ok(config.schedule_path()?),
        }
    }

    /// Load today's schedule. A missing file is an empty day.
    pub fn load(&self, config: &Config) -> Result<(PathBuf, Schedule), Box<dyn std::error::Error>> {
        let path = self.path(config)?;
        if !path.exists() {
            info!(path = %path.display(), "no schedule file, starting empty");
            return Ok((path, Schedule::new(TaskList::new())));
        }
        let list = load_schedule_file(&path, Local::now().date_naive())?;
        Ok((path, Schedule::new(list)))
    }
}
