use chrono::{DateTime, Local};
use clap::Subcommand;
use std::path::Path;
use timeruler_core::ingest::parse_clock_time;
use timeruler_core::{
    save_schedule_file, Config, CurrentTaskModel, Schedule, Task, TimeBlockModel,
};
use tracing::warn;

use super::ScheduleSource;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Show the whole day
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the task active right now
    Current {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entries overlapping FROM..TO (HH:MM:SS)
    Within {
        from: String,
        to: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Do something else from now until a given time
    Change {
        description: String,
        /// End time (HH:MM:SS)
        #[arg(long)]
        until: String,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// Add a task that does not collide with any real task
    Add {
        description: String,
        /// Start time (HH:MM:SS)
        start: String,
        /// End time (HH:MM:SS)
        end: String,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// Stamp a JSON array of time blocks over the day
    Update {
        /// JSON: [{"description", "start", "end", "tag"}]
        json: String,
    },
    /// Remove the entry at INDEX (as listed by `show`)
    Remove { index: usize },
}

pub fn run(source: &ScheduleSource, action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (path, mut schedule) = source.load(&config)?;
    let now = Local::now();

    match action {
        ScheduleAction::Show { json } => {
            mark_current(&mut schedule, now);
            if json {
                print_blocks(schedule.tasks().iter())?;
            } else if config.display.show_breaks {
                print!("{schedule}");
            } else {
                let lines = schedule.to_string();
                for (line, task) in lines.lines().zip(schedule.tasks()) {
                    if !task.is_break() {
                        println!("{line}");
                    }
                }
            }
        }
        ScheduleAction::Current { json } => {
            schedule.update_current_task_at(now)?;
            match CurrentTaskModel::from_schedule(&schedule) {
                Some(current) if json => println!("{}", serde_json::to_string_pretty(&current)?),
                Some(current) => println!("{} until {}", current.description, current.until),
                None if json => println!("null"),
                None => println!("nothing scheduled now"),
            }
        }
        ScheduleAction::Within { from, to, json } => {
            let from = clock(now, &from)?;
            let to = clock(now, &to)?;
            let tasks = schedule.tasks_within(from, to);
            if json {
                print_blocks(tasks.iter())?;
            } else {
                for task in tasks {
                    println!("{task}");
                }
            }
        }
        ScheduleAction::Change {
            description,
            until,
            tag,
        } => {
            let request = CurrentTaskModel {
                description,
                tag,
                until,
            };
            request.apply(&mut schedule, now)?;
            save(&path, &schedule)?;
        }
        ScheduleAction::Add {
            description,
            start,
            end,
            tag,
        } => {
            let task = Task::new(description, clock(now, &start)?, clock(now, &end)?)?.with_tag(tag);
            schedule.add_task_at(task, now)?;
            save(&path, &schedule)?;
        }
        ScheduleAction::Update { json } => {
            let blocks: Vec<TimeBlockModel> = serde_json::from_str(&json)?;
            TimeBlockModel::apply_batch(&blocks, &mut schedule, now)?;
            save(&path, &schedule)?;
        }
        ScheduleAction::Remove { index } => {
            let removed = schedule.remove_task(index)?;
            save(&path, &schedule)?;
            println!("removed: {removed}");
        }
    }
    Ok(())
}

/// Refresh the current-task marker for display. A failed refresh only hides
/// the marker.
fn mark_current(schedule: &mut Schedule, now: DateTime<Local>) -> Option<usize> {
    match schedule.update_current_task_at(now) {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "cannot mark the current task");
            None
        }
    }
}

fn clock(now: DateTime<Local>, value: &str) -> Result<DateTime<Local>, Box<dyn std::error::Error>> {
    Ok(parse_clock_time(now.date_naive(), value)?)
}

fn print_blocks<'a>(tasks: impl Iterator<Item = &'a Task>) -> Result<(), Box<dyn std::error::Error>> {
    let blocks: Vec<TimeBlockModel> = tasks.map(TimeBlockModel::from_task).collect();
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

fn save(path: &Path, schedule: &Schedule) -> Result<(), Box<dyn std::error::Error>> {
    save_schedule_file(path, schedule.tasks())?;
    println!("schedule saved to {}", path.display());
    Ok(())
}
