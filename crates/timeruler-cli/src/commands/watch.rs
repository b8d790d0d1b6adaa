use chrono::Local;
use std::sync::Arc;
use timeruler_core::{watch_current_task, Config, CurrentTaskModel, CurrentTaskNotifier, SharedSchedule};
use tracing::info;

use super::ScheduleSource;

/// Prints each new current task on its own line.
struct StdoutNotifier;

impl CurrentTaskNotifier for StdoutNotifier {
    fn notify(&self, current: &CurrentTaskModel) {
        info!(description = %current.description, until = %current.until, "current task changed");
        println!("{} until {}", current.description, current.until);
    }
}

pub fn run(source: &ScheduleSource) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (path, schedule) = source.load(&config)?;
    info!(
        path = %path.display(),
        every = ?config.refresh_interval(),
        "watching current task"
    );

    let shared = Arc::new(SharedSchedule::new(schedule));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        tokio::select! {
            _ = watch_current_task(
                shared.clone(),
                config.refresh_interval(),
                StdoutNotifier,
                config.watch.notify_breaks,
            ) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    });

    if let Some(current) = shared.current_snapshot() {
        info!(description = %current.description, at = %Local::now().format("%H:%M:%S"), "stopped");
    }
    Ok(())
}
