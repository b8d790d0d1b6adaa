//! Thread-safe handle around a [`Schedule`].
//!
//! The engine mutates its task list in several steps, so a schedule shared
//! between tasks or threads sits behind one mutex. The current task is
//! republished through a `watch` channel after every mutation or refresh,
//! which lets readers that only need "what is on now" skip the lock.

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::CurrentTaskModel;
use crate::error::ScheduleError;
use crate::schedule::Schedule;
use crate::task::BREAK_TAG;

/// Receives the new current task whenever it changes.
///
/// Delivery (push service, desktop notification, log line) is up to the
/// implementor.
pub trait CurrentTaskNotifier: Send + Sync {
    fn notify(&self, current: &CurrentTaskModel);
}

/// A schedule guarded by a mutex, with a lock-free current-task snapshot.
#[derive(Debug)]
pub struct SharedSchedule {
    schedule: Mutex<Schedule>,
    current: watch::Sender<Option<CurrentTaskModel>>,
}

impl SharedSchedule {
    pub fn new(schedule: Schedule) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            schedule: Mutex::new(schedule),
            current,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the schedule under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&Schedule) -> R) -> R {
        f(&self.lock())
    }

    /// Run a mutation under the lock, then refresh and republish the current
    /// task as of `now`. A failed mutation publishes nothing.
    pub fn mutate<R>(
        &self,
        now: DateTime<Local>,
        f: impl FnOnce(&mut Schedule) -> Result<R, ScheduleError>,
    ) -> Result<R, ScheduleError> {
        let mut schedule = self.lock();
        let out = f(&mut schedule)?;
        if let Err(e) = self.publish(&mut schedule, now) {
            warn!(error = %e, "schedule changed but the current task could not be refreshed");
        }
        Ok(out)
    }

    /// Swap in a new day's schedule.
    pub fn replace(&self, schedule: Schedule, now: DateTime<Local>) -> Result<(), ScheduleError> {
        let mut guard = self.lock();
        *guard = schedule;
        self.publish(&mut guard, now).map(|_| ())
    }

    /// Refresh the current task as of `now`. Returns whether it changed.
    pub fn refresh(&self, now: DateTime<Local>) -> Result<bool, ScheduleError> {
        let mut schedule = self.lock();
        self.publish(&mut schedule, now)
    }

    /// Last published current task.
    pub fn current_snapshot(&self) -> Option<CurrentTaskModel> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentTaskModel>> {
        self.current.subscribe()
    }

    fn publish(&self, schedule: &mut Schedule, now: DateTime<Local>) -> Result<bool, ScheduleError> {
        schedule.update_current_task_at(now)?;
        let snapshot = CurrentTaskModel::from_schedule(schedule);
        Ok(self.current.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            debug!(?snapshot, "current task changed");
            *current = snapshot;
            true
        }))
    }
}

/// Refresh `shared` every `period` and hand each new current task to
/// `notifier`. Breaks are skipped unless `notify_breaks` is set.
///
/// Runs until the surrounding task is dropped.
pub async fn watch_current_task<N: CurrentTaskNotifier>(
    shared: Arc<SharedSchedule>,
    period: Duration,
    notifier: N,
    notify_breaks: bool,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match shared.refresh(Local::now()) {
            Ok(true) => {
                if let Some(current) = shared.current_snapshot() {
                    if notify_breaks || current.tag != BREAK_TAG {
                        notifier.notify(&current);
                    }
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "current task refresh failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::at;
    use crate::task::Task;

    fn shared() -> SharedSchedule {
        SharedSchedule::new(
            Schedule::from_tasks(vec![
                Task::new("Work", at(9, 0, 0), at(12, 0, 0)).unwrap(),
                Task::new("Gym", at(18, 0, 0), at(19, 0, 0)).unwrap(),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn refresh_publishes_changes_only() {
        let shared = shared();
        let mut rx = shared.subscribe();
        assert!(shared.current_snapshot().is_none());

        assert!(shared.refresh(at(10, 0, 0)).unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().description, "Work");

        assert!(!shared.refresh(at(11, 0, 0)).unwrap());
        assert!(!rx.has_changed().unwrap());

        assert!(shared.refresh(at(13, 0, 0)).unwrap());
        assert_eq!(shared.current_snapshot().unwrap().tag, "break");
    }

    #[test]
    fn mutate_republishes_current_task() {
        let shared = shared();
        let now = at(10, 0, 0);
        shared.refresh(now).unwrap();

        shared
            .mutate(now, |schedule| {
                schedule.change_current_task_until_at("Call", "", at(10, 30, 0), now)
            })
            .unwrap();
        let current = shared.current_snapshot().unwrap();
        assert_eq!(current.description, "Call");
        assert_eq!(current.until, "10:30:00");
    }

    #[test]
    fn failed_mutation_changes_nothing() {
        let shared = shared();
        let now = at(10, 0, 0);
        shared.refresh(now).unwrap();
        let before = shared.read(|s| s.to_string());

        let result = shared.mutate(now, |schedule| {
            schedule.change_current_task_until_at("Call", "", at(9, 0, 0), now)
        });
        assert!(matches!(result, Err(ScheduleError::InvalidTime(_))));
        assert_eq!(shared.read(|s| s.to_string()), before);
        assert_eq!(shared.current_snapshot().unwrap().description, "Work");
    }

    #[test]
    fn replace_starts_a_new_day() {
        let shared = shared();
        shared.refresh(at(10, 0, 0)).unwrap();
        shared.replace(Schedule::default(), at(10, 0, 0)).unwrap();
        assert!(shared.current_snapshot().is_none());
        assert!(shared.read(Schedule::is_empty));
    }

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl CurrentTaskNotifier for Recorder {
        fn notify(&self, current: &CurrentTaskModel) {
            self.0.lock().unwrap().push(current.description.clone());
        }
    }

    #[tokio::test]
    async fn watcher_notifies_once_per_change() {
        let now = Local::now();
        let schedule = Schedule::from_tasks(vec![Task::new(
            "Focus",
            now - chrono::Duration::minutes(30),
            now + chrono::Duration::minutes(30),
        )
        .unwrap()])
        .unwrap();
        let shared = Arc::new(SharedSchedule::new(schedule));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let watcher = watch_current_task(
            shared.clone(),
            Duration::from_millis(5),
            Recorder(seen.clone()),
            false,
        );
        let _ = tokio::time::timeout(Duration::from_millis(50), watcher).await;

        assert_eq!(*seen.lock().unwrap(), vec!["Focus".to_string()]);
        assert_eq!(shared.current_snapshot().unwrap().description, "Focus");
    }
}
