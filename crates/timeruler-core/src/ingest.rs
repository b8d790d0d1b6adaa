//! Reading and writing day schedules as delimited text.
//!
//! One record per line: `description,start,end[,tag]` with times in
//! `HH:MM:SS` on a single day. Fields containing commas may be wrapped in
//! double quotes. Blank lines and lines starting with `#` are ignored.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CoreError, Result, ScheduleError};
use crate::task::{Task, TIME_FORMAT};
use crate::timeline::TaskList;

/// Interpret `value` (`HH:MM:SS`) as a local time on `day`.
pub fn parse_clock_time(day: NaiveDate, value: &str) -> std::result::Result<DateTime<Local>, String> {
    let time = NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| format!("time value '{value}' is not formatted as HH:MM:SS"))?;
    Local
        .from_local_datetime(&day.and_time(time))
        .earliest()
        .ok_or_else(|| format!("time value '{value}' does not exist on {day}"))
}

/// Parse every record from `reader` and build a task list for `day`.
///
/// # Errors
/// Fails on the first malformed line with [`ScheduleError::Parse`] carrying
/// its 1-based line number, or with [`ScheduleError::InvalidSchedule`] if
/// the records overlap. No partial list is returned.
pub fn parse_schedule<R: Read>(reader: R, day: NaiveDate) -> Result<TaskList> {
    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut tasks = Vec::new();
    for record in records.records() {
        let record = record.map_err(csv_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line_no = record.position().map_or(0, |pos| pos.line() as usize);
        tasks.push(parse_record(&record, line_no, day)?);
    }
    debug!(records = tasks.len(), %day, "parsed schedule records");
    Ok(TaskList::build(tasks)?)
}

/// Read a schedule file for `day`.
pub fn load_schedule_file(path: impl AsRef<Path>, day: NaiveDate) -> Result<TaskList> {
    let path = path.as_ref();
    let list = parse_schedule(File::open(path)?, day)?;
    info!(path = %path.display(), entries = list.len(), "loaded schedule");
    Ok(list)
}

/// Write `tasks` in the same format `parse_schedule` reads, breaks included.
pub fn write_schedule<W: Write>(writer: W, tasks: &TaskList) -> Result<()> {
    let mut records = csv::WriterBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_writer(writer);

    for task in tasks {
        records
            .write_record([
                task.description().to_string(),
                task.start().format(TIME_FORMAT).to_string(),
                task.end().format(TIME_FORMAT).to_string(),
                task.tag().to_string(),
            ])
            .map_err(csv_error)?;
    }
    records.flush()?;
    Ok(())
}

/// Overwrite the file at `path` with `tasks`.
pub fn save_schedule_file(path: impl AsRef<Path>, tasks: &TaskList) -> Result<()> {
    let path = path.as_ref();
    write_schedule(File::create(path)?, tasks)?;
    info!(path = %path.display(), entries = tasks.len(), "saved schedule");
    Ok(())
}

fn parse_record(
    record: &csv::StringRecord,
    line_no: usize,
    day: NaiveDate,
) -> std::result::Result<Task, ScheduleError> {
    let (Some(description), Some(start), Some(end)) = (record.get(0), record.get(1), record.get(2))
    else {
        return Err(ScheduleError::parse(
            line_no,
            format!("expected at least 3 fields, found {}", record.len()),
        ));
    };

    let start = parse_clock_time(day, start).map_err(|e| ScheduleError::parse(line_no, e))?;
    let end = parse_clock_time(day, end).map_err(|e| ScheduleError::parse(line_no, e))?;
    let tag = record.get(3).unwrap_or_default();

    Task::new(description, start, end)
        .map(|task| task.with_tag(tag))
        .map_err(|e| ScheduleError::parse(line_no, e.to_string()))
}

/// Malformed input keeps its line number; anything else is an I/O failure.
fn csv_error(err: csv::Error) -> CoreError {
    match err.position() {
        Some(pos) => ScheduleError::parse(pos.line() as usize, err.to_string()).into(),
        None => CoreError::Io(err.into()),
    }
}
