//! macOS Calendar, driven through `osascript`.
//!
//! Each operation is one AppleScript program piped to `osascript -` on
//! stdin. Dates are built field by field so the scripts do not depend on
//! the system locale, and listings come back as records separated by ASCII
//! record/unit separators.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::calendar::ExternalCalendar;
use crate::calendar::event::{CalendarEvent, EventId, RemoteEvent};
use crate::date_range::DateRange;
use crate::error::{StudyError, StudyResult};

const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';
const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// AppleScript handler that renders a date as `YYYY-MM-DDTHH:MM`.
const STAMP_HANDLER: &str = r#"
on pad(n)
    if n < 10 then return "0" & (n as text)
    return n as text
end pad

on stamp(d)
    return ((year of d) as text) & "-" & my pad((month of d) as integer) & "-" & my pad(day of d) & "T" & my pad(hours of d) & ":" & my pad(minutes of d)
end stamp
"#;

pub struct ScriptCalendar {
    binary: PathBuf,
    timeout: Duration,
}

/// Quote `s` as an AppleScript string expression. Newlines become
/// `linefeed` so multi-line descriptions survive.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    let lines: Vec<String> = escaped.split('\n').map(|l| format!("\"{l}\"")).collect();
    lines.join(" & linefeed & ")
}

/// Statements setting `var` to `dt`. Day is reset to 1 first so changing the
/// month never overflows.
fn date_statements(var: &str, dt: NaiveDateTime) -> String {
    format!(
        "set {var} to current date\n\
         set day of {var} to 1\n\
         set year of {var} to {}\n\
         set month of {var} to {}\n\
         set day of {var} to {}\n\
         set time of {var} to {}\n",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.num_seconds_from_midnight()
    )
}

fn list_script(calendar: &str, range: &DateRange) -> String {
    format!(
        r#"{from}{to}set fs to (ASCII character 31)
set rs to (ASCII character 30)
set out to ""
tell application "Calendar"
    if not (exists calendar {name}) then return ""
    set evs to (every event of calendar {name} whose start date ≥ rangeFrom and start date < rangeTo)
    repeat with ev in evs
        set desc to description of ev
        if desc is missing value then set desc to ""
        set alarmText to ""
        repeat with a in (sound alarms of ev)
            set alarmText to alarmText & ((trigger interval of a) as text) & ","
        end repeat
        set out to out & (uid of ev) & fs & (summary of ev) & fs & my stamp(start date of ev) & fs & my stamp(end date of ev) & fs & desc & fs & alarmText & rs
    end repeat
end tell
return out
{handlers}"#,
        from = date_statements("rangeFrom", range.from),
        to = date_statements("rangeTo", range.to),
        name = quote(calendar),
        handlers = STAMP_HANDLER,
    )
}

fn create_script(calendar: &str, event: &CalendarEvent) -> String {
    let alarms: String = event
        .reminders
        .iter()
        .map(|m| {
            format!(
                "        make new sound alarm at end of sound alarms with properties {{trigger interval:-{m}}}\n"
            )
        })
        .collect();

    format!(
        r#"{start}{end}tell application "Calendar"
    if not (exists calendar {name}) then make new calendar with properties {{name:{name}}}
    set ev to make new event at end of events of calendar {name} with properties {{summary:{summary}, start date:startAt, end date:endAt, description:{description}}}
    tell ev
{alarms}    end tell
    return uid of ev
end tell
"#,
        start = date_statements("startAt", event.start),
        end = date_statements("endAt", event.end),
        name = quote(calendar),
        summary = quote(&event.summary),
        description = quote(&event.description),
    )
}

fn delete_script(id: &EventId) -> String {
    format!(
        r#"tell application "Calendar"
    repeat with cal in calendars
        delete (every event of cal whose uid is {uid})
    end repeat
end tell
"#,
        uid = quote(&id.0)
    )
}

fn ensure_script(calendar: &str) -> String {
    format!(
        r#"tell application "Calendar"
    if not (exists calendar {name}) then make new calendar with properties {{name:{name}}}
end tell
"#,
        name = quote(calendar)
    )
}

/// Parse the listing produced by `list_script`. Malformed records are
/// skipped with a warning.
fn parse_listing(output: &str) -> Vec<RemoteEvent> {
    output
        .split(RECORD_SEP)
        .map(|r| r.trim_start_matches(['\n', '\r']))
        .filter(|r| !r.trim().is_empty())
        .filter_map(|record| {
            let parsed = parse_record(record);
            if parsed.is_none() {
                warn!(record, "Skipping unreadable calendar event");
            }
            parsed
        })
        .collect()
}

fn parse_record(record: &str) -> Option<RemoteEvent> {
    let fields: Vec<&str> = record.split(FIELD_SEP).collect();
    let [uid, summary, start, end, description, alarms] = fields.as_slice() else {
        return None;
    };

    let reminders = alarms
        .split(',')
        .filter_map(|a| a.trim().parse::<i64>().ok())
        .map(|minutes| minutes.unsigned_abs() as u32)
        .collect();

    Some(RemoteEvent {
        id: EventId(uid.to_string()),
        summary: summary.to_string(),
        start: NaiveDateTime::parse_from_str(start, STAMP_FORMAT).ok()?,
        end: NaiveDateTime::parse_from_str(end, STAMP_FORMAT).ok()?,
        description: description.replace("\r\n", "\n").replace('\r', "\n"),
        reminders,
    })
}

/// Map a failed script's stderr to an error. AppleScript error numbers tell
/// a timeout or an unreachable app apart from a rejected request.
fn classify_failure(stderr: &str, on_rejected: impl FnOnce(String) -> StudyError) -> StudyError {
    let message = stderr.trim().to_string();
    if message.contains("(-1712)") {
        // AppleEvent timed out.
        StudyError::CalendarTimeout(0)
    } else if message.contains("(-600)") || message.contains("(-609)") || message.contains("(-1743)")
    {
        StudyError::CalendarUnavailable(message)
    } else {
        on_rejected(message)
    }
}

impl ScriptCalendar {
    pub fn new(timeout: Duration) -> StudyResult<Self> {
        let binary = which::which("osascript").map_err(|_| {
            StudyError::CalendarUnavailable(
                "osascript not found. Calendar sync needs macOS Calendar".into(),
            )
        })?;
        Ok(ScriptCalendar { binary, timeout })
    }

    /// Create the calendar if it does not exist yet.
    pub async fn ensure_calendar(&self, calendar: &str) -> StudyResult<()> {
        self.run(ensure_script(calendar))
            .await?
            .map_err(|stderr| classify_failure(&stderr, StudyError::CalendarUnavailable))?;
        Ok(())
    }

    async fn run(&self, script: String) -> StudyResult<Result<String, String>> {
        timeout(self.timeout, self.run_raw(script))
            .await
            .map_err(|_| StudyError::CalendarTimeout(self.timeout.as_secs()))?
    }

    /// Ok(Ok(stdout)) on success, Ok(Err(stderr)) when the script failed.
    async fn run_raw(&self, script: String) -> StudyResult<Result<String, String>> {
        debug!(script = %script, "Running AppleScript");

        let mut child = Command::new(&self.binary)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                StudyError::CalendarUnavailable(format!(
                    "Failed to spawn {}: {e}",
                    self.binary.display()
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StudyError::CalendarUnavailable("osascript stdin unavailable".into()))?;
        stdin.write_all(script.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(Ok(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            Ok(Err(String::from_utf8_lossy(&output.stderr).into_owned()))
        }
    }
}

impl ExternalCalendar for ScriptCalendar {
    async fn list_events(&self, calendar: &str, range: &DateRange) -> StudyResult<Vec<RemoteEvent>> {
        let output = self
            .run(list_script(calendar, range))
            .await?
            .map_err(|stderr| classify_failure(&stderr, StudyError::CalendarUnavailable))?;
        Ok(parse_listing(output.trim_end_matches(['\n', '\r'])))
    }

    async fn create_event(&self, calendar: &str, event: &CalendarEvent) -> StudyResult<EventId> {
        let output = self
            .run(create_script(calendar, event))
            .await?
            .map_err(|stderr| {
                classify_failure(&stderr, |reason| StudyError::CalendarEvent {
                    summary: event.summary.clone(),
                    reason,
                })
            })?;
        Ok(EventId(output.trim().to_string()))
    }

    async fn delete_event(&self, id: &EventId) -> StudyResult<()> {
        self.run(delete_script(id)).await?.map_err(|stderr| {
            classify_failure(&stderr, |reason| StudyError::CalendarEvent {
                summary: id.to_string(),
                reason,
            })
        })?;
        Ok(())
    }
}
