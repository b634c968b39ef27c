//! Terminal rendering for study-core types.
//!
//! Colour goes through `if_supports_color`, so `--no-color`, `NO_COLOR` and
//! piped output all print plain text.

use owo_colors::{OwoColorize, Stream};
use study_core::Status;
use study_core::calendar::{DiffKind, EventDiff, SyncPlan, SyncReport};
use study_core::deadlines::{DeadlineEntry, Progress};
use study_core::tracker::BackupEntry;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

pub fn green(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.green()).to_string()
}

pub fn yellow(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.yellow()).to_string()
}

pub fn red(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.red()).to_string()
}

pub fn cyan(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.cyan()).to_string()
}

pub fn bold(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
}

pub fn dimmed(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.dimmed()).to_string()
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Colorize text according to the diff kind
fn colorize_diff(kind: DiffKind, text: &str) -> String {
    match kind {
        DiffKind::Create => green(text),
        DiffKind::Update => yellow(text),
        DiffKind::Delete => red(text),
    }
}

impl Render for DiffKind {
    fn render(&self) -> String {
        colorize_diff(*self, self.symbol())
    }
}

impl Render for EventDiff {
    fn render(&self) -> String {
        let summary = colorize_diff(self.kind, self.summary());
        let time = self
            .start()
            .map(|start| start.format("%a %d %b %H:%M").to_string())
            .unwrap_or_default();

        format!("{} {} {}", self.kind.render(), summary, dimmed(&time))
    }
}

impl Render for Status {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            Status::Completed | Status::Submitted => green(label),
            Status::InProgress => yellow(label),
            Status::Overdue => red(label),
            Status::Ongoing => cyan(label),
            Status::NotStarted => dimmed(label),
        }
    }
}

impl Render for DeadlineEntry {
    fn render(&self) -> String {
        let weight = self
            .weight
            .as_ref()
            .map(|w| format!(" ({})", w))
            .unwrap_or_default();

        format!(
            "{} {}{}  {}  {}",
            cyan(&format!("[{}]", self.course_alias)),
            self.name,
            dimmed(&weight),
            dimmed(&self.date.format("%a %d %b").to_string()),
            countdown(self.days_remaining, self.effective),
        )
    }
}

impl Render for Progress {
    fn render(&self) -> String {
        format!(
            "{}/{} done ({}%), {} in progress",
            self.done,
            self.total,
            self.percent(),
            self.in_progress
        )
    }
}

impl Render for BackupEntry {
    fn render(&self) -> String {
        format!(
            "{}  {}  {}",
            self.name,
            dimmed(&self.taken_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            dimmed(&format!("{} bytes", self.size)),
        )
    }
}

/// "in 3 days", "today", "2 days ago", coloured by urgency.
pub fn countdown(days: i64, status: Status) -> String {
    let text = match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d if d > 1 => format!("in {} days", d),
        -1 => "yesterday".to_string(),
        d => format!("{} days ago", -d),
    };

    if status.is_done() {
        dimmed(&text)
    } else if days < 0 {
        red(&text)
    } else if days <= 3 {
        yellow(&text)
    } else {
        text
    }
}

/// Threshold for compact view (show counts instead of individual events)
const COMPACT_THRESHOLD: usize = 5;

/// Render a sync plan, switching to per-kind counts when there are many changes.
pub fn render_plan(plan: &SyncPlan, verbose: bool) -> String {
    if plan.is_empty() {
        return dimmed(&format!(
            "   No changes ({} {} up to date)",
            plan.unchanged,
            pluralize("event", plan.unchanged)
        ));
    }

    let mut lines = Vec::new();
    if verbose || plan.changes.len() <= COMPACT_THRESHOLD {
        for diff in &plan.changes {
            lines.push(format!("   {}", diff.render()));
        }
    } else {
        let labels = [
            (DiffKind::Create, "new"),
            (DiffKind::Update, "changed"),
            (DiffKind::Delete, "deleted"),
        ];
        for (kind, label) in labels {
            let count = plan.count(kind);
            if count > 0 {
                let text = format!("({} {} {})", count, label, pluralize("event", count));
                lines.push(format!("   {} {}", kind.render(), colorize_diff(kind, &text)));
            }
        }
    }

    if plan.unchanged > 0 {
        lines.push(dimmed(&format!("   {} unchanged", plan.unchanged)));
    }
    lines.join("\n")
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Synced: {} created, {} updated, {} deleted, {} unchanged",
            self.created, self.updated, self.deleted, self.unchanged
        )];

        if !self.failures.is_empty() {
            lines.push(red(&format!(
                "{} {} failed:",
                self.failures.len(),
                pluralize("change", self.failures.len())
            )));
            for failure in &self.failures {
                lines.push(format!(
                    "   {} {} {}",
                    failure.kind.render(),
                    failure.summary,
                    red(&failure.error)
                ));
            }
        }
        lines.join("\n")
    }
}
