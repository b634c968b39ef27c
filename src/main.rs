mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::{OwoColorize, Stream};
use study_core::StudyError;
use study_core::clock::SystemClock;
use study_core::study_dir::StudyDir;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "study")]
#[command(about = "Track coursework progress and keep a study calendar in sync")]
struct Cli {
    /// Use this data directory instead of the configured one
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Don't ask for confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, default catalog and tracker
    Init,

    /// Every course with its assessments, deadlines and scores
    #[command(alias = "s")]
    Status,

    /// Course codes, aliases and numbered assessment keys
    #[command(alias = "c")]
    Courses,

    /// Upcoming deadlines
    #[command(alias = "n")]
    Next {
        /// How many deadlines to show
        #[arg(default_value_t = 10)]
        count: usize,

        /// Only look this many weeks ahead
        #[arg(long)]
        weeks: Option<u32>,
    },

    /// This week's hours, deadlines and activity
    #[command(alias = "w")]
    Week,

    /// Set the status of an assessment
    #[command(alias = "u")]
    Update {
        /// Course code or alias (e.g. "pc")
        course: String,

        /// Assessment key, unique prefix, or number from `study courses`
        assessment: String,

        /// Status or alias (e.g. "done", "wip", "submitted")
        status: String,
    },

    /// Mark an assessment completed
    Done { course: String, assessment: String },

    /// Mark an assessment in progress
    Wip { course: String, assessment: String },

    /// Record a score (marks the assessment completed)
    Score {
        course: String,
        assessment: String,

        /// A number, or text such as "17/20"
        score: String,
    },

    /// Log study hours
    Log {
        #[arg(allow_hyphen_values = true)]
        hours: String,

        /// Attribute the hours to this course
        course: Option<String>,

        /// And to this assessment
        assessment: Option<String>,
    },

    /// Set the partner for a group assessment
    Partner {
        course: String,
        assessment: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Set the paper topic for an assessment
    Paper {
        course: String,
        assessment: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Revert the most recent change
    Undo,

    /// List recent changes
    History {
        #[arg(default_value_t = 10)]
        count: usize,
    },

    /// Sync deadlines and study blocks to the calendar
    Calendar {
        /// Delete every managed event in the window and recreate it
        #[arg(long)]
        regen: bool,

        /// Show what would change without touching the calendar
        #[arg(long)]
        dry_run: bool,
    },

    /// List tracker backups
    Backup,

    /// Replace the tracker with a backup
    Restore {
        /// Backup file name, with or without .json
        name: String,
    },

    /// Show resolved paths and settings
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let study = StudyDir::load(cli.data_dir)?;
    let clock = SystemClock;

    match cli.command {
        Commands::Init => commands::init::run(&study, &clock),
        Commands::Status => commands::status::run(&study, &clock),
        Commands::Courses => commands::courses::run(&study),
        Commands::Next { count, weeks } => commands::next::run(&study, &clock, count, weeks),
        Commands::Week => commands::week::run(&study, &clock),
        Commands::Update {
            course,
            assessment,
            status,
        } => commands::update::run(&study, &clock, &course, &assessment, &status),
        Commands::Done { course, assessment } => {
            commands::update::run(&study, &clock, &course, &assessment, "completed")
        }
        Commands::Wip { course, assessment } => {
            commands::update::run(&study, &clock, &course, &assessment, "in_progress")
        }
        Commands::Score {
            course,
            assessment,
            score,
        } => commands::score::run(&study, &clock, &course, &assessment, &score),
        Commands::Log {
            hours,
            course,
            assessment,
        } => commands::log::run(
            &study,
            &clock,
            &hours,
            course.as_deref(),
            assessment.as_deref(),
        ),
        Commands::Partner {
            course,
            assessment,
            name,
        } => commands::detail::partner(&study, &clock, &course, &assessment, &name.join(" ")),
        Commands::Paper {
            course,
            assessment,
            title,
        } => commands::detail::paper(&study, &clock, &course, &assessment, &title.join(" ")),
        Commands::Undo => commands::undo::run(&study, &clock),
        Commands::History { count } => commands::history::run(&study, count),
        Commands::Calendar { regen, dry_run } => {
            commands::calendar::run(&study, &clock, regen, dry_run, cli.verbose).await
        }
        Commands::Backup => commands::backup::run(&study),
        Commands::Restore { name } => commands::restore::run(&study, &clock, &name, cli.yes),
        Commands::Config => commands::config::run(&study),
    }
}

/// Print the error and pick an exit code: 2 for bad input, 1 otherwise.
fn report(err: &anyhow::Error) -> ExitCode {
    let Some(study_err) = err.downcast_ref::<StudyError>() else {
        let label = "error:".if_supports_color(Stream::Stderr, |t| t.red()).to_string();
        eprintln!("{} {:#}", label, err);
        return ExitCode::FAILURE;
    };

    let label = format!("error[{}]:", study_err.class());
    eprintln!(
        "{} {}",
        label.if_supports_color(Stream::Stderr, |t| t.red()),
        study_err
    );
    if let Some(hint) = study_err.hint() {
        eprintln!("  {}", hint.if_supports_color(Stream::Stderr, |t| t.dimmed()));
    }

    if study_err.is_user_input() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases_and_global_flags() {
        let cli = Cli::try_parse_from(["study", "u", "pc", "1", "done", "--data-dir", "/tmp/s"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/s")));
        assert!(matches!(cli.command, Commands::Update { .. }));

        let cli = Cli::try_parse_from(["study", "n", "3", "--weeks", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Next {
                count: 3,
                weeks: Some(2)
            }
        ));
    }

    #[test]
    fn test_multi_word_paper_title() {
        let cli = Cli::try_parse_from(["study", "paper", "do", "paper", "Deep", "Optimizers"])
            .unwrap();
        match cli.command {
            Commands::Paper { title, .. } => assert_eq!(title.join(" "), "Deep Optimizers"),
            _ => panic!("expected paper"),
        }
    }

    #[test]
    fn test_user_input_errors_exit_with_two() {
        let err = anyhow::Error::from(StudyError::InvalidScore("empty".into()));
        assert_eq!(report(&err), ExitCode::from(2));

        let err = anyhow::Error::from(StudyError::CalendarTimeout(60));
        assert_eq!(report(&err), ExitCode::FAILURE);
    }
}
