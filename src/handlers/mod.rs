//! One module per console command, plus the flags they share.

pub mod add;
pub mod duplicate;
pub mod enable;
pub mod finish;
pub mod history;
pub mod init;
pub mod list;
pub mod pause;
pub mod remove;
pub mod reschedule;
pub mod run;
pub mod show;
pub mod status;

use chrono::NaiveDateTime;
use clap::{ArgGroup, Args};
use colored::Colorize;
use delivery::engine::error::ScheduleError;
use delivery::engine::schedule::{parse_date, parse_date_time, parse_time};
use delivery::engine::state::DerivedStatus;
use delivery::engine::types::{Frequency, Recurrence, RunStatus, ScheduleRule};

/// Schedule flags shared by `add` and `reschedule`.
///
/// No flags at all leaves the schedule unconfigured.
#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("kind").args(["date", "every"])))]
pub struct ScheduleArgs {
    /// Run once, as soon as the task is enabled
    #[arg(long = "now", conflicts_with = "kind")]
    pub immediate: bool,

    /// Run once on this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Repeat at this frequency
    #[arg(long, value_enum)]
    pub every: Option<Frequency>,

    /// Time of day (HH:MM)
    #[arg(long, requires = "kind")]
    pub time: Option<String>,

    /// First day of a recurring schedule (YYYY-MM-DD)
    #[arg(long, requires = "every")]
    pub start: Option<String>,

    /// Last day of a recurring schedule (YYYY-MM-DD)
    #[arg(long, requires = "every")]
    pub end: Option<String>,
}

impl ScheduleArgs {
    /// Builds the schedule rule these flags describe.
    ///
    /// # Errors
    /// Returns an error if a date or time is malformed or missing.
    pub fn to_rule(&self) -> Result<ScheduleRule, ScheduleError> {
        if let Some(frequency) = self.every {
            let time = self.time.as_deref().ok_or(ScheduleError::MissingTime("every"))?;
            let start_date = self.start.as_deref().map(parse_date).transpose()?;
            let end_date = self.end.as_deref().map(parse_date).transpose()?;

            if let (Some(start), Some(end)) = (start_date, end_date) {
                if end < start {
                    return Err(ScheduleError::EndBeforeStart {
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
            }

            return Ok(ScheduleRule::recurring(Recurrence {
                time: parse_time(time)?,
                frequency,
                start_date,
                end_date,
            }));
        }

        if let Some(date) = &self.date {
            let time = self.time.as_deref().ok_or(ScheduleError::MissingTime("date"))?;
            return Ok(ScheduleRule::at(parse_date_time(date, time)?));
        }

        if self.immediate {
            return Ok(ScheduleRule::immediate());
        }

        Ok(ScheduleRule::default())
    }
}

/// Current local wall-clock time.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn status_icon(status: DerivedStatus) -> colored::ColoredString {
    match status {
        DerivedStatus::Active => "●".green(),
        DerivedStatus::Scheduled => "◷".blue(),
        DerivedStatus::Running => "▶".blue(),
        DerivedStatus::Overdue => "!".yellow(),
        DerivedStatus::Completed => "✓".green(),
        DerivedStatus::Failed => "✗".red(),
        DerivedStatus::Paused => "‖".yellow(),
        DerivedStatus::Draft => "○".dimmed(),
    }
}

pub fn run_label(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Running => "RUNNING".blue(),
        RunStatus::Success => "SUCCESS".green(),
        RunStatus::Failed => "FAILED ".red(),
        RunStatus::Skipped => "SKIPPED".dimmed(),
    }
}

pub fn format_moment(at: Option<NaiveDateTime>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}
