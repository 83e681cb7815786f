//! Terminal output: logging setup and run summaries

use crate::runner::{Outcome, Report, Status};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Default log directive for this level
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over `verbosity`.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    // Only the first subscriber wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn status_label(status: Status) -> String {
    let label = format!("{:>7}", status.as_str());
    match status {
        Status::Done => label.green().to_string(),
        Status::Skipped => label.yellow().to_string(),
        Status::Failed => label.red().bold().to_string(),
        _ => label.dimmed().to_string(),
    }
}

fn print_outcome(name: &str, outcome: &Outcome, verbosity: Verbosity) {
    println!(
        "{} {} {}",
        status_label(outcome.status()),
        name.bold(),
        outcome.message().dimmed()
    );

    if let Some(error) = outcome.error() {
        println!("        {}", error.to_string().red());
    }

    let show_output = outcome.status() == Status::Failed || verbosity >= Verbosity::Verbose;
    if show_output && !outcome.output().is_empty() {
        for line in outcome.output().lines() {
            println!("        | {}", line);
        }
    }
}

/// Print per-task results and a one-line summary
pub fn print_report(report: &Report, verbosity: Verbosity) {
    if verbosity == Verbosity::Silent {
        return;
    }

    for (name, outcome) in &report.outcomes {
        if verbosity >= Verbosity::Normal || outcome.status() == Status::Failed {
            print_outcome(name, outcome, verbosity);
        }
    }

    if verbosity >= Verbosity::Normal {
        let summary = format!(
            "{} done, {} skipped, {} failed",
            report.done(),
            report.skipped(),
            report.failed()
        );
        if report.is_success() {
            println!("{}", summary.green());
        } else {
            println!("{}", summary.red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_order() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
    }

    #[test]
    fn test_directives() {
        assert_eq!(Verbosity::Silent.directive(), "off");
        assert_eq!(Verbosity::Quiet.directive(), "error");
        assert_eq!(Verbosity::Normal.directive(), "info");
        assert_eq!(Verbosity::Verbose.directive(), "debug");
    }

    #[test]
    fn test_status_label_keeps_text() {
        assert!(status_label(Status::Done).contains("done"));
        assert!(status_label(Status::Failed).contains("failed"));
    }
}
