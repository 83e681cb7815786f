//! Main CLI application

use crate::cli::output::{init_logging, print_report, Verbosity};
use crate::config::{
    load_env_file, parse_config_auto, parse_config_file, parse_override, resolve_vars,
    validate_config, validate_profile, Config,
};
use crate::error::{BootkitError, ExecutionError};
use crate::expr::Context;
use crate::runner::actions;
use crate::runner::{Builder, CommandRunner, Evaluator, Executor, SystemRunner};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

/// A loaded configuration and the context derived from it
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    pub context: Context,
}

impl Session {
    /// Load, validate and resolve the configuration selected by `matches`
    pub fn load(matches: &ArgMatches) -> Result<Self, BootkitError> {
        let (config, config_path) = match matches.get_one::<String>("file") {
            Some(path) => {
                let path = PathBuf::from(path);
                (parse_config_file(&path)?, path)
            }
            None => parse_config_auto()?,
        };
        validate_config(&config)?;
        debug!(path = %config_path.display(), entries = config.tasks.len(), "loaded config");

        let profile = match matches.get_one::<String>("profile") {
            Some(profile) => {
                validate_profile(&config, profile)?;
                profile.clone()
            }
            None => config.profile.clone().unwrap_or_default(),
        };

        let overrides = matches
            .get_many::<String>("var")
            .into_iter()
            .flatten()
            .map(|s| parse_override(s))
            .collect::<Result<Vec<_>, _>>()?;

        let env = load_env_file(&config, &config_path)?;
        let base = Context::new().with_profile(profile).with_env(env);
        let vars = resolve_vars(&config, &overrides, &base)?;
        let context = base.with_vars(vars);

        Ok(Session {
            config,
            config_path,
            context,
        })
    }

    /// A builder over the built-in actions, gated on this session's OS and profile
    pub fn builder(&self, runner: Rc<dyn CommandRunner>, ignore_when: bool) -> Builder {
        let registry = actions::registry(runner);
        if ignore_when {
            Builder::unconditional(registry)
        } else {
            Builder::with_evaluator(registry, Evaluator::from_context(&self.context))
        }
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("bootkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bootstrap a machine from a declarative YAML task list")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to bootkit.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("PROFILE")
                .help("Profile to run (overrides the config's default)")
                .global(true),
        )
        .arg(
            Arg::new("var")
                .long("var")
                .value_name("KEY=VALUE")
                .help("Override a variable")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print failures")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Run the task list (default)")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Show what would run without running it")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .help("Continue after a task fails")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("ignore-when")
                        .long("ignore-when")
                        .help("Ignore os/profile conditions")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("list").about("List the tasks that would be built"))
        .subcommand(Command::new("check").about("Validate the config and build every task"))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<(), BootkitError> {
    run_from(std::env::args_os())
}

/// Run the CLI application with explicit arguments
pub fn run_from<I, T>(args: I) -> Result<(), BootkitError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().get_matches_from(args);
    let verbosity = get_verbosity(&matches);
    init_logging(verbosity);

    match matches.subcommand() {
        Some(("completions", sub)) => {
            if let Some(shell) = sub.get_one::<Shell>("shell") {
                let mut cmd = build_command();
                clap_complete::generate(*shell, &mut cmd, "bootkit", &mut io::stdout());
            }
            Ok(())
        }
        Some(("list", _)) => cmd_list(&matches),
        Some(("check", _)) => cmd_check(&matches),
        Some(("run", sub)) => cmd_run(
            &matches,
            sub.get_flag("dry-run"),
            sub.get_flag("keep-going"),
            sub.get_flag("ignore-when"),
            verbosity,
        ),
        _ => cmd_run(&matches, false, false, false, verbosity),
    }
}

fn cmd_run(
    matches: &ArgMatches,
    dry_run: bool,
    keep_going: bool,
    ignore_when: bool,
    verbosity: Verbosity,
) -> Result<(), BootkitError> {
    let mut session = Session::load(matches)?;
    let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner);

    let tasks = session
        .builder(runner.clone(), ignore_when)
        .build(&session.config.tasks)?;

    let report = Executor::new(runner)
        .dry_run(dry_run)
        .keep_going(keep_going)
        .run(&tasks, &mut session.context)?;

    print_report(&report, verbosity);

    if report.is_success() {
        Ok(())
    } else {
        Err(ExecutionError::TasksFailed(report.failed()).into())
    }
}

fn cmd_list(matches: &ArgMatches) -> Result<(), BootkitError> {
    let session = Session::load(matches)?;
    let builder = session.builder(Rc::new(SystemRunner), false);
    let evaluator = Evaluator::from_context(&session.context);

    for (i, entry) in session.config.tasks.iter().enumerate() {
        let reason = evaluator.failure_reason(entry.when.as_ref());
        for task in builder.build_entry(i + 1, entry)? {
            let sudo = if task.needs_sudo() { " [sudo]" } else { "" };
            if reason.is_empty() {
                println!("{}{}", task.name(), sudo.yellow());
            } else {
                println!(
                    "{}{} {}",
                    task.name().dimmed(),
                    sudo.yellow(),
                    format!("(skip: {})", reason).dimmed()
                );
            }
        }
    }

    Ok(())
}

fn cmd_check(matches: &ArgMatches) -> Result<(), BootkitError> {
    let session = Session::load(matches)?;
    let tasks = session
        .builder(Rc::new(SystemRunner), false)
        .build(&session.config.tasks)?;

    println!(
        "{} {}: {} tasks from {} entries",
        "ok".green(),
        session.config_path.display(),
        tasks.len(),
        session.config.tasks.len()
    );
    Ok(())
}
