//! `shell.run`: run a shell command

use super::{one_or_many, raw_text, resolve_path, string_arg};
use crate::error::{ExecutionError, FactoryError, FactoryResult};
use crate::expr::{resolve_condition, Context, Value};
use crate::runner::command::CommandRunner;
use crate::runner::task::{timed, Outcome, Task};
use serde::Deserialize;
use serde_yaml::Value as Yaml;
use std::rc::Rc;

pub const ACTION: &str = "shell.run";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShellArgs {
    run: Yaml,
    name: Option<String>,
    creates: Option<Yaml>,
    #[serde(rename = "if")]
    condition: Option<Yaml>,
    #[serde(default)]
    sudo: bool,
}

/// Runs a command through `sh -c`
pub struct ShellCommand {
    name: String,
    command: Value,
    creates: Option<Value>,
    condition: Option<Value>,
    sudo: bool,
    runner: Rc<dyn CommandRunner>,
}

impl ShellCommand {
    pub fn new(command: Value, runner: Rc<dyn CommandRunner>) -> Self {
        ShellCommand {
            name: format!("{} {}", ACTION, raw_text(&command)),
            command,
            creates: None,
            condition: None,
            sudo: false,
            runner,
        }
    }

    /// Override the task name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Skip when `path` already exists
    pub fn creates(mut self, path: Value) -> Self {
        self.creates = Some(path);
        self
    }

    /// Only run when `condition` evaluates to true
    pub fn only_if(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn invocation(&self, command: String) -> (&'static str, Vec<String>) {
        let mut args = vec!["sh".to_string(), "-c".to_string(), command];
        if self.sudo {
            ("sudo", args)
        } else {
            args.remove(0);
            ("sh", args)
        }
    }
}

impl Task for ShellCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Outcome {
        timed(|| {
            if let Some(creates) = &self.creates {
                match resolve_path(creates, ctx) {
                    Ok(path) if path.exists() => {
                        return Outcome::skipped(format!("{} exists", path.display()))
                    }
                    Ok(_) => {}
                    Err(e) => return Outcome::failed("failed to resolve creates", e),
                }
            }

            match resolve_condition(self.condition.as_ref(), ctx) {
                Ok(true) => {}
                Ok(false) => return Outcome::skipped("condition not met: if"),
                Err(e) => return Outcome::failed("failed to evaluate if", e),
            }

            let command = match self.command.resolve_string(ctx) {
                Ok(command) => command,
                Err(e) => return Outcome::failed("failed to resolve command", e),
            };

            let (program, args) = self.invocation(command);
            match self.runner.run(program, &args) {
                Ok(result) if result.success() => {
                    Outcome::done("ran").with_output(result.output.trim_end())
                }
                Ok(result) => {
                    let error = match result.code {
                        Some(code) => ExecutionError::CommandFailed(code),
                        None => ExecutionError::CommandKilled,
                    };
                    Outcome::failed("command failed", error).with_output(result.output.trim_end())
                }
                Err(e) => Outcome::failed(
                    "command failed",
                    ExecutionError::Spawn {
                        program: program.to_string(),
                        error: e.to_string(),
                    },
                ),
            }
        })
    }

    fn needs_sudo(&self) -> bool {
        self.sudo
    }
}

/// Accepts a command, a `{run, name?, creates?, if?, sudo?}` mapping, or a list of either
pub fn factory(args: &Yaml, runner: &Rc<dyn CommandRunner>) -> FactoryResult<Vec<Box<dyn Task>>> {
    one_or_many(args)
        .into_iter()
        .map(|item| build_one(item, runner).map(|task| Box::new(task) as Box<dyn Task>))
        .collect()
}

fn build_one(item: &Yaml, runner: &Rc<dyn CommandRunner>) -> FactoryResult<ShellCommand> {
    if let Yaml::String(_) = item {
        return Ok(ShellCommand::new(string_arg(item, "command")?, runner.clone()));
    }
    if !item.is_mapping() {
        return Err(FactoryError::InvalidArgs(
            "expected a command or a mapping with `run`".to_string(),
        ));
    }

    let fields: ShellArgs = serde_yaml::from_value(item.clone())?;
    let mut task = ShellCommand::new(string_arg(&fields.run, "run")?, runner.clone()).sudo(fields.sudo);

    if let Some(name) = fields.name {
        task = task.named(name);
    }
    if let Some(creates) = &fields.creates {
        task = task.creates(string_arg(creates, "creates")?);
    }
    if let Some(condition) = fields.condition {
        task = task.only_if(Value::new(condition)?);
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::command::CommandOutput;
    use crate::runner::task::Status;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    /// Records invocations and replies with a canned result
    struct FakeRunner {
        calls: RefCell<Vec<(String, Vec<String>)>>,
        reply: Option<CommandOutput>,
    }

    impl FakeRunner {
        fn replying(code: i32, output: &str) -> Rc<Self> {
            Self::exiting(Some(code), output)
        }

        fn exiting(code: Option<i32>, output: &str) -> Rc<Self> {
            Rc::new(FakeRunner {
                calls: RefCell::new(Vec::new()),
                reply: Some(CommandOutput {
                    code,
                    output: output.to_string(),
                }),
            })
        }

        fn missing() -> Rc<Self> {
            Rc::new(FakeRunner {
                calls: RefCell::new(Vec::new()),
                reply: None,
            })
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));
            self.reply
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
        }

        fn run_interactive(&self, _program: &str, _args: &[String]) -> io::Result<bool> {
            Ok(true)
        }
    }

    fn build(yaml: &str, runner: Rc<FakeRunner>) -> Vec<Box<dyn Task>> {
        let args: Yaml = serde_yaml::from_str(yaml).unwrap();
        let runner: Rc<dyn CommandRunner> = runner;
        factory(&args, &runner).unwrap()
    }

    fn ctx() -> Context {
        let mut vars = HashMap::new();
        vars.insert("editor".to_string(), Yaml::from("nvim"));
        vars.insert("work".to_string(), Yaml::Bool(false));
        Context::with_platform("arch", "x86_64").with_vars(vars)
    }

    #[test]
    fn test_runs_through_sh() {
        let runner = FakeRunner::replying(0, "hello\n");
        let tasks = build("echo ${ vars.editor }", runner.clone());

        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Done);
        assert_eq!(outcome.output(), "hello");
        assert_eq!(tasks[0].name(), "shell.run echo ${ vars.editor }");

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].0, "sh");
        assert_eq!(calls[0].1, vec!["-c".to_string(), "echo nvim".to_string()]);
    }

    #[test]
    fn test_non_zero_exit_fails() {
        let runner = FakeRunner::replying(2, "oops");
        let tasks = build("exit 2", runner);

        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Failed);
        assert_eq!(outcome.output(), "oops");
        assert_eq!(
            outcome.error().unwrap().to_string(),
            "command exited with code 2"
        );
    }

    #[test]
    fn test_signal_exit_fails() {
        let tasks = build("sleep 100", FakeRunner::exiting(None, ""));

        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Failed);
        assert_eq!(
            outcome.error().unwrap().to_string(),
            "command was terminated by a signal"
        );
    }

    #[test]
    fn test_spawn_error_fails() {
        let tasks = build("make", FakeRunner::missing());
        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Failed);
        assert!(outcome.error().unwrap().to_string().contains("failed to start 'sh'"));
    }

    #[test]
    fn test_if_false_skips_without_running() {
        let runner = FakeRunner::replying(0, "");
        let tasks = build("{run: make, if: '${ vars.work }'}", runner.clone());

        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Skipped);
        assert_eq!(outcome.message(), "condition not met: if");
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_if_non_bool_fails() {
        let runner = FakeRunner::replying(0, "");
        let tasks = build("{run: make, if: '${ vars.editor }'}", runner.clone());

        let outcome = tasks[0].run(&ctx());
        assert_eq!(outcome.status(), Status::Failed);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_creates_skips() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let marker = temp_dir.path().join("done");
        std::fs::write(&marker, "").unwrap();

        let runner = FakeRunner::replying(0, "");
        let yaml = format!("{{run: make, creates: '{}'}}", marker.display());
        let tasks = build(&yaml, runner.clone());

        assert_eq!(tasks[0].run(&ctx()).status(), Status::Skipped);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_sudo_and_name() {
        let runner = FakeRunner::replying(0, "");
        let tasks = build("{run: pacman -Syu, name: update, sudo: true}", runner.clone());

        assert_eq!(tasks[0].name(), "update");
        assert!(tasks[0].needs_sudo());
        tasks[0].run(&ctx());

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].0, "sudo");
        assert_eq!(calls[0].1[..2], ["sh".to_string(), "-c".to_string()]);
    }

    #[test]
    fn test_factory_rejects_bad_args() {
        let runner: Rc<dyn CommandRunner> = FakeRunner::replying(0, "");
        assert!(factory(&Yaml::Null, &runner).is_err());
        assert!(factory(&serde_yaml::from_str::<Yaml>("{name: x}").unwrap(), &runner).is_err());
        assert!(factory(&serde_yaml::from_str::<Yaml>("{run: x, unknown: 1}").unwrap(), &runner).is_err());
        assert!(factory(&Yaml::from("echo ${ nope_nope }"), &runner).is_err());
    }
}
