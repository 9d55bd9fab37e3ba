//! Process execution for vendor tools.
//!
//! Everything that talks to a RAID controller, the BMC or the inspection
//! service goes through an [Executor], so the parsers can be driven by
//! canned output under test.

use slog::{debug, info, Logger};
use std::process::{Command, Output};
use std::str::from_utf8;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shell used for vendor command lines, which are pipelines (`... | grep`).
pub const SHELL: &str = "/bin/sh";

#[derive(Debug)]
pub struct CommandFailureInfo {
    pub command: String,
    pub status:  String,
    pub stdout:  String,
    pub stderr:  String,
}

impl std::fmt::Display for CommandFailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Command [{}] executed and failed with status: {}",
            self.command, self.status
        )?;
        write!(f, "  stdout: {}", self.stdout)?;
        write!(f, "  stderr: {}", self.stderr)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start execution of [{command}]: {err}")]
    ExecutionStart { command: String, err: std::io::Error },

    #[error("{0}")]
    CommandFailure(Box<CommandFailureInfo>),
}

/// Build a `sh -c <line>` command for a vendor pipeline.
pub fn shell(line: &str) -> Command {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(line);
    cmd
}

/// Render a command the way an operator would type it. Shell pipelines are
/// shown as the script itself.
pub fn command_to_string(command: &Command) -> String {
    let args: Vec<String> = command
        .get_args()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    if command.get_program() == SHELL && args.len() == 2 && args[0] == "-c" {
        return args[1].clone();
    }
    std::iter::once(command.get_program().to_string_lossy().into_owned())
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stdout of a finished command as text.
pub fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn log_input(log: &Logger, id: u64, command: &str) {
    info!(log, "running command via executor"; "id" => id, "command" => command);
}

fn log_output(log: &Logger, id: u64, output: &Output) {
    info!(
        log,
        "finished running command via executor";
        "id" => id,
        "result" => if output.status.success() { "OK" } else { "ERROR" },
        "status" => output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string()),
    );
    if !output.stdout.is_empty() {
        debug!(
            log,
            "finished command stdout";
            "id" => id,
            "stdout" => from_utf8(&output.stdout).unwrap_or("<Not valid UTF-8>"),
        );
    }
    if !output.stderr.is_empty() {
        debug!(
            log,
            "finished command stderr";
            "id" => id,
            "stderr" => from_utf8(&output.stderr).unwrap_or("<Not valid UTF-8>"),
        );
    }
}

fn output_to_exec_error(command: String, output: &Output) -> ExecutionError {
    ExecutionError::CommandFailure(Box::new(CommandFailureInfo {
        command,
        status: output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }))
}

pub type BoxedExecutor = Arc<dyn Executor>;

/// Runs a [Command] to completion and returns its output.
///
/// - In production this is a [HostExecutor].
/// - Under test, `fake::FakeExecutor` answers from a scripted handler.
pub trait Executor: Send + Sync {
    /// Run the command, blocking until it exits. A non-zero exit status is
    /// an error.
    fn execute(&self, command: &mut Command) -> Result<Output, ExecutionError>;
}

/// Executes commands on the running host.
pub struct HostExecutor {
    log:     Logger,
    counter: AtomicU64,
}

impl HostExecutor {
    pub fn new(log: Logger) -> Arc<Self> {
        Arc::new(Self { log, counter: AtomicU64::new(0) })
    }

    pub fn as_executor(self: Arc<Self>) -> BoxedExecutor {
        self
    }
}

impl Executor for HostExecutor {
    fn execute(&self, command: &mut Command) -> Result<Output, ExecutionError> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let rendered = command_to_string(command);
        log_input(&self.log, id, &rendered);

        let output = command.output().map_err(|err| {
            ExecutionError::ExecutionStart { command: rendered.clone(), err }
        })?;
        log_output(&self.log, id, &output);

        if !output.status.success() {
            return Err(output_to_exec_error(rendered, &output));
        }
        Ok(output)
    }
}
