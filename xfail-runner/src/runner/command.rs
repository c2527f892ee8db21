// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::helpers::summarize_output;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    borrow::Cow,
    process::Output,
    time::{Duration, Instant},
};
use tracing::{debug, trace};
use xfail_metadata::Outcome;

/// A single invocation of an external tool for one stage of a test case.
#[derive(Clone, Debug)]
pub(super) struct StageCli<'a> {
    program: &'a str,
    args: Vec<Cow<'a, str>>,
    cwd: Option<Utf8PathBuf>,
}

impl<'a> StageCli<'a> {
    pub(super) fn new(program: &'a str) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd: None,
        }
    }

    pub(super) fn add_arg(&mut self, arg: impl Into<Cow<'a, str>>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub(super) fn add_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'a, str>>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(super) fn current_dir(&mut self, cwd: &Utf8Path) -> &mut Self {
        self.cwd = Some(cwd.to_owned());
        self
    }

    /// Returns the command line, quoted for a POSIX shell.
    pub(super) fn command_line(&self) -> String {
        shell_words::join(std::iter::once(self.program).chain(self.args.iter().map(|arg| &**arg)))
    }

    fn to_expression(&self) -> duct::Expression {
        let mut expression = duct::cmd(self.program, self.args.iter().map(|arg| &**arg));
        if let Some(cwd) = &self.cwd {
            expression = expression.dir(cwd.as_std_path());
        }
        expression.stdout_capture().stderr_capture().unchecked()
    }

    /// Runs the command to completion, or until `timeout` elapses.
    pub(super) fn execute(&self, timeout: Option<Duration>) -> StageExecution {
        trace!("executing: {}", self.command_line());
        let start = Instant::now();

        let handle = match self.to_expression().start() {
            Ok(handle) => handle,
            Err(error) => {
                debug!("failed to spawn `{}`: {error}", self.program);
                return StageExecution {
                    kind: StageExecutionKind::SpawnFailed(error),
                    time_taken: start.elapsed(),
                };
            }
        };

        let kind = match timeout {
            Some(timeout) => match handle.wait_timeout(timeout) {
                Ok(Some(output)) => StageExecutionKind::Exited(output.clone()),
                Ok(None) => {
                    if let Err(error) = handle.kill() {
                        debug!("failed to kill `{}` after timeout: {error}", self.program);
                    }
                    StageExecutionKind::TimedOut(timeout)
                }
                Err(error) => StageExecutionKind::WaitFailed(error),
            },
            None => match handle.wait() {
                Ok(output) => StageExecutionKind::Exited(output.clone()),
                Err(error) => StageExecutionKind::WaitFailed(error),
            },
        };

        StageExecution {
            kind,
            time_taken: start.elapsed(),
        }
    }
}

/// The result of running a [`StageCli`].
#[derive(Debug)]
pub(super) struct StageExecution {
    pub(super) kind: StageExecutionKind,
    pub(super) time_taken: Duration,
}

#[derive(Debug)]
pub(super) enum StageExecutionKind {
    Exited(Output),
    SpawnFailed(std::io::Error),
    WaitFailed(std::io::Error),
    TimedOut(Duration),
}

impl StageExecution {
    /// Returns the outcome of the stage along with a short message.
    pub(super) fn outcome(&self, program: &str) -> (Outcome, Option<String>) {
        match &self.kind {
            StageExecutionKind::Exited(output) if output.status.success() => {
                (Outcome::Passed, None)
            }
            StageExecutionKind::Exited(output) => {
                let status = match output.status.code() {
                    Some(code) => format!("`{program}` exited with code {code}"),
                    None => format!("`{program}` was terminated by a signal"),
                };
                let message = match summarize_output(&output.stderr) {
                    Some(diagnostics) => format!("{status}\n{diagnostics}"),
                    None => status,
                };
                (Outcome::Failed, Some(message))
            }
            StageExecutionKind::SpawnFailed(error) => (
                Outcome::Errored,
                Some(format!("failed to start `{program}`: {error}")),
            ),
            StageExecutionKind::WaitFailed(error) => (
                Outcome::Errored,
                Some(format!("failed to wait for `{program}`: {error}")),
            ),
            StageExecutionKind::TimedOut(timeout) => (
                Outcome::Errored,
                Some(format!(
                    "`{program}` timed out after {}",
                    humantime::format_duration(*timeout)
                )),
            ),
        }
    }

    /// Returns the captured standard output and standard error, if the process exited.
    pub(super) fn output(&self) -> Option<&Output> {
        match &self.kind {
            StageExecutionKind::Exited(output) => Some(output),
            _ => None,
        }
    }
}
