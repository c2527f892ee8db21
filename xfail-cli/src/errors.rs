// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use xfail_metadata::XfailExitCode;
use xfail_runner::errors::*;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected error: one caused by the environment or by user input rather than a bug in xfail.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("test suite discovery failed")]
    DiscoverError {
        #[from]
        err: DiscoverError,
    },
    #[error("no test cases found")]
    NoTestsFound { suite_root: Utf8PathBuf },
    #[error("duplicate config name")]
    DuplicateConfigName {
        config_name: String,
        first_path: Utf8PathBuf,
        second_path: Utf8PathBuf,
    },
    #[error("config load error")]
    ConfigLoadError {
        #[from]
        err: ConfigLoadError,
    },
    #[error("config write error")]
    ConfigWriteError {
        #[from]
        err: ConfigWriteError,
    },
    #[error("outcome log read error")]
    OutcomeLogReadError {
        #[from]
        err: OutcomeLogReadError,
    },
    #[error("outcome log write error")]
    OutcomeLogWriteError {
        path: Utf8PathBuf,
        #[source]
        err: OutcomeLogWriteError,
    },
    #[error("output directory create error")]
    OutDirCreateError {
        out_dir: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("test run error")]
    RunError {
        #[from]
        err: RunError,
    },
    #[error("JUnit write error")]
    JunitWriteError {
        #[from]
        err: JunitWriteError,
    },
    #[error("serialization error")]
    SerializeError {
        what: &'static str,
        #[source]
        err: serde_json::Error,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[from]
        err: std::io::Error,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn serialize_error(what: &'static str, err: serde_json::Error) -> Self {
        Self::SerializeError { what, err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::DiscoverError { .. }
            | Self::DuplicateConfigName { .. } => XfailExitCode::SETUP_ERROR,
            Self::RunError { err } => match err {
                RunError::ReporterIo(_) => XfailExitCode::WRITE_OUTPUT_ERROR,
                _ => XfailExitCode::SETUP_ERROR,
            },
            Self::NoTestsFound { .. } => XfailExitCode::NO_TESTS_FOUND,
            Self::ConfigLoadError { .. } => XfailExitCode::CONFIG_LOAD_FAILED,
            Self::ConfigWriteError { .. } => XfailExitCode::CONFIG_WRITE_FAILED,
            Self::OutcomeLogReadError { .. } => XfailExitCode::OUTCOME_LOG_READ_FAILED,
            Self::OutcomeLogWriteError { .. }
            | Self::OutDirCreateError { .. }
            | Self::JunitWriteError { .. }
            | Self::SerializeError { .. }
            | Self::WriteOutputError { .. } => XfailExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed => XfailExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr, followed by its chain of causes.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirInvalid { err } => {
                error!("current directory is invalid");
                Some(err as &dyn Error)
            }
            Self::DiscoverError { err } => {
                error!("{err}");
                err.source()
            }
            Self::NoTestsFound { suite_root } => {
                error!(
                    "no test cases found under `{}`",
                    suite_root.style(styles.bold)
                );
                None
            }
            Self::DuplicateConfigName {
                config_name,
                first_path,
                second_path,
            } => {
                error!(
                    "config name `{}` is used by both `{}` and `{}`",
                    config_name.style(styles.bold),
                    first_path.style(styles.bold),
                    second_path.style(styles.bold),
                );
                None
            }
            Self::ConfigLoadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::ConfigWriteError { err } => {
                error!("{err}");
                err.source()
            }
            Self::OutcomeLogReadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::OutcomeLogWriteError { path, err } => {
                error!(
                    "failed to write outcome log to `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::OutDirCreateError { out_dir, err } => {
                error!(
                    "failed to create output directory `{}`",
                    out_dir.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::RunError { err } => {
                error!("{err}");
                err.source()
            }
            Self::JunitWriteError { err } => {
                error!("{err}");
                err.source()
            }
            Self::SerializeError { what, err } => {
                error!("failed to serialize {what}");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
