// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by xfail.

use camino::Utf8PathBuf;
use std::{error::Error, fmt};
use thiserror::Error;

/// An error that occurred while loading a configuration document.
///
/// Loading errors are fatal: a ledger that cannot be read cannot be trusted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    /// The configuration document does not exist.
    #[error("config file `{path}` not found")]
    NotFound {
        /// The path that was looked up.
        path: Utf8PathBuf,
    },

    /// The configuration document exists but could not be read.
    #[error("failed to read config file `{path}`")]
    Read {
        /// The path that failed to be read.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The configuration document is structurally invalid.
    ///
    /// This covers malformed JSON, missing required fields, values of the wrong type, unknown
    /// stage names, and duplicate test cases in the expected-failure ledger.
    #[error("failed to parse config file `{path}`")]
    Parse {
        /// The path that failed to parse.
        path: Utf8PathBuf,

        /// The underlying error, along with the path to the offending value within the document.
        #[source]
        error: Box<serde_path_to_error::Error<serde_json::Error>>,
    },
}

impl ConfigLoadError {
    /// Returns the path of the configuration document this error is for.
    pub fn config_file(&self) -> &Utf8PathBuf {
        match self {
            Self::NotFound { path } | Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

/// An error that occurred while writing a configuration document.
///
/// Writes are atomic: if this error is returned, the previous contents of the document (if any)
/// are left untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigWriteError {
    /// The directory containing the configuration document could not be created.
    #[error("failed to create directory `{path}`")]
    CreateDir {
        /// The directory that failed to be created.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize config for `{path}`")]
    Serialize {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying serialization error.
        #[source]
        error: serde_json::Error,
    },

    /// The configuration document could not be written.
    #[error("failed to write config file `{path}`")]
    Write {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },
}

/// An error that occurred while reading a run-outcome log.
#[derive(Debug, Error)]
#[error("failed to read outcome log `{path}`")]
pub struct OutcomeLogReadError {
    path: Utf8PathBuf,
    #[source]
    error: std::io::Error,
}

impl OutcomeLogReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: std::io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Returns the path of the outcome log.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// A single record in a run-outcome log could not be understood.
///
/// Malformed records are skipped: a corrupted line never aborts the rest of the log.
#[derive(Debug, Error)]
#[error("malformed outcome record on line {line_number}")]
pub struct MalformedOutcomeRecord {
    line_number: usize,
    #[source]
    error: serde_json::Error,
}

impl MalformedOutcomeRecord {
    pub(crate) fn new(line_number: usize, error: serde_json::Error) -> Self {
        Self { line_number, error }
    }

    /// Returns the 1-based line number of the record.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// An error that occurred while writing a run-outcome log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutcomeLogWriteError {
    /// A record could not be serialized.
    #[error("failed to serialize outcome record")]
    Serialize(#[source] serde_json::Error),

    /// The log could not be written.
    #[error("failed to write outcome log `{path}`")]
    Write {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },
}

/// An error that occurred while discovering test cases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoverError {
    /// The suite root could not be read.
    #[error("failed to read test suite directory `{path}`")]
    ReadDir {
        /// The directory that failed to be read.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// A test's data flagfile exists but could not be read.
    #[error("failed to read data flagfile `{path}`")]
    ReadFlagfile {
        /// The flagfile that failed to be read.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while running a test suite against a configuration.
///
/// Failures of the tools being driven are not errors: they are recorded as outcomes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// A working directory could not be created.
    #[error("failed to create working directory `{path}`")]
    CreateWorkDir {
        /// The directory that failed to be created.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// A temporary working directory could not be created.
    #[error("failed to create temporary working directory")]
    CreateTempDir(#[source] std::io::Error),

    /// The reporter failed to write to its output.
    #[error("error writing to reporter output")]
    ReporterIo(#[source] std::io::Error),
}

/// An error that occurred while writing a JUnit report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JunitWriteError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path `{file}`")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to `{file}`")]
    Serialize {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// Displays an error along with its chain of sources on a single line, separated by `: `.
///
/// Used for outcome messages and report fields, where multi-line output is unwelcome.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        let mut source = self.error.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
