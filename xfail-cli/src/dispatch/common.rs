// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Options and helpers shared between commands.

use crate::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::Args;
use xfail_runner::{collector::RunReportCollector, config::ConfigStore};

/// The directory relative paths on the command line are resolved against.
///
/// This is the only place the process's current directory is read.
#[derive(Clone, Debug)]
pub(super) struct BaseDir(Utf8PathBuf);

impl BaseDir {
    pub(super) fn current() -> Result<Self> {
        let dir = std::env::current_dir()
            .map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
        let dir = Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::CurrentDirInvalid {
            err: err.into_io_error(),
        })?;
        Ok(Self(dir))
    }

    #[cfg(test)]
    pub(super) fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self(dir.into())
    }

    pub(super) fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.0.join(path)
    }

    pub(super) fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.0.clone())
    }

    pub(super) fn collector(&self) -> RunReportCollector {
        RunReportCollector::new(self.0.clone())
    }
}

/// Options selecting target configuration documents.
#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
pub(super) struct ConfigFilesOpts {
    /// Target configuration documents to run against
    ///
    /// May be specified multiple times. When read from the environment, paths are separated by
    /// `;`.
    #[arg(
        long = "config",
        short = 'c',
        value_name = "PATH",
        env = "XFAIL_CONFIG_FILES",
        value_delimiter = ';',
        required = true
    )]
    pub(super) config_files: Vec<Utf8PathBuf>,
}

/// Options controlling the reasons recorded for ledger entries.
#[derive(Debug, Args)]
pub(super) struct ContextOpts {
    /// Text identifying this run in the reasons of added or updated ledger entries
    ///
    /// Defaults to today's date followed by the configuration name.
    #[arg(long, value_name = "TEXT", env = "XFAIL_CONTEXT")]
    pub(super) context: Option<String>,
}

impl ContextOpts {
    pub(super) fn context_for(&self, config_name: &str) -> String {
        match &self.context {
            Some(context) => context.clone(),
            None => format!("{} {config_name}", Local::now().format("%Y-%m-%d")),
        }
    }
}
