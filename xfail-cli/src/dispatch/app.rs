// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use super::{
    common::BaseDir,
    ledger::{ApplyOpts, ReconcileOpts},
    list::ListOpts,
    run::RunOpts,
};
use crate::{
    Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use clap::{Parser, Subcommand};

/// Run a generated compiler test suite and keep expected-failure ledgers up to date.
///
/// Each target configuration document lists the flags to compile and run with, along with a
/// ledger of the test cases expected to fail and the stage they fail at.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "xfail",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct XfailApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl XfailApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let base_dir = BaseDir::current()?;
        self.exec_in(&base_dir, output, output_writer)
    }

    pub(super) fn exec_in(
        self,
        base_dir: &BaseDir,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        match self.command {
            Command::List(opts) => opts.exec(base_dir, output, output_writer),
            Command::Run(opts) => opts.exec(base_dir, output, output_writer),
            Command::Reconcile(opts) => opts.exec(base_dir, output, output_writer),
            Command::Apply(opts) => opts.exec(base_dir),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the test cases in a suite
    ///
    /// Test cases are the directories directly under the suite root that hold a `model.mlir` or
    /// `model.onnx` file. Test cases missing their data flagfile, or any file the flagfile
    /// references, are listed as incomplete.
    List(ListOpts),

    /// Run the test cases in a suite against target configurations
    ///
    /// Failures at the stage a configuration's ledger expects are reported as XFAIL and do not
    /// fail the run. A run outcome log is written for each configuration.
    Run(Box<RunOpts>),

    /// Compute an updated ledger from a run outcome log
    ///
    /// By default, the updated configuration document is written to standard output and a
    /// summary of the changes to standard error. Exits with code 20 if the ledger was out of date.
    Reconcile(ReconcileOpts),

    /// Validate a configuration document and save it in place of another
    Apply(ApplyOpts),
}
