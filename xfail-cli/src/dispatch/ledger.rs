// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `reconcile` and `apply` commands.

use super::common::{BaseDir, ContextOpts};
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::Args;
use tracing::{info, warn};
use xfail_metadata::XfailExitCode;
use xfail_runner::{
    config::to_document_string,
    errors::{ConfigLoadError, DisplayErrorChain},
    helpers::plural,
    reconcile::XfailReconciler,
    reporter::ReporterBuilder,
    write_str::WriteStr,
};

#[derive(Debug, Args)]
pub(super) struct ReconcileOpts {
    /// The configuration document holding the current ledger
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    config_file: Utf8PathBuf,

    /// The run outcome log to reconcile against
    #[arg(long, value_name = "PATH")]
    outcomes: Utf8PathBuf,

    /// Where to write the updated document: a path, or `-` for standard output [default: -]
    #[arg(long, short = 'o', value_name = "PATH", conflicts_with = "write")]
    output: Option<Utf8PathBuf>,

    /// Save the updated document in place of the current one
    #[arg(long)]
    write: bool,

    #[clap(flatten)]
    context: ContextOpts,
}

impl ReconcileOpts {
    pub(super) fn exec(
        self,
        base_dir: &BaseDir,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let store = base_dir.config_store();
        let config = store.load(&self.config_file)?;
        let outcomes = base_dir.collector().collect_path(&self.outcomes)?;

        let reconciler = XfailReconciler::new(self.context.context_for(&config.config_name));
        let result = reconciler.reconcile(&config.expected_failures, &outcomes);

        let mut reporter_builder = ReporterBuilder::default();
        reporter_builder
            .set_colorize(output.color.should_colorize(supports_color::Stream::Stderr))
            .set_verbose(output.verbose);
        {
            let mut stderr = output_writer.stderr_writer();
            reporter_builder.build().write_reconcile_summary(
                &config.config_name,
                &result,
                &mut stderr,
            )?;
            stderr.write_str_flush()?;
        }

        let new_config = result.apply_to(&config);
        if self.write {
            if result.is_up_to_date() {
                info!("`{}` is already up to date", store.resolve(&self.config_file));
            } else {
                store.save(&self.config_file, &new_config)?;
                info!("updated ledger in `{}`", store.resolve(&self.config_file));
            }
        } else {
            match &self.output {
                Some(path) if path.as_str() != "-" => {
                    store.save(path, &new_config)?;
                    info!("wrote updated config to `{}`", store.resolve(path));
                }
                _ => {
                    let document = to_document_string(&new_config).map_err(|err| {
                        ExpectedError::serialize_error("configuration document", err)
                    })?;
                    let mut stdout = output_writer.stdout_writer();
                    stdout.write_str(&document)?;
                    stdout.write_str_flush()?;
                }
            }
        }

        if result.is_up_to_date() {
            Ok(XfailExitCode::OK)
        } else {
            Ok(XfailExitCode::LEDGER_OUT_OF_DATE)
        }
    }
}

#[derive(Debug, Args)]
pub(super) struct ApplyOpts {
    /// The new configuration document
    #[arg(value_name = "NEW_DOC")]
    new_doc: Utf8PathBuf,

    /// The configuration document to replace
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    config_file: Utf8PathBuf,
}

impl ApplyOpts {
    pub(super) fn exec(self, base_dir: &BaseDir) -> Result<i32> {
        let store = base_dir.config_store();
        let new_config = store.load(&self.new_doc)?;

        match store.load(&self.config_file) {
            Ok(old_config) if old_config.config_name != new_config.config_name => {
                warn!(
                    "replacing config `{}` with config `{}`",
                    old_config.config_name, new_config.config_name,
                );
            }
            Ok(_) | Err(ConfigLoadError::NotFound { .. }) => {}
            Err(error) => {
                warn!("replacing unreadable config: {}", DisplayErrorChain::new(&error));
            }
        }

        store.save(&self.config_file, &new_config)?;
        let count = new_config.expected_failures.len();
        info!(
            "applied `{}` to `{}` ({count} {})",
            store.resolve(&self.new_doc),
            store.resolve(&self.config_file),
            plural::expected_failures_str(count),
        );
        Ok(XfailExitCode::OK)
    }
}
