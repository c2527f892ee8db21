// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::common::{BaseDir, ConfigFilesOpts, ContextOpts};
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use std::{collections::HashMap, time::Duration};
use tracing::info;
use xfail_metadata::XfailExitCode;
use xfail_runner::{
    collector::{CollectedOutcomes, write_outcome_log},
    config::TargetConfig,
    helpers::plural,
    reconcile::XfailReconciler,
    registry::TestCaseRegistry,
    reporter::{JunitReport, ReporterBuilder},
    runner::{TestRunnerBuilder, ToolPaths},
    write_str::WriteStr,
};

#[derive(Debug, Args)]
pub(super) struct RunOpts {
    /// The root directory of the test suite
    #[arg(value_name = "SUITE_ROOT")]
    suite_root: Utf8PathBuf,

    #[clap(flatten)]
    pub(super) configs: ConfigFilesOpts,

    #[clap(flatten)]
    tools: ToolOpts,

    /// Per-stage timeout, for example `90s` or `5m`
    ///
    /// A stage that runs past the timeout is killed and recorded as errored.
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Runner options"
    )]
    pub(super) timeout: Option<Duration>,

    /// Directory for compiled artifacts [default: a temporary directory]
    #[arg(long, value_name = "DIR", help_heading = "Runner options")]
    work_dir: Option<Utf8PathBuf>,

    /// Directory to write run outcome logs to, one per configuration
    #[arg(
        long,
        value_name = "DIR",
        default_value = "xfail-out",
        help_heading = "Output options"
    )]
    out_dir: Utf8PathBuf,

    /// Also write a JUnit XML report to this path
    #[arg(long, value_name = "PATH", help_heading = "Output options")]
    junit: Option<Utf8PathBuf>,

    /// Reconcile each configuration's ledger against the run, and save it in place
    #[arg(long, help_heading = "Ledger options")]
    update_ledger: bool,

    #[clap(flatten)]
    context: ContextOpts,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Tool options")]
struct ToolOpts {
    /// The ONNX importer, used for the import stage
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "XFAIL_IMPORTER",
        default_value = ToolPaths::DEFAULT_IMPORTER
    )]
    importer: String,

    /// The compiler, used for the compile stage
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "XFAIL_COMPILER",
        default_value = ToolPaths::DEFAULT_COMPILER
    )]
    compiler: String,

    /// The runtime, used for the run stage
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "XFAIL_RUNTIME",
        default_value = ToolPaths::DEFAULT_RUNTIME
    )]
    runtime: String,
}

impl ToolOpts {
    fn to_tool_paths(&self) -> ToolPaths {
        ToolPaths {
            importer: self.importer.clone(),
            compiler: self.compiler.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl RunOpts {
    pub(super) fn exec(
        self,
        base_dir: &BaseDir,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let suite_root = base_dir.resolve(&self.suite_root);
        let registry = TestCaseRegistry::discover(suite_root.clone())?;
        if registry.is_empty() {
            return Err(ExpectedError::NoTestsFound { suite_root });
        }

        // Load every configuration before running anything.
        let store = base_dir.config_store();
        let configs = self
            .configs
            .config_files
            .iter()
            .map(|path| -> Result<_> { Ok((path.as_path(), store.load(path)?)) })
            .collect::<Result<Vec<(&Utf8Path, TargetConfig)>>>()?;

        // Outputs are named after the configuration, so names must be unique.
        let mut seen = HashMap::new();
        for (path, config) in &configs {
            if let Some(first_path) = seen.insert(config.config_name.as_str(), *path) {
                return Err(ExpectedError::DuplicateConfigName {
                    config_name: config.config_name.clone(),
                    first_path: store.resolve(first_path),
                    second_path: store.resolve(path),
                });
            }
        }

        let out_dir = base_dir.resolve(&self.out_dir);
        std::fs::create_dir_all(&out_dir).map_err(|err| ExpectedError::OutDirCreateError {
            out_dir: out_dir.clone(),
            err,
        })?;

        let mut runner_builder = TestRunnerBuilder::default();
        runner_builder.set_tools(self.tools.to_tool_paths());
        if let Some(timeout) = self.timeout {
            runner_builder.set_timeout(timeout);
        }
        if let Some(work_dir) = &self.work_dir {
            runner_builder.set_work_dir(base_dir.resolve(work_dir));
        }
        let runner = runner_builder.build(&registry);

        let mut reporter_builder = ReporterBuilder::default();
        reporter_builder
            .set_colorize(output.color.should_colorize(supports_color::Stream::Stderr))
            .set_verbose(output.verbose);
        let reporter = reporter_builder.build();

        let mut junit = self.junit.as_ref().map(|_| JunitReport::new("xfail-run"));
        let mut any_failed = false;
        let mut writer = output_writer.stderr_writer();

        for (path, config) in &configs {
            reporter.write_run_started(&config.config_name, registry.len(), &mut writer)?;
            let summary = runner.execute(config, |result| {
                reporter.write_test_finished(&config.config_name, result, &mut writer)
            })?;
            reporter.write_run_summary(&summary, &mut writer)?;
            any_failed |= !summary.stats.is_success();

            let log_path = out_dir.join(format!("{}.jsonl", config.config_name));
            write_outcome_log(&log_path, summary.records()).map_err(|err| {
                ExpectedError::OutcomeLogWriteError {
                    path: log_path.clone(),
                    err,
                }
            })?;

            if let Some(junit) = &mut junit {
                junit.add_run(&summary);
            }

            if self.update_ledger {
                let outcomes = CollectedOutcomes::from_records(summary.records().cloned());
                let reconciler =
                    XfailReconciler::new(self.context.context_for(&config.config_name));
                let result = reconciler.reconcile(&config.expected_failures, &outcomes);
                reporter.write_reconcile_summary(&config.config_name, &result, &mut writer)?;
                writer.write_str_flush()?;

                if !result.is_up_to_date() {
                    store.save(path, &result.apply_to(config))?;
                    info!("updated ledger in `{}`", store.resolve(path));
                }
            }

            writer.write_str_flush()?;
            info!("wrote outcome log to `{log_path}`");
        }

        if let (Some(junit), Some(junit_path)) = (&junit, &self.junit) {
            let junit_path = base_dir.resolve(junit_path);
            junit.write_to_path(&junit_path)?;
            info!("wrote JUnit report to `{junit_path}`");
        }

        if configs.len() > 1 {
            info!(
                "ran {} {} against {} {}",
                registry.len(),
                plural::tests_str(registry.len()),
                configs.len(),
                plural::configs_str(configs.len()),
            );
        }

        if any_failed {
            Err(ExpectedError::TestRunFailed)
        } else {
            Ok(XfailExitCode::OK)
        }
    }
}
