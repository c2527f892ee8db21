// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The driver: runs discovered test cases through the external toolchain.
//!
//! For each test case, stages are run in pipeline order: import (for ONNX models only), compile,
//! then run. A stage whose tool exits non-zero is *failed*; one whose tool cannot be started or
//! runs past the timeout is *errored*. Later stages are not attempted after a failure.
//!
//! The outcome of each test is gated against the configuration's expected-failure ledger, see
//! [`TestStatus`].

mod command;

use self::command::StageCli;
use crate::{
    config::TargetConfig,
    errors::RunError,
    registry::{ModelKind, TestCase, TestCaseRegistry},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset, Local};
use itertools::Itertools;
use std::{fmt, time::Duration, time::Instant};
use tracing::{debug, warn};
use xfail_metadata::{Outcome, OutcomeRecord, Stage, TestCaseName};

/// The external tools invoked for each stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolPaths {
    /// The ONNX importer, used for the import stage.
    pub importer: String,

    /// The compiler, used for the compile stage.
    pub compiler: String,

    /// The runtime, used for the run stage.
    pub runtime: String,
}

impl ToolPaths {
    /// The default importer.
    pub const DEFAULT_IMPORTER: &'static str = "iree-import-onnx";

    /// The default compiler.
    pub const DEFAULT_COMPILER: &'static str = "iree-compile";

    /// The default runtime.
    pub const DEFAULT_RUNTIME: &'static str = "iree-run-module";
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            importer: Self::DEFAULT_IMPORTER.to_owned(),
            compiler: Self::DEFAULT_COMPILER.to_owned(),
            runtime: Self::DEFAULT_RUNTIME.to_owned(),
        }
    }
}

/// Builder for a [`TestRunner`].
#[derive(Clone, Debug, Default)]
pub struct TestRunnerBuilder {
    tools: ToolPaths,
    timeout: Option<Duration>,
    work_dir: Option<Utf8PathBuf>,
}

impl TestRunnerBuilder {
    /// Sets the external tools to invoke.
    pub fn set_tools(&mut self, tools: ToolPaths) -> &mut Self {
        self.tools = tools;
        self
    }

    /// Sets the per-stage timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the directory that compiled artifacts are written to.
    ///
    /// Each configuration gets its own subdirectory. If unset, a temporary directory is used and
    /// removed after the run.
    pub fn set_work_dir(&mut self, work_dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Creates a new runner for the test cases in `registry`.
    pub fn build(self, registry: &TestCaseRegistry) -> TestRunner<'_> {
        TestRunner {
            registry,
            tools: self.tools,
            timeout: self.timeout,
            work_dir: self.work_dir,
        }
    }
}

/// Runs the test cases in a registry against target configurations.
#[derive(Debug)]
pub struct TestRunner<'a> {
    registry: &'a TestCaseRegistry,
    tools: ToolPaths,
    timeout: Option<Duration>,
    work_dir: Option<Utf8PathBuf>,
}

impl<'a> TestRunner<'a> {
    /// Runs every test case against `config`.
    ///
    /// The callback is called with the result of each test as it finishes. If the callback
    /// returns an error, the run is stopped and the error is returned.
    pub fn execute<F>(&self, config: &TargetConfig, mut callback: F) -> Result<RunSummary, RunError>
    where
        F: FnMut(&TestRunResult) -> std::io::Result<()>,
    {
        let start_time = Local::now().fixed_offset();
        let start = Instant::now();

        // Keep the temporary directory alive until the run is done.
        let (_temp_dir, work_dir) = self.create_work_dir(&config.config_name)?;
        debug!(
            "running {} test cases against `{}` in `{work_dir}`",
            self.registry.len(),
            config.config_name,
        );

        let mut stats = RunStats::default();
        let mut results = Vec::with_capacity(self.registry.len());
        for test_case in self.registry.iter() {
            let result = self.run_test(config, test_case, &work_dir)?;
            stats.on_test_finished(&result.status);
            callback(&result).map_err(RunError::ReporterIo)?;
            results.push(result);
        }

        Ok(RunSummary {
            config_name: config.config_name.clone(),
            results,
            stats,
            start_time,
            elapsed: start.elapsed(),
        })
    }

    fn create_work_dir(
        &self,
        config_name: &str,
    ) -> Result<(Option<camino_tempfile::Utf8TempDir>, Utf8PathBuf), RunError> {
        match &self.work_dir {
            Some(work_dir) => {
                let dir = work_dir.join(config_name);
                std::fs::create_dir_all(&dir).map_err(|error| RunError::CreateWorkDir {
                    path: dir.clone(),
                    error,
                })?;
                // The run stage changes directories, so artifact paths must be absolute.
                let dir = dir
                    .canonicalize_utf8()
                    .map_err(|error| RunError::CreateWorkDir { path: dir, error })?;
                Ok((None, dir))
            }
            None => {
                let temp_dir = camino_tempfile::Builder::new()
                    .prefix("xfail-")
                    .tempdir()
                    .map_err(RunError::CreateTempDir)?;
                let dir = temp_dir.path().to_owned();
                Ok((Some(temp_dir), dir))
            }
        }
    }

    fn run_test(
        &self,
        config: &TargetConfig,
        test_case: &TestCase,
        work_dir: &Utf8Path,
    ) -> Result<TestRunResult, RunError> {
        let name = test_case.name();
        let expected = config.expected_failures.stage_of(name.as_str());
        let start_time = Local::now().fixed_offset();
        let start = Instant::now();
        let mut records = Vec::new();
        let mut stages = Vec::new();

        if !test_case.is_complete() {
            let missing = test_case.missing().iter().join(", ");
            warn!("skipping `{name}`: missing required files: {missing}");
            records.push(
                OutcomeRecord::new(name.clone(), test_case.first_stage(), Outcome::Skipped)
                    .with_message(format!("missing required files: {missing}")),
            );
        } else if config.skip_compile_tests.contains(name) {
            records.push(
                OutcomeRecord::new(name.clone(), test_case.first_stage(), Outcome::Skipped)
                    .with_message("listed in skip_compile_tests"),
            );
        } else {
            let test_work_dir = work_dir.join(name.as_str());
            std::fs::create_dir_all(&test_work_dir).map_err(|error| RunError::CreateWorkDir {
                path: test_work_dir.clone(),
                error,
            })?;

            let mut all_passed = true;
            for (stage, program, cli) in self.plan(config, test_case, &test_work_dir) {
                let execution = cli.execute(self.timeout);
                let (outcome, message) = execution.outcome(program);
                debug!("{name}: {stage} {outcome} in {:?}", execution.time_taken);

                let mut record = OutcomeRecord::new(name.clone(), stage, outcome);
                record.message = message;
                records.push(record);

                let output = execution.output();
                stages.push(StageReport {
                    stage,
                    outcome,
                    command_line: cli.command_line(),
                    time_taken: execution.time_taken,
                    stdout: output.map(|o| String::from_utf8_lossy(&o.stdout).into_owned()),
                    stderr: output.map(|o| String::from_utf8_lossy(&o.stderr).into_owned()),
                });

                if outcome.is_failure() {
                    all_passed = false;
                    break;
                }
            }

            if all_passed && config.skip_run_tests.contains(name) {
                records.push(
                    OutcomeRecord::new(name.clone(), Stage::Run, Outcome::Skipped)
                        .with_message("listed in skip_run_tests"),
                );
            }
        }

        let status = TestStatus::from_records(&records, expected);
        Ok(TestRunResult {
            test_case: name.clone(),
            expected,
            records,
            stages,
            status,
            start_time,
            time_taken: start.elapsed(),
        })
    }

    fn plan<'b>(
        &'b self,
        config: &'b TargetConfig,
        test_case: &TestCase,
        test_work_dir: &Utf8Path,
    ) -> Vec<(Stage, &'b str, StageCli<'b>)> {
        let mut plan = Vec::with_capacity(3);

        let mlir_path = match test_case.model_kind() {
            ModelKind::Mlir => test_case.model_path(),
            ModelKind::Onnx => {
                let mlir_path = test_work_dir.join("model.mlir");
                let mut import = StageCli::new(&self.tools.importer);
                import
                    .add_arg(test_case.model_path().into_string())
                    .add_arg("-o")
                    .add_arg(mlir_path.to_string());
                plan.push((Stage::Import, self.tools.importer.as_str(), import));
                mlir_path
            }
        };

        let module_path = test_work_dir.join(format!("model_{}.vmfb", config.config_name));
        let mut compile = StageCli::new(&self.tools.compiler);
        compile
            .add_arg(mlir_path.into_string())
            .add_arg("-o")
            .add_arg(module_path.to_string())
            .add_args(config.compile_flags.iter().map(String::as_str));
        plan.push((Stage::Compile, self.tools.compiler.as_str(), compile));

        if !config.skip_run_tests.contains(test_case.name()) {
            let mut run = StageCli::new(&self.tools.runtime);
            run.add_arg(format!("--module={module_path}"))
                .add_arg(format!("--flagfile={}", crate::registry::DATA_FLAGFILE_NAME))
                .add_args(config.run_flags.iter().map(String::as_str))
                .current_dir(test_case.dir());
            plan.push((Stage::Run, self.tools.runtime.as_str(), run));
        }

        plan
    }
}

/// The gated status of a test case: its outcome, judged against the expected-failure ledger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestStatus {
    /// Every attempted stage passed, and no failure was expected.
    Passed,

    /// The test failed where no failure was expected.
    ///
    /// This is the only status that fails a run.
    Failed {
        /// The stage the test failed at.
        stage: Stage,

        /// The stage a failure was expected at, if any.
        expected: Option<Stage>,
    },

    /// The test failed at the stage the ledger expects.
    ExpectedFailure {
        /// The stage the test failed at.
        stage: Stage,
    },

    /// The ledger expects a failure at a stage that passed, or at a stage the test does not
    /// go through.
    UnexpectedPass {
        /// The stage a failure was expected at.
        expected: Stage,
    },

    /// The test, or part of it, was skipped.
    Skipped {
        /// The first skipped stage.
        stage: Stage,
    },
}

impl TestStatus {
    /// Gates the records for a single test case against the stage the ledger expects a failure
    /// at, if any.
    ///
    /// `records` must all be for the same test case.
    pub fn from_records(records: &[OutcomeRecord], expected: Option<Stage>) -> Self {
        let first_failure = records
            .iter()
            .filter(|record| record.outcome.is_failure())
            .map(|record| record.stage)
            .min();
        if let Some(stage) = first_failure {
            return if expected == Some(stage) {
                Self::ExpectedFailure { stage }
            } else {
                Self::Failed { stage, expected }
            };
        }

        if let Some(expected) = expected {
            let passed_at_expected = records
                .iter()
                .any(|record| record.stage == expected && record.outcome == Outcome::Passed);
            // An MLIR test has no import stage, so a failure expected there can never happen.
            let expected_stage_absent = !records.is_empty()
                && records
                    .iter()
                    .all(|record| record.stage != expected && record.outcome == Outcome::Passed);
            if passed_at_expected || expected_stage_absent {
                return Self::UnexpectedPass { expected };
            }
        }

        let first_skip = records
            .iter()
            .filter(|record| record.outcome == Outcome::Skipped)
            .map(|record| record.stage)
            .min();
        match first_skip {
            Some(stage) => Self::Skipped { stage },
            None => Self::Passed,
        }
    }

    /// Returns the short label for this status, as shown in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed { .. } => "FAIL",
            Self::ExpectedFailure { .. } => "XFAIL",
            Self::UnexpectedPass { .. } => "XPASS",
            Self::Skipped { .. } => "SKIP",
        }
    }

    /// Returns true if this status fails the run.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The execution of a single stage.
#[derive(Clone, Debug)]
pub struct StageReport {
    /// The stage.
    pub stage: Stage,

    /// The outcome of the stage.
    pub outcome: Outcome,

    /// The command line that was invoked.
    pub command_line: String,

    /// How long the stage took.
    pub time_taken: Duration,

    /// Captured standard output, if the process ran to completion.
    pub stdout: Option<String>,

    /// Captured standard error, if the process ran to completion.
    pub stderr: Option<String>,
}

/// The result of running a single test case against a configuration.
#[derive(Clone, Debug)]
pub struct TestRunResult {
    /// The test case.
    pub test_case: TestCaseName,

    /// The stage the ledger expected a failure at, if any.
    pub expected: Option<Stage>,

    /// The outcome records for this test, in stage order.
    pub records: Vec<OutcomeRecord>,

    /// The stages that were executed, in order.
    pub stages: Vec<StageReport>,

    /// The gated status.
    pub status: TestStatus,

    /// When the test started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the test took.
    pub time_taken: Duration,
}

impl TestRunResult {
    /// Returns the message of the record that determined the status, if any.
    pub fn message(&self) -> Option<&str> {
        let stage = match self.status {
            TestStatus::Failed { stage, .. }
            | TestStatus::ExpectedFailure { stage }
            | TestStatus::Skipped { stage } => stage,
            TestStatus::Passed | TestStatus::UnexpectedPass { .. } => return None,
        };
        self.records
            .iter()
            .find(|record| record.stage == stage)
            .and_then(|record| record.message.as_deref())
    }
}

/// Statistics for a run against one configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of tests that were run or skipped.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed unexpectedly.
    pub failed: usize,

    /// The number of tests that failed at the expected stage.
    pub expected_failures: usize,

    /// The number of tests that passed where a failure was expected.
    pub unexpected_passes: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl RunStats {
    /// Returns true if no test failed unexpectedly.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn on_test_finished(&mut self, status: &TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed { .. } => self.failed += 1,
            TestStatus::ExpectedFailure { .. } => self.expected_failures += 1,
            TestStatus::UnexpectedPass { .. } => self.unexpected_passes += 1,
            TestStatus::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// The results of running every test case against one configuration.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// The name of the configuration.
    pub config_name: String,

    /// Per-test results, in name order.
    pub results: Vec<TestRunResult>,

    /// Aggregate statistics.
    pub stats: RunStats,

    /// When the run started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the run took.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Iterates over every outcome record produced by the run.
    pub fn records(&self) -> impl Iterator<Item = &OutcomeRecord> + '_ {
        self.results.iter().flat_map(|result| &result.records)
    }
}
