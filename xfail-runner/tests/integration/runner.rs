// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a small suite through fake toolchain scripts.

use crate::fixtures::*;
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use std::{os::unix::fs::PermissionsExt, time::Duration};
use xfail_metadata::{Outcome, Stage, TestCaseName};
use xfail_runner::{
    collector::CollectedOutcomes,
    config::{ExpectedFailure, ExpectedFailures, TargetConfig},
    reconcile::XfailReconciler,
    registry::TestCaseRegistry,
    runner::{RunStats, TestRunnerBuilder, TestStatus, ToolPaths},
};

/// Writes a tool script that logs its invocation and fails for test cases whose name contains
/// `fail_marker`.
///
/// `input_dir_expr` is a shell expression evaluating to the directory holding the stage's input.
fn write_tool(
    dir: &Utf8Path,
    name: &str,
    log: &Utf8Path,
    input_dir_expr: &str,
    fail_marker: &str,
) -> String {
    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\n\
         t=$(basename \"{input_dir_expr}\")\n\
         echo \"{name} $t\" >> '{log}'\n\
         case \"$t\" in *{fail_marker}*) echo \"error: {name} rejected $t\" >&2; exit 1;; esac\n\
         exit 0\n",
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.into_string()
}

fn write_toolchain(dir: &Utf8Path, log: &Utf8Path) -> ToolPaths {
    ToolPaths {
        importer: write_tool(dir, "import", log, "$(dirname \"$1\")", "bad_import"),
        compiler: write_tool(dir, "compile", log, "$(dirname \"$1\")", "bad_compile"),
        // The runtime is passed `--module=<work dir>/<test>/model_<config>.vmfb`, and is run from
        // the test case directory.
        runtime: write_tool(
            dir,
            "run",
            log,
            "$(test -f test_data_flags.txt && dirname \"${1#--module=}\")",
            "bad_run",
        ),
    }
}

fn sample_config() -> TargetConfig {
    let mut config = TargetConfig::new("cpu");
    config.compile_flags = vec!["--iree-hal-target-backends=llvm-cpu".to_owned()];
    config.run_flags = vec!["--device=local-task".to_owned()];
    config
        .skip_compile_tests
        .insert(TestCaseName::new("test_skip_compile"));
    config.skip_run_tests.insert(TestCaseName::new("test_skip_run"));

    let ledger: ExpectedFailures = [
        ("test_bad_compile", ExpectedFailure::new(Stage::Compile)),
        ("test_fixed", ExpectedFailure::new(Stage::Run)),
    ]
    .into_iter()
    .map(|(name, entry)| (TestCaseName::new(name), entry))
    .collect();
    config.with_expected_failures(ledger)
}

#[test]
fn run_suite_with_fake_toolchain() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    let suite = dir.path().join("suite");
    let tools_dir = dir.path().join("tools");
    let work_dir = dir.path().join("work");
    let log = dir.path().join("invocations.log");
    std::fs::create_dir_all(&tools_dir)?;

    write_mlir_test(&suite, "test_bad_compile");
    write_onnx_test(&suite, "test_bad_import");
    write_onnx_test(&suite, "test_bad_run");
    write_mlir_test(&suite, "test_fixed");
    write_file(&suite, "test_incomplete/model.mlir", "");
    write_mlir_test(&suite, "test_ok");
    write_mlir_test(&suite, "test_skip_compile");
    write_mlir_test(&suite, "test_skip_run");

    let registry = TestCaseRegistry::discover(suite.clone())?;
    assert_eq!(registry.len(), 8);
    assert_eq!(registry.incomplete_count(), 1);

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_tools(write_toolchain(&tools_dir, &log))
        .set_timeout(Duration::from_secs(30))
        .set_work_dir(work_dir.clone());
    let runner = builder.build(&registry);

    let config = sample_config();
    let mut finished = Vec::new();
    let summary = runner.execute(&config, |result| {
        finished.push(result.test_case.clone());
        Ok(())
    })?;

    let statuses: Vec<_> = summary
        .results
        .iter()
        .map(|result| (result.test_case.as_str(), result.status))
        .collect();
    assert_eq!(
        statuses,
        [
            (
                "test_bad_compile",
                TestStatus::ExpectedFailure {
                    stage: Stage::Compile
                }
            ),
            (
                "test_bad_import",
                TestStatus::Failed {
                    stage: Stage::Import,
                    expected: None
                }
            ),
            (
                "test_bad_run",
                TestStatus::Failed {
                    stage: Stage::Run,
                    expected: None
                }
            ),
            (
                "test_fixed",
                TestStatus::UnexpectedPass {
                    expected: Stage::Run
                }
            ),
            (
                "test_incomplete",
                TestStatus::Skipped {
                    stage: Stage::Compile
                }
            ),
            ("test_ok", TestStatus::Passed),
            (
                "test_skip_compile",
                TestStatus::Skipped {
                    stage: Stage::Compile
                }
            ),
            ("test_skip_run", TestStatus::Skipped { stage: Stage::Run }),
        ],
    );
    assert_eq!(
        finished,
        summary
            .results
            .iter()
            .map(|result| result.test_case.clone())
            .collect::<Vec<_>>(),
    );
    assert_eq!(
        summary.stats,
        RunStats {
            total: 8,
            passed: 1,
            failed: 2,
            expected_failures: 1,
            unexpected_passes: 1,
            skipped: 3,
        },
    );
    assert!(!summary.stats.is_success());

    // Later stages are not attempted after a failure, and skipped tests invoke nothing.
    let invocations = std::fs::read_to_string(&log)?;
    assert_eq!(
        invocations.lines().collect::<Vec<_>>(),
        [
            "compile test_bad_compile",
            "import test_bad_import",
            "import test_bad_run",
            "compile test_bad_run",
            "run test_bad_run",
            "compile test_fixed",
            "run test_fixed",
            "compile test_ok",
            "run test_ok",
            "compile test_skip_run",
        ],
    );

    let bad_run = &summary.results[2];
    let outcomes: Vec<_> = bad_run
        .records
        .iter()
        .map(|record| (record.stage, record.outcome))
        .collect();
    assert_eq!(
        outcomes,
        [
            (Stage::Import, Outcome::Passed),
            (Stage::Compile, Outcome::Passed),
            (Stage::Run, Outcome::Failed),
        ],
    );
    let message = bad_run.message().expect("failed test has a message");
    assert!(message.contains("exited with code 1"), "{message}");
    assert!(message.contains("error: run rejected test_bad_run"), "{message}");
    assert!(
        bad_run.stages[2].command_line.contains("--device=local-task"),
        "{}",
        bad_run.stages[2].command_line,
    );
    assert!(work_dir.join("cpu/test_bad_run").is_dir());

    let incomplete = &summary.results[4];
    assert_eq!(
        incomplete.message(),
        Some("missing required files: test_data_flags.txt"),
    );

    // Reconciling the run produces a ledger that describes it.
    let outcomes = CollectedOutcomes::from_records(summary.records().cloned());
    let result =
        XfailReconciler::new("test run").reconcile(&config.expected_failures, &outcomes);
    let new_ledger: Vec<_> = result
        .new_ledger
        .iter()
        .map(|(name, entry)| (name.as_str(), entry.stage))
        .collect();
    assert_eq!(
        new_ledger,
        [
            ("test_bad_compile", Stage::Compile),
            ("test_bad_import", Stage::Import),
            ("test_bad_run", Stage::Run),
        ],
    );
    assert_eq!(result.now_passing.len(), 1);
    assert_eq!(result.now_passing[0].test_case.as_str(), "test_fixed");

    Ok(())
}
