// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciling a saved ledger against an outcome log, and saving the result.

use crate::fixtures::*;
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use xfail_metadata::{Outcome, Stage, TestCaseName};
use xfail_runner::{
    collector::{RunReportCollector, write_outcome_log},
    config::{ConfigStore, ExpectedFailure, ExpectedFailures, TargetConfig},
    reconcile::{NewlyFailingKind, XfailReconciler},
};

fn sample_config() -> TargetConfig {
    let mut config = TargetConfig::new("cpu_llvm_task");
    config.compile_flags = vec!["--iree-hal-target-backends=llvm-cpu".to_owned()];
    config.run_flags = vec!["--device=local-task".to_owned()];
    config.skip_run_tests.insert(TestCaseName::new("test_exp"));

    let ledger: ExpectedFailures = [
        ("test_abs", ExpectedFailure::with_reason(Stage::Compile, "unsupported op")),
        ("test_cos", ExpectedFailure::new(Stage::Run)),
        ("test_exp", ExpectedFailure::new(Stage::Run)),
        ("test_tanh", ExpectedFailure::new(Stage::Compile)),
    ]
    .into_iter()
    .map(|(name, entry)| (TestCaseName::new(name), entry))
    .collect();
    config.with_expected_failures(ledger)
}

fn names(names: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.as_ref().to_owned())
        .collect()
}

#[test]
fn reconcile_and_save() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    let store = ConfigStore::new(dir.path());
    let config_path = Utf8Path::new("configs/config_cpu_llvm_task.json");
    store.save(config_path, &sample_config())?;

    let records = [
        // Still failing at the same stage.
        record("test_abs", Stage::Compile, Outcome::Failed),
        // Newly failing.
        record("test_add", Stage::Compile, Outcome::Passed),
        record("test_add", Stage::Run, Outcome::Errored),
        // Now passing.
        record("test_cos", Stage::Compile, Outcome::Passed),
        record("test_cos", Stage::Run, Outcome::Passed),
        // Skipped at the expected stage, so the entry is kept.
        record("test_exp", Stage::Compile, Outcome::Passed),
        record("test_exp", Stage::Run, Outcome::Skipped),
        // Fails at a later stage than expected.
        record("test_tanh", Stage::Compile, Outcome::Passed),
        record("test_tanh", Stage::Run, Outcome::Failed),
    ];
    let log_path = dir.path().join("outcomes/cpu_llvm_task.jsonl");
    std::fs::create_dir_all(log_path.parent().expect("log path has a parent"))?;
    write_outcome_log(&log_path, &records)?;

    let outcomes = RunReportCollector::new(dir.path())
        .collect_path(Utf8Path::new("outcomes/cpu_llvm_task.jsonl"))?;
    assert_eq!(outcomes.len(), records.len());
    assert!(outcomes.malformed().is_empty());

    let old_config = store.load(config_path)?;
    assert_eq!(old_config, sample_config());

    let reconciler = XfailReconciler::new("2026-10-16 cpu_llvm_task");
    let result = reconciler.reconcile(&old_config.expected_failures, &outcomes);
    assert!(!result.is_up_to_date());

    let newly_failing: Vec<_> = result
        .newly_failing
        .iter()
        .map(|failing| (failing.test_case.as_str(), failing.stage, failing.kind))
        .collect();
    assert_eq!(
        newly_failing,
        [
            ("test_add", Stage::Run, NewlyFailingKind::New),
            (
                "test_tanh",
                Stage::Run,
                NewlyFailingKind::StageMismatch {
                    previous: Stage::Compile
                }
            ),
        ],
    );
    assert_eq!(
        names(result.now_passing.iter().map(|passing| &passing.test_case)),
        ["test_cos"],
    );
    assert_eq!(names(&result.carried_over), ["test_abs", "test_exp"]);

    let new_config = result.apply_to(&old_config);
    store.save(config_path, &new_config)?;

    let reloaded = store.load(config_path)?;
    assert_eq!(reloaded, new_config);
    assert_eq!(reloaded.compile_flags, old_config.compile_flags);
    assert_eq!(reloaded.run_flags, old_config.run_flags);
    assert_eq!(reloaded.skip_run_tests, old_config.skip_run_tests);
    assert_eq!(
        names(reloaded.expected_failures.iter().map(|(name, _)| name)),
        ["test_abs", "test_add", "test_exp", "test_tanh"],
    );
    assert_eq!(
        reloaded.expected_failures.get("test_abs"),
        Some(&ExpectedFailure::with_reason(Stage::Compile, "unsupported op")),
    );
    assert_eq!(
        reloaded.expected_failures.get("test_add"),
        Some(&ExpectedFailure::with_reason(
            Stage::Run,
            "auto-added from run on 2026-10-16 cpu_llvm_task",
        )),
    );
    assert_eq!(
        reloaded.expected_failures.get("test_tanh"),
        Some(&ExpectedFailure::with_reason(
            Stage::Run,
            "auto-updated from run on 2026-10-16 cpu_llvm_task \
             (previously expected to fail at compile)",
        )),
    );

    // Reconciling the same run against the updated ledger is a no-op.
    let again = reconciler.reconcile(&reloaded.expected_failures, &outcomes);
    assert!(again.is_up_to_date(), "{again:?}");
    assert_eq!(again.new_ledger, reloaded.expected_failures);

    Ok(())
}

#[test]
fn saved_document_is_stable() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    let store = ConfigStore::new(dir.path());
    let path = Utf8Path::new("config_cpu.json");

    store.save(path, &sample_config())?;
    let first = std::fs::read_to_string(dir.path().join(path))?;
    let loaded = store.load(path)?;
    store.save(path, &loaded)?;
    let second = std::fs::read_to_string(dir.path().join(path))?;

    assert_eq!(first, second);
    Ok(())
}
