// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit XML reports for runs.
//!
//! Each configuration becomes a test suite, and each test case a JUnit test case in it. Expected
//! failures are reported as skipped with the type `xfail`, so that JUnit consumers do not count
//! them as failures.

use crate::{
    errors::JunitWriteError,
    runner::{RunSummary, TestRunResult, TestStatus},
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Property, Report, TestCase, TestCaseStatus, TestSuite};
use std::time::Duration;
use swrite::{SWrite, swrite};
use xfail_metadata::Outcome;

/// Accumulates run summaries into a JUnit report.
#[derive(Debug)]
pub struct JunitReport {
    name: String,
    start_time: Option<DateTime<FixedOffset>>,
    elapsed: Duration,
    test_suites: DebugIgnore<IndexMap<String, TestSuite>>,
}

impl JunitReport {
    /// Creates a new, empty report.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: None,
            elapsed: Duration::ZERO,
            test_suites: DebugIgnore(IndexMap::new()),
        }
    }

    /// Adds the results of a run against one configuration.
    pub fn add_run(&mut self, summary: &RunSummary) {
        self.start_time.get_or_insert(summary.start_time);
        self.elapsed += summary.elapsed;

        let mut test_suite = TestSuite::new(summary.config_name.as_str());
        test_suite
            .set_timestamp(summary.start_time)
            .set_time(summary.elapsed)
            .add_property(Property::new("config_name", summary.config_name.as_str()));
        for result in &summary.results {
            test_suite.add_test_case(to_test_case(&summary.config_name, result));
        }

        self.test_suites.insert(summary.config_name.clone(), test_suite);
    }

    /// Builds the JUnit report.
    pub fn to_report(&self) -> Report {
        let mut report = Report::new(self.name.as_str());
        if let Some(start_time) = self.start_time {
            report.set_timestamp(start_time);
        }
        report
            .set_time(self.elapsed)
            .add_test_suites(self.test_suites.values().cloned());
        report
    }

    /// Writes the report to `path`, creating parent directories as needed.
    pub fn write_to_path(&self, path: &Utf8Path) -> Result<(), JunitWriteError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| JunitWriteError::Fs {
                file: dir.to_owned(),
                error,
            })?;
        }

        let f = std::fs::File::create(path).map_err(|error| JunitWriteError::Fs {
            file: path.to_owned(),
            error,
        })?;
        self.to_report()
            .serialize(f)
            .map_err(|error| JunitWriteError::Serialize {
                file: path.to_owned(),
                error,
            })
    }
}

fn to_test_case(config_name: &str, result: &TestRunResult) -> TestCase {
    let mut status = match result.status {
        TestStatus::Passed | TestStatus::UnexpectedPass { .. } => TestCaseStatus::success(),
        TestStatus::Failed { stage, .. } => {
            let errored = result
                .records
                .iter()
                .any(|record| record.stage == stage && record.outcome == Outcome::Errored);
            let (kind, ty) = if errored {
                (NonSuccessKind::Error, format!("{stage} error"))
            } else {
                (NonSuccessKind::Failure, format!("{stage} failure"))
            };
            let mut status = TestCaseStatus::non_success(kind);
            status.set_type(ty);
            status
        }
        TestStatus::ExpectedFailure { stage } => {
            let mut status = TestCaseStatus::skipped();
            status
                .set_type("xfail")
                .set_message(format!("expected failure at {stage}"));
            status
        }
        TestStatus::Skipped { .. } => TestCaseStatus::skipped(),
    };

    if let Some(message) = result.message() {
        match result.status {
            TestStatus::Failed { .. } => {
                let short = message.lines().next().unwrap_or(message);
                status.set_message(short).set_description(message);
            }
            TestStatus::Skipped { .. } => {
                status.set_message(message);
            }
            _ => {}
        }
    }

    let mut test_case = TestCase::new(result.test_case.as_str(), status);
    test_case
        .set_classname(config_name)
        .set_timestamp(result.start_time)
        .set_time(result.time_taken);

    if let TestStatus::UnexpectedPass { expected } = result.status {
        test_case.set_system_out(format!("expected to fail at {expected}, but passed\n"));
    }

    // Record each invoked command along with its diagnostics.
    let mut system_err = String::new();
    for stage in &result.stages {
        swrite!(system_err, "$ {}\n", stage.command_line);
        match &stage.stderr {
            Some(stderr) => system_err.push_str(stderr),
            None if stage.outcome == Outcome::Errored => {
                system_err.push_str("(process did not run to completion)\n")
            }
            None => {}
        }
    }
    if !system_err.is_empty() {
        test_case.set_system_err(system_err);
    }

    test_case
}
