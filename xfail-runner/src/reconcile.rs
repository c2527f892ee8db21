// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of expected-failure ledgers against observed outcomes.
//!
//! Given the ledger stored in a [`TargetConfig`] and the outcomes of a fresh run, the
//! [`XfailReconciler`] computes the ledger that accurately describes the run, along with the
//! differences from the old one:
//!
//! * tests that failed but were not expected to, or that failed at a different stage than
//!   expected, are *newly failing* and get a new or updated entry;
//! * tests that were expected to fail but did not fail are *now passing*, and their entries are
//!   dropped;
//! * tests that failed where expected are *carried over* unchanged.
//!
//! Skipped records carry no information: a test whose only records are skipped, or whose record
//! at the ledger's stage is skipped, keeps its entry (or lack of one).
//!
//! Reconciliation is a pure function of the old ledger and the outcomes. It never fails: data
//! issues in the outcome log are dealt with by the [collector](crate::collector).

use crate::{
    collector::CollectedOutcomes,
    config::{ExpectedFailure, ExpectedFailures, TargetConfig},
};
use std::collections::BTreeMap;
use xfail_metadata::{Outcome, Stage, TestCaseName};

/// Computes updated expected-failure ledgers.
#[derive(Clone, Debug)]
pub struct XfailReconciler {
    context: String,
}

impl XfailReconciler {
    /// Creates a new reconciler.
    ///
    /// `context` describes the run the outcomes come from, for example a date and a
    /// configuration name. It is used in the reasons attached to new and updated entries.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// Reconciles `old_ledger` against `outcomes`.
    pub fn reconcile(
        &self,
        old_ledger: &ExpectedFailures,
        outcomes: &CollectedOutcomes,
    ) -> ReconciliationResult {
        // Records are ordered by test case and then by stage, so the first failure seen for each
        // test case is at its earliest failing stage.
        let mut failing: BTreeMap<&TestCaseName, (Stage, Option<&str>)> = BTreeMap::new();
        for record in outcomes.iter().filter(|record| record.outcome.is_failure()) {
            failing
                .entry(&record.test_case)
                .or_insert((record.stage, record.message.as_deref()));
        }

        let mut new_ledger = ExpectedFailures::new();
        let mut newly_failing = Vec::new();
        let mut now_passing = Vec::new();
        let mut carried_over = Vec::new();

        for (&test_case, &(stage, message)) in &failing {
            let (kind, reason) = match old_ledger.get(test_case.as_str()) {
                None => (
                    NewlyFailingKind::New,
                    format!("auto-added from run on {}", self.context),
                ),
                Some(entry) if entry.stage == stage => {
                    new_ledger.insert(test_case.clone(), entry.clone());
                    carried_over.push(test_case.clone());
                    continue;
                }
                Some(entry) => (
                    NewlyFailingKind::StageMismatch {
                        previous: entry.stage,
                    },
                    format!(
                        "auto-updated from run on {} (previously expected to fail at {})",
                        self.context, entry.stage
                    ),
                ),
            };

            new_ledger.insert(test_case.clone(), ExpectedFailure::with_reason(stage, reason));
            newly_failing.push(NewlyFailing {
                test_case: test_case.clone(),
                stage,
                kind,
                message: message.map(str::to_owned),
            });
        }

        for (test_case, entry) in old_ledger {
            if failing.contains_key(test_case) {
                continue;
            }

            if is_skip_neutral(outcomes, test_case, entry.stage) {
                new_ledger.insert(test_case.clone(), entry.clone());
                carried_over.push(test_case.clone());
            } else {
                now_passing.push(NowPassing {
                    test_case: test_case.clone(),
                    stage: entry.stage,
                    reason: entry.reason.clone(),
                });
            }
        }

        carried_over.sort_unstable();

        ReconciliationResult {
            new_ledger,
            newly_failing,
            now_passing,
            carried_over,
        }
    }
}

fn is_skip_neutral(outcomes: &CollectedOutcomes, test_case: &TestCaseName, stage: Stage) -> bool {
    let skipped_at_stage = outcomes
        .get(test_case, stage)
        .is_some_and(|record| record.outcome == Outcome::Skipped);
    if skipped_at_stage {
        return true;
    }

    let mut records = outcomes.for_test_case(test_case).peekable();
    records.peek().is_some() && records.all(|record| record.outcome == Outcome::Skipped)
}

/// The result of reconciling a ledger against a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReconciliationResult {
    /// The ledger that accurately describes the run.
    pub new_ledger: ExpectedFailures,

    /// Tests that failed without a matching ledger entry, sorted by name.
    pub newly_failing: Vec<NewlyFailing>,

    /// Tests with a ledger entry that did not fail, sorted by name.
    pub now_passing: Vec<NowPassing>,

    /// Tests whose ledger entry was kept unchanged, sorted by name.
    pub carried_over: Vec<TestCaseName>,
}

impl ReconciliationResult {
    /// Returns true if the old ledger already described the run: there is nothing newly failing
    /// and nothing now passing.
    pub fn is_up_to_date(&self) -> bool {
        self.newly_failing.is_empty() && self.now_passing.is_empty()
    }

    /// Returns `config` with its ledger replaced by the new ledger.
    ///
    /// Flags and skip lists are left untouched.
    pub fn apply_to(&self, config: &TargetConfig) -> TargetConfig {
        config.with_expected_failures(self.new_ledger.clone())
    }
}

/// A test that failed without a matching ledger entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewlyFailing {
    /// The test case.
    pub test_case: TestCaseName,

    /// The earliest stage the test failed at.
    pub stage: Stage,

    /// Whether the test had an entry for a different stage.
    pub kind: NewlyFailingKind,

    /// The message attached to the failing record, if any.
    pub message: Option<String>,
}

/// The kind of a [`NewlyFailing`] test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NewlyFailingKind {
    /// The test had no ledger entry.
    New,

    /// The test had a ledger entry for a different stage.
    StageMismatch {
        /// The stage the ledger expected the failure at.
        previous: Stage,
    },
}

/// A test with a ledger entry that did not fail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NowPassing {
    /// The test case.
    pub test_case: TestCaseName,

    /// The stage the ledger expected the failure at.
    pub stage: Stage,

    /// The reason recorded in the dropped entry.
    pub reason: Option<String>,
}
