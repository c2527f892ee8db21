// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `xfail` failures.
///
/// `xfail` invocations may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum XfailExitCode {}

impl XfailExitCode {
    /// No errors occurred and `xfail` exited normally.
    pub const OK: i32 = 0;

    /// No test cases were discovered under the suite root.
    pub const NO_TESTS_FOUND: i32 = 4;

    /// The expected-failure ledger does not match the observed outcomes.
    ///
    /// Produced by `xfail reconcile` when at least one test is newly failing or at least one
    /// expected failure now passes. The committed ledger needs review and an update.
    pub const LEDGER_OUT_OF_DATE: i32 = 20;

    /// A user issue happened while setting up an `xfail` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more tests failed without being marked as expected failures.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A configuration document could not be found or parsed.
    pub const CONFIG_LOAD_FAILED: i32 = 102;

    /// A configuration document could not be written.
    ///
    /// The previous contents of the document are left untouched.
    pub const CONFIG_WRITE_FAILED: i32 = 103;

    /// The run-outcome log could not be read.
    pub const OUTCOME_LOG_READ_FAILED: i32 = 104;

    /// Writing data to stdout, stderr or a report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
