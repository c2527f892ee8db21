// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for xfail: expected-failure bookkeeping for a generated compiler test
//! suite.
//!
//! The basic flow of operations is:
//!
//! 1. Discover test cases under a suite root with [`registry::TestCaseRegistry`].
//! 2. Load a target configuration, including its expected-failure ledger, with
//!    [`config::ConfigStore`].
//! 3. Run the test cases through the external toolchain with [`runner::TestRunner`], producing an
//!    outcome log. Logs produced by other tools can be read with
//!    [`collector::RunReportCollector`].
//! 4. Compute an updated ledger with [`reconcile::XfailReconciler`], and save it back.

pub mod collector;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod reconcile;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod write_str;
