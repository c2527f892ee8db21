// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch and execution.

mod app;
mod common;
mod ledger;
mod list;
mod run;
#[cfg(test)]
mod test_helpers;

pub use app::XfailApp;
