// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a generated compiler test suite against target configurations, and keeps each
//! configuration's expected-failure ledger in step with what actually fails.
//!
//! This crate is the `xfail` binary. The logic lives in `xfail-runner`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
