// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable vocabulary for `xfail`.
//!
//! This crate contains the types that appear in run-outcome logs, along with the documented exit
//! codes produced by the `xfail` binary. Tools that produce outcome logs for `xfail reconcile`
//! can depend on this crate alone.

mod exit_codes;
mod outcome;
#[cfg(feature = "proptest1")]
mod proptest_helpers;

pub use exit_codes::*;
pub use outcome::*;
