// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod ledger;
#[cfg(unix)]
mod runner;
