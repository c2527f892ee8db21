// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration documents and the expected-failure ledger.
//!
//! Each target configuration (a backend, device and execution mode combination) is described by
//! a single JSON document, committed to version control. [`ConfigStore`] loads and atomically
//! saves these documents.

mod document;
mod store;

pub use document::*;
pub use store::*;
