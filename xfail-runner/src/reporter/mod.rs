// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of run results and reconciliation results.
//!
//! Human-readable output is produced by [`Reporter`]. JUnit XML output for a run is produced by
//! [`JunitReport`].

mod displayer;
mod junit;

pub use displayer::*;
pub use junit::*;

use owo_colors::Style;

#[derive(Clone, Debug, Default)]
struct Styles {
    is_colorized: bool,
    count: Style,
    pass: Style,
    fail: Style,
    xfail: Style,
    skip: Style,
    config_name: Style,
    test_name: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.is_colorized = true;
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.xfail = Style::new().magenta().bold();
        self.skip = Style::new().yellow().bold();
        self.config_name = Style::new().blue().bold();
        self.test_name = Style::new().bold();
    }
}
