// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for xfail-runner.

use swrite::{SWrite, swrite};

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "entry" if `count` is 1, otherwise "entries".
    pub fn entries_str(count: usize) -> &'static str {
        if count == 1 { "entry" } else { "entries" }
    }

    /// Returns "configuration" if `count` is 1, otherwise "configurations".
    pub fn configs_str(count: usize) -> &'static str {
        if count == 1 {
            "configuration"
        } else {
            "configurations"
        }
    }

    /// Returns "expected failure" if `count` is 1, otherwise "expected failures".
    pub fn expected_failures_str(count: usize) -> &'static str {
        if count == 1 {
            "expected failure"
        } else {
            "expected failures"
        }
    }

    /// Returns "unexpected pass" if `count` is 1, otherwise "unexpected passes".
    pub fn unexpected_passes_str(count: usize) -> &'static str {
        if count == 1 {
            "unexpected pass"
        } else {
            "unexpected passes"
        }
    }

    /// Returns "file" if `count` is 1, otherwise "files".
    pub fn files_str(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }
}

const MESSAGE_MAX_LINES: usize = 5;

/// Summarizes tool diagnostics for inclusion in an outcome message.
///
/// Keeps the first few non-empty lines, with trailing whitespace removed. Returns `None` if there
/// is nothing to keep.
pub(crate) fn summarize_output(output: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(output);
    let mut lines = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty());

    let mut summary = String::new();
    for line in lines.by_ref().take(MESSAGE_MAX_LINES) {
        if !summary.is_empty() {
            summary.push('\n');
        }
        summary.push_str(line);
    }

    let remaining = lines.count();
    if remaining > 0 {
        swrite!(summary, "\n({remaining} more lines)");
    }

    (!summary.is_empty()).then_some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn summarize_output_keeps_first_lines() {
        assert_eq!(summarize_output(b""), None);
        assert_eq!(summarize_output(b"\n  \n"), None);
        assert_eq!(
            summarize_output(b"error: bad op  \r\n\nnote: here\n").as_deref(),
            Some("error: bad op\nnote: here"),
        );

        let long = indoc! {"
            line 1
            line 2
            line 3
            line 4
            line 5
            line 6
            line 7
        "};
        assert_eq!(
            summarize_output(long.as_bytes()).as_deref(),
            Some("line 1\nline 2\nline 3\nline 4\nline 5\n(2 more lines)"),
        );
    }
}
