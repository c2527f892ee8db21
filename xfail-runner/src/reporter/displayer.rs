// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Styles;
use crate::{
    helpers::plural,
    reconcile::{NewlyFailingKind, ReconciliationResult},
    registry::TestCaseRegistry,
    runner::{RunStats, RunSummary, TestRunResult, TestStatus},
    write_str::WriteStr,
};
use owo_colors::{OwoColorize, Style};
use std::{io, time::Duration};

const HBAR_WIDTH: usize = 12;
const MESSAGE_INDENT: &str = "             ";

/// Builder for a [`Reporter`].
#[derive(Clone, Debug, Default)]
pub struct ReporterBuilder {
    colorize: bool,
    verbose: bool,
}

impl ReporterBuilder {
    /// Sets whether output is colorized.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Sets whether messages are shown for expected failures and skipped tests.
    ///
    /// Messages for unexpected failures are always shown.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Creates a new reporter.
    pub fn build(&self) -> Reporter {
        let mut styles = Styles::default();
        if self.colorize {
            styles.colorize();
        }
        Reporter {
            styles,
            verbose: self.verbose,
        }
    }
}

/// Writes human-readable output for runs, reconciliations and test lists.
#[derive(Clone, Debug)]
pub struct Reporter {
    styles: Styles,
    verbose: bool,
}

impl Reporter {
    /// Writes the line shown before a run against a configuration starts.
    pub fn write_run_started(
        &self,
        config_name: &str,
        test_count: usize,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "{:>12} {} {} against {}",
            "Starting".style(self.styles.pass),
            test_count.style(self.styles.count),
            plural::tests_str(test_count),
            config_name.style(self.styles.config_name),
        )
    }

    /// Writes the status line for a finished test.
    pub fn write_test_finished(
        &self,
        config_name: &str,
        result: &TestRunResult,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        self.write_status_line(config_name, result, writer)?;

        let show_message = result.status.is_failure()
            || (self.verbose && !matches!(result.status, TestStatus::Passed));
        if show_message && let Some(message) = result.message() {
            for line in message.lines() {
                writeln!(writer, "{MESSAGE_INDENT}{line}")?;
            }
        }
        Ok(())
    }

    fn write_status_line(
        &self,
        config_name: &str,
        result: &TestRunResult,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        let style = self.status_style(result.status);
        write!(writer, "{:>12} ", result.status.label().style(style))?;
        write_duration(result.time_taken, writer)?;
        write!(
            writer,
            " {} {}",
            config_name.style(self.styles.config_name),
            result.test_case.style(self.styles.test_name),
        )?;

        match result.status {
            TestStatus::Passed => writeln!(writer),
            TestStatus::Failed {
                stage,
                expected: None,
            } => writeln!(writer, " (failed at {stage})"),
            TestStatus::Failed {
                stage,
                expected: Some(expected),
            } => writeln!(writer, " (failed at {stage}, expected at {expected})"),
            TestStatus::ExpectedFailure { stage } => writeln!(writer, " ({stage})"),
            TestStatus::UnexpectedPass { expected } => {
                writeln!(writer, " (expected to fail at {expected})")
            }
            TestStatus::Skipped { stage } => writeln!(writer, " ({stage})"),
        }
    }

    /// Writes the summary for a finished run against a configuration.
    pub fn write_run_summary(
        &self,
        summary: &RunSummary,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        let stats = &summary.stats;
        let summary_style = if !stats.is_success() {
            self.styles.fail
        } else if stats.total == 0 {
            self.styles.skip
        } else {
            self.styles.pass
        };

        write!(
            writer,
            "{}\n{:>12} ",
            "-".repeat(HBAR_WIDTH),
            "Summary".style(summary_style),
        )?;
        write_duration(summary.elapsed, writer)?;
        writeln!(
            writer,
            " {} {} run against {}: {}",
            stats.total.style(self.styles.count),
            plural::tests_str(stats.total),
            summary.config_name.style(self.styles.config_name),
            self.summary_str(stats),
        )?;

        for result in summary.results.iter().filter(|r| r.status.is_failure()) {
            self.write_status_line(&summary.config_name, result, writer)?;
        }

        if stats.unexpected_passes > 0 {
            writeln!(
                writer,
                "{}: {} {} passed where a failure was expected; \
                 run `xfail reconcile` to update the ledger",
                "note".style(self.styles.skip),
                stats.unexpected_passes.style(self.styles.count),
                plural::tests_str(stats.unexpected_passes),
            )?;
        }
        Ok(())
    }

    fn summary_str(&self, stats: &RunStats) -> String {
        let mut parts = vec![format!(
            "{} {}",
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
        )];
        if stats.failed > 0 {
            parts.push(format!(
                "{} {}",
                stats.failed.style(self.styles.count),
                "failed".style(self.styles.fail),
            ));
        }
        if stats.expected_failures > 0 {
            parts.push(format!(
                "{} {}",
                stats.expected_failures.style(self.styles.count),
                plural::expected_failures_str(stats.expected_failures).style(self.styles.xfail),
            ));
        }
        if stats.unexpected_passes > 0 {
            parts.push(format!(
                "{} {}",
                stats.unexpected_passes.style(self.styles.count),
                plural::unexpected_passes_str(stats.unexpected_passes).style(self.styles.xfail),
            ));
        }
        parts.push(format!(
            "{} {}",
            stats.skipped.style(self.styles.count),
            "skipped".style(self.styles.skip),
        ));
        parts.join(", ")
    }

    /// Writes the summary of a reconciliation.
    pub fn write_reconcile_summary(
        &self,
        config_name: &str,
        result: &ReconciliationResult,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        let heading_style = if result.is_up_to_date() {
            self.styles.pass
        } else {
            self.styles.fail
        };
        writeln!(
            writer,
            "{:>12} {}: {} newly failing, {} now passing, {} carried over",
            "Reconciled".style(heading_style),
            config_name.style(self.styles.config_name),
            result.newly_failing.len().style(self.styles.count),
            result.now_passing.len().style(self.styles.count),
            result.carried_over.len().style(self.styles.count),
        )?;

        for entry in &result.newly_failing {
            match entry.kind {
                NewlyFailingKind::New => writeln!(
                    writer,
                    "{:>12} {} at {}",
                    "NEW FAIL".style(self.styles.fail),
                    entry.test_case.style(self.styles.test_name),
                    entry.stage,
                )?,
                NewlyFailingKind::StageMismatch { previous } => writeln!(
                    writer,
                    "{:>12} {} at {} (previously expected at {previous})",
                    "MISMATCH".style(self.styles.fail),
                    entry.test_case.style(self.styles.test_name),
                    entry.stage,
                )?,
            }
            if self.verbose
                && let Some(line) = entry.message.as_deref().and_then(|m| m.lines().next())
            {
                writeln!(writer, "{MESSAGE_INDENT}{line}")?;
            }
        }

        for entry in &result.now_passing {
            writeln!(
                writer,
                "{:>12} {} (was expected to fail at {})",
                "NOW PASS".style(self.styles.pass),
                entry.test_case.style(self.styles.test_name),
                entry.stage,
            )?;
        }

        if result.is_up_to_date() {
            writeln!(
                writer,
                "{:>12} ledger is up to date ({} {})",
                "",
                result.new_ledger.len().style(self.styles.count),
                plural::entries_str(result.new_ledger.len()),
            )?;
        }
        Ok(())
    }

    /// Writes the list of discovered test cases.
    pub fn write_list(
        &self,
        registry: &TestCaseRegistry,
        writer: &mut dyn WriteStr,
    ) -> io::Result<()> {
        writeln!(writer, "{}:", registry.root())?;
        for test_case in registry.iter() {
            write!(
                writer,
                "    {} ({})",
                test_case.name().style(self.styles.test_name),
                test_case.model_kind(),
            )?;
            if !test_case.is_complete() {
                write!(
                    writer,
                    " {}: missing {} {}",
                    "incomplete".style(self.styles.skip),
                    test_case.missing().len(),
                    plural::files_str(test_case.missing().len()),
                )?;
            }
            if self.verbose
                && let Some(notes) = test_case.notes()
            {
                write!(writer, " - {notes}")?;
            }
            writeln!(writer)?;
        }

        let incomplete = registry.incomplete_count();
        writeln!(
            writer,
            "{} {} discovered, {} incomplete",
            registry.len().style(self.styles.count),
            plural::tests_str(registry.len()),
            incomplete.style(self.styles.count),
        )
    }

    fn status_style(&self, status: TestStatus) -> Style {
        match status {
            TestStatus::Passed => self.styles.pass,
            TestStatus::Failed { .. } => self.styles.fail,
            TestStatus::ExpectedFailure { .. } | TestStatus::UnexpectedPass { .. } => {
                self.styles.xfail
            }
            TestStatus::Skipped { .. } => self.styles.skip,
        }
    }
}

fn write_duration(duration: Duration, writer: &mut dyn WriteStr) -> io::Result<()> {
    // * > means right-align.
    // * 8 is the number of characters to pad to.
    // * .3 means print three digits after the decimal point.
    write!(writer, "[{:>8.3?}s]", duration.as_secs_f64())
}
