// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection of per-test outcomes from run-outcome logs.
//!
//! A run-outcome log is a [JSON Lines](https://jsonlines.org) file with one
//! [`OutcomeRecord`] per line. Logs are produced by [`crate::runner`] or by any other tool that
//! drives the test suite.

use crate::errors::{
    DisplayErrorChain, MalformedOutcomeRecord, OutcomeLogReadError, OutcomeLogWriteError,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::{BTreeMap, BTreeSet},
    io::{BufRead, BufReader, Write},
};
use tracing::{debug, warn};
use xfail_metadata::{OutcomeRecord, Stage, TestCaseName};

/// Reads run-outcome logs into [`CollectedOutcomes`].
///
/// Relative log paths are resolved against the base directory passed in at construction time.
#[derive(Clone, Debug)]
pub struct RunReportCollector {
    base_dir: Utf8PathBuf,
}

impl RunReportCollector {
    /// Creates a new collector that resolves relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Reads and collects the outcome log at `path`.
    pub fn collect_path(&self, path: &Utf8Path) -> Result<CollectedOutcomes, OutcomeLogReadError> {
        let path = self.base_dir.join(path);
        let file =
            std::fs::File::open(&path).map_err(|error| OutcomeLogReadError::new(&path, error))?;
        let outcomes = self
            .collect(BufReader::new(file))
            .map_err(|error| OutcomeLogReadError::new(&path, error))?;
        debug!(
            "collected {} outcome records from `{path}` ({} malformed)",
            outcomes.len(),
            outcomes.malformed().len(),
        );
        Ok(outcomes)
    }

    /// Collects outcomes from a reader producing JSON Lines.
    ///
    /// Blank lines are ignored. Lines that cannot be parsed as an [`OutcomeRecord`] are skipped
    /// with a warning and retained in [`CollectedOutcomes::malformed`]. Only errors reading from
    /// `reader` itself are returned.
    pub fn collect(&self, mut reader: impl BufRead) -> std::io::Result<CollectedOutcomes> {
        let mut outcomes = CollectedOutcomes::default();
        let mut line = Vec::new();
        let mut line_number = 0;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_number += 1;

            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_slice::<OutcomeRecord>(trimmed) {
                Ok(record) => outcomes.insert(record),
                Err(error) => {
                    let malformed = MalformedOutcomeRecord::new(line_number, error);
                    warn!("skipping {}", DisplayErrorChain::new(&malformed));
                    outcomes.malformed.push(malformed);
                }
            }
        }

        Ok(outcomes)
    }
}

/// The outcomes observed in a run, with one record per (test case, stage) pair.
#[derive(Debug, Default)]
pub struct CollectedOutcomes {
    records: BTreeMap<(TestCaseName, Stage), OutcomeRecord>,
    malformed: Vec<MalformedOutcomeRecord>,
}

impl CollectedOutcomes {
    /// Creates a new set from records, in the order they were produced.
    ///
    /// If a (test case, stage) pair occurs more than once, the last record wins: retried tests
    /// report their final state last.
    pub fn from_records(records: impl IntoIterator<Item = OutcomeRecord>) -> Self {
        let mut outcomes = Self::default();
        for record in records {
            outcomes.insert(record);
        }
        outcomes
    }

    fn insert(&mut self, record: OutcomeRecord) {
        let key = (record.test_case.clone(), record.stage);
        if let Some(previous) = self.records.insert(key, record) {
            debug!(
                "replacing earlier {} record for {} at stage {}",
                previous.outcome, previous.test_case, previous.stage,
            );
        }
    }

    /// Returns the number of (test case, stage) pairs observed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records were observed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record for a (test case, stage) pair.
    pub fn get(&self, test_case: &TestCaseName, stage: Stage) -> Option<&OutcomeRecord> {
        self.records.get(&(test_case.clone(), stage))
    }

    /// Iterates over all records, ordered by test case and then by stage.
    pub fn iter(&self) -> impl Iterator<Item = &OutcomeRecord> + '_ {
        self.records.values()
    }

    /// Iterates over the records for a single test case, in stage order.
    pub fn for_test_case<'a>(
        &'a self,
        test_case: &TestCaseName,
    ) -> impl Iterator<Item = &'a OutcomeRecord> + 'a {
        let start = (test_case.clone(), Stage::Import);
        let end = (test_case.clone(), Stage::Run);
        self.records.range(start..=end).map(|(_, record)| record)
    }

    /// Returns the set of test cases with at least one record.
    pub fn test_cases(&self) -> BTreeSet<&TestCaseName> {
        self.records.keys().map(|(test_case, _)| test_case).collect()
    }

    /// Returns the records that were skipped because they could not be parsed.
    pub fn malformed(&self) -> &[MalformedOutcomeRecord] {
        &self.malformed
    }
}

/// Writes records to `path` as a run-outcome log, replacing any existing file atomically.
pub fn write_outcome_log<'a>(
    path: &Utf8Path,
    records: impl IntoIterator<Item = &'a OutcomeRecord>,
) -> Result<(), OutcomeLogWriteError> {
    let mut contents = String::new();
    for record in records {
        contents.push_str(&record.to_json_line().map_err(OutcomeLogWriteError::Serialize)?);
        contents.push('\n');
    }

    atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite)
        .write(|file| file.write_all(contents.as_bytes()))
        .map_err(|error| OutcomeLogWriteError::Write {
            path: path.to_owned(),
            error,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use xfail_metadata::Outcome;

    fn collector() -> RunReportCollector {
        RunReportCollector::new(".")
    }

    #[test]
    fn last_record_wins() {
        let log = indoc! {r#"
            {"test_case":"test_abs","stage":"compile","outcome":"failed","message":"attempt 1"}
            {"test_case":"test_add","stage":"compile","outcome":"passed"}
            {"test_case":"test_abs","stage":"compile","outcome":"passed"}
        "#};

        let outcomes = collector().collect(log.as_bytes()).unwrap();
        assert_eq!(outcomes.len(), 2);
        let abs = outcomes
            .get(&TestCaseName::new("test_abs"), Stage::Compile)
            .expect("record present");
        assert_eq!(abs.outcome, Outcome::Passed);
        assert_eq!(abs.message, None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let log = indoc! {r#"
            {"test_case":"test_abs","stage":"compile","outcome":"failed"}

            this is not json
            {"test_case":"test_add","stage":"link","outcome":"failed"}
            {"test_case":"test_add","stage":"run","outcome":"errored","message":"timed out"}
            {"test_case":"test_cos","stage":"run"
        "#};

        let outcomes = collector().collect(log.as_bytes()).unwrap();
        assert_eq!(outcomes.len(), 2);
        let malformed_lines: Vec<_> = outcomes
            .malformed()
            .iter()
            .map(|malformed| malformed.line_number())
            .collect();
        assert_eq!(malformed_lines, [3, 4, 6]);

        let names: Vec<_> = outcomes.test_cases().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["test_abs", "test_add"]);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut log = br#"{"test_case":"test_abs","stage":"run","outcome":"passed"}"#.to_vec();
        log.push(b'\n');
        log.extend_from_slice(
            b"{\"test_case\":\"\xff\xfe\",\"stage\":\"run\",\"outcome\":\"passed\"}\n",
        );

        let outcomes = collector().collect(&log[..]).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes.malformed().len(), 1);
    }

    #[test]
    fn for_test_case_is_in_stage_order() {
        let outcomes = CollectedOutcomes::from_records([
            OutcomeRecord::new(TestCaseName::new("test_b"), Stage::Run, Outcome::Passed),
            OutcomeRecord::new(TestCaseName::new("test_a"), Stage::Run, Outcome::Failed),
            OutcomeRecord::new(TestCaseName::new("test_a"), Stage::Import, Outcome::Passed),
            OutcomeRecord::new(TestCaseName::new("test_a"), Stage::Compile, Outcome::Passed),
        ]);

        let stages: Vec<_> = outcomes
            .for_test_case(&TestCaseName::new("test_a"))
            .map(|record| record.stage)
            .collect();
        assert_eq!(stages, [Stage::Import, Stage::Compile, Stage::Run]);
    }

    #[test]
    fn write_then_collect() {
        let dir = Utf8TempDir::new().unwrap();
        let records = [
            OutcomeRecord::new(TestCaseName::new("test_a"), Stage::Compile, Outcome::Passed),
            OutcomeRecord::new(TestCaseName::new("test_a"), Stage::Run, Outcome::Failed)
                .with_message("exit code 1"),
        ];
        write_outcome_log(&dir.path().join("cpu.jsonl"), &records).unwrap();

        let outcomes = RunReportCollector::new(dir.path())
            .collect_path(Utf8Path::new("cpu.jsonl"))
            .unwrap();
        let collected: Vec<_> = outcomes.iter().cloned().collect();
        assert_eq!(collected, records);
        assert!(outcomes.malformed().is_empty());
    }

    #[test]
    fn missing_log_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let error = RunReportCollector::new(dir.path())
            .collect_path(Utf8Path::new("missing.jsonl"))
            .expect_err("log does not exist");
        assert!(error.path().ends_with("missing.jsonl"));
    }
}
