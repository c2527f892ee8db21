// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
};
use std::{
    collections::{BTreeMap, BTreeSet, btree_map},
    fmt,
};
use xfail_metadata::{Stage, TestCaseName};

/// Configuration for a single target: a backend, device and execution mode combination.
///
/// This is the in-memory form of a configuration document. Documents are JSON:
///
/// ```json
/// {
///   "config_name": "cpu_llvm_task",
///   "compile_flags": ["--iree-hal-target-backends=llvm-cpu"],
///   "run_flags": ["--device=local-task"],
///   "skip_compile_tests": [],
///   "skip_run_tests": [],
///   "expected_failures": {
///     "test_abs": { "stage": "compile", "reason": "unsupported op" }
///   }
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TargetConfig {
    /// The name of this configuration, used to label outputs.
    pub config_name: String,

    /// Flags passed to the compiler, in order.
    pub compile_flags: Vec<String>,

    /// Flags passed to the runtime, in order.
    pub run_flags: Vec<String>,

    /// Tests that are not compiled (or run) at all under this configuration.
    #[serde(default)]
    pub skip_compile_tests: BTreeSet<TestCaseName>,

    /// Tests that are compiled but not run under this configuration.
    #[serde(default)]
    pub skip_run_tests: BTreeSet<TestCaseName>,

    /// The expected-failure ledger.
    pub expected_failures: ExpectedFailures,
}

impl TargetConfig {
    /// Creates a configuration with no flags, skips or expected failures.
    pub fn new(config_name: impl Into<String>) -> Self {
        Self {
            config_name: config_name.into(),
            compile_flags: Vec::new(),
            run_flags: Vec::new(),
            skip_compile_tests: BTreeSet::new(),
            skip_run_tests: BTreeSet::new(),
            expected_failures: ExpectedFailures::new(),
        }
    }

    /// Returns a copy of this configuration with the ledger replaced.
    pub fn with_expected_failures(&self, expected_failures: ExpectedFailures) -> Self {
        Self {
            expected_failures,
            ..self.clone()
        }
    }
}

/// A single entry in the expected-failure ledger.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExpectedFailure {
    /// The stage at which the test case is expected to fail.
    pub stage: Stage,

    /// Free-form text explaining the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExpectedFailure {
    /// Creates a new entry without a reason.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            reason: None,
        }
    }

    /// Creates a new entry with a reason.
    pub fn with_reason(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: Some(reason.into()),
        }
    }
}

/// The expected-failure ledger: test cases that are allowed to fail, and where.
///
/// A test case appears at most once. Iteration and serialization are ordered by test case name,
/// so that documents produced from the same ledger are byte-for-byte identical.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpectedFailures {
    entries: BTreeMap<TestCaseName, ExpectedFailure>,
}

impl ExpectedFailures {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for a test case.
    pub fn get(&self, test_case: &str) -> Option<&ExpectedFailure> {
        self.entries.get(test_case)
    }

    /// Returns true if the test case has an entry.
    pub fn contains(&self, test_case: &str) -> bool {
        self.entries.contains_key(test_case)
    }

    /// Returns the stage at which the test case is expected to fail, if any.
    pub fn stage_of(&self, test_case: &str) -> Option<Stage> {
        self.get(test_case).map(|entry| entry.stage)
    }

    /// Inserts an entry, returning the previous entry for the test case if there was one.
    pub fn insert(
        &mut self,
        test_case: TestCaseName,
        entry: ExpectedFailure,
    ) -> Option<ExpectedFailure> {
        self.entries.insert(test_case, entry)
    }

    /// Iterates over entries in test case order.
    pub fn iter(&self) -> btree_map::Iter<'_, TestCaseName, ExpectedFailure> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ExpectedFailures {
    type Item = (&'a TestCaseName, &'a ExpectedFailure);
    type IntoIter = btree_map::Iter<'a, TestCaseName, ExpectedFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(TestCaseName, ExpectedFailure)> for ExpectedFailures {
    fn from_iter<T: IntoIterator<Item = (TestCaseName, ExpectedFailure)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for ExpectedFailures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExpectedFailures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ExpectedFailuresVisitor)
    }
}

// JSON objects may repeat keys, and a plain map deserializer would silently keep the last one.
// A repeated test case in a ledger is almost always a merge accident, so it is rejected.
struct ExpectedFailuresVisitor;

impl<'de> Visitor<'de> for ExpectedFailuresVisitor {
    type Value = ExpectedFailures;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from test case names to expected failures")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some(test_case) = map.next_key::<TestCaseName>()? {
            match entries.entry(test_case) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(map.next_value::<ExpectedFailure>()?);
                }
                btree_map::Entry::Occupied(entry) => {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate test case `{}` in expected failures",
                        entry.key()
                    )));
                }
            }
        }
        Ok(ExpectedFailures { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use maplit::btreeset;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_document() {
        let input = indoc! {r#"
            {
              "config_name": "cpu_llvm_task",
              "compile_flags": ["--iree-hal-target-backends=llvm-cpu"],
              "run_flags": ["--device=local-task"],
              "skip_run_tests": ["test_slow"],
              "expected_failures": {
                "test_add": { "stage": "run" },
                "test_abs": { "stage": "compile", "reason": "unsupported op" }
              }
            }
        "#};

        let config: TargetConfig = serde_json::from_str(input).expect("valid document");
        assert_eq!(config.config_name, "cpu_llvm_task");
        assert_eq!(config.compile_flags, ["--iree-hal-target-backends=llvm-cpu"]);
        assert_eq!(config.run_flags, ["--device=local-task"]);
        assert!(config.skip_compile_tests.is_empty());
        assert_eq!(config.skip_run_tests, btreeset! {TestCaseName::new("test_slow")});

        let entries: Vec<_> = config
            .expected_failures
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.stage))
            .collect();
        assert_eq!(
            entries,
            [("test_abs", Stage::Compile), ("test_add", Stage::Run)],
            "entries are ordered by name",
        );
        assert_eq!(
            config.expected_failures.get("test_abs"),
            Some(&ExpectedFailure::with_reason(Stage::Compile, "unsupported op")),
        );
    }

    #[test]
    fn duplicate_ledger_key_rejected() {
        let input = indoc! {r#"
            {
              "test_abs": { "stage": "compile" },
              "test_abs": { "stage": "run" }
            }
        "#};
        let error = serde_json::from_str::<ExpectedFailures>(input).expect_err("duplicate key");
        assert!(
            error.to_string().contains("duplicate test case `test_abs`"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn serialize_omits_missing_reason() {
        let ledger: ExpectedFailures = [
            (TestCaseName::new("test_b"), ExpectedFailure::new(Stage::Run)),
            (
                TestCaseName::new("test_a"),
                ExpectedFailure::with_reason(Stage::Import, "no importer"),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            serde_json::to_string(&ledger).unwrap(),
            r#"{"test_a":{"stage":"import","reason":"no importer"},"test_b":{"stage":"run"}}"#,
        );
    }
}
