// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, error, fmt, str::FromStr};

/// The name of a test case.
///
/// A test case is identified by the name of its directory under the suite root, for example
/// `test_abs`. Names are never empty.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TestCaseName(SmolStr);

impl TestCaseName {
    /// Creates a new `TestCaseName`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty. Use [`TestCaseName::try_new`] for untrusted input.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self::try_new(name).expect("test case name is non-empty")
    }

    /// Creates a new `TestCaseName`, returning an error if `name` is empty.
    pub fn try_new(name: impl AsRef<str>) -> Result<Self, EmptyTestCaseName> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(EmptyTestCaseName)
        } else {
            Ok(Self(name.into()))
        }
    }

    /// Returns the name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestCaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestCaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TestCaseName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TestCaseName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = SmolStr::deserialize(deserializer)?;
        Self::try_new(name).map_err(serde::de::Error::custom)
    }
}

/// An empty string was used as a test case name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EmptyTestCaseName;

impl fmt::Display for EmptyTestCaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("test case name must not be empty")
    }
}

impl error::Error for EmptyTestCaseName {}

/// A pipeline stage at which a test case can fail.
///
/// Stages are ordered by their position in the pipeline: `import < compile < run`. A failure at
/// an earlier stage preempts observation of later stages.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Importing the model into the compiler's input format.
    Import,

    /// Compiling the imported model.
    Compile,

    /// Running the compiled module against the test's input and output fixtures.
    Run,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Import, Stage::Compile, Stage::Run];

    /// Returns the string used for this stage in documents and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Import => "import",
            Stage::Compile => "compile",
            Stage::Run => "run",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| StageParseError {
                input: s.to_owned(),
            })
    }
}

/// An error returned while parsing a [`Stage`] from a string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StageParseError {
    input: String,
}

impl fmt::Display for StageParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized stage `{}` (known stages: import, compile, run)",
            self.input
        )
    }
}

impl error::Error for StageParseError {}

/// The observed result of a single stage of a test case.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The stage completed successfully.
    Passed,

    /// The stage ran and reported a failure.
    Failed,

    /// The stage could not be carried out, for example because a tool could not be started or
    /// timed out.
    Errored,

    /// The stage was not attempted.
    Skipped,
}

impl Outcome {
    /// Returns true if this outcome counts as a failure for expected-failure bookkeeping.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Errored)
    }

    /// Returns the string used for this outcome in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Errored => "errored",
            Outcome::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a run-outcome log.
///
/// Outcome logs are in the [JSON Lines](https://jsonlines.org) format, with one record per line.
/// Each record describes a (test case, stage) pair:
///
/// ```json
/// {"test_case":"test_abs","stage":"compile","outcome":"failed","message":"exit code 1"}
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct OutcomeRecord {
    /// The test case this record is for.
    pub test_case: TestCaseName,

    /// The stage this record is for.
    pub stage: Stage,

    /// What happened at this stage.
    pub outcome: Outcome,

    /// An optional human-readable summary, typically the first lines of a tool's diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OutcomeRecord {
    /// Creates a new record without a message.
    pub fn new(test_case: TestCaseName, stage: Stage, outcome: Outcome) -> Self {
        Self {
            test_case,
            stage,
            outcome,
            message: None,
        }
    }

    /// Sets the message for this record.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Parses a single line of an outcome log.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Serializes this record as a single line of an outcome log, without a trailing newline.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
