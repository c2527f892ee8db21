// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of test case directories under a suite root.
//!
//! Each immediate subdirectory of the suite root that contains a model file is a test case. A
//! test case is *complete* if all of its required fixtures are present:
//!
//! * the model file (`model.mlir`, or `model.onnx` which is imported first);
//! * the data flagfile, `test_data_flags.txt`;
//! * every file the flagfile references with an `@path` argument, such as
//!   `--input=@input_0.npy`.
//!
//! Incomplete test cases are still listed, along with the files they are missing.

use crate::errors::DiscoverError;
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};
use xfail_metadata::{Stage, TestCaseName};

/// The file name of the data flagfile in each test case directory.
pub const DATA_FLAGFILE_NAME: &str = "test_data_flags.txt";

const NOTES_FILE_NAMES: [&str; 2] = ["notes.txt", "README.md"];

/// The format of a test case's model file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// An MLIR file, compiled directly.
    Mlir,

    /// An ONNX file, imported to MLIR before compilation.
    Onnx,
}

impl ModelKind {
    /// Model kinds in the order they are looked up.
    pub const ALL: [ModelKind; 2] = [ModelKind::Mlir, ModelKind::Onnx];

    /// Returns the file name of a model of this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::Mlir => "model.mlir",
            ModelKind::Onnx => "model.onnx",
        }
    }

    /// Returns the first stage a model of this kind goes through.
    pub fn first_stage(self) -> Stage {
        match self {
            ModelKind::Mlir => Stage::Compile,
            ModelKind::Onnx => Stage::Import,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Mlir => f.write_str("mlir"),
            ModelKind::Onnx => f.write_str("onnx"),
        }
    }
}

/// A single discovered test case.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TestCase {
    name: TestCaseName,
    dir: Utf8PathBuf,
    model_kind: ModelKind,
    fixtures: Vec<Utf8PathBuf>,
    missing: Vec<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl TestCase {
    /// Returns the name of this test case.
    pub fn name(&self) -> &TestCaseName {
        &self.name
    }

    /// Returns the directory of this test case.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the kind of model this test case has.
    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    /// Returns the path to the model file.
    pub fn model_path(&self) -> Utf8PathBuf {
        self.dir.join(self.model_kind.file_name())
    }

    /// Returns the fixture files referenced by the data flagfile, relative to the test directory.
    pub fn fixtures(&self) -> &[Utf8PathBuf] {
        &self.fixtures
    }

    /// Returns the required files that are missing, relative to the test directory.
    pub fn missing(&self) -> &[Utf8PathBuf] {
        &self.missing
    }

    /// Returns true if every required file is present.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Returns the first line of the test's notes, if any.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the first stage this test case goes through.
    pub fn first_stage(&self) -> Stage {
        self.model_kind.first_stage()
    }
}

/// The test cases discovered under a suite root, sorted by name.
#[derive(Clone, Debug, Serialize)]
pub struct TestCaseRegistry {
    root: Utf8PathBuf,
    test_cases: Vec<TestCase>,
}

impl TestCaseRegistry {
    /// Discovers test cases under `root`.
    pub fn discover(root: impl Into<Utf8PathBuf>) -> Result<Self, DiscoverError> {
        let root = root.into();
        let read_dir = root.read_dir_utf8().map_err(|error| DiscoverError::ReadDir {
            path: root.clone(),
            error,
        })?;

        let mut dirs = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| DiscoverError::ReadDir {
                path: root.clone(),
                error,
            })?;
            let is_dir = entry
                .file_type()
                .map_err(|error| DiscoverError::ReadDir {
                    path: root.clone(),
                    error,
                })?
                .is_dir();
            if is_dir {
                dirs.push(entry.into_path());
            }
        }
        dirs.sort_unstable();

        let mut test_cases = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if let Some(test_case) = discover_one(dir)? {
                test_cases.push(test_case);
            }
        }

        debug!("discovered {} test cases under `{root}`", test_cases.len());
        Ok(Self { root, test_cases })
    }

    /// Returns the suite root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the number of test cases.
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    /// Returns true if there are no test cases.
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    /// Iterates over test cases in name order.
    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.test_cases.iter()
    }

    /// Returns the test case with the given name.
    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.test_cases
            .binary_search_by(|test_case| test_case.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.test_cases[index])
    }

    /// Returns the number of incomplete test cases.
    pub fn incomplete_count(&self) -> usize {
        self.test_cases.iter().filter(|t| !t.is_complete()).count()
    }
}

fn discover_one(dir: Utf8PathBuf) -> Result<Option<TestCase>, DiscoverError> {
    let Some(model_kind) = ModelKind::ALL
        .into_iter()
        .find(|kind| dir.join(kind.file_name()).is_file())
    else {
        debug!("skipping `{dir}`: no model file");
        return Ok(None);
    };

    let Some(name) = dir.file_name().and_then(|name| TestCaseName::try_new(name).ok()) else {
        return Ok(None);
    };

    let mut missing = Vec::new();
    let flagfile = dir.join(DATA_FLAGFILE_NAME);
    let fixtures = match std::fs::read_to_string(&flagfile) {
        Ok(contents) => parse_flagfile_fixtures(&contents),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            missing.push(Utf8PathBuf::from(DATA_FLAGFILE_NAME));
            Vec::new()
        }
        Err(error) => {
            return Err(DiscoverError::ReadFlagfile {
                path: flagfile,
                error,
            });
        }
    };

    missing.extend(
        fixtures
            .iter()
            .filter(|fixture| !dir.join(fixture).is_file())
            .cloned(),
    );
    if !missing.is_empty() {
        warn!(
            "test case `{name}` is missing required files: {}",
            missing.iter().join(", "),
        );
    }

    let notes = read_notes(&dir);

    Ok(Some(TestCase {
        name,
        dir,
        model_kind,
        fixtures,
        missing,
        notes,
    }))
}

/// Extracts the files referenced with `@path` arguments from a flagfile.
///
/// Flagfiles contain one flag per line. Both `--flag=@path` and bare `@path` arguments are
/// recognized. Blank lines and lines starting with `#` are ignored.
pub fn parse_flagfile_fixtures(contents: &str) -> Vec<Utf8PathBuf> {
    let mut fixtures: Vec<Utf8PathBuf> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let value = match line.split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => value,
            _ => line,
        };
        if let Some(path) = value.strip_prefix('@').filter(|path| !path.is_empty()) {
            let path = Utf8PathBuf::from(path);
            if !fixtures.contains(&path) {
                fixtures.push(path);
            }
        }
    }
    fixtures
}

fn read_notes(dir: &Utf8Path) -> Option<String> {
    NOTES_FILE_NAMES.into_iter().find_map(|file_name| {
        let contents = std::fs::read_to_string(dir.join(file_name)).ok()?;
        contents
            .lines()
            .map(|line| line.trim().trim_start_matches('#').trim())
            .find(|line| !line.is_empty())
            .map(str::to_owned)
    })
}
