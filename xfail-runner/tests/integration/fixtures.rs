// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use xfail_metadata::{Outcome, OutcomeRecord, Stage, TestCaseName};

pub(crate) fn test_init() {
    // Installation fails if another test already installed the hooks.
    let _ = color_eyre::install();
}

pub(crate) fn write_file(dir: &Utf8Path, path: &str, contents: &str) {
    let path = dir.join(path);
    std::fs::create_dir_all(path.parent().expect("path has a parent")).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[cfg(unix)]
/// Writes a complete MLIR test case with a single input fixture.
pub(crate) fn write_mlir_test(root: &Utf8Path, name: &str) {
    write_file(root, &format!("{name}/model.mlir"), "");
    write_file(
        root,
        &format!("{name}/test_data_flags.txt"),
        "--input=@input_0.npy\n",
    );
    write_file(root, &format!("{name}/input_0.npy"), "");
}

#[cfg(unix)]
/// Writes a complete ONNX test case with a single input fixture.
pub(crate) fn write_onnx_test(root: &Utf8Path, name: &str) {
    write_file(root, &format!("{name}/model.onnx"), "");
    write_file(
        root,
        &format!("{name}/test_data_flags.txt"),
        "--input=@input_0.npy\n",
    );
    write_file(root, &format!("{name}/input_0.npy"), "");
}

pub(crate) fn record(test_case: &str, stage: Stage, outcome: Outcome) -> OutcomeRecord {
    OutcomeRecord::new(TestCaseName::new(test_case), stage, outcome)
}
