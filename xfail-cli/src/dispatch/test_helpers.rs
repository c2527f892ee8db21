// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{XfailApp, common::BaseDir};
use crate::output::{Color, OutputContext, OutputWriter};
use camino::Utf8Path;

pub(super) fn write_file(dir: &Utf8Path, path: &str, contents: &str) {
    let path = dir.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Runs `app` with relative paths resolved against `base_dir`, capturing its output.
///
/// Returns the exit code, standard output and standard error.
pub(super) fn exec_captured(app: XfailApp, base_dir: &Utf8Path) -> (i32, String, String) {
    let output = OutputContext {
        verbose: false,
        color: Color::Never,
    };
    let mut writer = OutputWriter::Test {
        stdout: Vec::new(),
        stderr: Vec::new(),
    };
    let code = match app.exec_in(&BaseDir::new(base_dir), output, &mut writer) {
        Ok(code) => code,
        Err(error) => error.process_exit_code(),
    };
    let OutputWriter::Test { stdout, stderr } = writer else {
        unreachable!("writer is a test writer");
    };
    (
        code,
        String::from_utf8(stdout).unwrap(),
        String::from_utf8(stderr).unwrap(),
    )
}
