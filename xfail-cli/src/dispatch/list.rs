// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::common::BaseDir;
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use xfail_metadata::XfailExitCode;
use xfail_runner::{registry::TestCaseRegistry, reporter::ReporterBuilder, write_str::WriteStr};

#[derive(Debug, Args)]
pub(super) struct ListOpts {
    /// The root directory of the test suite
    #[arg(value_name = "SUITE_ROOT")]
    suite_root: Utf8PathBuf,

    /// Output format
    #[arg(
        short = 'T',
        long,
        value_enum,
        default_value_t,
        value_name = "FMT"
    )]
    message_format: MessageFormat,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormat {
    /// A human-readable summary
    #[default]
    Human,

    /// Pretty-printed JSON
    Json,
}

impl ListOpts {
    pub(super) fn exec(
        self,
        base_dir: &BaseDir,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let registry = TestCaseRegistry::discover(base_dir.resolve(&self.suite_root))?;

        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                let mut builder = ReporterBuilder::default();
                builder
                    .set_colorize(output.color.should_colorize(supports_color::Stream::Stdout))
                    .set_verbose(output.verbose);
                builder.build().write_list(&registry, &mut writer)?;
            }
            MessageFormat::Json => {
                let json = serde_json::to_string_pretty(&registry)
                    .map_err(|err| ExpectedError::serialize_error("test case list", err))?;
                writer.write_str(&json)?;
                writer.write_str("\n")?;
            }
        }
        writer.write_str_flush()?;

        if registry.is_empty() {
            Ok(XfailExitCode::NO_TESTS_FOUND)
        } else {
            Ok(XfailExitCode::OK)
        }
    }
}
