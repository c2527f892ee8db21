// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TargetConfig;
use crate::errors::{ConfigLoadError, ConfigWriteError};
use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::BTreeSet, io::Write};
use tracing::{debug, warn};

/// Loads and saves configuration documents.
///
/// Relative paths are resolved against the base directory passed in at construction time.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    base_dir: Utf8PathBuf,
}

impl ConfigStore {
    /// Creates a new store that resolves relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolves a possibly-relative path against the base directory.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.base_dir.join(path)
    }

    /// Loads the configuration document at `path`.
    ///
    /// Unknown keys in the document are reported as warnings and otherwise ignored.
    pub fn load(&self, path: &Utf8Path) -> Result<TargetConfig, ConfigLoadError> {
        let path = self.resolve(path);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigLoadError::NotFound { path });
            }
            Err(error) => return Err(ConfigLoadError::Read { path, error }),
        };

        let (config, ignored) = parse_document(&contents)
            .map_err(|error| ConfigLoadError::Parse {
                path: path.clone(),
                error: Box::new(error),
            })?;

        for key in ignored {
            warn!("in config file `{path}`, ignoring unknown key `{key}`");
        }
        debug!(
            "loaded config `{}` from `{path}` ({} expected failures)",
            config.config_name,
            config.expected_failures.len(),
        );

        Ok(config)
    }

    /// Saves `config` to `path`, replacing any existing document atomically.
    ///
    /// Missing parent directories are created.
    pub fn save(&self, path: &Utf8Path, config: &TargetConfig) -> Result<(), ConfigWriteError> {
        let path = self.resolve(path);
        let contents = to_document_string(config).map_err(|error| ConfigWriteError::Serialize {
            path: path.clone(),
            error,
        })?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| ConfigWriteError::CreateDir {
                path: parent.to_owned(),
                error,
            })?;
        }

        atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(contents.as_bytes()))
            .map_err(|error| ConfigWriteError::Write {
                path: path.clone(),
                error,
            })?;

        debug!(
            "saved config `{}` to `{path}` ({} expected failures)",
            config.config_name,
            config.expected_failures.len(),
        );
        Ok(())
    }
}

/// Serializes a configuration to its canonical document form.
///
/// The output is pretty-printed JSON with a trailing newline. Ledger entries and skip lists are
/// sorted by test case name.
pub fn to_document_string(config: &TargetConfig) -> Result<String, serde_json::Error> {
    let mut contents = serde_json::to_string_pretty(config)?;
    contents.push('\n');
    Ok(contents)
}

/// Parses a configuration document from a string.
///
/// Returns the configuration along with the paths of any keys that were ignored.
pub fn parse_document(
    contents: &str,
) -> Result<(TargetConfig, BTreeSet<String>), serde_path_to_error::Error<serde_json::Error>> {
    let mut json_de = serde_json::Deserializer::from_str(contents);

    let mut ignored = BTreeSet::new();
    let mut cb = |path: serde_ignored::Path| {
        ignored.insert(path.to_string());
    };
    let ignored_de = serde_ignored::Deserializer::new(&mut json_de, &mut cb);
    let config: TargetConfig = serde_path_to_error::deserialize(ignored_de)?;

    // Reject trailing data after the document.
    json_de.end().map_err(|error| {
        serde_path_to_error::Error::new(serde_path_to_error::Track::new().path(), error)
    })?;

    Ok((config, ignored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpectedFailure;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use proptest::{collection, prelude::*};
    use test_strategy::proptest;
    use xfail_metadata::{Stage, TestCaseName};

    fn sample_config() -> TargetConfig {
        let mut config = TargetConfig::new("gpu_vulkan");
        config.compile_flags = vec!["--iree-hal-target-backends=vulkan-spirv".to_owned()];
        config.run_flags = vec!["--device=vulkan".to_owned()];
        config.skip_run_tests.insert(TestCaseName::new("test_slow"));
        config.expected_failures.insert(
            TestCaseName::new("test_zeta"),
            ExpectedFailure::with_reason(Stage::Run, "numerics: ±1e-3 drift, 精度"),
        );
        config
            .expected_failures
            .insert(TestCaseName::new("test_alpha"), ExpectedFailure::new(Stage::Compile));
        config
    }

    #[test]
    fn save_then_load() {
        let dir = Utf8TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        let config = sample_config();

        store
            .save(Utf8Path::new("configs/gpu.json"), &config)
            .expect("save succeeded");
        let loaded = store
            .load(Utf8Path::new("configs/gpu.json"))
            .expect("load succeeded");
        assert_eq!(loaded, config);

        // Saving the loaded config produces identical bytes.
        let first = std::fs::read_to_string(dir.path().join("configs/gpu.json")).unwrap();
        store
            .save(Utf8Path::new("configs/gpu.json"), &loaded)
            .unwrap();
        let second = std::fs::read_to_string(dir.path().join("configs/gpu.json")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn save_then_load_empty_ledger() {
        let dir = Utf8TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        let config = TargetConfig::new("cpu_llvm_sync");

        store
            .save(Utf8Path::new("config_cpu_llvm_sync.json"), &config)
            .expect("save succeeded");
        let contents =
            std::fs::read_to_string(dir.path().join("config_cpu_llvm_sync.json")).unwrap();
        assert!(
            contents.contains(r#""expected_failures": {}"#),
            "empty ledger is written out:\n{contents}"
        );

        let loaded = store
            .load(Utf8Path::new("config_cpu_llvm_sync.json"))
            .expect("load succeeded");
        assert_eq!(loaded, config);
        assert!(loaded.expected_failures.is_empty());
    }

    fn arb_config() -> impl Strategy<Value = TargetConfig> {
        (
            "[a-z_]{1,12}",
            collection::vec("--[a-z-]{1,8}(=[a-z0-9 ]{0,6})?", 0..4),
            collection::vec("--[a-z-]{1,8}(=[a-z0-9 ]{0,6})?", 0..4),
            collection::btree_set(any::<TestCaseName>(), 0..3),
            collection::btree_set(any::<TestCaseName>(), 0..3),
            collection::btree_map(
                any::<TestCaseName>(),
                (any::<Stage>(), proptest::option::of("\\PC{0,16}")),
                0..6,
            ),
        )
            .prop_map(
                |(config_name, compile_flags, run_flags, skip_compile, skip_run, ledger)| {
                    TargetConfig {
                        config_name,
                        compile_flags,
                        run_flags,
                        skip_compile_tests: skip_compile,
                        skip_run_tests: skip_run,
                        expected_failures: ledger
                            .into_iter()
                            .map(|(name, (stage, reason))| {
                                (name, ExpectedFailure { stage, reason })
                            })
                            .collect(),
                    }
                },
            )
    }

    #[proptest(cases = 64)]
    fn load_inverts_save(#[strategy(arb_config())] config: TargetConfig) {
        let dir = Utf8TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());

        store.save(Utf8Path::new("config.json"), &config).unwrap();
        let loaded = store.load(Utf8Path::new("config.json")).unwrap();
        prop_assert_eq!(loaded, config);
    }

    #[test]
    fn save_is_sorted() {
        let contents = to_document_string(&sample_config()).unwrap();
        let alpha = contents.find("test_alpha").unwrap();
        let zeta = contents.find("test_zeta").unwrap();
        assert!(alpha < zeta, "ledger sorted by name:\n{contents}");
        assert!(contents.ends_with("}\n"));
    }

    #[test]
    fn load_not_found() {
        let dir = Utf8TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        let error = store
            .load(Utf8Path::new("missing.json"))
            .expect_err("missing file");
        assert!(
            matches!(
                error,
                ConfigLoadError::NotFound { ref path } if path.ends_with("missing.json")
            ),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn load_reports_parse_path() {
        let dir = Utf8TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());

        let cases = [
            (
                "wrong-stage.json",
                indoc! {r#"
                    {
                      "config_name": "cpu",
                      "compile_flags": [],
                      "run_flags": [],
                      "expected_failures": { "test_abs": { "stage": "link" } }
                    }
                "#},
                "expected_failures.test_abs.stage",
            ),
            (
                "missing-field.json",
                indoc! {r#"
                    { "config_name": "cpu", "compile_flags": [], "expected_failures": {} }
                "#},
                "missing field `run_flags`",
            ),
            (
                "wrong-type.json",
                indoc! {r#"
                    {
                      "config_name": "cpu",
                      "compile_flags": "--flag",
                      "run_flags": [],
                      "expected_failures": {}
                    }
                "#},
                "compile_flags",
            ),
            (
                "duplicate.json",
                indoc! {r#"
                    {
                      "config_name": "cpu",
                      "compile_flags": [],
                      "run_flags": [],
                      "expected_failures": {
                        "test_abs": { "stage": "run" },
                        "test_abs": { "stage": "compile" }
                      }
                    }
                "#},
                "duplicate test case `test_abs`",
            ),
            (
                "trailing.json",
                r#"{"config_name":"cpu","compile_flags":[],"run_flags":[],"expected_failures":{}} {}"#,
                "trailing characters",
            ),
        ];

        for (file_name, contents, expected) in cases {
            std::fs::write(dir.path().join(file_name), contents).unwrap();
            let error = store
                .load(Utf8Path::new(file_name))
                .expect_err("document is invalid");
            let ConfigLoadError::Parse { error, .. } = &error else {
                panic!("for {file_name}, expected a parse error, found {error:?}");
            };
            let message = format!("{}: {}", error.path(), error.inner());
            assert!(
                message.contains(expected),
                "for {file_name}, expected `{expected}` in `{message}`"
            );
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (config, ignored) = parse_document(indoc! {r#"
            {
              "config_name": "cpu",
              "iree_compile_flags": [],
              "compile_flags": [],
              "run_flags": [],
              "expected_failures": { "test_abs": { "stage": "run", "owner": "someone" } }
            }
        "#})
        .expect("unknown keys are not fatal");

        assert_eq!(config.expected_failures.stage_of("test_abs"), Some(Stage::Run));
        assert_eq!(
            ignored.into_iter().collect::<Vec<_>>(),
            ["expected_failures.test_abs.owner", "iree_compile_flags"],
        );
    }
}
