// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings for processing the debug-ID and hash locales.
//!
//! Settings are read from a TOML file shared by all localization
//! scripts. Each script has its own section, and task lists may
//! override it for a single run:
//!
//! ```toml
//! [script-parameters.test-lang]
//! loc_targets = ["Game", "Audio"]
//! hash_prefix = "‹"
//! hash_suffix = "›"
//!
//! [[nightly]]
//! script = "test-lang"
//!
//! [nightly.script-parameters]
//! clear_translations = true
//! ```
//!
//! Keys starting with `_` are ignored, which is handy for commenting
//! out a setting while keeping its value around.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::debug_id::DebugIdProcessor;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::pseudo::{ProtectedSpans, PseudoLocalizer};
use crate::rules::{AdditionRule, DeletionRule, RuleField, RuleSet};

/// The section name used when no other script name is given.
pub const DEFAULT_SCRIPT: &str = "test-lang";

/// Upper bound for `hash_expansion`, in percent.
pub const MAX_HASH_EXPANSION: u32 = 1000;

const DEFAULT_LEDGER_FILE: &str = "locsync-ledger.json";

const PLURAL_HINT: &str = "Please adapt to your language plural rules. We only support \
    keywords: zero, one, two, few, many, other.\n\
    Use Alt + C on Crowdin to create a skeleton adapted to your language grammar.\n\
    Translate only white text in curly braces. Test using the form below the Preview box.\n\
    Check what keywords stand for here: \
    http://www.unicode.org/cldr/charts/29/supplemental/language_plural_rules.html.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Localization targets to process.
    pub loc_targets: Vec<String>,
    /// The `Content` directory of the project.
    pub content_dir: PathBuf,
    /// Locale receiving debug identifiers, empty to skip it.
    #[serde(alias = "debug_ID_locale")]
    pub debug_id_locale: String,
    /// Locale receiving hash markers, empty to skip it.
    pub hash_locale: String,

    pub debug_prefix: String,
    /// Number of digits in an identifier. Changing it requires
    /// `clear_translations`.
    pub id_length: usize,
    /// Forget all identifiers and number every string from scratch.
    pub clear_translations: bool,

    pub hash_prefix: String,
    pub hash_suffix: String,
    /// Replaces `hash_prefix` for strings which are no longer used.
    pub hash_not_used_marker: String,
    pub hash_filler: String,
    /// Filler length in percent of the translatable text.
    pub hash_expansion: u32,

    /// Format variables such as `{Count}`.
    pub var_regex: String,
    /// Empty inline tags such as `<img id="Coin"/>`.
    pub tags_regex: String,

    pub comments_criteria: Vec<AdditionRule>,
    pub delete_comments_criteria: Vec<DeletionRule>,
    pub delete_occurrences: bool,
    pub sort_po: bool,
    pub encoding: String,

    /// Where identifiers are kept between runs, see
    /// [`Config::ledger_path`] for the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_file: Option<PathBuf>,
    /// Stop at the first failing target instead of logging and
    /// continuing with the next one.
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            loc_targets: vec![String::from("Game")],
            content_dir: PathBuf::from("../"),
            debug_id_locale: String::from("io"),
            hash_locale: String::from("ia-001"),
            debug_prefix: String::from("#"),
            id_length: 4,
            clear_translations: false,
            hash_prefix: String::from("# "),
            hash_suffix: String::from(" ~"),
            hash_not_used_marker: String::new(),
            hash_filler: String::new(),
            hash_expansion: 0,
            var_regex: String::from(r"\{[^}\[<]+\}"),
            tags_regex: String::from(r"<[^/>]+/>"),
            comments_criteria: vec![AdditionRule(
                RuleField::Msgid,
                String::from(r"\}\|plural\("),
                String::from(PLURAL_HINT),
            )],
            delete_comments_criteria: Vec::new(),
            delete_occurrences: false,
            sort_po: true,
            encoding: String::from("utf-8-sig"),
            ledger_file: None,
            fail_fast: false,
        }
    }
}

/// Copy the settings of `table` into `merged`, skipping `_` keys.
fn merge_parameters(merged: &mut Table, table: &Table) {
    for (key, value) in table {
        if !key.starts_with('_') {
            merged.insert(key.clone(), value.clone());
        }
    }
}

fn parameters_table<'a>(value: &'a Value, section: &str) -> Result<&'a Table> {
    value
        .as_table()
        .ok_or_else(|| Error::Config(format!("{section} must be a table")))
}

impl Config {
    /// Read the settings of `script` from a TOML document.
    ///
    /// Built-in defaults are overridden by `[script-parameters.<script>]`,
    /// which in turn is overridden by the `script-parameters` of the
    /// entry of `task_list` whose `script` is `script`.
    pub fn from_toml_str(text: &str, script: &str, task_list: Option<&str>) -> Result<Self> {
        let document: Table = toml::from_str(text)?;
        let mut merged = Table::new();

        if let Some(sections) = document.get("script-parameters") {
            let sections = parameters_table(sections, "script-parameters")?;
            if let Some(parameters) = sections.get(script) {
                let section = format!("script-parameters.{script}");
                merge_parameters(&mut merged, parameters_table(parameters, &section)?);
            }
        }

        if let Some(task_list) = task_list {
            let tasks = match document.get(task_list) {
                Some(Value::Array(tasks)) => tasks.as_slice(),
                Some(_) => {
                    return Err(Error::Config(format!(
                        "task list {task_list} must be an array of tables"
                    )))
                }
                None => {
                    return Err(Error::Config(format!("task list {task_list} not found")))
                }
            };
            let task = tasks
                .iter()
                .find(|task| task.get("script").and_then(Value::as_str) == Some(script));
            if let Some(parameters) = task.and_then(|task| task.get("script-parameters")) {
                let section = format!("{task_list}.script-parameters");
                merge_parameters(&mut merged, parameters_table(parameters, &section)?);
                info!("Updated parameters from the {task_list} task list");
            }
        }

        Ok(Value::Table(merged).try_into()?)
    }

    /// Read the settings of `script` from `path`. A missing file gives
    /// the defaults.
    pub fn load(path: &Path, script: &str, task_list: Option<&str>) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, script, task_list),
            Err(err) if err.kind() == io::ErrorKind::NotFound && task_list.is_none() => {
                info!("No config file {}, using defaults", path.display());
                Ok(Config::default())
            }
            Err(err) => Err(Error::io(path, err)),
        }
    }

    /// Check the settings which can be checked without touching files.
    pub fn validate(&self) -> Result<()> {
        if self.id_length == 0 || self.id_length > 9 {
            return Err(Error::Config(format!(
                "id_length must be between 1 and 9, got {}",
                self.id_length
            )));
        }
        if self.debug_prefix.is_empty() {
            return Err(Error::Config(String::from("debug_prefix must not be empty")));
        }
        if self.hash_expansion > MAX_HASH_EXPANSION {
            return Err(Error::Config(format!(
                "hash_expansion must be at most {MAX_HASH_EXPANSION}, got {}",
                self.hash_expansion
            )));
        }
        if self.debug_id_locale.is_empty() && self.hash_locale.is_empty() {
            return Err(Error::Config(String::from(
                "at least one of debug_id_locale and hash_locale must be set",
            )));
        }
        self.text_encoding()?;
        self.rule_set()?;
        self.protected_spans()?;
        Ok(())
    }

    pub fn text_encoding(&self) -> Result<TextEncoding> {
        self.encoding.parse()
    }

    pub fn rule_set(&self) -> Result<RuleSet> {
        RuleSet::compile(
            &self.comments_criteria,
            &self.delete_comments_criteria,
            self.delete_occurrences,
        )
    }

    pub fn protected_spans(&self) -> Result<ProtectedSpans> {
        ProtectedSpans::new(&self.var_regex, &self.tags_regex)
    }

    pub fn debug_id_processor(&self) -> Result<DebugIdProcessor> {
        Ok(DebugIdProcessor::new(self.rule_set()?, self.protected_spans()?)
            .with_sort(self.sort_po)
            .with_clear_translations(self.clear_translations))
    }

    pub fn pseudo_localizer(&self) -> Result<PseudoLocalizer> {
        Ok(
            PseudoLocalizer::new(self.protected_spans()?, &self.hash_prefix, &self.hash_suffix)
                .with_not_used_marker(&self.hash_not_used_marker)
                .with_filler(&self.hash_filler, self.hash_expansion),
        )
    }

    /// The ledger file: `ledger_file` when set, otherwise
    /// `<content_dir>/Localization/locsync-ledger.json`.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_file.clone().unwrap_or_else(|| {
            self.content_dir
                .join("Localization")
                .join(DEFAULT_LEDGER_FILE)
        })
    }

    fn catalog_path(&self, target: &str, locale: &str) -> Option<PathBuf> {
        if locale.is_empty() {
            return None;
        }
        Some(
            self.content_dir
                .join("Localization")
                .join(target)
                .join(locale)
                .join(format!("{target}.po")),
        )
    }

    /// `<content_dir>/Localization/<target>/<debug_id_locale>/<target>.po`
    pub fn debug_id_path(&self, target: &str) -> Option<PathBuf> {
        self.catalog_path(target, &self.debug_id_locale)
    }

    pub fn hash_path(&self, target: &str) -> Option<PathBuf> {
        self.catalog_path(target, &self.hash_locale)
    }
}
