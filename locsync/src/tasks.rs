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

//! Process the debug-ID and hash locales of every localization target.

use std::fs;
use std::path::Path;

use log::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::debug_id::DebugIdProcessor;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::identity::Ledger;
use crate::po;
use crate::pseudo::{pseudo_localize_catalog, PseudoLocalizer};
use crate::util::write_atomic;

/// Which locale of a target a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleKind {
    DebugId,
    Hash,
}

/// A target which could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub target: String,
    pub locale: LocaleKind,
    pub message: String,
}

/// The outcome of [`process_locales`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Targets whose debug-ID catalog was written.
    pub debug_id_processed: Vec<String>,
    /// Targets whose hash catalog was written.
    pub hash_processed: Vec<String>,
    pub failures: Vec<TargetFailure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn read_catalog(path: &Path, encoding: TextEncoding) -> Result<Catalog> {
    let bytes = fs::read(path).map_err(|err| Error::io(path, err))?;
    po::parse(&encoding.decode(&bytes)?)
}

fn write_catalog(path: &Path, catalog: &Catalog, encoding: TextEncoding) -> Result<()> {
    let bytes = encoding.encode(&po::serialize(catalog))?;
    write_atomic(path, &bytes)
}

/// The ledger to continue from.
///
/// With `clear_translations` numbering starts over. Otherwise the
/// ledger file is loaded when there is one, and identifiers found in
/// the existing debug-ID catalogs are added to it.
fn open_ledger(config: &Config, encoding: TextEncoding) -> Result<Ledger> {
    let path = config.ledger_path();
    let existing = if path.exists() {
        Some(Ledger::load(&path)?)
    } else {
        None
    };

    if config.clear_translations {
        let mut ledger = existing.unwrap_or_else(|| {
            Ledger::new(config.debug_prefix.as_str(), config.id_length)
        });
        if ledger.check_format(&config.debug_prefix, config.id_length).is_err() {
            info!("Identifier format changed, starting a new ledger");
            ledger = Ledger::new(config.debug_prefix.as_str(), config.id_length);
        }
        ledger.reset();
        return Ok(ledger);
    }

    let mut ledger = match existing {
        Some(ledger) => {
            ledger.check_format(&config.debug_prefix, config.id_length)?;
            ledger
        }
        None => Ledger::new(config.debug_prefix.as_str(), config.id_length),
    };
    for target in &config.loc_targets {
        let Some(path) = config.debug_id_path(target) else {
            continue;
        };
        if !path.exists() {
            continue;
        }
        match read_catalog(&path, encoding) {
            Ok(catalog) => ledger.seed_from_catalog(&catalog),
            Err(err) => warn!("Cannot read IDs from {}: {err}", path.display()),
        }
    }
    info!(
        "Ledger has {} IDs, next ID: {}",
        ledger.len(),
        ledger.format_id(ledger.next_number())
    );
    Ok(ledger)
}

fn process_debug_id_file(
    path: &Path,
    processor: &DebugIdProcessor,
    ledger: &mut Ledger,
    encoding: TextEncoding,
) -> Result<()> {
    info!("Debug IDs PO file: {}", path.display());
    let catalog = read_catalog(path, encoding)?;
    let processed = processor.process(&catalog, ledger)?;
    write_catalog(path, &processed, encoding)?;
    info!("Saved target file: {}", path.display());
    Ok(())
}

fn process_hash_file(path: &Path, localizer: &PseudoLocalizer, encoding: TextEncoding) -> Result<()> {
    info!("Hash locale PO file: {}", path.display());
    let catalog = read_catalog(path, encoding)?;
    let localized = pseudo_localize_catalog(&catalog, localizer);
    write_catalog(path, &localized, encoding)?;
    info!("Saved target hash locale file: {}", path.display());
    Ok(())
}

/// Record a failed target, or give up when `fail_fast` is set.
fn record_failure(
    config: &Config,
    report: &mut Report,
    target: &str,
    locale: LocaleKind,
    err: Error,
) -> Result<()> {
    if config.fail_fast {
        return Err(err);
    }
    error!("Target {target} ({locale:?}) failed: {err}");
    report.failures.push(TargetFailure {
        target: target.to_owned(),
        locale,
        message: err.to_string(),
    });
    Ok(())
}

fn process_targets(
    config: &Config,
    ledger: &mut Option<Ledger>,
    report: &mut Report,
) -> Result<()> {
    let encoding = config.text_encoding()?;
    let processor = config.debug_id_processor()?;
    let localizer = config.pseudo_localizer()?;
    info!(
        "Hash symbols added ({}): `{}` and `{}`",
        config.hash_prefix.chars().count() + config.hash_suffix.chars().count(),
        config.hash_prefix,
        config.hash_suffix
    );

    for target in &config.loc_targets {
        info!("Processing target: {target}");
        if let (Some(path), Some(ledger)) = (config.debug_id_path(target), ledger.as_mut()) {
            match process_debug_id_file(&path, &processor, ledger, encoding) {
                Ok(()) => report.debug_id_processed.push(target.clone()),
                Err(err) => record_failure(config, report, target, LocaleKind::DebugId, err)?,
            }
        }
        if let Some(path) = config.hash_path(target) {
            match process_hash_file(&path, &localizer, encoding) {
                Ok(()) => report.hash_processed.push(target.clone()),
                Err(err) => record_failure(config, report, target, LocaleKind::Hash, err)?,
            }
        }
    }
    Ok(())
}

/// Rewrite the debug-ID and hash catalogs of all configured targets.
///
/// Targets are processed one after the other and share one ledger.
/// A catalog is only written after all of its stages succeeded. A
/// failing target is recorded in the report, or ends the run when
/// `fail_fast` is set. The ledger is saved in both cases so it always
/// matches the catalogs written so far.
pub fn process_locales(config: &Config) -> Result<Report> {
    config.validate()?;
    info!("Content path: {}", config.content_dir.display());

    let encoding = config.text_encoding()?;
    let mut ledger = if config.debug_id_locale.is_empty() {
        None
    } else {
        Some(open_ledger(config, encoding)?)
    };

    let mut report = Report::default();
    let outcome = process_targets(config, &mut ledger, &mut report);

    if let Some(ledger) = &ledger {
        let path = config.ledger_path();
        ledger.save(&path)?;
        info!("Saved ledger: {}", path.display());
    }
    outcome?;

    let targets = config.loc_targets.len();
    if !config.debug_id_locale.is_empty() && report.debug_id_processed.len() != targets {
        error!(
            "Not all debug locales have been processed: {} out of {targets}",
            report.debug_id_processed.len()
        );
    }
    if !config.hash_locale.is_empty() && report.hash_processed.len() != targets {
        error!(
            "Not all hash locales have been processed: {} out of {targets}",
            report.hash_processed.len()
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityAssigner;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn export(language: &str, entries: &str) -> String {
        format!(
            "msgid \"\"\n\
             msgstr \"\"\n\
             \"Project-Id-Version: Game\\n\"\n\
             \"Language: {language}\\n\"\n\
             \n\
             {entries}"
        )
    }

    const ENTRIES: &str = "\
#. Key:\tQuit
#. InfoMetaData:\t\"Char Limit\" : \"12\"
#: /Game/UI/Title.Title_C:WidgetTree.Quit.Text
msgctxt \"UI,Quit\"
msgid \"Quit\"
msgstr \"\"

#. Key:\tContinue
#: /Game/UI/Pause.Pause_C:WidgetTree.Continue.Text
msgctxt \"UI,Continue\"
msgid \"Continue\"
msgstr \"\"

#. Key:\tContinueTitle
#: /Game/UI/Title.Title_C:WidgetTree.Continue.Text
msgctxt \"UI,ContinueTitle\"
msgid \"Continue\"
msgstr \"\"

#. Key:\tPickup
#: Source/Game/Inventory.cpp:128
msgctxt \"Inventory,Pickup\"
msgid \"Pick up {Quantity} {ItemName}\"
msgstr \"\"
";

    fn write_po(content: &Path, target: &str, locale: &str, text: &str) -> PathBuf {
        let dir = content.join("Localization").join(target).join(locale);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{target}.po"));
        fs::write(&path, TextEncoding::default().encode(text).unwrap()).unwrap();
        path
    }

    fn read_po(path: &Path) -> Catalog {
        read_catalog(path, TextEncoding::default()).unwrap()
    }

    fn setup(targets: &[&str]) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        for target in targets {
            write_po(dir.path(), target, "io", &export("io", ENTRIES));
            write_po(dir.path(), target, "ia-001", &export("ia-001", ENTRIES));
        }
        let config = Config {
            loc_targets: targets.iter().map(|t| t.to_string()).collect(),
            content_dir: dir.path().to_path_buf(),
            debug_prefix: String::from("io"),
            ledger_file: Some(dir.path().join("ledger.json")),
            delete_comments_criteria: vec![crate::rules::DeletionRule(
                crate::rules::DeletionTarget::Comment,
                String::from("^InfoMetaData:"),
            )],
            ..Config::default()
        };
        (dir, config)
    }

    fn translations(catalog: &Catalog) -> Vec<(&str, &str)> {
        catalog
            .iter()
            .map(|entry| (entry.msgctxt.as_deref().unwrap_or_default(), entry.msgstr.as_str()))
            .collect()
    }

    #[test]
    fn test_process_locales() {
        let (dir, config) = setup(&["Game"]);
        let report = process_locales(&config).unwrap();
        assert!(report.is_success());
        assert_eq!(report.debug_id_processed, vec!["Game"]);
        assert_eq!(report.hash_processed, vec!["Game"]);

        let debug_id = read_po(&config.debug_id_path("Game").unwrap());
        assert_eq!(
            translations(&debug_id),
            vec![
                ("UI,Continue", "io0001"),
                ("UI,ContinueTitle", "io0001"),
                ("UI,Quit", "io0002"),
                ("Inventory,Pickup", "io0003 <{Quantity}> <{ItemName}>"),
            ]
        );
        assert_eq!(
            debug_id.entries()[1].extracted_comments,
            vec![
                "Key:\tContinueTitle",
                "Debug ID:\tio0001\t\tAsset: Title\t\t// ###Repetition###",
            ]
        );
        assert_eq!(
            debug_id.entries()[2].extracted_comments,
            vec!["Key:\tQuit", "Debug ID:\tio0002\t\tAsset: Title"]
        );
        assert_eq!(
            debug_id.header.as_ref().map(|h| h.msgstr.as_str()),
            Some("Project-Id-Version: Game\nLanguage: io\n")
        );

        let hash = read_po(&config.hash_path("Game").unwrap());
        assert_eq!(hash.entries()[0].msgstr, "# Quit ~");
        assert_eq!(
            hash.entries()[3].msgstr,
            "# Pick up {Quantity} {ItemName} ~"
        );
        // The hash locale keeps the export order and comments.
        assert_eq!(hash.entries()[0].extracted_comments.len(), 2);

        let raw = fs::read(config.debug_id_path("Game").unwrap()).unwrap();
        assert!(raw.starts_with(b"\xEF\xBB\xBF"));

        let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        assert_eq!(ledger.get("Continue").as_deref(), Some("io0001"));
        assert_eq!(ledger.next_number(), 4);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let (_dir, config) = setup(&["Game"]);
        process_locales(&config).unwrap();
        let path = config.debug_id_path("Game").unwrap();
        let first = fs::read(&path).unwrap();
        process_locales(&config).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_targets_share_the_ledger() {
        let (_dir, config) = setup(&["Game", "Audio"]);
        process_locales(&config).unwrap();
        let game = read_po(&config.debug_id_path("Game").unwrap());
        let audio = read_po(&config.debug_id_path("Audio").unwrap());
        assert_eq!(translations(&game), translations(&audio));
    }

    #[test]
    fn test_ids_recovered_without_ledger_file() {
        let (dir, mut config) = setup(&["Game"]);
        config.ledger_file = None;
        let path = config.debug_id_path("Game").unwrap();
        write_po(
            dir.path(),
            "Game",
            "io",
            &export(
                "io",
                "#: /Game/UI/Pause\nmsgctxt \"UI,Continue\"\nmsgid \"Continue\"\nmsgstr \"io0007\"\n\n\
                 #: /Game/UI/Title\nmsgctxt \"UI,Quit\"\nmsgid \"Quit\"\nmsgstr \"\"\n",
            ),
        );
        process_locales(&config).unwrap();
        assert_eq!(
            translations(&read_po(&path)),
            vec![("UI,Continue", "io0007"), ("UI,Quit", "io0008")]
        );
        let ledger = Ledger::load(&dir.path().join("Localization/locsync-ledger.json")).unwrap();
        assert_eq!(ledger.next_number(), 9);
    }

    #[test]
    fn test_deleted_text_keeps_its_number() {
        let (dir, mut config) = setup(&["Game"]);
        config.ledger_file = None;
        let path = config.debug_id_path("Game").unwrap();
        write_po(
            dir.path(),
            "Game",
            "io",
            &export(
                "io",
                "#: /Game/UI/Pause\nmsgctxt \"UI,Continue\"\nmsgid \"Continue\"\nmsgstr \"\"\n\n\
                 #: /Game/UI/Title\nmsgctxt \"UI,Quit\"\nmsgid \"Quit\"\nmsgstr \"\"\n",
            ),
        );
        process_locales(&config).unwrap();
        assert_eq!(
            translations(&read_po(&path)),
            vec![("UI,Continue", "io0001"), ("UI,Quit", "io0002")]
        );

        // The next export drops Quit and brings a new text.
        write_po(
            dir.path(),
            "Game",
            "io",
            &export(
                "io",
                "#: /Game/UI/Pause\nmsgctxt \"UI,Continue\"\nmsgid \"Continue\"\nmsgstr \"io0001\"\n\n\
                 #: /Game/UI/Title\nmsgctxt \"UI,NewGame\"\nmsgid \"New game\"\nmsgstr \"\"\n",
            ),
        );
        process_locales(&config).unwrap();
        assert_eq!(
            translations(&read_po(&path)),
            vec![("UI,Continue", "io0001"), ("UI,NewGame", "io0003")]
        );
    }

    #[test]
    fn test_clear_translations() {
        let (dir, mut config) = setup(&["Game"]);
        let mut ledger = Ledger::new("io", 4);
        {
            let mut assigner = IdentityAssigner::new(&mut ledger);
            for n in 1..=42 {
                assigner.assign_text(&format!("Old string {n}")).unwrap();
            }
        }
        ledger.save(&dir.path().join("ledger.json")).unwrap();

        config.clear_translations = true;
        process_locales(&config).unwrap();
        let debug_id = read_po(&config.debug_id_path("Game").unwrap());
        assert_eq!(debug_id.entries()[0].msgstr, "io0001");
        let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get("Old string 1"), None);
    }

    #[test]
    fn test_ledger_format_mismatch() {
        let (dir, mut config) = setup(&["Game"]);
        Ledger::new("io", 4)
            .save(&dir.path().join("ledger.json"))
            .unwrap();
        config.id_length = 5;
        assert!(matches!(
            process_locales(&config),
            Err(Error::LedgerMismatch { found_length: 4, id_length: 5, .. })
        ));

        // Starting over is allowed.
        config.clear_translations = true;
        process_locales(&config).unwrap();
        let debug_id = read_po(&config.debug_id_path("Game").unwrap());
        assert_eq!(debug_id.entries()[0].msgstr, "io00001");
    }

    #[test]
    fn test_failed_target_is_skipped() {
        let (dir, config) = setup(&["Game", "Audio"]);
        let broken = write_po(dir.path(), "Game", "io", "msgid \"Unterminated\nmsgstr \"\"\n");
        let before = fs::read(&broken).unwrap();

        let report = process_locales(&config).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.debug_id_processed, vec!["Audio"]);
        assert_eq!(report.hash_processed, vec!["Game", "Audio"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, "Game");
        assert_eq!(report.failures[0].locale, LocaleKind::DebugId);
        // Failed catalogs are left as they were.
        assert_eq!(fs::read(&broken).unwrap(), before);
    }

    #[test]
    fn test_fail_fast() {
        let (dir, mut config) = setup(&["Game", "Audio"]);
        config.fail_fast = true;
        fs::remove_file(config.hash_path("Game").unwrap()).unwrap();
        assert!(matches!(process_locales(&config), Err(Error::Io { .. })));
        // Game's debug-ID catalog was written before the failure, and
        // the ledger was saved to match it.
        let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        assert_eq!(ledger.next_number(), 4);
        let audio = read_po(&config.debug_id_path("Audio").unwrap());
        assert!(audio.iter().all(|entry| entry.msgstr.is_empty()));
    }

    #[test]
    fn test_hash_only() {
        let (_dir, mut config) = setup(&["Game"]);
        config.debug_id_locale = String::new();
        let report = process_locales(&config).unwrap();
        assert!(report.debug_id_processed.is_empty());
        assert_eq!(report.hash_processed, vec!["Game"]);
        assert!(!config.ledger_file.as_ref().unwrap().exists());
    }
}
