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

//! Stable debug identifiers for source texts.
//!
//! Every distinct source text gets a short identifier such as `#0042`
//! the first time it is seen. The mapping lives in a [`Ledger`] which
//! outlives a single run: identifiers end up in screenshots, bug
//! reports and the translation service, so a number is never handed
//! out twice, not even after the text it belonged to disappeared.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Entry};
use crate::error::{Error, Result};
use crate::util::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub number: u64,
    /// RFC 3339 time the number was minted. Unknown for identifiers
    /// recovered from an existing catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minted_at: Option<String>,
}

/// The persistent mapping from source text to identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    prefix: String,
    id_length: usize,
    /// The number the next new text receives. Never decreases except
    /// through [`Ledger::reset`].
    next_number: u64,
    records: BTreeMap<String, LedgerRecord>,
}

impl Ledger {
    pub fn new(prefix: impl Into<String>, id_length: usize) -> Self {
        Ledger {
            prefix: prefix.into(),
            id_length,
            next_number: 1,
            records: BTreeMap::new(),
        }
    }

    /// Read a ledger written by [`Ledger::save`].
    ///
    /// A ledger which could hand out a number twice is refused: every
    /// number must belong to one text and lie below `next_number`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let ledger: Ledger = serde_json::from_str(&text)?;
        ledger.check_consistency().map_err(|message| Error::CorruptLedger {
            path: path.to_owned(),
            message,
        })?;
        Ok(ledger)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        write_atomic(path, text.as_bytes())
    }

    fn check_consistency(&self) -> std::result::Result<(), String> {
        let mut owners = HashMap::new();
        for (text, record) in &self.records {
            if record.number == 0 || record.number >= self.next_number {
                return Err(format!(
                    "{} of {text:?} is not below the next number {}",
                    self.format_id(record.number),
                    self.format_id(self.next_number)
                ));
            }
            if let Some(owner) = owners.insert(record.number, text) {
                return Err(format!(
                    "{} is used by {owner:?} and {text:?}",
                    self.format_id(record.number)
                ));
            }
        }
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn id_length(&self) -> usize {
        self.id_length
    }

    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The identifier already assigned to `text`, if any.
    pub fn get(&self, text: &str) -> Option<String> {
        self.records
            .get(text)
            .map(|record| self.format_id(record.number))
    }

    pub fn format_id(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.id_length)
    }

    /// The number of a well-formed identifier at the start of `text`.
    ///
    /// The identifier must have exactly `id_length` digits, so an
    /// identifier minted with another width is not recognized.
    pub fn parse_id(&self, text: &str) -> Option<u64> {
        let rest = text.strip_prefix(self.prefix.as_str())?;
        let digits = rest.get(..self.id_length)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if rest[self.id_length..].starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    fn max_number(&self) -> u64 {
        u32::try_from(self.id_length)
            .ok()
            .and_then(|exp| 10u64.checked_pow(exp))
            .map_or(u64::MAX, |limit| limit - 1)
    }

    /// Refuse to continue a ledger written with another identifier format.
    pub fn check_format(&self, prefix: &str, id_length: usize) -> Result<()> {
        if self.prefix == prefix && self.id_length == id_length {
            return Ok(());
        }
        Err(Error::LedgerMismatch {
            found_prefix: self.prefix.clone(),
            found_length: self.id_length,
            prefix: prefix.to_owned(),
            id_length,
        })
    }

    /// Forget every identifier and start numbering from one again.
    pub fn reset(&mut self) {
        info!(
            "Resetting identifier ledger ({} identifiers, next was {})",
            self.records.len(),
            self.format_id(self.next_number)
        );
        self.records.clear();
        self.next_number = 1;
    }

    /// Recover identifiers from the translations of a debug-ID catalog.
    ///
    /// Entries whose translation starts with a well-formed identifier
    /// contribute `msgid -> identifier`. Conflicts are reported and the
    /// conflicting entry is left for minting.
    pub fn seed_from_catalog(&mut self, catalog: &Catalog) {
        let mut owners = self
            .records
            .iter()
            .map(|(text, record)| (record.number, text.clone()))
            .collect::<HashMap<_, _>>();

        for entry in catalog {
            let Some(number) = self.parse_id(&entry.msgstr) else {
                continue;
            };
            self.next_number = self.next_number.max(number + 1);

            if let Some(record) = self.records.get(entry.source_text()) {
                if record.number != number {
                    warn!(
                        "Text {:?} has both {} and {}; keeping {}",
                        entry.source_text(),
                        self.format_id(record.number),
                        self.format_id(number),
                        self.format_id(record.number),
                    );
                }
                continue;
            }
            if let Some(owner) = owners.get(&number) {
                warn!(
                    "Identifier {} is used by {:?} and {:?}; the latter gets a new one",
                    self.format_id(number),
                    owner,
                    entry.source_text(),
                );
                continue;
            }

            owners.insert(number, entry.msgid.clone());
            self.records.insert(
                entry.msgid.clone(),
                LedgerRecord {
                    number,
                    minted_at: None,
                },
            );
        }
    }

    fn mint(&mut self, text: &str) -> Result<String> {
        let number = self.next_number;
        if number > self.max_number() {
            return Err(Error::IdentitySpaceExhausted {
                prefix: self.prefix.clone(),
                id_length: self.id_length,
            });
        }
        self.next_number += 1;
        let now = chrono::Utc::now();
        self.records.insert(
            text.to_owned(),
            LedgerRecord {
                number,
                minted_at: Some(now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            },
        );
        Ok(self.format_id(number))
    }
}

/// The identifier given to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    /// The same text was already assigned in this session.
    pub is_repetition: bool,
    /// The identifier was minted for this entry.
    pub is_new: bool,
}

/// Assigns identifiers for one catalog.
///
/// The assigner borrows the ledger mutably, so only one catalog can
/// update a shared ledger at a time.
#[derive(Debug)]
pub struct IdentityAssigner<'a> {
    ledger: &'a mut Ledger,
    seen: HashSet<String>,
}

impl<'a> IdentityAssigner<'a> {
    pub fn new(ledger: &'a mut Ledger) -> Self {
        IdentityAssigner {
            ledger,
            seen: HashSet::new(),
        }
    }

    pub fn assign(&mut self, entry: &Entry) -> Result<Assignment> {
        self.assign_text(entry.source_text())
    }

    /// Texts are compared byte for byte: no case folding and no
    /// whitespace normalization, so distinct strings are never merged.
    pub fn assign_text(&mut self, text: &str) -> Result<Assignment> {
        let is_repetition = !self.seen.insert(text.to_owned());
        match self.ledger.get(text) {
            Some(id) => Ok(Assignment {
                id,
                is_repetition,
                is_new: false,
            }),
            None => Ok(Assignment {
                id: self.ledger.mint(text)?,
                is_repetition,
                is_new: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(ledger: &mut Ledger, texts: &[&str]) -> Vec<String> {
        let mut assigner = IdentityAssigner::new(ledger);
        texts
            .iter()
            .map(|text| assigner.assign_text(text).unwrap().id)
            .collect()
    }

    #[test]
    fn test_repeated_text_reuses_identifier() {
        let mut ledger = Ledger::new("io", 4);
        let mut assigner = IdentityAssigner::new(&mut ledger);

        let first = assigner.assign_text("Continue").unwrap();
        let second = assigner.assign_text("Continue").unwrap();
        assert_eq!(
            first,
            Assignment {
                id: "io0001".into(),
                is_repetition: false,
                is_new: true
            }
        );
        assert_eq!(
            second,
            Assignment {
                id: "io0001".into(),
                is_repetition: true,
                is_new: false
            }
        );
        assert_eq!(assigner.assign_text("Quit").unwrap().id, "io0002");
    }

    #[test]
    fn test_identifiers_are_stable_across_runs() {
        let mut ledger = Ledger::new("#", 4);
        let first = ids(&mut ledger, &["Continue", "Quit", "Options"]);
        // Same texts in another order, plus a new one.
        let second = ids(&mut ledger, &["Options", "New Game", "Continue", "Quit"]);
        assert_eq!(first, vec!["#0001", "#0002", "#0003"]);
        assert_eq!(second, vec!["#0003", "#0004", "#0001", "#0002"]);
    }

    #[test]
    fn test_no_case_folding() {
        let mut ledger = Ledger::new("#", 4);
        assert_eq!(
            ids(&mut ledger, &["Continue", "continue", "Continue "]),
            vec!["#0001", "#0002", "#0003"]
        );
    }

    #[test]
    fn test_exhausted() {
        let mut ledger = Ledger::new("#", 1);
        let mut assigner = IdentityAssigner::new(&mut ledger);
        for n in 1..=9 {
            assert_eq!(assigner.assign_text(&n.to_string()).unwrap().id, format!("#{n}"));
        }
        assert!(matches!(
            assigner.assign_text("ten"),
            Err(Error::IdentitySpaceExhausted { id_length: 1, .. })
        ));
        // Known texts still resolve.
        assert_eq!(assigner.assign_text("3").unwrap().id, "#3");
    }

    #[test]
    fn test_reset_renumbers_from_one() {
        let mut ledger = Ledger::new("io", 4);
        let texts = (1..=42).map(|n| format!("String {n}")).collect::<Vec<_>>();
        let texts = texts.iter().map(String::as_str).collect::<Vec<_>>();
        ids(&mut ledger, &texts);
        assert_eq!(ledger.get("String 42").as_deref(), Some("io0042"));

        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ids(&mut ledger, &["String 42", "Fresh"]), vec!["io0001", "io0002"]);
    }

    #[test]
    fn test_parse_id() {
        let ledger = Ledger::new("#", 4);
        assert_eq!(ledger.parse_id("#0042"), Some(42));
        assert_eq!(ledger.parse_id("#0042 <{Quantity}>"), Some(42));
        assert_eq!(ledger.parse_id("#00042"), None);
        assert_eq!(ledger.parse_id("#042"), None);
        assert_eq!(ledger.parse_id("Weiter"), None);
        assert_eq!(ledger.parse_id(""), None);
    }

    #[test]
    fn test_seed_from_catalog() {
        let mut catalog = Catalog::new();
        for (ctxt, msgid, msgstr) in [
            ("UI,A", "Continue", "#0007"),
            ("UI,B", "Quit", "#0003 <{Key}>"),
            ("UI,C", "Continue", "#0009"),
            ("UI,D", "Options", "#0003"),
            ("UI,E", "Untranslated", ""),
            ("UI,F", "Odd", "Weiter"),
        ] {
            catalog
                .push(Entry::new(msgid).with_msgctxt(ctxt).with_msgstr(msgstr))
                .unwrap();
        }

        let mut ledger = Ledger::new("#", 4);
        ledger.seed_from_catalog(&catalog);
        assert_eq!(ledger.get("Continue").as_deref(), Some("#0007"));
        assert_eq!(ledger.get("Quit").as_deref(), Some("#0003"));
        assert_eq!(ledger.get("Options"), None);
        assert_eq!(ledger.next_number(), 10);
        assert_eq!(ids(&mut ledger, &["Options"]), vec!["#0010"]);
    }

    #[test]
    fn test_check_format() {
        let ledger = Ledger::new("#", 4);
        assert!(ledger.check_format("#", 4).is_ok());
        assert!(matches!(
            ledger.check_format("#", 5),
            Err(Error::LedgerMismatch { found_length: 4, id_length: 5, .. })
        ));
    }

    #[test]
    fn test_save_and_load() -> anyhow::Result<()> {
        let mut ledger = Ledger::new("io", 4);
        ids(&mut ledger, &["Continue", "Quit"]);

        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("ledger.json");
        ledger.save(&path)?;
        let loaded = Ledger::load(&path)?;
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.next_number(), 3);
        Ok(())
    }

    #[test]
    fn test_load_refuses_inconsistent_ledger() -> anyhow::Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("ledger.json");
        for text in [
            // next_number would hand out #0002 again.
            r##"{"prefix": "#", "id_length": 4, "next_number": 2,
                "records": {"Continue": {"number": 1}, "Quit": {"number": 2}}}"##,
            r##"{"prefix": "#", "id_length": 4, "next_number": 3,
                "records": {"Continue": {"number": 1}, "Quit": {"number": 1}}}"##,
        ] {
            std::fs::write(&path, text)?;
            assert!(
                matches!(Ledger::load(&path), Err(Error::CorruptLedger { .. })),
                "{text}"
            );
        }
        Ok(())
    }
}
