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

//! The debug-ID locale.
//!
//! Every string of the debug-ID locale is translated to its identifier,
//! followed by the format variables and tags of the source so the game still
//! has something to substitute: `#0007 <{Quantity}> <{ItemName}>`.
//! The same catalog doubles as the annotated source for translators,
//! so each entry also gets a `Debug ID:` comment and the comments of
//! the configured rules.

use std::collections::HashMap;

use log::{error, info, warn};

use crate::catalog::{Catalog, Entry};
use crate::error::Result;
use crate::identity::{IdentityAssigner, Ledger};
use crate::pseudo::ProtectedSpans;
use crate::rules::RuleSet;
use crate::sort::sort;
use crate::stats::CatalogStats;

const DEBUG_ID_COMMENT: &str = "Debug ID:\t";
const REPETITION_MARKER: &str = "\t\t// ###Repetition###";

/// The asset name shown in the `Debug ID:` comment: the last path
/// component of the first occurrence up to the first `.`, keeping a
/// `.cpp` or `.h` extension.
pub fn asset_name(entry: &Entry) -> String {
    let Some(occurrence) = entry.occurrences.first() else {
        return String::new();
    };
    let name = occurrence
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&occurrence.path);
    let (stem, rest) = name.split_at(name.find('.').unwrap_or(name.len()));
    if rest.starts_with(".cpp") {
        format!("{stem}.cpp")
    } else if rest.starts_with(".h") {
        format!("{stem}.h")
    } else {
        stem.to_owned()
    }
}

/// Write the `Debug ID:` line, replacing an earlier one in place.
fn stamp(entry: &mut Entry, is_repetition: bool) {
    let mut line = format!(
        "{DEBUG_ID_COMMENT}{}\t\tAsset: {}",
        entry.msgstr.replace('\n', "\\n"),
        asset_name(entry)
    );
    if is_repetition {
        line.push_str(REPETITION_MARKER);
    }
    match entry
        .extracted_comments
        .iter_mut()
        .find(|comment| comment.starts_with(DEBUG_ID_COMMENT))
    {
        Some(comment) => *comment = line,
        None => entry.extracted_comments.push(line),
    }
}

/// Builds the debug-ID catalog of one localization target.
#[derive(Debug, Clone)]
pub struct DebugIdProcessor {
    rules: RuleSet,
    spans: ProtectedSpans,
    sort: bool,
    clear_translations: bool,
}

impl DebugIdProcessor {
    pub fn new(rules: RuleSet, spans: ProtectedSpans) -> Self {
        DebugIdProcessor {
            rules,
            spans,
            sort: true,
            clear_translations: false,
        }
    }

    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Give every entry a fresh translation instead of only the
    /// untranslated ones. The ledger should have been reset before.
    pub fn with_clear_translations(mut self, clear_translations: bool) -> Self {
        self.clear_translations = clear_translations;
        self
    }

    /// `id`, then the variables and tags of `source` each wrapped in
    /// `<` `>`.
    pub fn translation(&self, id: &str, source: &str) -> String {
        let spans = self.spans.protected(source);
        if spans.is_empty() {
            return id.to_owned();
        }
        let wrapped = spans
            .iter()
            .map(|span| format!("<{span}>"))
            .collect::<Vec<_>>();
        format!("{id} {}", wrapped.join(" "))
    }

    /// Log translated entries without an identifier.
    fn warn_odd_strings(&self, catalog: &Catalog, ledger: &Ledger) {
        let odd = catalog
            .iter()
            .filter(|entry| entry.is_translated() && ledger.parse_id(&entry.msgstr).is_none())
            .collect::<Vec<_>>();
        if odd.is_empty() {
            return;
        }
        warn!("Translated lines with no IDs in them ({}):", odd.len());
        for entry in odd {
            warn!(
                "{}\n{}\n{}",
                entry.msgctxt.as_deref().unwrap_or_default(),
                entry.msgid,
                entry.msgstr
            );
        }
    }

    /// Log identifiers claimed by more than one source text.
    fn check_duplicate_ids(&self, catalog: &Catalog, ledger: &Ledger) {
        let mut owners = HashMap::new();
        let mut duplicates = 0;
        for entry in catalog {
            let Some(number) = ledger.parse_id(&entry.msgstr) else {
                continue;
            };
            let owner = owners.entry(number).or_insert(entry.source_text());
            if *owner != entry.source_text() {
                duplicates += 1;
                error!(
                    "{} is used by {:?} and {:?}",
                    ledger.format_id(number),
                    owner,
                    entry.source_text()
                );
            }
        }
        if duplicates > 0 {
            error!(
                "Duplicate IDs spotted, please recompile the debug IDs from scratch \
                 (use clear_translations = true)"
            );
        }
    }

    /// Build the debug-ID catalog from `catalog`.
    ///
    /// New identifiers are minted from `ledger`. The ledger is only
    /// updated when the whole catalog succeeds.
    pub fn process(&self, catalog: &Catalog, ledger: &mut Ledger) -> Result<Catalog> {
        info!(
            "Source file translation rate: {}",
            CatalogStats::for_catalog(catalog)
        );
        let catalog = if self.sort {
            sort(catalog)
        } else {
            catalog.clone()
        };

        let mut staged = ledger.clone();
        if !self.clear_translations {
            self.warn_odd_strings(&catalog, &staged);
        }
        info!(
            "Starting ID: {}",
            staged.format_id(staged.next_number())
        );

        let repeated = catalog.repeated_texts();
        let mut entries = Vec::with_capacity(catalog.len());
        let mut minted = 0;
        {
            let mut assigner = IdentityAssigner::new(&mut staged);
            for entry in &catalog {
                let mut entry = self.rules.prune(entry);
                if self.clear_translations || !entry.is_translated() {
                    let assignment = assigner.assign(&entry)?;
                    if assignment.is_new {
                        minted += 1;
                    }
                    entry.msgstr = self.translation(&assignment.id, entry.source_text());
                }
                let is_repetition = repeated.contains(entry.source_text());
                stamp(&mut entry, is_repetition);
                entries.push(self.rules.annotate(&entry));
            }
        }

        let result = catalog.with_entries(entries);
        self.check_duplicate_ids(&result, &staged);
        info!(
            "Target file translation rate: {}",
            CatalogStats::for_catalog(&result)
        );
        info!(
            "Minted {minted} new IDs, next ID: {}",
            staged.format_id(staged.next_number())
        );
        *ledger = staged;
        Ok(result)
    }
}
