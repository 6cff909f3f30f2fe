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

use std::fmt::{self, Display, Formatter};

use crate::catalog::Catalog;

/// Counts of entry statuses.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CatalogStats {
    pub language: String,
    pub translated_count: u32,
    pub non_translated_count: u32,
    /// Fuzzy entries, translated or not.
    pub fuzzy_count: u32,
    /// Entries sharing their source text with another entry.
    pub repetition_count: u32,
    /// Entries without occurrences.
    pub unused_count: u32,
}

/// The value of a `Name: value` line of the header.
fn header_field<'c>(catalog: &'c Catalog, name: &str) -> Option<&'c str> {
    catalog.header.as_ref()?.msgstr.lines().find_map(|line| {
        let (field, value) = line.split_once(':')?;
        (field.trim() == name).then(|| value.trim())
    })
}

impl CatalogStats {
    /// Returns the total number of entries.
    pub fn total(&self) -> u32 {
        self.translated_count + self.non_translated_count
    }

    /// Translated entries in percent of all entries, 0 for an empty catalog.
    pub fn translation_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.translated_count) / f64::from(self.total())
    }

    /// Returns counts of entry statuses in the given catalog.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let mut stats = Self {
            language: header_field(catalog, "Language")
                .unwrap_or_default()
                .to_owned(),
            ..Self::default()
        };
        for (entry, flags) in catalog.iter().zip(catalog.flags()) {
            if entry.is_translated() {
                stats.translated_count += 1;
            } else {
                stats.non_translated_count += 1;
            }
            if entry.is_fuzzy() {
                stats.fuzzy_count += 1;
            }
            if flags.is_repetition {
                stats.repetition_count += 1;
            }
            if flags.is_unused {
                stats.unused_count += 1;
            }
        }
        stats
    }
}

impl Display for CatalogStats {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let language = if self.language.is_empty() {
            "?"
        } else {
            &self.language
        };
        write!(
            f,
            "{}: {} / {} translated ({:.0}%), {} fuzzy, {} repetitions, {} unused",
            language,
            self.translated_count,
            self.total(),
            self.translation_rate(),
            self.fuzzy_count,
            self.repetition_count,
            self.unused_count,
        )
    }
}
