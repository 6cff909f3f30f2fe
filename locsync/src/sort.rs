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

//! Deterministic entry order.
//!
//! The editor exports entries keyed by random GUIDs, so the raw order
//! changes between exports. Sorting by where a string is used groups
//! related strings and keeps diffs small.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::catalog::{Catalog, Entry};

/// Width used when comparing `[3]` or `(3)` indices in paths.
const INDEX_WIDTH: usize = 5;
/// Width used when comparing digit runs in keys.
const KEY_DIGITS_WIDTH: usize = 3;

fn zero_pad_digits(text: &str, width: usize) -> String {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("well-formed regex"));
    digits
        .replace_all(text, |captures: &Captures| {
            format!("{:0>width$}", &captures[0])
        })
        .into_owned()
}

/// Pad the numbers inside `[...]` and `(...)` so `Items[2]` comes
/// before `Items[10]`.
fn zero_pad_indices(path: &str) -> String {
    static INDEX: OnceLock<Regex> = OnceLock::new();
    let index = INDEX.get_or_init(|| {
        Regex::new(r"([\[(])([^\])]+)([\])])").expect("well-formed regex")
    });
    index
        .replace_all(path, |captures: &Captures| {
            format!(
                "{}{}{}",
                &captures[1],
                zero_pad_digits(&captures[2], INDEX_WIDTH),
                &captures[3]
            )
        })
        .into_owned()
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    unused: bool,
    path: String,
    line: u32,
    namespace: String,
    local: String,
    msgctxt: Option<String>,
    msgid: String,
}

impl SortKey {
    fn new(entry: &Entry) -> Self {
        let (path, line) = match entry.occurrences.first() {
            Some(occurrence) => (
                zero_pad_indices(&occurrence.path),
                occurrence.line.unwrap_or(0),
            ),
            None => (String::new(), 0),
        };
        let key = entry.key();
        SortKey {
            unused: entry.occurrences.is_empty(),
            path,
            line,
            namespace: zero_pad_digits(key.namespace, KEY_DIGITS_WIDTH),
            local: zero_pad_digits(key.local, KEY_DIGITS_WIDTH),
            msgctxt: entry.msgctxt.clone(),
            msgid: entry.msgid.clone(),
        }
    }
}

/// Order entries by first occurrence, then by key.
///
/// Entries without occurrences go last. The raw `msgctxt` and `msgid`
/// break remaining ties, so no two entries of a catalog compare equal.
/// Padding only affects the comparison; the entries are not modified.
pub fn sort(catalog: &Catalog) -> Catalog {
    let mut entries = catalog.entries().to_vec();
    entries.sort_by_cached_key(SortKey::new);
    catalog.with_entries(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog(entries: Vec<Entry>) -> Catalog {
        let mut catalog = Catalog::new();
        for entry in entries {
            catalog.push(entry).unwrap();
        }
        catalog
    }

    fn msgctxts(catalog: &Catalog) -> Vec<&str> {
        catalog
            .iter()
            .map(|entry| entry.msgctxt.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_zero_pad_indices() {
        assert_eq!(
            zero_pad_indices("/Game/Data/Items.Items:Rows[12].Name (3)"),
            "/Game/Data/Items.Items:Rows[00012].Name (00003)"
        );
        assert_eq!(zero_pad_indices("/Game/UI/Menu2"), "/Game/UI/Menu2");
    }

    #[test]
    fn test_sort_by_occurrence_then_key() {
        let unsorted = catalog(vec![
            Entry::new("Unused").with_msgctxt("Old,1"),
            Entry::new("Ten").with_msgctxt("Items,Ten").with_occurrence("/Game/Data/Items.Items:Rows[10].Name"),
            Entry::new("Two").with_msgctxt("Items,Two").with_occurrence("/Game/Data/Items.Items:Rows[2].Name"),
            Entry::new("Line 9").with_msgctxt("Code,B").with_occurrence("Source/Game/Hud.cpp:9"),
            Entry::new("Line 120").with_msgctxt("Code,A").with_occurrence("Source/Game/Hud.cpp:120"),
            Entry::new("Key 10").with_msgctxt("UI,Key10").with_occurrence("/Game/UI/Pause"),
            Entry::new("Key 9").with_msgctxt("UI,Key9").with_occurrence("/Game/UI/Pause"),
        ]);
        let sorted = sort(&unsorted);
        assert_eq!(
            msgctxts(&sorted),
            vec![
                "Items,Two",
                "Items,Ten",
                "UI,Key9",
                "UI,Key10",
                "Code,B",
                "Code,A",
                "Old,1",
            ]
        );
        // Padding never leaks into the entries.
        assert_eq!(
            sorted.entries()[1].occurrences[0].path,
            "/Game/Data/Items.Items:Rows[10].Name"
        );
    }

    #[test]
    fn test_unused_entries_go_last() {
        let sorted = sort(&catalog(vec![
            Entry::new("B").with_msgctxt("A,2"),
            Entry::new("A").with_msgctxt("A,1"),
            Entry::new("C").with_msgctxt("Z,1").with_occurrence("/Game/Z"),
        ]));
        assert_eq!(msgctxts(&sorted), vec!["Z,1", "A,1", "A,2"]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let entries = vec![
            Entry::new("Continue").with_msgctxt("UI,A").with_occurrence("/Game/UI/Pause"),
            Entry::new("Continue").with_msgctxt("UI,B").with_occurrence("/Game/UI/Pause"),
            Entry::new("Quit").with_msgctxt("UI,A1").with_occurrence("/Game/UI/Pause"),
            Entry::new("Quit").with_occurrence("/Game/UI/Pause"),
            Entry::new("Back"),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let forward = sort(&catalog(entries));
        let backward = sort(&catalog(reversed));
        assert_eq!(forward.entries(), backward.entries());
        assert_eq!(sort(&forward), forward);
    }

    #[test]
    fn test_sort_keeps_header_and_obsolete() {
        let mut unsorted = catalog(vec![Entry::new("B"), Entry::new("A")]);
        unsorted.header = Some(Entry::new("").with_msgstr("Language: io\n"));
        unsorted.obsolete = vec![String::from("#~ msgid \"Gone\"")];
        let sorted = sort(&unsorted);
        assert_eq!(sorted.header, unsorted.header);
        assert_eq!(sorted.obsolete, unsorted.obsolete);
        assert_eq!(sorted.find(None, "A").map(|e| e.msgid.as_str()), Some("A"));
    }
}
