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

//! In-memory model of a gettext catalog exported by the editor.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// A `#:` reference to the place a string comes from.
///
/// Editor exports use asset paths such as
/// `/Game/UI/Menu.Menu_C:WidgetTree.Title.Text` without line numbers,
/// while C++ sources carry a trailing `:<line>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Occurrence {
    pub path: String,
    pub line: Option<u32>,
}

impl Occurrence {
    pub fn new(path: impl Into<String>, line: Option<u32>) -> Self {
        Occurrence {
            path: path.into(),
            line,
        }
    }

    /// Split a reference into path and line number.
    ///
    /// Only an all-digit suffix after the last `:` is a line number.
    pub fn parse(reference: &str) -> Self {
        if let Some((path, lineno)) = reference.rsplit_once(':') {
            if !lineno.is_empty() && lineno.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(line) = lineno.parse() {
                    return Occurrence::new(path, Some(line));
                }
            }
        }
        Occurrence::new(reference, None)
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Composite view of an entry key: `Namespace,LocalKey`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key<'a> {
    pub namespace: &'a str,
    pub local: &'a str,
}

impl<'a> Key<'a> {
    /// Split a context at its first unescaped comma.
    ///
    /// A backslash escapes the following character, so `A\,B,C` has
    /// the namespace `A\,B` and the local key `C`. Without a comma the
    /// whole context is the namespace.
    pub fn from_context(msgctxt: &'a str) -> Self {
        let mut escaped = false;
        for (idx, c) in msgctxt.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                ',' => {
                    return Key {
                        namespace: &msgctxt[..idx],
                        local: &msgctxt[idx + 1..],
                    }
                }
                _ => {}
            }
        }
        Key {
            namespace: msgctxt,
            local: "",
        }
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.namespace, self.local)
    }
}

/// One translatable unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// `# ` lines written by humans.
    pub translator_comments: Vec<String>,
    /// `#.` lines: exporter metadata (`Key:`, `SourceLocation:`), the
    /// `Debug ID:` stamp and rule annotations.
    pub extracted_comments: Vec<String>,
    pub occurrences: Vec<Occurrence>,
    /// `#,` flags such as `fuzzy`.
    pub flags: Vec<String>,
    /// `#|` lines, kept verbatim without the marker.
    pub previous: Vec<String>,
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgstr: String,
}

impl Entry {
    pub fn new(msgid: impl Into<String>) -> Self {
        Entry {
            msgid: msgid.into(),
            ..Entry::default()
        }
    }

    pub fn with_msgctxt(mut self, msgctxt: impl Into<String>) -> Self {
        self.msgctxt = Some(msgctxt.into());
        self
    }

    pub fn with_msgstr(mut self, msgstr: impl Into<String>) -> Self {
        self.msgstr = msgstr.into();
        self
    }

    pub fn with_occurrence(mut self, reference: &str) -> Self {
        self.occurrences.push(Occurrence::parse(reference));
        self
    }

    pub fn with_extracted_comment(mut self, comment: impl Into<String>) -> Self {
        self.extracted_comments.push(comment.into());
        self
    }

    pub fn with_translator_comment(mut self, comment: impl Into<String>) -> Self {
        self.translator_comments.push(comment.into());
        self
    }

    /// The text translators see.
    pub fn source_text(&self) -> &str {
        &self.msgid
    }

    /// The composite key. Entries without a context use their `msgid`
    /// as the local key.
    pub fn key(&self) -> Key<'_> {
        match &self.msgctxt {
            Some(msgctxt) => Key::from_context(msgctxt),
            None => Key {
                namespace: "",
                local: &self.msgid,
            },
        }
    }

    pub fn is_translated(&self) -> bool {
        !self.msgstr.is_empty()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|flag| flag == "fuzzy")
    }

    /// Unused strings are no longer referenced anywhere in the project.
    pub fn is_unused(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// All human-readable comment lines, translator comments first.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.translator_comments
            .iter()
            .chain(&self.extracted_comments)
            .map(String::as_str)
    }
}

/// Flags derived from the whole catalog, never written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub is_repetition: bool,
    pub is_unused: bool,
}

/// All entries of one locale of one localization target.
///
/// The pair (`msgctxt`, `msgid`) is unique within a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// The `msgid ""` entry with the catalog metadata.
    pub header: Option<Entry>,
    entries: Vec<Entry>,
    /// `#~` lines of obsolete entries, kept verbatim.
    pub obsolete: Vec<String>,
    index: HashMap<(Option<String>, String), usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Append an entry, handing it back if its key is already taken.
    pub fn push(&mut self, entry: Entry) -> Result<(), Entry> {
        let key = (entry.msgctxt.clone(), entry.msgid.clone());
        if self.index.contains_key(&key) {
            return Err(entry);
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&Entry> {
        let key = (msgctxt.map(str::to_owned), msgid.to_owned());
        self.index.get(&key).map(|&idx| &self.entries[idx])
    }

    /// A new catalog with the same header and obsolete block but
    /// different entries. The entries must keep their keys.
    pub(crate) fn with_entries(&self, entries: Vec<Entry>) -> Catalog {
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| ((entry.msgctxt.clone(), entry.msgid.clone()), idx))
            .collect::<HashMap<_, _>>();
        debug_assert_eq!(index.len(), entries.len(), "entry keys must stay unique");
        Catalog {
            header: self.header.clone(),
            entries,
            obsolete: self.obsolete.clone(),
            index,
        }
    }

    /// Texts shared by more than one entry.
    pub fn repeated_texts(&self) -> HashSet<&str> {
        let mut counts = HashMap::<&str, usize>::new();
        for entry in &self.entries {
            *counts.entry(entry.source_text()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter_map(|(text, count)| (count > 1).then_some(text))
            .collect()
    }

    /// Derived flags, one per entry in catalog order.
    pub fn flags(&self) -> Vec<EntryFlags> {
        let repeated = self.repeated_texts();
        self.entries
            .iter()
            .map(|entry| EntryFlags {
                is_repetition: repeated.contains(entry.source_text()),
                is_unused: entry.is_unused(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
