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

//! Hash locale: every string wrapped in visible markers.
//!
//! Text in the game which shows up without the markers was never
//! localized. Format variables such as `{Count}` and inline tags such
//! as `<img id="Coin"/>` are protected: they are copied through
//! unchanged so the game can still substitute them.

use regex::{Match, Regex};

use crate::catalog::{Catalog, Entry};
use crate::error::{Error, Result, RuleKind};

/// A piece of a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// A variable or a tag, copied verbatim.
    Protected(&'t str),
    Translatable(&'t str),
}

/// The patterns for format variables and inline tags.
#[derive(Debug, Clone)]
pub struct ProtectedSpans {
    variables: Regex,
    tags: Regex,
}

fn compile(index: usize, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::RuleConfig {
        index,
        kind: RuleKind::Placeholder,
        pattern: pattern.to_owned(),
        source,
    })
}

impl ProtectedSpans {
    /// Compile the variable pattern (index 0) and the tag pattern (index 1).
    pub fn new(var_regex: &str, tags_regex: &str) -> Result<Self> {
        Ok(ProtectedSpans {
            variables: compile(0, var_regex)?,
            tags: compile(1, tags_regex)?,
        })
    }

    /// The variables and tags of `text`, in order.
    pub fn protected<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.segments(text)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Protected(span) => Some(span),
                Segment::Translatable(_) => None,
            })
            .collect()
    }

    /// Split `text` into protected and translatable segments.
    ///
    /// Matches of both patterns are taken left to right. When two
    /// matches overlap the earlier one wins, and the longer one when
    /// both start at the same byte. Concatenating the segments gives
    /// back `text`.
    pub fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let mut matches: Vec<Match<'t>> = self
            .variables
            .find_iter(text)
            .chain(self.tags.find_iter(text))
            .filter(|m| !m.is_empty())
            .collect();
        matches.sort_by_key(|m| (m.start(), std::cmp::Reverse(m.end())));

        let mut segments = Vec::new();
        let mut pos = 0;
        for m in matches {
            if m.start() < pos {
                continue;
            }
            if m.start() > pos {
                segments.push(Segment::Translatable(&text[pos..m.start()]));
            }
            segments.push(Segment::Protected(m.as_str()));
            pos = m.end();
        }
        if pos < text.len() {
            segments.push(Segment::Translatable(&text[pos..]));
        }
        segments
    }
}

/// Renders hash locale translations.
#[derive(Debug, Clone)]
pub struct PseudoLocalizer {
    spans: ProtectedSpans,
    prefix: String,
    suffix: String,
    not_used_marker: String,
    filler: String,
    /// Filler length in percent of the translatable characters.
    expansion: u32,
}

impl PseudoLocalizer {
    pub fn new(spans: ProtectedSpans, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        PseudoLocalizer {
            spans,
            prefix: prefix.into(),
            suffix: suffix.into(),
            not_used_marker: String::new(),
            filler: String::new(),
            expansion: 0,
        }
    }

    /// Use `marker` instead of the prefix for strings which are no
    /// longer referenced. An empty marker turns this off.
    pub fn with_not_used_marker(mut self, marker: impl Into<String>) -> Self {
        self.not_used_marker = marker.into();
        self
    }

    /// Pad strings with `filler` to simulate languages with longer
    /// text. `expansion` is in percent of the translatable characters.
    pub fn with_filler(mut self, filler: impl Into<String>, expansion: u32) -> Self {
        self.filler = filler.into();
        self.expansion = expansion;
        self
    }

    fn opening<'a>(&'a self, entry: &Entry) -> &'a str {
        let marker = self.not_used_marker.as_str();
        if !marker.is_empty()
            && entry.is_unused()
            && !entry.comments().any(|comment| comment.contains(marker))
        {
            marker
        } else {
            &self.prefix
        }
    }

    fn padding(&self, text: &str) -> String {
        if self.filler.is_empty() || self.expansion == 0 {
            return String::new();
        }
        let translatable = self
            .spans
            .segments(text)
            .into_iter()
            .map(|segment| match segment {
                Segment::Translatable(text) => text.chars().count(),
                Segment::Protected(_) => 0,
            })
            .sum::<usize>();
        let expansion = self.expansion as usize;
        let count = translatable.saturating_mul(expansion).div_ceil(100);
        self.filler.chars().cycle().take(count).collect()
    }

    /// The translation for one entry: the source wrapped once as a
    /// whole, protected spans untouched.
    pub fn render(&self, entry: &Entry) -> String {
        let source = entry.source_text();
        format!(
            "{}{}{}{}",
            self.opening(entry),
            source,
            self.padding(source),
            self.suffix
        )
    }
}

/// Replace every translation with its hash locale rendering.
pub fn pseudo_localize_catalog(catalog: &Catalog, localizer: &PseudoLocalizer) -> Catalog {
    let entries = catalog
        .iter()
        .map(|entry| Entry {
            msgstr: localizer.render(entry),
            ..entry.clone()
        })
        .collect();
    catalog.with_entries(entries)
}
