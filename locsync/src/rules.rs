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

//! Regex rules which add or remove comment lines.
//!
//! Rules come from the configuration as plain lists, for example
//!
//! ```toml
//! comments_criteria = [
//!     ["msgid", '\b[Zz]oop', "Keep the name Zoop as is."],
//! ]
//! delete_comments_criteria = [
//!     ["comment", '^InfoMetaData:\t"Char Limit"'],
//! ]
//! ```

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::catalog::Entry;
use crate::error::{Error, Result, RuleKind};

/// The entry field an addition rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Msgctxt,
    Msgid,
    Msgstr,
    /// Extracted comments, one per line.
    Comment,
    TranslatorComment,
    /// References, one per line.
    #[serde(alias = "occurrences")]
    Occurrence,
}

/// The lines a deletion rule removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionTarget {
    Comment,
    TranslatorComment,
    #[serde(alias = "occurrences")]
    Occurrence,
}

/// `[field, pattern, comment]`: append `comment` when `pattern` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionRule(pub RuleField, pub String, pub String);

/// `[target, pattern]`: remove every `target` line matching `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRule(pub DeletionTarget, pub String);

#[derive(Debug, Clone)]
struct CompiledAddition {
    field: RuleField,
    pattern: Regex,
    template: String,
}

#[derive(Debug, Clone)]
struct CompiledDeletion {
    target: DeletionTarget,
    pattern: Regex,
}

/// Compiled rules, shared read-only between catalogs.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    additions: Vec<CompiledAddition>,
    deletions: Vec<CompiledDeletion>,
    delete_occurrences: bool,
}

fn compile(kind: RuleKind, index: usize, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::RuleConfig {
        index,
        kind,
        pattern: pattern.to_owned(),
        source,
    })
}

fn field_value(entry: &Entry, field: RuleField) -> Cow<'_, str> {
    match field {
        RuleField::Msgctxt => Cow::Borrowed(entry.msgctxt.as_deref().unwrap_or_default()),
        RuleField::Msgid => Cow::Borrowed(&entry.msgid),
        RuleField::Msgstr => Cow::Borrowed(&entry.msgstr),
        RuleField::Comment => Cow::Owned(entry.extracted_comments.join("\n")),
        RuleField::TranslatorComment => Cow::Owned(entry.translator_comments.join("\n")),
        RuleField::Occurrence => Cow::Owned(
            entry
                .occurrences
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}

/// Substitute `{msgctxt}`, `{namespace}`, `{key}` and `{msgid}`.
/// Other braces are left alone.
fn render_template(template: &str, entry: &Entry) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\{(msgctxt|namespace|key|msgid)\}").expect("well-formed regex")
    });
    re.replace_all(template, |captures: &Captures| match &captures[1] {
        "msgctxt" => entry.msgctxt.clone().unwrap_or_default(),
        "namespace" => entry.key().namespace.to_owned(),
        "key" => entry.key().local.to_owned(),
        _ => entry.msgid.clone(),
    })
    .into_owned()
}

/// Whether `needle` occurs as a contiguous run in `haystack`.
fn contains_block(haystack: &[String], needle: &[String]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

impl RuleSet {
    pub fn compile(
        additions: &[AdditionRule],
        deletions: &[DeletionRule],
        delete_occurrences: bool,
    ) -> Result<Self> {
        let additions = additions
            .iter()
            .enumerate()
            .map(|(index, AdditionRule(field, pattern, template))| {
                Ok(CompiledAddition {
                    field: *field,
                    pattern: compile(RuleKind::Addition, index, pattern)?,
                    template: template.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let deletions = deletions
            .iter()
            .enumerate()
            .map(|(index, DeletionRule(target, pattern))| {
                Ok(CompiledDeletion {
                    target: *target,
                    pattern: compile(RuleKind::Deletion, index, pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet {
            additions,
            deletions,
            delete_occurrences,
        })
    }

    /// Remove the lines matched by deletion rules.
    ///
    /// Runs before [`RuleSet::annotate`]. Lines outside a rule's target
    /// are never touched.
    pub fn prune(&self, entry: &Entry) -> Entry {
        let mut entry = entry.clone();
        for rule in &self.deletions {
            match rule.target {
                DeletionTarget::Comment => entry
                    .extracted_comments
                    .retain(|comment| !rule.pattern.is_match(comment)),
                DeletionTarget::TranslatorComment => entry
                    .translator_comments
                    .retain(|comment| !rule.pattern.is_match(comment)),
                DeletionTarget::Occurrence => entry
                    .occurrences
                    .retain(|occurrence| !rule.pattern.is_match(&occurrence.to_string())),
            }
        }
        if self.delete_occurrences {
            entry.occurrences.clear();
        }
        entry
    }

    /// Append the comments of every matching addition rule.
    ///
    /// Rules also see the comments added by other rules, and run until
    /// none of them adds anything. A comment already present as a block
    /// of consecutive lines is not added again, so annotating twice
    /// gives the same result as annotating once.
    pub fn annotate(&self, entry: &Entry) -> Entry {
        let mut annotated = entry.clone();
        // Each rule adds its block at most once, which bounds the passes.
        loop {
            let mut changed = false;
            for rule in &self.additions {
                if !rule.pattern.is_match(&field_value(&annotated, rule.field)) {
                    continue;
                }
                let lines = render_template(&rule.template, entry)
                    .lines()
                    .map(String::from)
                    .collect::<Vec<_>>();
                if !contains_block(&annotated.extracted_comments, &lines) {
                    annotated.extracted_comments.extend(lines);
                    changed = true;
                }
            }
            if !changed {
                return annotated;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLURAL_HINT: &str = "Please adapt to your language plural rules.\n\
                               Translate only white text in curly braces.";

    fn plural_rules() -> RuleSet {
        RuleSet::compile(
            &[
                AdditionRule(RuleField::Msgid, r"\}\|plural\(".into(), PLURAL_HINT.into()),
                AdditionRule(
                    RuleField::Msgctxt,
                    r"AbbreviatedDisplayName,".into(),
                    "Abbreviation slot fits 10 i's: iiiiIiiiiI.".into(),
                ),
            ],
            &[],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_annotate_adds_multiline_comment() {
        let entry = Entry::new("{Count}|plural(one=item,other=items)")
            .with_extracted_comment("Key:\tItems");
        let annotated = plural_rules().annotate(&entry);
        assert_eq!(
            annotated.extracted_comments,
            vec![
                "Key:\tItems",
                "Please adapt to your language plural rules.",
                "Translate only white text in curly braces.",
            ]
        );
        // The input is untouched.
        assert_eq!(entry.extracted_comments, vec!["Key:\tItems"]);
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let rules = plural_rules();
        let entry = Entry::new("{Count}|plural(one=item,other=items)")
            .with_msgctxt("AbbreviatedDisplayName,Sword");
        let once = rules.annotate(&entry);
        let twice = rules.annotate(&once);
        assert_eq!(twice, once);
        assert_eq!(once.extracted_comments.len(), 3);
    }

    #[test]
    fn test_annotate_sees_added_comments() {
        let rules = RuleSet::compile(
            &[
                AdditionRule(RuleField::Comment, "Keep the name".into(), "Name rule applies.".into()),
                AdditionRule(RuleField::Msgid, "Zoop".into(), "Keep the name.".into()),
            ],
            &[],
            false,
        )
        .unwrap();
        let entry = Entry::new("Zoop");
        let once = rules.annotate(&entry);
        assert_eq!(
            once.extracted_comments,
            vec!["Keep the name.", "Name rule applies."]
        );
        assert_eq!(rules.annotate(&once), once);
    }

    #[test]
    fn test_annotate_no_match() {
        let entry = Entry::new("Continue").with_msgctxt("UI,Continue");
        assert_eq!(plural_rules().annotate(&entry), entry);
    }

    #[test]
    fn test_template_placeholders() {
        let rules = RuleSet::compile(
            &[AdditionRule(
                RuleField::Msgctxt,
                "^Items,".into(),
                "Item {key} in {namespace}; keep {braces} as is.".into(),
            )],
            &[],
            false,
        )
        .unwrap();
        let entry = Entry::new("Sword").with_msgctxt("Items,Sword_Name");
        assert_eq!(
            rules.annotate(&entry).extracted_comments,
            vec!["Item Sword_Name in Items; keep {braces} as is."]
        );
    }

    #[test]
    fn test_rules_on_comment_and_occurrence_fields() {
        let rules = RuleSet::compile(
            &[
                AdditionRule(RuleField::Comment, "SourceLocation:\t/Game/UI/".into(), "UI string.".into()),
                AdditionRule(RuleField::Occurrence, r"\.cpp:\d+$".into(), "Code string.".into()),
            ],
            &[],
            false,
        )
        .unwrap();
        let entry = Entry::new("Quit")
            .with_extracted_comment("SourceLocation:\t/Game/UI/Pause")
            .with_occurrence("Source/Game/Menu.cpp:12");
        assert_eq!(
            rules.annotate(&entry).extracted_comments,
            vec!["SourceLocation:\t/Game/UI/Pause", "UI string.", "Code string."]
        );
    }

    #[test]
    fn test_prune() {
        let rules = RuleSet::compile(
            &[],
            &[
                DeletionRule(DeletionTarget::Comment, r#"^InfoMetaData:\t"Char Limit""#.into()),
                DeletionRule(DeletionTarget::Occurrence, "^/Game/Debug/".into()),
            ],
            false,
        )
        .unwrap();
        let entry = Entry::new("Quit")
            .with_translator_comment("InfoMetaData:\t\"Char Limit\" : \"12\"")
            .with_extracted_comment("Key:\tQuit")
            .with_extracted_comment("InfoMetaData:\t\"Char Limit\" : \"12\"")
            .with_occurrence("/Game/Debug/Cheats")
            .with_occurrence("/Game/UI/Pause");
        let pruned = rules.prune(&entry);
        assert_eq!(pruned.extracted_comments, vec!["Key:\tQuit"]);
        // Translator comments are not a target of these rules.
        assert_eq!(pruned.translator_comments, entry.translator_comments);
        assert_eq!(
            pruned
                .occurrences
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["/Game/UI/Pause"]
        );
    }

    #[test]
    fn test_delete_occurrences() {
        let rules = RuleSet::compile(&[], &[], true).unwrap();
        let entry = Entry::new("Quit")
            .with_extracted_comment("Key:\tQuit")
            .with_occurrence("/Game/UI/Pause");
        let pruned = rules.prune(&entry);
        assert!(pruned.occurrences.is_empty());
        assert_eq!(pruned.extracted_comments, entry.extracted_comments);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RuleSet::compile(
            &[],
            &[
                DeletionRule(DeletionTarget::Comment, "fine".into()),
                DeletionRule(DeletionTarget::Comment, "(unclosed".into()),
            ],
            false,
        )
        .unwrap_err();
        match err {
            Error::RuleConfig {
                index,
                kind,
                pattern,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(kind, RuleKind::Deletion);
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
