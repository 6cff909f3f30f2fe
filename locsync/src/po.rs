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

//! Reading and writing gettext PO catalogs.
//!
//! The grammar is the subset produced by the editor's localization
//! dashboard: singular messages with `msgctxt`, comments of every
//! kind, and one reference per `#:` line since asset paths may
//! contain spaces and commas. Lines are never wrapped on output.

use crate::catalog::{Catalog, Entry, Occurrence};
use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq)]
enum Field {
    Msgctxt,
    Msgid,
    Msgstr,
}

#[derive(Debug)]
struct PendingEntry {
    entry: Entry,
    start_line: usize,
    has_msgid: bool,
    has_msgstr: bool,
    last_field: Option<Field>,
    /// Comment lines as written, in case they turn out to belong to
    /// an obsolete entry.
    raw_comments: Vec<String>,
}

impl PendingEntry {
    fn new(start_line: usize) -> Self {
        PendingEntry {
            entry: Entry::default(),
            start_line,
            has_msgid: false,
            has_msgstr: false,
            last_field: None,
            raw_comments: Vec::new(),
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Msgctxt => self.entry.msgctxt.get_or_insert_with(String::new),
            Field::Msgid => &mut self.entry.msgid,
            Field::Msgstr => &mut self.entry.msgstr,
        }
    }
}

#[derive(Debug, Default)]
struct Parser {
    catalog: Catalog,
    pending: Option<PendingEntry>,
    /// A blank line was seen after obsolete lines.
    obsolete_gap: bool,
}

impl Parser {
    fn finish_entry(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if !pending.has_msgid {
            return Err(Error::format(
                pending.start_line,
                "comments are not followed by a msgid",
            ));
        }
        if !pending.has_msgstr {
            return Err(Error::format(pending.start_line, "entry has no msgstr"));
        }

        let entry = pending.entry;
        if entry.msgctxt.is_none() && entry.msgid.is_empty() {
            if self.catalog.header.is_some() {
                return Err(Error::format(pending.start_line, "duplicate header entry"));
            }
            self.catalog.header = Some(entry);
            return Ok(());
        }

        self.catalog.push(entry).map_err(|entry| {
            Error::format(
                pending.start_line,
                format!(
                    "duplicate key (msgctxt {:?}, msgid {:?})",
                    entry.msgctxt.unwrap_or_default(),
                    entry.msgid
                ),
            )
        })
    }

    /// The entry which the next comment or keyword belongs to.
    ///
    /// A complete entry is finished first: after `msgstr`, any comment
    /// or `msgctxt`/`msgid` starts a new one.
    fn entry_for(&mut self, lineno: usize, starts_entry: bool) -> Result<&mut PendingEntry> {
        let complete = self
            .pending
            .as_ref()
            .is_some_and(|pending| starts_entry && pending.has_msgstr);
        if complete {
            self.finish_entry()?;
        }
        Ok(self
            .pending
            .get_or_insert_with(|| PendingEntry::new(lineno)))
    }

    fn comment(&mut self, lineno: usize, line: &str) -> Result<()> {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.has_msgid && !pending.has_msgstr)
        {
            return Err(Error::format(lineno, "comment between msgid and msgstr"));
        }
        let pending = self.entry_for(lineno, true)?;
        pending.raw_comments.push(line.to_owned());
        let entry = &mut pending.entry;
        let text = |rest: &str| rest.strip_prefix(' ').unwrap_or(rest).to_owned();
        if let Some(rest) = line.strip_prefix("#.") {
            entry.extracted_comments.push(text(rest));
        } else if let Some(rest) = line.strip_prefix("#:") {
            let reference = rest.trim();
            if !reference.is_empty() {
                entry.occurrences.push(Occurrence::parse(reference));
            }
        } else if let Some(rest) = line.strip_prefix("#,") {
            entry.flags.extend(
                rest.split(',')
                    .map(str::trim)
                    .filter(|flag| !flag.is_empty())
                    .map(String::from),
            );
        } else if let Some(rest) = line.strip_prefix("#|") {
            entry.previous.push(text(rest));
        } else {
            entry.translator_comments.push(text(&line[1..]));
        }
        Ok(())
    }

    fn obsolete(&mut self, line: &str) -> Result<()> {
        match self.pending.as_ref().map(|pending| pending.has_msgid) {
            // Comments directly above an obsolete entry belong to it.
            Some(false) => {
                let raw = self.pending.take().map(|p| p.raw_comments).unwrap_or_default();
                self.push_obsolete(raw);
            }
            Some(true) => self.finish_entry()?,
            None => {}
        }
        self.push_obsolete(vec![line.to_owned()]);
        Ok(())
    }

    fn push_obsolete(&mut self, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        if std::mem::take(&mut self.obsolete_gap) && !self.catalog.obsolete.is_empty() {
            self.catalog.obsolete.push(String::new());
        }
        self.catalog.obsolete.extend(lines);
    }

    fn keyword(&mut self, lineno: usize, keyword: &str, rest: &str) -> Result<()> {
        let field = match keyword {
            "msgctxt" => Field::Msgctxt,
            "msgid" => Field::Msgid,
            "msgstr" => Field::Msgstr,
            "msgid_plural" => {
                return Err(Error::format(lineno, "plural forms are not supported"));
            }
            _ if keyword.starts_with("msgstr[") => {
                return Err(Error::format(lineno, "plural forms are not supported"));
            }
            _ => return Err(Error::format(lineno, format!("unknown keyword {keyword:?}"))),
        };
        let value = unquote(rest, lineno)?;

        let pending = self.entry_for(lineno, field != Field::Msgstr)?;
        match field {
            Field::Msgctxt if pending.entry.msgctxt.is_some() => {
                return Err(Error::format(lineno, "duplicate msgctxt"));
            }
            Field::Msgctxt if pending.has_msgid => {
                return Err(Error::format(lineno, "msgctxt must come before msgid"));
            }
            Field::Msgid if pending.has_msgid => {
                return Err(Error::format(lineno, "expected msgstr"));
            }
            Field::Msgstr if pending.has_msgstr => {
                return Err(Error::format(lineno, "duplicate msgstr"));
            }
            Field::Msgstr if !pending.has_msgid => {
                return Err(Error::format(lineno, "msgstr without msgid"));
            }
            Field::Msgid => pending.has_msgid = true,
            Field::Msgstr => pending.has_msgstr = true,
            Field::Msgctxt => {}
        }
        *pending.field_mut(field) = value;
        pending.last_field = Some(field);
        Ok(())
    }

    fn continuation(&mut self, lineno: usize, line: &str) -> Result<()> {
        let value = unquote(line, lineno)?;
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| Error::format(lineno, "string without a keyword"))?;
        let field = pending
            .last_field
            .ok_or_else(|| Error::format(lineno, "string without a keyword"))?;
        pending.field_mut(field).push_str(&value);
        Ok(())
    }

    fn line(&mut self, lineno: usize, line: &str) -> Result<()> {
        let line = line.trim_start();
        if line.trim_end().is_empty() {
            if self.pending.as_ref().is_some_and(|p| p.has_msgid) {
                self.finish_entry()?;
            } else if self.pending.is_none() && !self.catalog.obsolete.is_empty() {
                self.obsolete_gap = true;
            }
            return Ok(());
        }
        if line.starts_with("#~") {
            return self.obsolete(line.trim_end());
        }
        if line.starts_with('#') {
            // A stray carriage return cannot be written back.
            return self.comment(lineno, line.trim_end_matches('\r'));
        }
        let line = line.trim_end();
        if line.starts_with('"') {
            return self.continuation(lineno, line);
        }
        let (keyword, rest) = line
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((line, ""));
        self.keyword(lineno, keyword, rest)
    }
}

/// Parse the text of a PO file.
///
/// The text must already be decoded, see [`crate::encoding`].
pub fn parse(text: &str) -> Result<Catalog> {
    let mut parser = Parser::default();
    for (idx, line) in text.lines().enumerate() {
        parser.line(idx + 1, line)?;
    }
    parser.finish_entry()?;
    Ok(parser.catalog)
}

/// Read one quoted PO string, resolving escape sequences.
fn unquote(text: &str, lineno: usize) -> Result<String> {
    let text = text.trim();
    let body = text
        .strip_prefix('"')
        .ok_or_else(|| Error::format(lineno, "expected a quoted string"))?;

    let mut value = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => {
                if !body[idx + 1..].trim().is_empty() {
                    return Err(Error::format(lineno, "unexpected text after string"));
                }
                return Ok(value);
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, other)) => {
                    return Err(Error::format(
                        lineno,
                        format!("unknown escape sequence \\{other}"),
                    ))
                }
                None => return Err(Error::format(lineno, "unterminated string")),
            },
            _ => value.push(c),
        }
    }
    Err(Error::format(lineno, "unterminated string"))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str(r"\n"),
            '\t' => escaped.push_str(r"\t"),
            '\r' => escaped.push_str(r"\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn write_field(out: &mut String, keyword: &str, value: &str) {
    let lines = value.split_inclusive('\n').collect::<Vec<_>>();
    if lines.len() > 1 {
        out.push_str(keyword);
        out.push_str(" \"\"\n");
        for line in lines {
            out.push('"');
            out.push_str(&escape(line));
            out.push_str("\"\n");
        }
    } else {
        out.push_str(&format!("{keyword} \"{}\"\n", escape(value)));
    }
}

fn write_comments(out: &mut String, marker: &str, comments: &[String]) {
    for comment in comments {
        out.push_str(marker);
        if !comment.is_empty() {
            out.push(' ');
            out.push_str(comment);
        }
        out.push('\n');
    }
}

fn write_entry(out: &mut String, entry: &Entry) {
    write_comments(out, "#", &entry.translator_comments);
    write_comments(out, "#.", &entry.extracted_comments);
    for occurrence in &entry.occurrences {
        out.push_str(&format!("#: {occurrence}\n"));
    }
    if !entry.flags.is_empty() {
        out.push_str(&format!("#, {}\n", entry.flags.join(", ")));
    }
    write_comments(out, "#|", &entry.previous);
    if let Some(msgctxt) = &entry.msgctxt {
        write_field(out, "msgctxt", msgctxt);
    }
    write_field(out, "msgid", &entry.msgid);
    write_field(out, "msgstr", &entry.msgstr);
}

/// Render a catalog as PO text.
///
/// Parsing the output with [`parse`] gives back an equal catalog.
pub fn serialize(catalog: &Catalog) -> String {
    let mut out = String::new();
    let mut blocks = 0;
    for entry in catalog.header.iter().chain(catalog.iter()) {
        if blocks > 0 {
            out.push('\n');
        }
        write_entry(&mut out, entry);
        blocks += 1;
    }
    if !catalog.obsolete.is_empty() {
        if blocks > 0 {
            out.push('\n');
        }
        for line in &catalog.obsolete {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
