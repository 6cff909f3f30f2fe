use arbitrary::Arbitrary;
use locsync::{Catalog, Entry};

/// Wrapper struct for generating arbitrary catalog entries.
#[derive(Arbitrary, Debug)]
pub struct FuzzEntry {
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgstr: String,
    pub translator_comments: Vec<String>,
    pub extracted_comments: Vec<String>,
    pub references: Vec<String>,
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Generate a random Catalog for fuzzing.
///
/// Comment lines and references are flattened to one line, entries
/// with an empty `msgid` and duplicate keys are dropped.
pub fn create_catalog(entries: Vec<FuzzEntry>) -> Catalog {
    let mut catalog = Catalog::new();
    for fuzz_entry in entries {
        if fuzz_entry.msgid.is_empty() {
            continue;
        }
        let mut entry = Entry::new(fuzz_entry.msgid).with_msgstr(fuzz_entry.msgstr);
        entry.msgctxt = fuzz_entry.msgctxt;
        for comment in &fuzz_entry.translator_comments {
            entry = entry.with_translator_comment(single_line(comment));
        }
        for comment in &fuzz_entry.extracted_comments {
            entry = entry.with_extracted_comment(single_line(comment));
        }
        for reference in &fuzz_entry.references {
            let reference = single_line(reference);
            if !reference.trim().is_empty() {
                entry = entry.with_occurrence(reference.trim());
            }
        }
        let _ = catalog.push(entry); // Duplicate keys are skipped.
    }
    catalog
}
