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

use std::path::PathBuf;

use thiserror::Error;

/// Which rule list an invalid pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Addition,
    Deletion,
    Placeholder,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Addition => write!(f, "comments_criteria"),
            RuleKind::Deletion => write!(f, "delete_comments_criteria"),
            RuleKind::Placeholder => write!(f, "placeholder pattern"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed catalog at line {line}: {message}")]
    Format { line: usize, message: String },
    #[error(
        "Identifier space exhausted for prefix {prefix:?} with {id_length} digits; \
         increase id_length and run with clear_translations"
    )]
    IdentitySpaceExhausted { prefix: String, id_length: usize },
    #[error(
        "Ledger uses identifiers {found_prefix:?} x {found_length} but the configuration asks for \
         {prefix:?} x {id_length}; run with clear_translations to renumber"
    )]
    LedgerMismatch {
        found_prefix: String,
        found_length: usize,
        prefix: String,
        id_length: usize,
    },
    #[error("Invalid pattern in {kind} rule #{index} ({pattern:?}): {source}")]
    RuleConfig {
        index: usize,
        kind: RuleKind,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Encoding error ({encoding}): {message}")]
    Encoding { encoding: String, message: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt ledger {path:?}: {message}")]
    CorruptLedger { path: PathBuf, message: String },
    #[error("Ledger error: {0}")]
    Ledger(#[from] serde_json::Error),
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
