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

//! Named text encodings for catalog files.
//!
//! The editor reads and writes PO files as UTF-8 with a byte order
//! mark, so `utf-8-sig` is the default. Other codecs are accepted by
//! name for projects which changed the export settings.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF16_LE_BOM: &[u8] = b"\xFF\xFE";
const UTF16_BE_BOM: &[u8] = b"\xFE\xFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8 { bom: bool },
    Utf16Le { bom: bool },
    Utf16Be { bom: bool },
    /// Any other WHATWG encoding known to `encoding_rs`.
    Legacy(&'static encoding_rs::Encoding),
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::Utf8 { bom: true }
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "utf-8-sig" | "utf8-sig" => TextEncoding::Utf8 { bom: true },
            "utf-8" | "utf8" => TextEncoding::Utf8 { bom: false },
            "utf-16" | "utf16" => TextEncoding::Utf16Le { bom: true },
            "utf-16-le" | "utf-16le" => TextEncoding::Utf16Le { bom: false },
            "utf-16-be" | "utf-16be" => TextEncoding::Utf16Be { bom: false },
            _ => match encoding_rs::Encoding::for_label(normalized.as_bytes()) {
                // `encoding_rs` only decodes UTF-16, so keep our own codec.
                Some(encoding) if encoding == encoding_rs::UTF_16LE => {
                    TextEncoding::Utf16Le { bom: false }
                }
                Some(encoding) if encoding == encoding_rs::UTF_16BE => {
                    TextEncoding::Utf16Be { bom: false }
                }
                Some(encoding) if encoding == encoding_rs::UTF_8 => {
                    TextEncoding::Utf8 { bom: false }
                }
                Some(encoding) => TextEncoding::Legacy(encoding),
                None => return Err(Error::Config(format!("unknown encoding {name:?}"))),
            },
        };
        Ok(encoding)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 { bom: true } => write!(f, "utf-8-sig"),
            TextEncoding::Utf8 { bom: false } => write!(f, "utf-8"),
            TextEncoding::Utf16Le { bom: true } => write!(f, "utf-16"),
            TextEncoding::Utf16Le { bom: false } => write!(f, "utf-16-le"),
            TextEncoding::Utf16Be { .. } => write!(f, "utf-16-be"),
            TextEncoding::Legacy(encoding) => write!(f, "{}", encoding.name().to_lowercase()),
        }
    }
}

impl TextEncoding {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::Encoding {
            encoding: self.to_string(),
            message: message.into(),
        }
    }

    /// Decode file contents. A leading byte order mark matching the
    /// encoding is dropped whether or not the encoding writes one.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match *self {
            TextEncoding::Utf8 { .. } => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|err| {
                        self.error(format!("invalid byte sequence at offset {}", err.valid_up_to()))
                    })
            }
            TextEncoding::Utf16Le { .. } => {
                decode_utf16(bytes.strip_prefix(UTF16_LE_BOM).unwrap_or(bytes), false)
                    .ok_or_else(|| self.error("invalid UTF-16 data"))
            }
            TextEncoding::Utf16Be { .. } => {
                decode_utf16(bytes.strip_prefix(UTF16_BE_BOM).unwrap_or(bytes), true)
                    .ok_or_else(|| self.error("invalid UTF-16 data"))
            }
            TextEncoding::Legacy(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned)
                .ok_or_else(|| self.error("input is not valid in this encoding")),
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let bytes = match *self {
            TextEncoding::Utf8 { bom } => {
                let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
                if bom {
                    bytes.extend_from_slice(UTF8_BOM);
                }
                bytes.extend_from_slice(text.as_bytes());
                bytes
            }
            TextEncoding::Utf16Le { bom } => encode_utf16(text, bom, false),
            TextEncoding::Utf16Be { bom } => encode_utf16(text, bom, true),
            TextEncoding::Legacy(encoding) => {
                let (bytes, _, had_errors) = encoding.encode(text);
                if had_errors {
                    return Err(self.error("text contains characters this encoding cannot represent"));
                }
                bytes.into_owned()
            }
        };
        Ok(bytes)
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect::<Vec<_>>();
    String::from_utf16(&units).ok()
}

fn encode_utf16(text: &str, bom: bool, big_endian: bool) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(text.len() * 2 + 2);
    if bom {
        buffer.extend_from_slice(if big_endian { UTF16_BE_BOM } else { UTF16_LE_BOM });
    }
    for unit in text.encode_utf16() {
        let bytes = if big_endian {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        };
        buffer.extend_from_slice(&bytes);
    }
    buffer
}
