//! Comprobantes CSV reader with ordered encoding trial.
//!
//! AFIP exports carry accented Spanish headers under inconsistent legacy
//! encodings. Every candidate encoding is tried in order and header names are
//! folded to plain ASCII, so column lookups succeed whatever the source
//! encoding was.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{CsvError, CsvResult};
use crate::models::InvoiceTable;

/// Field separator of Comprobantes exports.
pub const DELIMITER: u8 = b';';

/// Quote character of Comprobantes exports.
pub const QUOTE: u8 = b'"';

/// Character left behind by earlier lossy conversions.
const CORRUPT_SENTINEL: char = '\u{FFFD}';

/// Bytes that windows-1252 leaves unassigned.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

// =============================================================================
// Encodings
// =============================================================================

/// Text encodings the reader knows how to try.
///
/// Serialized by label; catalogs may use any alias [`FromStr`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    Latin1,
    Cp1252,
    Utf8,
    Iso8859_1,
}

impl Encoding {
    /// The default trial order.
    pub const DEFAULT_CANDIDATES: [Encoding; 4] = [
        Encoding::Latin1,
        Encoding::Cp1252,
        Encoding::Utf8,
        Encoding::Iso8859_1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Latin1 => "latin-1",
            Encoding::Cp1252 => "cp1252",
            Encoding::Utf8 => "utf-8",
            Encoding::Iso8859_1 => "iso-8859-1",
        }
    }

    /// One byte per character: decodes UTF-8 multibyte sequences as mojibake.
    pub fn is_single_byte(&self) -> bool {
        !matches!(self, Encoding::Utf8)
    }

    /// Strict decode: `None` when the bytes are not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            // latin-1 and iso-8859-1 are the same codec: one byte, one code point
            Encoding::Latin1 | Encoding::Iso8859_1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Encoding::Cp1252 => {
                if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
                    return None;
                }
                encoding_rs::WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latin-1" | "latin1" | "l1" => Ok(Encoding::Latin1),
            "cp1252" | "windows-1252" => Ok(Encoding::Cp1252),
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "iso8859-1" => Ok(Encoding::Iso8859_1),
            other => Err(CsvError::UnknownEncoding(other.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = CsvError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.label().to_string()
    }
}

/// Decoded file content plus the encoding that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub encoding: Encoding,
}

/// Decode `bytes` by trying each candidate encoding in order.
///
/// latin-1 decodes any byte sequence, so a candidate only wins outright when
/// its normalized header row holds every name in `expected_columns`. Without
/// such a match the first candidate that decoded cleanly is used. When every
/// candidate fails, a strict UTF-8 decode is the last attempt.
///
/// Bytes that are valid UTF-8 and hold multibyte sequences are never read
/// with a single-byte encoding, even when the header row is plain ASCII.
pub fn detect_encoding(
    bytes: &[u8],
    candidates: &[Encoding],
    expected_columns: &[String],
) -> CsvResult<Decoded> {
    let multibyte_utf8 = is_multibyte_utf8(bytes);
    let mut first_clean: Option<Decoded> = None;

    for &encoding in candidates {
        if multibyte_utf8 && encoding.is_single_byte() {
            continue;
        }
        let Some(text) = encoding.decode(bytes) else {
            continue;
        };
        let headers = header_names(&text);
        if expected_columns.iter().all(|c| headers.contains(c)) {
            return Ok(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
        if first_clean.is_none() {
            first_clean = Some(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
    }

    if let Some(decoded) = first_clean {
        return Ok(decoded);
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map(|text| Decoded {
            text,
            encoding: Encoding::Utf8,
        })
        .map_err(|e| CsvError::EncodingError {
            tried: candidates
                .iter()
                .map(Encoding::label)
                .collect::<Vec<_>>()
                .join(", "),
            message: e.to_string(),
        })
}

fn is_multibyte_utf8(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    !bytes.is_ascii() && encoding_rs::Encoding::utf8_valid_up_to(bytes) == bytes.len()
}

/// Normalized names of the first record, empty when there is none.
fn header_names(text: &str) -> Vec<String> {
    let mut rdr = reader_for(text);
    match rdr.headers() {
        Ok(record) => record.iter().map(normalize_column_name).collect(),
        Err(_) => Vec::new(),
    }
}

/// Fold a header to plain ASCII.
///
/// Removes the corrupt-character sentinel, decomposes (NFKD), drops every
/// non-ASCII character and trims surrounding whitespace:
/// `"Fecha de Emisión "` becomes `"Fecha de Emision"`.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != CORRUPT_SENTINEL)
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .trim()
        .to_string()
}

// =============================================================================
// Parsing
// =============================================================================

/// Result of reading one source file.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Table with normalized column names
    pub table: InvoiceTable,
    /// Encoding that was used
    pub encoding: Encoding,
}

fn reader_for(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Parse decoded text into a table, normalizing column names.
pub fn parse_table(text: &str) -> CsvResult<InvoiceTable> {
    let mut rdr = reader_for(text);

    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_column_name).collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(CsvError::EmptyFile);
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(InvoiceTable::new(headers, rows))
}

/// Decode and parse raw bytes.
pub fn parse_bytes(
    bytes: &[u8],
    candidates: &[Encoding],
    expected_columns: &[String],
) -> CsvResult<ParseResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(CsvError::EmptyFile);
    }
    let decoded = detect_encoding(bytes, candidates, expected_columns)?;
    let table = parse_table(&decoded.text)?;
    Ok(ParseResult {
        table,
        encoding: decoded.encoding,
    })
}

/// Read, decode and parse a file.
///
/// # Example
/// ```ignore
/// let result = parse_file(path, &Encoding::DEFAULT_CANDIDATES, &[])?;
/// println!("Encoding: {}, rows: {}", result.encoding, result.table.row_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(
    path: P,
    candidates: &[Encoding],
    expected_columns: &[String],
) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, candidates, expected_columns)
}
