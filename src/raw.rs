//! Raw deserializer — file path to untyped legacy record.
//!
//! Legacy session files are nested key/value records encoded as JSON. Text
//! written by old tool versions is not always valid UTF-8, so decoding is a
//! configurable [`TextDecoding`] policy rather than a hard failure.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::CompatError;
use crate::model::SectionMap;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How undecodable bytes in a legacy file are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TextDecoding {
    /// Invalid UTF-8 sequences become U+FFFD and are counted.
    #[default]
    Replace,
    /// Invalid UTF-8 makes the record malformed.
    Strict,
    /// Every byte is read as the code point of the same value (ISO-8859-1).
    Latin1,
}

/// Outcome of decoding a byte buffer to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Number of invalid byte sequences that were replaced.
    pub replaced: usize,
}

/// An untyped legacy record: the top-level object of a legacy session file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLegacyRecord {
    fields: SectionMap,
}

impl RawLegacyRecord {
    pub fn new(fields: SectionMap) -> Self {
        Self { fields }
    }

    /// Top-level field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Top-level field that must be a nested mapping.
    pub fn get_map(&self, key: &str) -> Option<&SectionMap> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &SectionMap {
        &self.fields
    }
}

impl From<SectionMap> for RawLegacyRecord {
    fn from(fields: SectionMap) -> Self {
        Self::new(fields)
    }
}

/// Reads legacy record files with a fixed decoding policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawReader {
    pub decoding: TextDecoding,
}

impl RawReader {
    pub fn new(decoding: TextDecoding) -> Self {
        Self { decoding }
    }

    /// Read `path` fully and parse it into a [`RawLegacyRecord`].
    pub fn read(&self, path: &Path) -> Result<RawLegacyRecord, CompatError> {
        debug!(path = %path.display(), decoding = ?self.decoding, "reading legacy record");

        let bytes = std::fs::read(path).map_err(|e| CompatError::FileUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let (text, report) =
            decode_text(&bytes, self.decoding).map_err(|detail| CompatError::MalformedRecord {
                path: path.to_path_buf(),
                detail,
            })?;
        if report.replaced > 0 {
            warn!(
                path = %path.display(),
                replaced = report.replaced,
                "replaced undecodable byte sequences in legacy record"
            );
        }

        parse_record(&text).map_err(|detail| CompatError::MalformedRecord {
            path: path.to_path_buf(),
            detail,
        })
    }
}

/// Decode `bytes` to text under `policy`.
///
/// A leading UTF-8 byte order mark is dropped under every policy. Only
/// [`TextDecoding::Strict`] can fail.
pub fn decode_text(bytes: &[u8], policy: TextDecoding) -> Result<(String, DecodeReport), String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match policy {
        TextDecoding::Strict => std::str::from_utf8(bytes)
            .map(|s| (s.to_string(), DecodeReport::default()))
            .map_err(|e| format!("invalid UTF-8: {e}")),
        TextDecoding::Replace => {
            let mut text = String::with_capacity(bytes.len());
            let mut report = DecodeReport::default();
            for chunk in bytes.utf8_chunks() {
                text.push_str(chunk.valid());
                if !chunk.invalid().is_empty() {
                    text.push(char::REPLACEMENT_CHARACTER);
                    report.replaced += 1;
                }
            }
            Ok((text, report))
        }
        TextDecoding::Latin1 => Ok((
            bytes.iter().map(|&b| char::from(b)).collect(),
            DecodeReport::default(),
        )),
    }
}

/// Parse decoded text into a record. The top level must be an object.
pub fn parse_record(text: &str) -> Result<RawLegacyRecord, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("not a record: {e}"))?;
    match value {
        Value::Object(fields) => {
            trace!(fields = fields.len(), "parsed legacy record");
            Ok(RawLegacyRecord::new(fields))
        }
        other => Err(format!(
            "expected a nested key/value record at top level, found {}",
            json_kind(&other)
        )),
    }
}

/// Short name of a JSON value's type, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
