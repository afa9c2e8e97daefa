use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{Error, Result};
use crate::normalize::canonicalize;

/// On-disk formatting knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Spaces per nesting level; 0 writes compact single-line JSON.
    pub indent: usize,
    /// Write strings that are valid JSON number literals as numbers.
    pub numeric_check: bool,
    pub trailing_newline: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            numeric_check: true,
            trailing_newline: false,
        }
    }
}

/// Canonicalize and serialize a staged tree.
///
/// Slashes and non-ASCII characters are written unescaped; an empty mapping is
/// written as `{}`.
pub fn encode(tree: &Value, opts: &EncodeOptions) -> Result<String> {
    let canonical = canonicalize(tree.clone(), opts);
    let mut buf = Vec::with_capacity(128);
    if opts.indent == 0 {
        serde_json::to_writer(&mut buf, &canonical).map_err(Error::Encode)?;
    } else {
        let indent = vec![b' '; opts.indent];
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
        canonical.serialize(&mut ser).map_err(Error::Encode)?;
    }
    if opts.trailing_newline {
        buf.push(b'\n');
    }
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Compact form used by read projections; no canonicalization.
pub fn to_compact_string(tree: &Value) -> Result<String> {
    serde_json::to_string(tree).map_err(Error::Encode)
}

/// Parse document bytes. Blank input (a freshly touched file) is `None`.
///
/// Invalid UTF-8 is replaced with U+FFFD instead of failing, a leading BOM is
/// skipped, and integers that fit neither i64 nor u64 come back as strings.
pub fn decode_document(bytes: &[u8]) -> Result<Option<Value>> {
    let lossy = String::from_utf8_lossy(bytes);
    let text = lossy.strip_prefix('\u{feff}').unwrap_or(lossy.as_ref());
    if text.trim().is_empty() {
        return Ok(None);
    }
    decode(text).map(Some)
}

pub fn decode(text: &str) -> Result<Value> {
    let mut value: Value = serde_json::from_str(text).map_err(Error::Decode)?;
    stringify_big_integers(&mut value);
    Ok(value)
}

fn stringify_big_integers(value: &mut Value) {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() && !n.is_f64() => {
            *value = Value::String(n.to_string());
        }
        Value::Array(items) => items.iter_mut().for_each(stringify_big_integers),
        Value::Object(map) => map.values_mut().for_each(stringify_big_integers),
        _ => {}
    }
}

pub fn load_file(path: &Path) -> Result<Option<Value>> {
    let data = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    decode_document(&data)
}

/// Encode and replace the file content in full. Returns the number of bytes written.
pub fn write_file(path: &Path, tree: &Value, opts: &EncodeOptions) -> Result<usize> {
    let s = encode(tree, opts)?;
    fs::write(path, &s).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_output_uses_configured_indent() {
        let tree = json!({"name": "Ann", "tags": ["a"]});
        let s = encode(&tree, &EncodeOptions::default()).unwrap();
        assert_eq!(s, "{\n    \"name\": \"Ann\",\n    \"tags\": [\n        \"a\"\n    ]\n}");
        let two = EncodeOptions { indent: 2, ..Default::default() };
        assert!(encode(&tree, &two).unwrap().contains("\n  \"name\""));
        let compact = EncodeOptions { indent: 0, trailing_newline: true, ..Default::default() };
        assert_eq!(encode(&tree, &compact).unwrap(), "{\"name\":\"Ann\",\"tags\":[\"a\"]}\n");
    }

    #[test]
    fn empty_mapping_is_braces() {
        assert_eq!(encode(&json!({}), &EncodeOptions::default()).unwrap(), "{}");
    }

    #[test]
    fn slashes_and_unicode_are_not_escaped() {
        let tree = json!({"url": "http://x/y", "name": "Zoë ☃"});
        let s = encode(&tree, &EncodeOptions::default()).unwrap();
        assert!(s.contains("http://x/y"));
        assert!(s.contains("Zoë ☃"));
    }

    #[test]
    fn numeric_strings_written_as_numbers() {
        let tree = json!({"age": "30", "version": "1.0.0", "id": "007"});
        let s = encode(&tree, &EncodeOptions { indent: 0, ..Default::default() }).unwrap();
        assert_eq!(s, r#"{"age":30,"version":"1.0.0","id":7}"#);
        let off = EncodeOptions { indent: 0, numeric_check: false, ..Default::default() };
        assert_eq!(encode(&tree, &off).unwrap(), r#"{"age":"30","version":"1.0.0","id":"007"}"#);
    }

    #[test]
    fn big_integers_survive_round_trip() {
        let text = r#"{"big":123456789012345678901234567890,"small":42,"neg":-7,"f":1.5}"#;
        let v = decode(text).unwrap();
        assert_eq!(v["big"], json!("123456789012345678901234567890"));
        assert!(v["small"].is_number());
        assert!(v["f"].is_number());
        let out = encode(&v, &EncodeOptions { indent: 0, ..Default::default() }).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn blank_and_bom_input() {
        assert!(decode_document(b"  \n").unwrap().is_none());
        let v = decode_document("\u{feff}{\"a\":1}".as_bytes()).unwrap().unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn invalid_utf8_is_substituted() {
        let v = decode_document(b"{\"name\":\"a\xffb\"}").unwrap().unwrap();
        assert_eq!(v["name"], json!("a\u{fffd}b"));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(decode("{\"a\":"), Err(Error::Decode(_))));
    }
}
