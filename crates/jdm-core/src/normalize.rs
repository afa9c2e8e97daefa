//! Conversion of caller values into the staged tree, and the canonical pass run
//! before a tree is written.
//!
//! Every value enters a staging buffer through [`normalize`]: serde projects
//! sequences element-wise, map-like collections into their entries, structs
//! into mappings of their named fields, and passes scalars through. The
//! result is a plain `serde_json::Value`, so nothing downstream ever sees a
//! caller-specific shape. Iterators and other collections without a
//! `Serialize` impl go through [`normalize_items`].

use serde::Serialize;
use serde_json::{Number, Value};

use crate::codec::EncodeOptions;
use crate::error::{Error, Result};

pub fn normalize<V: Serialize>(value: V) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::Normalize)
}

/// Normalize any iterable collection into a sequence.
pub fn normalize_items<I>(items: I) -> Result<Value>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    items
        .into_iter()
        .map(normalize)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// The last pass before encoding. With `numeric_check`, numeric-looking string
/// values become numbers; keys are never touched.
pub fn canonicalize(tree: Value, opts: &EncodeOptions) -> Value {
    match tree {
        Value::String(s) if opts.numeric_check => match numeric_literal(&s) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| canonicalize(v, opts)).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v, opts)))
                .collect(),
        ),
        other => other,
    }
}

/// Loose numeric strings: surrounding whitespace, a leading `+`, leading zeros
/// and a bare `.5` or `5.` are accepted. The text is rewritten into a JSON
/// number literal (`" +007.50 "` becomes `7.50`) before it is parsed.
fn numeric_literal(s: &str) -> Option<Number> {
    let s = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'));
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !digits(int) || !digits(frac) {
        return None;
    }

    let mut literal = String::with_capacity(s.len() + 1);
    if negative {
        literal.push('-');
    }
    match int.trim_start_matches('0') {
        "" => literal.push('0'),
        int => literal.push_str(int),
    }
    if !frac.is_empty() {
        literal.push('.');
        literal.push_str(frac);
    }
    if let Some(exp) = exponent {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp_digits.is_empty() || !digits(exp_digits) {
            return None;
        }
        literal.push('e');
        literal.push_str(exp);
    }
    serde_json::from_str(&literal).ok()
}
