//! Scalar formatting for both encoder paths.
//!
//! The general path quotes every scalar except a bare `null`. The native fast
//! path writes numbers and booleans bare. Floats use `NaN` and `inf` as
//! sentinel tokens on both paths; the sign of an infinity is not kept.

use std::fmt::{Debug, Write};

use marshal_core::{NativeArray, Value};

use crate::config::CsvConfig;
use crate::error::{CsvError, Result};

const NAN: &str = "NaN";
const INFINITY: &str = "inf";

/// Append `text` as a quoted literal with escape sequences for quotes,
/// backslashes, control characters and U+2028/U+2029.
pub fn escape_into(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Append one scalar in general-path form.
pub(crate) fn write_literal(out: &mut String, value: &Value, config: &CsvConfig) -> Result<()> {
    match value {
        Value::Null if config.null_as_empty_string => out.push_str("\"\""),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "\"{b}\"");
        }
        Value::Int(i) => {
            let _ = write!(out, "\"{i}\"");
        }
        Value::UInt(u) => {
            let _ = write!(out, "\"{u}\"");
        }
        Value::Float(f) => {
            out.push('"');
            write_float(out, *f, f.is_nan(), f.is_infinite());
            out.push('"');
        }
        Value::Char(c) if config.char_as_string => write_char(out, *c, config),
        Value::Char(c) => {
            let _ = write!(out, "\"{}\"", u32::from(*c));
        }
        Value::String(s) => escape_into(out, s),
        Value::Map(_) | Value::Seq(_) => {
            return Err(CsvError::UnsupportedNesting {
                context: "compound value in a field position",
            })
        }
    }
    Ok(())
}

/// Append every element of a native sequence in fast-path form, separated
/// but not terminated.
pub(crate) fn write_native(out: &mut String, native: &NativeArray, config: &CsvConfig) {
    let separator = config.separator();
    match native {
        NativeArray::Bool(items) => join(out, items, separator, |out, b| {
            out.push_str(if *b { "true" } else { "false" })
        }),
        NativeArray::I8(items) => join(out, items, separator, write_display),
        NativeArray::I16(items) => join(out, items, separator, write_display),
        NativeArray::I32(items) => join(out, items, separator, write_display),
        NativeArray::I64(items) => join(out, items, separator, write_display),
        NativeArray::U8(items) => join(out, items, separator, write_display),
        NativeArray::U16(items) => join(out, items, separator, write_display),
        NativeArray::U32(items) => join(out, items, separator, write_display),
        NativeArray::U64(items) => join(out, items, separator, write_display),
        NativeArray::F32(items) => join(out, items, separator, |out, f| {
            write_float(out, *f, f.is_nan(), f.is_infinite())
        }),
        NativeArray::F64(items) => join(out, items, separator, |out, f| {
            write_float(out, *f, f.is_nan(), f.is_infinite())
        }),
        NativeArray::Char(items) => join(out, items, separator, |out, c| write_char(out, *c, config)),
    }
}

fn join<T>(out: &mut String, items: &[T], separator: &str, mut write: impl FnMut(&mut String, &T)) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(separator);
        }
        write(out, item);
    }
}

fn write_display<T: std::fmt::Display>(out: &mut String, value: &T) {
    let _ = write!(out, "{value}");
}

// `{:?}` prints `1.0` for whole floats and the shortest text that reads back
// to the same value.
fn write_float<F: Debug>(out: &mut String, value: F, nan: bool, infinite: bool) {
    if nan {
        out.push_str(NAN);
    } else if infinite {
        out.push_str(INFINITY);
    } else {
        let _ = write!(out, "{value:?}");
    }
}

fn write_char(out: &mut String, c: char, config: &CsvConfig) {
    if config.char_as_string {
        let mut buf = [0u8; 4];
        escape_into(out, c.encode_utf8(&mut buf));
    } else {
        let _ = write!(out, "{}", u32::from(c));
    }
}
