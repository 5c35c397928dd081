//! Canonical rendering of headers and values as Python literals.
//!
//! Every literal in a generated script goes through this module so that the
//! same input always renders to the same bytes.

use std::path::Path;

use stepsheet_core::{CellValue, ColumnHeader};

/// Quote a string the way Python's `repr` does.
pub fn string_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// A float as Python prints it: `1.0`, `1e-07`, `1e+16`, `float('nan')`.
pub fn float_literal(x: f64) -> String {
    if x.is_nan() {
        return "float('nan')".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "float('inf')".into() } else { "-float('inf')".into() };
    }
    let debug = format!("{x:?}");
    match debug.split_once('e') {
        None => debug,
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
            format!("{mantissa}e{sign}{digits:0>2}")
        }
    }
}

/// A number used in a comparison. Whole numbers render without a fraction.
pub fn number_literal(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        float_literal(x)
    }
}

pub fn bool_literal(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Numeric and boolean headers stay unquoted, multi-part headers become tuples.
pub fn header_literal(header: &ColumnHeader) -> String {
    match header {
        ColumnHeader::Boolean(b) => bool_literal(*b).into(),
        ColumnHeader::Integer(n) => n.to_string(),
        ColumnHeader::Float(x) => float_literal(*x),
        ColumnHeader::Text(s) => string_literal(s),
        ColumnHeader::MultiPart(parts) => {
            let rendered: Vec<String> = parts.iter().map(header_literal).collect();
            if rendered.len() == 1 {
                format!("({},)", rendered[0])
            } else {
                format!("({})", rendered.join(", "))
            }
        }
    }
}

pub fn value_literal(value: &CellValue) -> String {
    match value {
        CellValue::Null => "None".into(),
        CellValue::Boolean(b) => bool_literal(*b).into(),
        CellValue::Integer(n) => n.to_string(),
        CellValue::Float(x) => float_literal(*x),
        CellValue::Text(s) => string_literal(s),
    }
}

/// File paths are raw strings so Windows separators survive.
pub fn path_literal(path: &Path) -> String {
    let raw = path.display().to_string();
    if raw.contains('\'') || raw.ends_with('\\') {
        string_literal(&raw)
    } else {
        format!("r'{raw}'")
    }
}
