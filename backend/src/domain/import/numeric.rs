//! Lenient parsing of prices and counts typed by people.
//!
//! Everything except digits, signs, `.` and `,` is discarded first, so
//! currency prefixes and spaces never matter; a separator that punctuates
//! the prefix (`"Rp.3500"`) goes with it. A single separator followed by
//! exactly three digits is read as a thousands separator (`"3.200"` is 3200),
//! otherwise it is the decimal point (`"3,5"` is 3.5). When both separators
//! appear, the last one is the decimal point.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Parse a human-formatted number. Empty or unparsable input yields `None`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let kept = strip_prefix_noise(raw);
    let negative = kept.starts_with('-');
    let body: String = kept.chars().filter(|c| !matches!(c, '-' | '+')).collect();
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let (integer, fraction) = split_separators(&body);
    let mut literal = String::with_capacity(body.len() + 2);
    if negative {
        literal.push('-');
    }
    literal.push_str(if integer.is_empty() { "0" } else { &integer });
    if !fraction.is_empty() {
        literal.push('.');
        literal.push_str(&fraction);
    }
    Decimal::from_str(&literal).ok()
}

/// Keep digits, signs and separators, dropping separators that trail a
/// non-numeric prefix before the first digit.
fn strip_prefix_noise(raw: &str) -> String {
    let mut kept = String::with_capacity(raw.len());
    let mut seen_digit = false;
    let mut after_prefix = false;
    for c in raw.chars() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                kept.push(c);
            }
            '-' | '+' => kept.push(c),
            '.' | ',' => {
                if seen_digit || !after_prefix {
                    kept.push(c);
                }
            }
            _ => after_prefix |= !seen_digit && !c.is_whitespace(),
        }
    }
    kept
}

/// Parse a whole number, truncating any fractional part.
pub fn parse_integer(raw: &str) -> Option<i64> {
    parse_decimal(raw).and_then(|value| value.trunc().to_i64())
}

fn split_separators(body: &str) -> (String, String) {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');
    let decimal_at = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(at), None) | (None, Some(at)) => {
            let separator = body[at..].chars().next().unwrap_or('.');
            single_kind_decimal_position(body, separator, at)
        }
        (None, None) => None,
    };

    match decimal_at {
        Some(at) => (digits_only(&body[..at]), digits_only(&body[at + 1..])),
        None => (digits_only(body), String::new()),
    }
}

fn single_kind_decimal_position(body: &str, separator: char, at: usize) -> Option<usize> {
    if body.matches(separator).count() > 1 {
        return None;
    }
    let leading = digits_only(&body[..at]);
    let trailing = &body[at + 1..];
    let looks_grouped = trailing.len() == 3 && !leading.is_empty() && leading != "0";
    if looks_grouped { None } else { Some(at) }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}
