//! Scalar coercions shared by the filter and the cell formatter.
//!
//! Sheet values come straight out of JSON exports of spreadsheets, so a
//! "number" column may hold numbers, numeric strings, blanks or free text.
//! The helpers here give every raw value one string form and one numeric
//! form, with the same rules the exported sheets were authored against
//! (browser number semantics).

use serde_json::Value;

// Numbers at or above this magnitude are printed in exponent form.
const EXPONENT_UPPER: f64 = 1e21;
// Numbers below this magnitude (and non zero) are printed in exponent form.
const EXPONENT_LOWER: f64 = 1e-6;

/// Trim leading and trailing whitespace, including the byte order mark that
/// spreadsheet exports like to leave in header cells.
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Lowercase and trim a string.
pub fn normalize_str(s: &str) -> String {
    trim(&s.to_lowercase()).to_string()
}

/// Lowercase and trim the string form of a value. Missing and null values
/// normalize to the empty string.
pub fn normalize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => normalize_str(&to_display_string(v)),
    }
}

/// The plain string form of a raw value.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => s.clone(),
        // Sheets are flat, nested values only show up in broken exports.
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Like [`to_display_string`] but missing and null values become empty.
/// Used when a whole row is joined into one searchable line.
pub fn to_cell_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => to_display_string(v),
    }
}

/// Coerce a raw value to a number. Missing and null values are `0`, text
/// that is not a number literal is `NaN`.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_number(s),
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    }
}

/// Parse a numeric string. Accepts surrounding whitespace, decimal literals
/// with optional sign and exponent, `Infinity` and unsigned `0x`/`0o`/`0b`
/// integer literals. Blank strings are `0`.
pub fn parse_number(s: &str) -> f64 {
    let s = trim(s);
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&s[2..], radix);
    }

    // Rust's float parser also takes "inf" and "nan", which are not numbers here.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut acc = 0.0_f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => acc = acc * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    acc
}

/// The shortest string that reads back as `x`, in browser notation:
/// integral values print without a fraction, very large and very small
/// magnitudes use an exponent (`1e+21`, `1e-7`).
pub fn number_to_string(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if x == 0.0 {
        // Covers -0 as well.
        return "0".to_string();
    }

    let abs = x.abs();
    if (EXPONENT_LOWER..EXPONENT_UPPER).contains(&abs) {
        return format!("{x}");
    }

    let s = format!("{x:e}");
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => s,
    }
}

/// Fixed point notation with `digits` decimals.
///
/// Rounds the exact binary value of `x`. When `x` lies exactly halfway
/// between two candidates the one further from zero wins, so `0.125`
/// becomes `0.13`. Negative zero prints without a sign.
pub fn to_fixed(x: f64, digits: usize) -> String {
    if !x.is_finite() || x.abs() >= EXPONENT_UPPER {
        return number_to_string(x);
    }
    let x = if x == 0.0 { 0.0 } else { x };

    let abs = x.abs();
    if let Some(units) = exact_tie_units(abs, digits) {
        // Ties are resolved away from zero, the float formatter would pick
        // the even neighbour.
        let scale = 10_u128.pow(digits as u32);
        let magnitude = if digits == 0 {
            units.to_string()
        } else {
            format!("{}.{:0digits$}", units / scale, units % scale)
        };
        return if x < 0.0 {
            format!("-{magnitude}")
        } else {
            magnitude
        };
    }
    format!("{x:.digits$}")
}

// A double is dyadic, so it sits exactly halfway at `digits` decimals iff
// `abs * 2^(digits + 1)` is an odd integer `m`. The value rounded away from
// zero is then `ceil(m * 10^digits / 2^(digits + 1))` units, computed in
// integers so large magnitudes keep every digit.
fn exact_tie_units(abs: f64, digits: usize) -> Option<u128> {
    let scaled = abs * 2.0_f64.powi(digits as i32 + 1);
    if scaled.fract() != 0.0 || scaled % 2.0 != 1.0 {
        return None;
    }
    let scale = 10_u128.checked_pow(digits as u32)?;
    let denominator = 1_u128.checked_shl(digits as u32 + 1)?;
    (scaled as u128)
        .checked_mul(scale)
        .map(|numerator| numerator.div_ceil(denominator))
}

/// Round to the nearest integer, halves go towards positive infinity
/// (`2.5` → `3`, `-2.5` → `-2`).
pub fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_number_follows_number_literals() {
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("   "), 0.0);
        assert_eq!(parse_number("0x1A"), 26.0);
        assert_eq!(parse_number("0b101"), 5.0);
        assert_eq!(parse_number("1e3"), 1000.0);
        assert_eq!(parse_number(".5"), 0.5);
        assert_eq!(parse_number("5."), 5.0);
        assert_eq!(parse_number("+1"), 1.0);
        assert_eq!(parse_number(" -Infinity"), f64::NEG_INFINITY);
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("NaN").is_nan());
        assert!(parse_number("12abc").is_nan());
        assert!(parse_number("-0x10").is_nan());
        assert!(parse_number("1_0").is_nan());
    }

    #[test]
    fn to_number_handles_every_json_kind() {
        assert_eq!(to_number(None), 0.0);
        assert_eq!(to_number(Some(&Value::Null)), 0.0);
        assert_eq!(to_number(Some(&json!(true))), 1.0);
        assert_eq!(to_number(Some(&json!(false))), 0.0);
        assert_eq!(to_number(Some(&json!(-2.5))), -2.5);
        assert_eq!(to_number(Some(&json!("0.01"))), 0.01);
        assert!(to_number(Some(&json!("abc"))).is_nan());
        assert!(to_number(Some(&json!([1]))).is_nan());
    }

    #[test]
    fn number_strings_match_browser_output() {
        assert_eq!(number_to_string(5.0), "5");
        assert_eq!(number_to_string(5.5), "5.5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(1e-10), "1e-10");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.23e22), "1.23e+22");
        assert_eq!(number_to_string(123456789.125), "123456789.125");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn display_string_of_json_values() {
        assert_eq!(to_display_string(&json!(42)), "42");
        assert_eq!(to_display_string(&json!(4.0)), "4");
        assert_eq!(to_display_string(&json!("John Doe")), "John Doe");
        assert_eq!(to_display_string(&json!(null)), "null");
        assert_eq!(to_cell_string(Some(&json!(null))), "");
        assert_eq!(to_cell_string(None), "");
    }

    #[test]
    fn fixed_point_rounds_like_to_fixed() {
        assert_eq!(to_fixed(12.0, 2), "12.00");
        assert_eq!(to_fixed(12.345, 2), "12.35");
        assert_eq!(to_fixed(2.675, 2), "2.67");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(-0.125, 2), "-0.13");
        assert_eq!(to_fixed(0.375, 2), "0.38");
        assert_eq!(to_fixed(123456789.125, 2), "123456789.13");
        // Large ties keep their last digit.
        assert_eq!(to_fixed(2f64.powi(47) + 0.125, 2), "140737488355328.13");
        assert_eq!(to_fixed(-(2f64.powi(45) + 0.375), 2), "-35184372088832.38");
        assert_eq!(to_fixed(-0.001, 2), "-0.00");
        assert_eq!(to_fixed(-0.0, 2), "0.00");
        assert_eq!(to_fixed(1e21, 2), "1e+21");
    }

    #[test]
    fn round_half_up_matches_math_round() {
        assert_eq!(round_half_up(3.7), 4.0);
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(number_to_string(round_half_up(-0.4)), "0");
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize(Some(&json!("  JOHN  "))), "john");
        assert_eq!(normalize(Some(&json!(7))), "7");
        assert_eq!(normalize(None), "");
        assert_eq!(normalize_str("\u{feff} Team A "), "team a");
    }
}
