//! Numeric literal parsing shared by the lexer and the evaluator's literal
//! promotion step (spec.md §4.3).

/// Parses a decimal/hex/octal/binary integer literal's text into its exact
/// value plus whether a `U`/`u` suffix was present. Underscores are
/// accepted as digit separators.
#[must_use]
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (text, _unsigned_suffix) = match text.strip_suffix(['u', 'U']) {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    if let Some(rest) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return parse_radix(rest, 16);
    }
    if let Some(rest) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        return parse_radix(rest, 2);
    }
    if let Some(rest) = text
        .strip_prefix("0o")
        .or_else(|| text.strip_prefix("0O"))
    {
        return parse_radix(rest, 8);
    }
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned.parse::<i128>().ok()
}

fn parse_radix(digits: &str, radix: u32) -> Option<i128> {
    if digits.is_empty() {
        return None;
    }
    let mut value: i128 = 0;
    for byte in digits.bytes() {
        if byte == b'_' {
            continue;
        }
        let digit = match byte {
            b'0'..=b'9' => u32::from(byte - b'0'),
            b'a'..=b'f' => u32::from(byte - b'a') + 10,
            b'A'..=b'F' => u32::from(byte - b'A') + 10,
            _ => return None,
        };
        if digit >= radix {
            return None;
        }
        value = value.checked_mul(i128::from(radix))?.checked_add(i128::from(digit))?;
    }
    Some(value)
}

/// Parses a float literal's text into an `f64`, tolerating underscores.
#[must_use]
pub fn parse_float_literal(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_radix_prefixes() {
        assert_eq!(parse_int_literal("123"), Some(123));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("200u"), Some(200));
        assert_eq!(parse_int_literal("0xg"), None);
    }

    #[test]
    fn parses_float_literals() {
        assert_eq!(parse_float_literal("3.14"), Some(3.14));
        assert_eq!(parse_float_literal("1_0.5"), Some(10.5));
    }
}
