//! Numeric and boolean parsing for spreadsheet text.

use finmap_model::NumberFormat;

/// How much cleanup a parse needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed {
    /// The trimmed text was a number as written.
    Exact(f64),
    /// Only a leading numeric prefix was read, after any formatting was dropped.
    Lenient(f64),
}

impl Parsed {
    pub fn value(self) -> f64 {
        match self {
            Parsed::Exact(v) | Parsed::Lenient(v) => v,
        }
    }
}

/// Parses spreadsheet text as a finite number.
///
/// Text that is a number as written is exact. Otherwise the longest leading
/// numeric prefix is taken, so `"5%"` gives 5 and `"1,200"` gives 1, both
/// lenient. With [`NumberFormat::Formatted`] `,` and `$` are dropped first,
/// so `"$1,200"` gives 1200. Returns `None` when no digits lead the text.
pub fn parse_number(value: &str, format: NumberFormat) -> Option<Parsed> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(v) = parse_plain(trimmed) {
        return Some(Parsed::Exact(v));
    }

    let prefix = match format {
        NumberFormat::Plain => numeric_prefix(trimmed).to_string(),
        NumberFormat::Formatted => {
            let cleaned: String = trimmed.chars().filter(|c| !matches!(c, ',' | '$')).collect();
            numeric_prefix(cleaned.trim_start()).to_string()
        }
    };
    parse_plain(&prefix).map(Parsed::Lenient)
}

fn parse_plain(value: &str) -> Option<f64> {
    // Only decimal notation; `f64::from_str` would also take "inf" and "NaN".
    if !value.bytes().any(|b| b.is_ascii_digit())
        || !value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Longest prefix of the form `[+-]digits[.digits][(e|E)[+-]digits]`.
fn numeric_prefix(value: &str) -> &str {
    let bytes = value.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return "";
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    &value[..end]
}

/// Parses a boolean word: `true/yes/1/on` and `false/no/0/off`, any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(value: &str) -> Option<Parsed> {
        parse_number(value, NumberFormat::Plain)
    }

    #[test]
    fn plain_numbers_are_exact() {
        assert_eq!(plain("500"), Some(Parsed::Exact(500.0)));
        assert_eq!(plain(" -12.5 "), Some(Parsed::Exact(-12.5)));
        assert_eq!(plain("1e3"), Some(Parsed::Exact(1000.0)));
        assert_eq!(plain(".5"), Some(Parsed::Exact(0.5)));
    }

    #[test]
    fn leading_prefix_is_lenient() {
        assert_eq!(plain("5%"), Some(Parsed::Lenient(5.0)));
        assert_eq!(plain("1,200"), Some(Parsed::Lenient(1.0)));
        assert_eq!(plain("12 months"), Some(Parsed::Lenient(12.0)));
        assert_eq!(plain("3.5x"), Some(Parsed::Lenient(3.5)));
        assert_eq!(plain("7e"), Some(Parsed::Lenient(7.0)));
    }

    #[test]
    fn currency_sign_blocks_plain_parse() {
        assert_eq!(plain("$1,200"), None);
        assert_eq!(plain("$500"), None);
    }

    #[test]
    fn formatted_numbers_drop_separators() {
        let formatted = |v| parse_number(v, NumberFormat::Formatted);
        assert_eq!(formatted("$1,200"), Some(Parsed::Lenient(1200.0)));
        assert_eq!(formatted("1,200.50"), Some(Parsed::Lenient(1200.5)));
        assert_eq!(formatted("$ 75"), Some(Parsed::Lenient(75.0)));
        assert_eq!(formatted("500"), Some(Parsed::Exact(500.0)));
        assert_eq!(formatted("USD"), None);
    }

    #[test]
    fn rejects_text_without_leading_digits() {
        for value in ["", "   ", "abc", "NaN", "inf", "-", ".", "about 5"] {
            assert_eq!(plain(value), None, "{value:?}");
            assert_eq!(parse_number(value, NumberFormat::Formatted), None, "{value:?}");
        }
    }

    #[test]
    fn boolean_words() {
        for word in ["true", "YES", " 1 ", "On"] {
            assert_eq!(parse_bool(word), Some(true), "{word}");
        }
        for word in ["false", "No", "0", "OFF"] {
            assert_eq!(parse_bool(word), Some(false), "{word}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
