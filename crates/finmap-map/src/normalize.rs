//! Header text normalization.

/// Normalizes a header or candidate phrase for comparison.
///
/// Lower-cases, spells out `&` as `and` and `%` as `percent`, drops every
/// character outside `[a-z0-9]` except whitespace, then collapses whitespace
/// runs to a single space and trims. Total and idempotent.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        let piece = match c {
            '&' => "and",
            '%' => "percent",
            c if c.is_whitespace() => {
                pending_space = true;
                continue;
            }
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                continue;
            }
            _ => continue,
        };
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push_str(piece);
    }
    out
}

/// Whitespace tokens of an already normalized string.
pub(crate) fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spells_out_symbols() {
        assert_eq!(normalize("Growth %"), "growth percent");
        assert_eq!(normalize("D&A"), "danda");
        assert_eq!(normalize("Depreciation & Amortization"), "depreciation and amortization");
    }

    #[test]
    fn drops_punctuation_without_splitting() {
        assert_eq!(normalize("Price/Client"), "priceclient");
        assert_eq!(normalize("Clients/Month"), "clientsmonth");
        assert_eq!(normalize("services.price"), "servicesprice");
        assert_eq!(normalize("Long-term Debt"), "longterm debt");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Net \t\n  Income  "), "net income");
        assert_eq!(normalize("Net\u{00a0}Income"), "net income");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" / - "), "");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(normalize("Café Revenue"), "caf revenue");
        assert_eq!(normalize("収益 2024"), "2024");
    }
}
