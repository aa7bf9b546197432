//! Parsing helpers shared by the spiders.

/// Parse a number as the holdings provider prints it.
///
/// `"12.5%"` is a fraction (`0.125`), `"$1,234.50"` is `1234.5`, and the `B`, `M` and `K`
/// suffixes scale by a billion, million and thousand. An empty cell is `0`; anything else
/// that fails to parse is `None`.
///
/// ```rust
/// use etfnav_spider::common::parse_num;
///
/// assert_eq!(parse_num("7.25%"), Some(0.0725));
/// assert_eq!(parse_num("$1,250.00"), Some(1250.0));
/// assert_eq!(parse_num("3.1M"), Some(3_100_000.0));
/// assert_eq!(parse_num("n/a"), None);
/// ```
pub fn parse_num(raw: &str) -> Option<f64> {
    let val = raw.trim().to_uppercase().replace([',', '$'], "");
    if val.is_empty() {
        return Some(0.0);
    }

    if let Some(pct) = val.strip_suffix('%') {
        return pct
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| n / 100.0);
    }

    let (digits, scale) = match val.chars().last() {
        Some('B') => (&val[..val.len() - 1], 1e9),
        Some('M') => (&val[..val.len() - 1], 1e6),
        Some('K') => (&val[..val.len() - 1], 1e3),
        _ => (val.as_str(), 1.0),
    };

    digits
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * scale)
}

/// Normalize a disclosed holding symbol into one the quotes provider accepts.
///
/// Share classes use a dot (`BRK/B` becomes `BRK.B`), every other character outside
/// `[A-Za-z0-9.]` is dropped, and placeholders (`--`, blanks) have no symbol at all.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "--" {
        return None;
    }

    let symbol: String = raw
        .replace('/', ".")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();

    match symbol.is_empty() {
        true => None,
        false => Some(symbol),
    }
}

/// Check an ETF ticker given on the command line, returning it upper-cased.
pub fn validate_etf_symbol(raw: &str) -> Result<String, crate::ConfigError> {
    let symbol = raw.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.');

    match valid {
        true => Ok(symbol),
        false => Err(crate::ConfigError::InvalidSymbol(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scaled_and_blank_numbers() {
        assert_eq!(parse_num(" 1.5b "), Some(1_500_000_000.0));
        assert_eq!(parse_num("250K"), Some(250_000.0));
        assert_eq!(parse_num(""), Some(0.0));
        assert_eq!(parse_num("--"), None);
        assert_eq!(parse_num("12,345"), Some(12_345.0));
    }

    #[test]
    fn non_finite_numbers_are_unreadable() {
        assert_eq!(parse_num("NaN%"), None);
        assert_eq!(parse_num("inf%"), None);
        assert_eq!(parse_num("-infinity%"), None);
        assert_eq!(parse_num("NaN"), None);
        assert_eq!(parse_num("infK"), None);
        assert_eq!(parse_num("0.5%"), Some(0.005));
    }

    #[test]
    fn normalizes_share_classes_and_placeholders() {
        assert_eq!(normalize_symbol("BRK/B").as_deref(), Some("BRK.B"));
        assert_eq!(normalize_symbol(" msft* ").as_deref(), Some("msft"));
        assert_eq!(normalize_symbol("--"), None);
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol("$$"), None);
    }

    #[test]
    fn validates_etf_symbols() {
        assert_eq!(validate_etf_symbol("spy").unwrap(), "SPY");
        assert_eq!(validate_etf_symbol("brk.b").unwrap(), "BRK.B");
        assert!(validate_etf_symbol("SP Y").is_err());
        assert!(validate_etf_symbol("").is_err());
    }
}
