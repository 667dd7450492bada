// src/utils/price.rs

//! Price text parsing and display formatting.
//!
//! Storefronts render prices in inconsistent shapes ("CHF 12.30",
//! "Fr. 12,30", "12.-"); parsing is best-effort and returns `None`
//! rather than guessing when no digits are present.

use std::sync::OnceLock;

use regex::Regex;

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)[.,](\d{1,2})").expect("valid regex"))
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Parse a price string into cents.
///
/// Returns `None` when the text carries no recognizable amount. A
/// bare integer ("12") is read as whole currency units.
pub fn parse_price_cents(text: &str) -> Option<u32> {
    let cleaned = text
        .replace("CHF.", " ")
        .replace("CHF", " ")
        .replace("Fr.", " ");
    let cleaned = cleaned.trim();

    if let Some(caps) = decimal_re().captures(cleaned) {
        let units: u32 = caps.get(1)?.as_str().parse().ok()?;
        let frac_str = caps.get(2)?.as_str();
        let mut frac: u32 = frac_str.parse().ok()?;
        // "8.9" means 90 cents, not 9.
        if frac_str.len() == 1 {
            frac *= 10;
        }
        return units.checked_mul(100)?.checked_add(frac);
    }

    let m = integer_re().find(cleaned)?;
    let units: u32 = m.as_str().parse().ok()?;
    units.checked_mul(100)
}

/// Format cents for display, `CHF —` when unknown.
pub fn format_price_cents(cents: Option<u32>) -> String {
    match cents {
        Some(c) => format!("CHF {}.{:02}", c / 100, c % 100),
        None => "CHF —".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_prices() {
        assert_eq!(parse_price_cents("CHF 12.30"), Some(1230));
        assert_eq!(parse_price_cents("Fr. 8,90"), Some(890));
        assert_eq!(parse_price_cents("  12.50 "), Some(1250));
    }

    #[test]
    fn parses_single_decimal_prices() {
        assert_eq!(parse_price_cents("CHF 8.9"), Some(890));
        assert_eq!(parse_price_cents("8,9"), Some(890));
        assert_eq!(parse_price_cents("12.5"), Some(1250));
    }

    #[test]
    fn parses_integer_prices() {
        assert_eq!(parse_price_cents("CHF 12"), Some(1200));
        assert_eq!(parse_price_cents("12.-"), Some(1200));
    }

    #[test]
    fn rejects_non_prices() {
        assert_eq!(parse_price_cents(""), None);
        assert_eq!(parse_price_cents("sold out"), None);
        assert_eq!(parse_price_cents("CHF"), None);
    }

    #[test]
    fn prefers_decimal_over_integer_match() {
        assert_eq!(parse_price_cents("2 x CHF 12.30"), Some(1230));
    }

    #[test]
    fn formats_prices() {
        assert_eq!(format_price_cents(Some(1230)), "CHF 12.30");
        assert_eq!(format_price_cents(Some(500)), "CHF 5.00");
        assert_eq!(format_price_cents(Some(5)), "CHF 0.05");
        assert_eq!(format_price_cents(None), "CHF —");
    }
}
