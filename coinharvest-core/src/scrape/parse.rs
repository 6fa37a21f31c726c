//! Tolerant text-to-value parsing for scraped table cells.

use chrono::NaiveDate;

/// Date layouts seen on the historical-data page, tried in order.
pub const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Parse a displayed amount such as `$1,234.50`, `$2.3B` or `845.12M`.
///
/// Currency symbols and thousands separators are stripped and a trailing
/// `B`/`M` (either case) scales by 1e9/1e6. Returns `None` for anything that
/// still is not a finite number.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let cleaned = cleaned.trim();

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('B' | 'b') => (&cleaned[..cleaned.len() - 1], 1e9),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1e6),
        _ => (cleaned, 1.0),
    };

    let value: f64 = digits.trim().parse().ok()?;
    let value = value * multiplier;
    value.is_finite().then_some(value)
}

/// [`parse_amount`] with the page's zero fallback for unparseable text.
pub fn amount_or_zero(text: &str) -> f64 {
    parse_amount(text).unwrap_or(0.0)
}

/// Parse a displayed date using [`DATE_FORMATS`].
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Canonical `YYYY-MM-DD` form of a displayed date, or the trimmed raw text
/// when no known layout matches.
pub fn normalize_date(text: &str) -> String {
    match parse_date(text) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => text.trim().to_string(),
    }
}
