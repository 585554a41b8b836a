// Parsing and formatting helpers.
//
// Ledger exports arrive as loosely formatted text; this module turns cells
// into typed values so the rest of the crate can assume clean data.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a money cell into `Decimal`, tolerating thousands separators and
/// surrounding whitespace.
///
/// - Returns `None` for empty cells, `NULL` markers, alphabetic text and
///   anything else that does not parse.
pub fn parse_decimal_safe(s: Option<&str>) -> Option<Decimal> {
    let s = s?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    Decimal::from_str(&s).ok()
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Exports carry either a bare `YYYY-MM-DD` or a full timestamp; only the
    // date part matters for bucketing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let day = s.split([' ', 'T']).next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn format_decimal(n: Decimal, decimals: u32) -> String {
    // Fixed decimal places with `en` thousands separators, e.g. `1,234.50`.
    let rounded = n.round_dp(decimals);
    let neg = rounded.is_sign_negative() && !rounded.is_zero();
    let s = format!("{:.*}", decimals as usize, rounded.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Decimal's 96-bit mantissa always fits in u128.
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_cells_strip_separators() {
        assert_eq!(parse_decimal_safe(Some(" 1,250.75 ")), Some(dec!(1250.75)));
        assert_eq!(parse_decimal_safe(Some("-10")), Some(dec!(-10)));
    }

    #[test]
    fn decimal_cells_reject_text_and_blanks() {
        assert_eq!(parse_decimal_safe(None), None);
        assert_eq!(parse_decimal_safe(Some("")), None);
        assert_eq!(parse_decimal_safe(Some("NULL")), None);
        assert_eq!(parse_decimal_safe(Some("12abc")), None);
    }

    #[test]
    fn dates_accept_timestamps() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(parse_date_safe(Some("2024-05-01")), Some(d));
        assert_eq!(parse_date_safe(Some("2024-05-01 13:45:00")), Some(d));
        assert_eq!(parse_date_safe(Some("01/05/2024")), None);
    }

    #[test]
    fn format_decimal_groups_thousands() {
        assert_eq!(format_decimal(dec!(1234567.891), 2), "1,234,567.89");
        assert_eq!(format_decimal(dec!(-50), 2), "-50.00");
        assert_eq!(format_decimal(dec!(0), 0), "0");
    }

    #[test]
    fn format_decimal_handles_values_beyond_i64() {
        assert_eq!(
            format_decimal(dec!(10000000000000000000000), 2),
            "10,000,000,000,000,000,000,000.00"
        );
        assert_eq!(
            format_decimal(-Decimal::MAX, 0),
            "-79,228,162,514,264,337,593,543,950,335"
        );
    }

    #[test]
    fn format_int_groups_thousands() {
        assert_eq!(format_int(9855u64), "9,855");
    }
}
