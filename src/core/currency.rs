//! Currency formatting for rendered values

/// Format a value as a currency string with symbol and thousands grouping.
///
/// USD renders as `$1,234.56`, AUD as `A$1,234.56`, anything else falls back
/// to `CUR 1,234.56`. Sub-cent values keep six decimals so small token
/// prices stay readable.
pub fn format_currency(value: f64, currency: &str) -> String {
    let magnitude = value.abs();
    let formatted = if magnitude > 0.0 && magnitude < 0.01 {
        format!("{:.6}", value)
    } else {
        group_thousands(value)
    };

    match currency.to_lowercase().as_str() {
        "usd" => format!("${}", formatted),
        "aud" => format!("A${}", formatted),
        _ => format!("{} {}", currency.to_uppercase(), formatted),
    }
}

/// Render with two decimals and `,` thousands separators
fn group_thousands(value: f64) -> String {
    let negative = value < 0.0;
    let s = format!("{:.2}", value.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_formatting() {
        assert_eq!(format_currency(2.5, "usd"), "$2.50");
        assert_eq!(format_currency(1234.5, "usd"), "$1,234.50");
        assert_eq!(format_currency(1234567.89, "USD"), "$1,234,567.89");
    }

    #[test]
    fn test_aud_formatting() {
        assert_eq!(format_currency(3.75, "aud"), "A$3.75");
        assert_eq!(format_currency(1000.0, "AUD"), "A$1,000.00");
    }

    #[test]
    fn test_fallback_currency() {
        assert_eq!(format_currency(12.0, "eur"), "EUR 12.00");
    }

    #[test]
    fn test_sub_cent_precision() {
        assert_eq!(format_currency(0.004217, "usd"), "$0.004217");
        assert_eq!(format_currency(0.0, "usd"), "$0.00");
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(format_currency(-1234.56, "usd"), "$-1,234.56");
    }
}
