//! Amount normalization and currency display.
//!
//! Spreadsheet cells arrive as free text in mixed locale conventions
//! ("1.234,56", "1,234.56", "(200)"). Everything funnels through
//! [`parse_amount`], which never fails: malformed input becomes `0.0`
//! so downstream aggregation never sees a NaN.

/// Parse a locale-formatted amount into a plain `f64`.
///
/// Rules, in order:
/// - a value wrapped in parentheses is negative;
/// - everything outside `[0-9,.-]` is stripped;
/// - if both `,` and `.` appear, the last-occurring one is the decimal
///   mark and the other a thousands separator (handles es-AR
///   `1.234,56` and en-US `1,234.56` alike);
/// - a lone `,` is a decimal mark.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut s = trimmed.to_string();
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        s = format!("-{}", &s[1..s.len() - 1]);
    }

    s.retain(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'));
    if s.is_empty() {
        return 0.0;
    }

    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');
    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if dot > comma => {
            s = s.replace(',', "");
        }
        (Some(_), Some(_)) => {
            s = s.replace('.', "").replacen(',', ".", 1);
        }
        (Some(_), None) => {
            s = s.replacen(',', ".", 1);
        }
        _ => {}
    }

    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Format an amount for display in the given ISO currency code, es-AR
/// style: `$ 1.234,56`. Unknown codes fall back to a plain `$`-prefixed
/// two-decimal string. Never fails.
pub fn format_money(amount: f64, currency: &str) -> String {
    let symbol = match currency.to_ascii_uppercase().as_str() {
        "ARS" => "$",
        "USD" => "US$",
        "EUR" => "€",
        "UYU" => "$U",
        "CLP" => "CLP$",
        _ => return format!("${:.2}", amount),
    };

    let negative = amount < 0.0;
    // Round to cents first so -0.004 does not render as "-$ 0,00".
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative && cents > 0 { "-" } else { "" };
    format!("{sign}{symbol} {grouped},{frac:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_latin_american_convention() {
        assert_eq!(parse_amount("1.234,56"), 1234.56);
        assert_eq!(parse_amount("12.345.678,90"), 12_345_678.90);
    }

    #[test]
    fn parses_anglo_convention() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("12,345,678.90"), 12_345_678.90);
        assert_eq!(parse_amount("$1,500.00"), 1500.0);
    }

    #[test]
    fn parses_parentheses_as_negative() {
        assert_eq!(parse_amount("(200)"), -200.0);
        assert_eq!(parse_amount("($ 1.500,00)"), -1500.0);
    }

    #[test]
    fn parses_plain_and_padded_values() {
        assert_eq!(parse_amount("  300  "), 300.0);
        assert_eq!(parse_amount("-42.5"), -42.5);
        assert_eq!(parse_amount("1500,75"), 1500.75);
    }

    #[test]
    fn malformed_input_coerces_to_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("   "), 0.0);
        assert_eq!(parse_amount("sin datos"), 0.0);
        assert_eq!(parse_amount("--"), 0.0);
        assert_eq!(parse_amount("$"), 0.0);
    }

    #[test]
    fn formats_ars_with_thousand_separators() {
        assert_eq!(format_money(1234.56, "ARS"), "$ 1.234,56");
        assert_eq!(format_money(1_000_000.0, "ARS"), "$ 1.000.000,00");
        assert_eq!(format_money(-200.0, "ARS"), "-$ 200,00");
        assert_eq!(format_money(0.0, "ARS"), "$ 0,00");
    }

    #[test]
    fn unknown_currency_falls_back_to_plain_format() {
        assert_eq!(format_money(1234.5, "XXX"), "$1234.50");
    }
}
