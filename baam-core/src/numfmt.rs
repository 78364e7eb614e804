//! Number formatting for chart ticks and summary figures.

/// Integer with comma thousands separators (`1234567` → `"1,234,567"`)
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    let first = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - first) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Locale-style rendering of a float: grouped integer part and at most
/// three fractional digits, trailing zeros dropped.
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let millis = (value.abs() * 1000.0).round() as i64;
    let mut out = String::new();
    if value < 0.0 && millis > 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(millis / 1000));
    let frac = millis % 1000;
    if frac > 0 {
        out.push('.');
        out.push_str(format!("{:03}", frac).trim_end_matches('0'));
    }
    out
}

/// Axis tick label: millions collapse to `"12.3 M"`, smaller values are
/// grouped.
pub fn format_axis_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1} M", value / 1_000_000.0)
    } else {
        format_decimal(value)
    }
}
