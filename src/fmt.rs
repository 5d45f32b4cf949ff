/// Insert thousands separators into the integer part of a non-negative
/// decimal string: "1234567.89" -> "1,234,567.89".
fn with_commas(formatted: &str) -> String {
    let (int_part, dec_part) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    match dec_part {
        Some(d) => format!("{grouped}.{d}"),
        None => grouped,
    }
}

/// Format a float as a currency amount with thousands separators: $1,234.56
pub fn money(val: f64, symbol: &str) -> String {
    let body = with_commas(&format!("{:.2}", val.abs()));
    if val < 0.0 {
        format!("-{symbol}{body}")
    } else {
        format!("{symbol}{body}")
    }
}

/// Format a weight in kilograms: 1,234.5 kg
pub fn weight(kg: f64) -> String {
    let body = with_commas(&format!("{:.1}", kg.abs()));
    if kg < 0.0 {
        format!("-{body} kg")
    } else {
        format!("{body} kg")
    }
}

/// Format a 0..=1 share as a percentage: 0.1234 -> 12.3%
pub fn pct(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

/// Compact value for chart axes: 1.2M, 340k, 12
pub fn compact(val: f64) -> String {
    let abs = val.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", val / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.0}k", val / 1_000.0)
    } else {
        format!("{val:.0}")
    }
}
