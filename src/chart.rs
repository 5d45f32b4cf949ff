use crate::reports::AggregateView;

const BLOCKS: [char; 8] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];
const MAX_LABEL: usize = 28;

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        label.to_string()
    } else {
        let cut: String = label.chars().take(MAX_LABEL - 1).collect();
        format!("{cut}…")
    }
}

/// A horizontal bar of `fraction * width` cells using eighth-block glyphs.
pub fn bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let eighths = (fraction * width as f64 * 8.0).round() as usize;
    let mut s = "█".repeat(eighths / 8);
    if eighths % 8 > 0 {
        s.push(BLOCKS[eighths % 8 - 1]);
    }
    s
}

/// Render labelled horizontal bars scaled to the largest item.
pub fn render_bars(title: &str, items: &[(String, f64)], width: usize, fmt_value: impl Fn(f64) -> String) -> String {
    let mut out = format!("{title}\n");
    if items.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    let labels: Vec<String> = items.iter().map(|(l, _)| truncate_label(l)).collect();
    let label_w = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = items.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

    for (label, (_, value)) in labels.iter().zip(items) {
        let fraction = if max > 0.0 { value / max } else { 0.0 };
        let pad = label_w - label.chars().count();
        out.push_str(&format!(
            "  {label}{} │{:<width$} {}\n",
            " ".repeat(pad),
            bar(fraction, width),
            fmt_value(*value),
            width = width,
        ));
    }
    out
}

/// Bar chart of each group's value in a view.
pub fn value_chart(view: &AggregateView, missing_label: &str, width: usize, fmt_value: impl Fn(f64) -> String) -> String {
    let items: Vec<(String, f64)> = view
        .groups
        .iter()
        .map(|g| (g.name.display(missing_label), g.value))
        .collect();
    render_bars(&format!("Value by {}", view.by.title()), &items, width, fmt_value)
}
