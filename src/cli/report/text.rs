use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::chart::value_chart;
use crate::fmt::{money, pct, weight};
use crate::reports::{AggregateView, GapGroup, GroupKey, ImportReport, QualityStats};
use crate::settings::Settings;

/// Display choices shared by the text and PDF renderers.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub currency: String,
    pub unclassified: String,
    pub chart_width: usize,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            currency: "$".to_string(),
            unclassified: "Unclassified".to_string(),
            chart_width: 40,
        }
    }
}

impl Presentation {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            currency: settings.currency_symbol.clone(),
            unclassified: settings.unclassified_label.clone(),
            ..Self::default()
        }
    }

    pub fn money(&self, val: f64) -> String {
        money(val, &self.currency)
    }

    /// How rows without a key are labelled in a view grouped by `by`.
    pub fn missing_label(&self, by: GroupKey) -> String {
        match by {
            GroupKey::Classification => self.unclassified.clone(),
            GroupKey::Category => "(no lookup match)".to_string(),
            GroupKey::CodeGroup => "(short code)".to_string(),
            GroupKey::Origin | GroupKey::Description => "(blank)".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report data -> String)
// ---------------------------------------------------------------------------

pub fn format_view(view: &AggregateView, p: &Presentation) -> String {
    if view.groups.is_empty() {
        return format!("{}\n  No matching rows.", view.title());
    }

    let missing = p.missing_label(view.by);
    let mut table = Table::new();
    table.set_header(vec![view.by.title(), "Value", "Value %", "Weight", "Weight %", "Rows"]);
    for g in &view.groups {
        let name = g.name.display(&missing);
        let name_cell = if g.name.is_missing() {
            Cell::new(name.dimmed())
        } else {
            Cell::new(name)
        };
        table.add_row(vec![
            name_cell,
            Cell::new(p.money(g.value)),
            Cell::new(pct(g.value_share)),
            Cell::new(weight(g.weight_kg)),
            Cell::new(pct(g.weight_share)),
            Cell::new(g.count),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(p.money(view.total_value)),
        Cell::new(pct(if view.total_value > 0.0 { 1.0 } else { 0.0 })),
        Cell::new(weight(view.total_weight_kg)),
        Cell::new(pct(if view.total_weight_kg > 0.0 { 1.0 } else { 0.0 })),
        Cell::new(view.total_count),
    ]);
    format!("{}\n{table}", view.title())
}

pub fn format_chart(view: &AggregateView, p: &Presentation) -> String {
    value_chart(view, &p.missing_label(view.by), p.chart_width, |v| p.money(v))
}

fn format_gaps(title: &str, groups: &[GapGroup], p: &Presentation) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Code Group", "Rows", "Value", "Example Description"]);
    for g in groups {
        table.add_row(vec![
            Cell::new(g.code_group.as_deref().unwrap_or("(short code)")),
            Cell::new(g.rows),
            Cell::new(p.money(g.value)),
            Cell::new(textwrap::fill(&g.sample_description, 40)),
        ]);
    }
    format!("{title}\n{table}")
}

pub fn format_quality(q: &QualityStats, p: &Presentation) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Check", "Rows"]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(q.rows)]);
    table.add_row(vec![Cell::new("No lookup match"), Cell::new(q.join_misses)]);
    table.add_row(vec![Cell::new("No classification"), Cell::new(q.unclassified)]);
    table.add_row(vec![Cell::new("Code shorter than 4"), Cell::new(q.short_codes)]);
    let mut out = format!("Data Quality\n{table}");

    if q.unclassified > 0 {
        out.push_str(&format!(
            "\n{} of value ({} rows) is {}.",
            p.money(q.unclassified_value),
            q.unclassified,
            p.unclassified.to_lowercase()
        ));
    }
    out
}

/// Both gap listings, for the `unmatched` command.
pub fn format_gap_listing(q: &QualityStats, p: &Presentation) -> String {
    let mut sections = Vec::new();
    if q.unmatched_groups.is_empty() {
        sections.push("Every code group has a lookup entry.".to_string());
    } else {
        sections.push(format_gaps("Code Groups Missing From Lookup", &q.unmatched_groups, p));
    }
    if q.unclassified_groups.is_empty() {
        sections.push("Every row matched a classification rule.".to_string());
    } else {
        sections.push(format_gaps("Rows Without Classification", &q.unclassified_groups, p));
    }
    sections.join("\n\n")
}

pub fn format_report(report: &ImportReport, p: &Presentation) -> String {
    let origin = &report.by_origin;
    let mut sections = vec![
        format!(
            "{}\n{} rows, {} CIF, {}",
            "Import Report".bold(),
            origin.total_count,
            p.money(origin.total_value),
            weight(origin.total_weight_kg)
        ),
        format_view(origin, p),
        format_chart(origin, p),
        format_view(&report.by_classification, p),
        format_chart(&report.by_classification, p),
    ];
    for breakdown in &report.breakdowns {
        sections.push(format_view(breakdown, p));
    }
    sections.push(format_quality(&report.quality, p));
    sections.join("\n\n")
}
