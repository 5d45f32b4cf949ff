use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::LadingError;
use crate::models::EnrichedTransaction;

// ---------------------------------------------------------------------------
// Grouping dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Origin,
    Classification,
    /// Lookup category label of the code group.
    Category,
    Description,
    CodeGroup,
}

impl GroupKey {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Origin => "Origin",
            Self::Classification => "Classification",
            Self::Category => "Category",
            Self::Description => "Description",
            Self::CodeGroup => "Code Group",
        }
    }

    /// The row's value for this dimension; blank text counts as missing.
    pub fn key_of<'a>(&self, row: &'a EnrichedTransaction) -> Option<&'a str> {
        let key = match self {
            Self::Origin => Some(row.transaction.origin.as_str()),
            Self::Classification => row.classification.as_deref(),
            Self::Category => row.category_label.as_deref(),
            Self::Description => Some(row.transaction.description.as_str()),
            Self::CodeGroup => row.code_group(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl FromStr for GroupKey {
    type Err = LadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "origin" | "country" => Ok(Self::Origin),
            "classification" | "class" => Ok(Self::Classification),
            "category" => Ok(Self::Category),
            "description" => Ok(Self::Description),
            "code-group" | "hs4" => Ok(Self::CodeGroup),
            _ => Err(LadingError::UnknownGroupKey(s.to_string())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ---------------------------------------------------------------------------
// Aggregate views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum GroupName {
    Key(String),
    /// Groups folded together by `top`; holds how many.
    Other(usize),
    /// Rows with no value for the dimension.
    Missing,
}

impl GroupName {
    pub fn display(&self, missing_label: &str) -> String {
        match self {
            Self::Key(k) => k.clone(),
            Self::Other(n) => format!("Other ({n} groups)"),
            Self::Missing => missing_label.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub name: GroupName,
    pub value: f64,
    pub weight_kg: f64,
    pub count: usize,
    pub value_share: f64,
    pub weight_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub by: GroupKey,
    /// Classification the view is restricted to, for breakdowns.
    pub within: Option<String>,
    pub groups: Vec<AggregateRow>,
    pub total_value: f64,
    pub total_weight_kg: f64,
    pub total_count: usize,
}

/// `part / whole`, or 0.0 when the whole is zero.
pub fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

fn by_value_desc(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    // Missing last, then Other, then named groups by value
    let rank = |n: &GroupName| match n {
        GroupName::Key(_) => 0,
        GroupName::Other(_) => 1,
        GroupName::Missing => 2,
    };
    rank(&a.name)
        .cmp(&rank(&b.name))
        .then_with(|| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal))
        .then_with(|| match (&a.name, &b.name) {
            (GroupName::Key(x), GroupName::Key(y)) => x.cmp(y),
            _ => Ordering::Equal,
        })
}

fn aggregate_rows<'a, I>(rows: I, by: GroupKey, within: Option<String>) -> AggregateView
where
    I: Iterator<Item = &'a EnrichedTransaction>,
{
    let mut sums: BTreeMap<Option<&str>, (f64, f64, usize)> = BTreeMap::new();
    let (mut total_value, mut total_weight_kg, mut total_count) = (0.0, 0.0, 0usize);

    for row in rows {
        let entry = sums.entry(by.key_of(row)).or_default();
        entry.0 += row.value();
        entry.1 += row.weight_kg();
        entry.2 += 1;
        total_value += row.value();
        total_weight_kg += row.weight_kg();
        total_count += 1;
    }

    let mut groups: Vec<AggregateRow> = sums
        .into_iter()
        .map(|(key, (value, weight_kg, count))| AggregateRow {
            name: key.map_or(GroupName::Missing, |k| GroupName::Key(k.to_string())),
            value,
            weight_kg,
            count,
            value_share: share(value, total_value),
            weight_share: share(weight_kg, total_weight_kg),
        })
        .collect();
    groups.sort_by(by_value_desc);

    AggregateView {
        by,
        within,
        groups,
        total_value,
        total_weight_kg,
        total_count,
    }
}

/// Group rows by a dimension, summing value and weight and computing each
/// group's share of the view's grand totals.
pub fn aggregate(rows: &[EnrichedTransaction], by: GroupKey) -> AggregateView {
    aggregate_rows(rows.iter(), by, None)
}

/// Sub-classification breakdown: aggregate only the rows carrying
/// `classification`.
pub fn aggregate_within(
    rows: &[EnrichedTransaction],
    by: GroupKey,
    classification: &str,
) -> AggregateView {
    aggregate_rows(
        rows.iter()
            .filter(|r| r.classification.as_deref() == Some(classification)),
        by,
        Some(classification.to_string()),
    )
}

impl AggregateView {
    /// Keep the `n` largest named groups and fold the rest into one
    /// `Other` row. Totals are unchanged.
    pub fn top(mut self, n: usize) -> Self {
        let named = self
            .groups
            .iter()
            .filter(|g| matches!(g.name, GroupName::Key(_)))
            .count();
        if named <= n {
            return self;
        }

        let mut kept = Vec::with_capacity(n + 2);
        let mut other = AggregateRow {
            name: GroupName::Other(named - n),
            value: 0.0,
            weight_kg: 0.0,
            count: 0,
            value_share: 0.0,
            weight_share: 0.0,
        };
        let mut missing = None;
        let mut seen = 0usize;
        for g in self.groups.drain(..) {
            match g.name {
                GroupName::Key(_) if seen < n => {
                    seen += 1;
                    kept.push(g);
                }
                GroupName::Missing => missing = Some(g),
                _ => {
                    other.value += g.value;
                    other.weight_kg += g.weight_kg;
                    other.count += g.count;
                }
            }
        }
        other.value_share = share(other.value, self.total_value);
        other.weight_share = share(other.weight_kg, self.total_weight_kg);
        kept.push(other);
        kept.extend(missing);
        self.groups = kept;
        self
    }

    pub fn title(&self) -> String {
        match &self.within {
            Some(class) => format!("{class} by {}", self.by.title()),
            None => format!("Imports by {}", self.by.title()),
        }
    }
}

// ---------------------------------------------------------------------------
// Data quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapGroup {
    /// `None` for rows whose code is too short to have a group.
    pub code_group: Option<String>,
    pub rows: usize,
    pub value: f64,
    /// First description seen for the group, to help extend the rules.
    pub sample_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityStats {
    pub rows: usize,
    /// Rows whose code group has no lookup entry.
    pub join_misses: usize,
    /// Rows no rule classified.
    pub unclassified: usize,
    pub unclassified_value: f64,
    /// Rows with a code shorter than four characters.
    pub short_codes: usize,
    pub unmatched_groups: Vec<GapGroup>,
    pub unclassified_groups: Vec<GapGroup>,
}

fn gap_groups<'a, I>(rows: I) -> Vec<GapGroup>
where
    I: Iterator<Item = &'a EnrichedTransaction>,
{
    let mut groups: BTreeMap<Option<&str>, GapGroup> = BTreeMap::new();
    for row in rows {
        let g = groups.entry(row.code_group()).or_insert_with(|| GapGroup {
            code_group: row.code_group().map(str::to_string),
            rows: 0,
            value: 0.0,
            sample_description: row.transaction.description.clone(),
        });
        g.rows += 1;
        g.value += row.value();
    }
    let mut out: Vec<GapGroup> = groups.into_values().collect();
    out.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.code_group.cmp(&b.code_group))
    });
    out
}

/// Count join misses and classification misses. Neither is an error;
/// both are reported alongside the tables.
pub fn quality(rows: &[EnrichedTransaction]) -> QualityStats {
    let join_misses = rows.iter().filter(|r| r.category_label.is_none()).count();
    let unclassified: Vec<&EnrichedTransaction> =
        rows.iter().filter(|r| r.classification.is_none()).collect();

    QualityStats {
        rows: rows.len(),
        join_misses,
        unclassified: unclassified.len(),
        unclassified_value: unclassified.iter().map(|r| r.value()).sum(),
        short_codes: rows.iter().filter(|r| r.code_group().is_none()).count(),
        unmatched_groups: gap_groups(rows.iter().filter(|r| r.category_label.is_none())),
        unclassified_groups: gap_groups(unclassified.into_iter()),
    }
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Classifications that get their own breakdown section.
    pub breakdowns: Vec<String>,
    pub breakdown_by: GroupKey,
    pub top_n: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            breakdowns: Vec::new(),
            breakdown_by: GroupKey::Category,
            top_n: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub by_origin: AggregateView,
    pub by_classification: AggregateView,
    pub breakdowns: Vec<AggregateView>,
    pub quality: QualityStats,
}

pub fn build_report(rows: &[EnrichedTransaction], opts: &ReportOptions) -> ImportReport {
    let limit = |view: AggregateView| match opts.top_n {
        Some(n) => view.top(n),
        None => view,
    };

    ImportReport {
        by_origin: limit(aggregate(rows, GroupKey::Origin)),
        by_classification: limit(aggregate(rows, GroupKey::Classification)),
        breakdowns: opts
            .breakdowns
            .iter()
            .map(|class| limit(aggregate_within(rows, opts.breakdown_by, class)))
            .collect(),
        quality: quality(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RuleSet;
    use crate::loader::derive_code_group;
    use crate::models::{Lookup, Transaction};
    use crate::pipeline::join_and_classify;

    const EPS: f64 = 1e-9;

    /// Shares of every group, including the missing-key group.
    fn value_share_sum(view: &AggregateView) -> f64 {
        view.groups.iter().map(|g| g.value_share).sum()
    }

    fn enriched(rows: &[(&str, &str, &str, f64, f64)]) -> Vec<EnrichedTransaction> {
        let txns = rows
            .iter()
            .enumerate()
            .map(|(i, (code, desc, origin, weight_kg, value))| Transaction {
                line: i + 2,
                code: code.to_string(),
                code_group: derive_code_group(code),
                description: desc.to_string(),
                origin: origin.to_string(),
                weight_kg: *weight_kg,
                value: *value,
            })
            .collect();
        let mut lookup = Lookup::new();
        lookup.insert("0302".to_string(), "Fish, fresh or chilled".to_string());
        lookup.insert("0303".to_string(), "Fish, frozen".to_string());
        lookup.insert("0201".to_string(), "Bovine meat, fresh".to_string());
        join_and_classify(txns, &lookup, &RuleSet::default_rules().unwrap())
    }

    fn sample() -> Vec<EnrichedTransaction> {
        enriched(&[
            ("02011000", "Beef carcass", "Australia", 1000.0, 4000.0),
            ("02023000", "Frozen boneless beef", "New Zealand", 500.0, 2500.0),
            ("03024100", "Atlantic salmon", "Norway", 80.0, 900.0),
            ("03034200", "Yellowfin tuna", "Fiji", 300.0, 1200.0),
            ("03024100", "Salmon fillets", "Norway", 20.0, 400.0),
            ("87032100", "Motor car", "Japan", 1100.0, 8000.0),
        ])
    }

    #[test]
    fn test_origin_shares_example() {
        let rows = enriched(&[
            ("02011000", "Beef", "USA", 10.0, 100.0),
            ("02011000", "Beef", "Canada", 30.0, 300.0),
        ]);
        let view = aggregate(&rows, GroupKey::Origin);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].name, GroupName::Key("Canada".into()));
        assert!((view.groups[0].value_share - 0.75).abs() < EPS);
        assert_eq!(view.groups[1].name, GroupName::Key("USA".into()));
        assert!((view.groups[1].value_share - 0.25).abs() < EPS);
        assert!((view.groups[1].weight_share - 0.25).abs() < EPS);
    }

    #[test]
    fn test_subtotals_sum_to_grand_total() {
        let rows = sample();
        for by in [
            GroupKey::Origin,
            GroupKey::Classification,
            GroupKey::Category,
            GroupKey::Description,
            GroupKey::CodeGroup,
        ] {
            let view = aggregate(&rows, by);
            let value: f64 = view.groups.iter().map(|g| g.value).sum();
            let weight: f64 = view.groups.iter().map(|g| g.weight_kg).sum();
            let count: usize = view.groups.iter().map(|g| g.count).sum();
            assert!((value - view.total_value).abs() < EPS, "{by}");
            assert!((weight - view.total_weight_kg).abs() < EPS, "{by}");
            assert_eq!(count, rows.len());
            assert!((value_share_sum(&view) - 1.0).abs() < EPS, "{by}");
        }
    }

    #[test]
    fn test_shares_sum_to_one_without_missing_keys() {
        let rows = sample();
        let view = aggregate(&rows, GroupKey::Origin);
        assert!(view.groups.iter().all(|g| !g.name.is_missing()));
        let weight_shares: f64 = view.groups.iter().map(|g| g.weight_share).sum();
        assert!((value_share_sum(&view) - 1.0).abs() < EPS);
        assert!((weight_shares - 1.0).abs() < EPS);
    }

    #[test]
    fn test_missing_key_group_is_last_and_counted() {
        let rows = sample();
        let view = aggregate(&rows, GroupKey::Classification);
        let last = view.groups.last().unwrap();
        assert_eq!(last.name, GroupName::Missing);
        assert_eq!(last.count, 1);
        assert!((last.value - 8000.0).abs() < EPS);
        let named: f64 = view
            .groups
            .iter()
            .filter(|g| !g.name.is_missing())
            .map(|g| g.value_share)
            .sum();
        assert!((named + last.value_share - 1.0).abs() < EPS);
        assert_eq!(last.name.display("Unclassified"), "Unclassified");
    }

    #[test]
    fn test_sorted_by_value_then_key() {
        let rows = enriched(&[
            ("03024100", "Salmon", "B", 1.0, 50.0),
            ("03024100", "Salmon", "A", 1.0, 50.0),
            ("03024100", "Salmon", "C", 1.0, 70.0),
        ]);
        let view = aggregate(&rows, GroupKey::Origin);
        let names: Vec<String> = view.groups.iter().map(|g| g.name.display("-")).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_zero_total_gives_zero_shares() {
        let rows = enriched(&[("03024100", "Samples", "Tonga", 0.0, 0.0)]);
        let view = aggregate(&rows, GroupKey::Origin);
        assert_eq!(view.groups[0].value_share, 0.0);
        assert_eq!(view.groups[0].weight_share, 0.0);
        assert!(!view.groups[0].value_share.is_nan());
    }

    #[test]
    fn test_empty_view() {
        let view = aggregate(&[], GroupKey::Origin);
        assert!(view.groups.is_empty());
        assert_eq!(view.total_value, 0.0);
    }

    #[test]
    fn test_aggregate_within_classification() {
        let rows = sample();
        let view = aggregate_within(&rows, GroupKey::Category, "Fish");
        assert_eq!(view.within.as_deref(), Some("Fish"));
        assert_eq!(view.total_count, 3);
        assert!((view.total_value - 2500.0).abs() < EPS);
        assert_eq!(view.groups[0].name, GroupName::Key("Fish, fresh or chilled".into()));
        assert!((view.groups[0].value - 1300.0).abs() < EPS);
        assert!((value_share_sum(&view) - 1.0).abs() < EPS);
        assert_eq!(view.title(), "Fish by Category");
    }

    #[test]
    fn test_top_folds_remainder_and_keeps_totals() {
        let rows = sample();
        let full = aggregate(&rows, GroupKey::Origin);
        let top = full.clone().top(2);
        assert_eq!(top.groups.len(), 3);
        assert_eq!(top.groups[2].name, GroupName::Other(3));
        let value: f64 = top.groups.iter().map(|g| g.value).sum();
        assert!((value - full.total_value).abs() < EPS);
        assert!((value_share_sum(&top) - 1.0).abs() < EPS);
        assert_eq!(top.groups[2].name.display(""), "Other (3 groups)");
    }

    #[test]
    fn test_top_keeps_missing_group_last() {
        let rows = sample();
        let top = aggregate(&rows, GroupKey::Classification).top(1);
        let names: Vec<&GroupName> = top.groups.iter().map(|g| &g.name).collect();
        assert_eq!(
            names,
            vec![&GroupName::Key("Cattle".into()), &GroupName::Other(1), &GroupName::Missing]
        );
    }

    #[test]
    fn test_top_noop_when_small() {
        let rows = sample();
        let view = aggregate(&rows, GroupKey::Classification);
        assert_eq!(view.clone().top(10), view);
    }

    #[test]
    fn test_quality_stats() {
        let mut rows = sample();
        rows.extend(enriched(&[("12", "Bad code", "Fiji", 1.0, 5.0)]));
        let q = quality(&rows);
        assert_eq!(q.rows, 7);
        // 02023000 (0202) and 87032100 (8703) and the short code miss the lookup
        assert_eq!(q.join_misses, 3);
        assert_eq!(q.unclassified, 2);
        assert!((q.unclassified_value - 8005.0).abs() < EPS);
        assert_eq!(q.short_codes, 1);
        assert_eq!(q.unmatched_groups[0].code_group.as_deref(), Some("8703"));
        assert_eq!(q.unmatched_groups[0].sample_description, "Motor car");
        assert_eq!(q.unclassified_groups.len(), 2);
    }

    #[test]
    fn test_build_report_sections() {
        let rows = sample();
        let report = build_report(
            &rows,
            &ReportOptions {
                breakdowns: vec!["Fish".into(), "Cattle".into(), "Eggs".into()],
                ..ReportOptions::default()
            },
        );
        assert_eq!(report.by_origin.total_count, 6);
        assert_eq!(report.breakdowns.len(), 3);
        assert_eq!(report.breakdowns[1].total_count, 2);
        assert!(report.breakdowns[2].groups.is_empty());
        assert_eq!(report.quality.unclassified, 1);
    }

    #[test]
    fn test_group_key_parse() {
        assert_eq!("origin".parse::<GroupKey>().unwrap(), GroupKey::Origin);
        assert_eq!("code_group".parse::<GroupKey>().unwrap(), GroupKey::CodeGroup);
        assert_eq!("Classification".parse::<GroupKey>().unwrap(), GroupKey::Classification);
        assert!(matches!(
            "weight".parse::<GroupKey>(),
            Err(LadingError::UnknownGroupKey(_))
        ));
    }
}
