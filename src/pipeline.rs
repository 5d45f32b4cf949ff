use std::path::Path;

use tracing::{debug, info};

use crate::classifier::{classify, RuleSet};
use crate::error::Result;
use crate::loader::{load_lookup, load_transactions, LoaderOptions};
use crate::models::{EnrichedTransaction, Lookup, Transaction};
use crate::reports::{quality, QualityStats};
use crate::settings::ColumnMap;

/// Left outer join on `code_group`, then classification. Every transaction
/// comes out exactly once, in input order.
pub fn join_and_classify(
    transactions: Vec<Transaction>,
    lookup: &Lookup,
    rules: &RuleSet,
) -> Vec<EnrichedTransaction> {
    transactions
        .into_iter()
        .map(|t| {
            let category_label = t
                .code_group
                .as_deref()
                .and_then(|g| lookup.get(g))
                .cloned();
            if category_label.is_none() {
                debug!(line = t.line, code = %t.code, "no lookup match");
            }
            let classification =
                classify(rules, t.code_group.as_deref(), &t.description).map(str::to_string);
            EnrichedTransaction {
                transaction: t,
                category_label,
                classification,
            }
        })
        .collect()
}

/// Number of rows each rule claimed, indexed like `rules.rules()`.
pub fn rule_hits(rules: &RuleSet, rows: &[EnrichedTransaction]) -> Vec<usize> {
    let mut hits = vec![0usize; rules.len()];
    for row in rows {
        if let Some(i) = rules.first_match(row.code_group(), &row.transaction.description) {
            hits[i] += 1;
        }
    }
    hits
}

pub struct PipelineInputs<'a> {
    pub transactions: &'a Path,
    pub lookup: &'a Path,
    pub rules: &'a RuleSet,
    pub columns: &'a ColumnMap,
    pub options: &'a LoaderOptions,
}

pub struct PipelineOutput {
    pub rows: Vec<EnrichedTransaction>,
    pub lookup_entries: usize,
    pub quality: QualityStats,
}

/// Load both inputs and produce the enriched table.
pub fn run(inputs: &PipelineInputs) -> Result<PipelineOutput> {
    let transactions = load_transactions(inputs.transactions, inputs.columns, inputs.options)?;
    let lookup_options = LoaderOptions {
        sheet: None,
        ..inputs.options.clone()
    };
    let lookup = load_lookup(inputs.lookup, inputs.columns, &lookup_options)?;

    let rows = join_and_classify(transactions, &lookup, inputs.rules);
    let quality = quality(&rows);
    info!(
        rows = rows.len(),
        join_misses = quality.join_misses,
        unclassified = quality.unclassified,
        "enriched transactions"
    );

    Ok(PipelineOutput {
        rows,
        lookup_entries: lookup.len(),
        quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::derive_code_group;

    fn txn(code: &str, description: &str, origin: &str, weight_kg: f64, value: f64) -> Transaction {
        Transaction {
            line: 0,
            code: code.to_string(),
            code_group: derive_code_group(code),
            description: description.to_string(),
            origin: origin.to_string(),
            weight_kg,
            value,
        }
    }

    fn lookup() -> Lookup {
        let mut l = Lookup::new();
        l.insert("0201".to_string(), "Meat of bovine animals, fresh or chilled".to_string());
        l.insert("0302".to_string(), "Fish, fresh or chilled".to_string());
        l
    }

    #[test]
    fn test_left_join_preserves_every_row() {
        let rows = vec![
            txn("02011000", "Beef carcass", "Australia", 1000.0, 5000.0),
            txn("03024100", "Atlantic salmon", "Norway", 50.0, 700.0),
            txn("87032100", "Motor car", "Japan", 1200.0, 9000.0),
            txn("12", "Bad code", "Fiji", 1.0, 1.0),
        ];
        let enriched = join_and_classify(rows, &lookup(), &RuleSet::default_rules().unwrap());
        assert_eq!(enriched.len(), 4);
        assert_eq!(
            enriched[0].category_label.as_deref(),
            Some("Meat of bovine animals, fresh or chilled")
        );
        assert_eq!(enriched[0].classification.as_deref(), Some("Cattle"));
        assert_eq!(enriched[1].classification.as_deref(), Some("Fish"));
        assert_eq!(enriched[2].category_label, None);
        assert_eq!(enriched[2].classification, None);
        assert_eq!(enriched[3].code_group(), None);
        assert_eq!(enriched[3].category_label, None);
    }

    #[test]
    fn test_join_is_exact_equality() {
        let rows = vec![txn("02021000", "Frozen beef", "USA", 1.0, 1.0)];
        let enriched = join_and_classify(rows, &lookup(), &RuleSet::default_rules().unwrap());
        assert_eq!(enriched[0].category_label, None);
        assert_eq!(enriched[0].classification.as_deref(), Some("Cattle"));
    }

    #[test]
    fn test_rule_hits() {
        let rules = RuleSet::default_rules().unwrap();
        let rows = join_and_classify(
            vec![
                txn("02011000", "Beef", "USA", 1.0, 1.0),
                txn("02021000", "Beef", "USA", 1.0, 1.0),
                txn("03021100", "Trout", "USA", 1.0, 1.0),
                txn("87030000", "Car", "USA", 1.0, 1.0),
            ],
            &lookup(),
            &rules,
        );
        let hits = rule_hits(&rules, &rows);
        assert_eq!(hits[0], 2);
        assert_eq!(hits[5], 1);
        assert_eq!(hits.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let tx = dir.path().join("tx.csv");
        let lk = dir.path().join("lookup.csv");
        std::fs::write(
            &tx,
            "code,description,origin,weight_kg,value\n\
             02011000,Beef carcass,USA,10,100\n\
             03024100,Atlantic salmon,Canada,20,300\n",
        )
        .unwrap();
        std::fs::write(&lk, "code_group,category_label\n0201,Bovine meat\n").unwrap();

        let rules = RuleSet::default_rules().unwrap();
        let out = run(&PipelineInputs {
            transactions: &tx,
            lookup: &lk,
            rules: &rules,
            columns: &ColumnMap::default(),
            options: &LoaderOptions::default(),
        })
        .unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.lookup_entries, 1);
        assert_eq!(out.quality.join_misses, 1);
        assert_eq!(out.quality.unclassified, 0);
    }
}
