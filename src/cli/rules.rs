use comfy_table::{Cell, Table};

use crate::classifier::RuleSet;
use crate::cli::{Context, InputArgs};
use crate::error::Result;
use crate::pipeline::rule_hits;
use crate::settings::shellexpand_path;

pub fn format_rules(rules: &RuleSet, hits: Option<&[usize]>) -> String {
    let mut table = Table::new();
    let mut header = vec!["#", "Classification", "When"];
    if hits.is_some() {
        header.push("Hits");
    }
    table.set_header(header);
    for (i, rule) in rules.rules().iter().enumerate() {
        let mut row = vec![
            Cell::new(i + 1),
            Cell::new(&rule.label),
            Cell::new(textwrap::fill(&rule.predicate.to_string(), 60)),
        ];
        if let Some(h) = hits {
            row.push(Cell::new(h.get(i).copied().unwrap_or(0)));
        }
        table.add_row(row);
    }
    format!("Rules (first match wins)\n{table}")
}

pub fn list(ctx: &Context, inputs: &InputArgs) -> Result<()> {
    let has_inputs = inputs.transactions.is_some() || ctx.settings.transactions.is_some();
    let hits = if has_inputs {
        let out = ctx.run_pipeline(inputs)?;
        Some(rule_hits(&ctx.rules, &out.rows))
    } else {
        None
    };
    println!("{}", format_rules(&ctx.rules, hits.as_deref()));
    Ok(())
}

pub fn export(ctx: &Context, path: &str) -> Result<()> {
    let path = shellexpand_path(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, format!("{}\n", ctx.rules.to_json()?))?;
    println!("Wrote {} rules to {}", ctx.rules.len(), path.display());
    Ok(())
}
