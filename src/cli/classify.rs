use std::io::Write;

use crate::cli::{Context, InputArgs};
use crate::error::Result;
use crate::models::EnrichedTransaction;
use crate::settings::shellexpand_path;

const HEADER: [&str; 9] = [
    "line",
    "code",
    "code_group",
    "description",
    "origin",
    "weight_kg",
    "value",
    "category_label",
    "classification",
];

/// Write the enriched table as CSV. Missing values are empty cells.
pub fn write_enriched<W: Write>(rows: &[EnrichedTransaction], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for row in rows {
        let t = &row.transaction;
        wtr.write_record([
            t.line.to_string().as_str(),
            t.code.as_str(),
            t.code_group.as_deref().unwrap_or(""),
            t.description.as_str(),
            t.origin.as_str(),
            t.weight_kg.to_string().as_str(),
            t.value.to_string().as_str(),
            row.category_label.as_deref().unwrap_or(""),
            row.classification.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run(ctx: &Context, inputs: &InputArgs, output: Option<&str>) -> Result<()> {
    let out = ctx.run_pipeline(inputs)?;
    match output {
        None => write_enriched(&out.rows, std::io::stdout().lock()),
        Some(path) => {
            let path = shellexpand_path(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_enriched(&out.rows, std::fs::File::create(&path)?)?;
            eprintln!(
                "Wrote {} rows to {} ({} unclassified)",
                out.rows.len(),
                path.display(),
                out.quality.unclassified
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;

    #[test]
    fn test_write_enriched_csv() {
        let rows = vec![
            EnrichedTransaction {
                transaction: Transaction {
                    line: 2,
                    code: "02011000".into(),
                    code_group: Some("0201".into()),
                    description: "Beef, carcass".into(),
                    origin: "USA".into(),
                    weight_kg: 10.0,
                    value: 100.5,
                },
                category_label: Some("Bovine meat".into()),
                classification: Some("Cattle".into()),
            },
            EnrichedTransaction {
                transaction: Transaction {
                    line: 3,
                    code: "87".into(),
                    code_group: None,
                    description: "Car".into(),
                    origin: "Japan".into(),
                    weight_kg: 1.0,
                    value: 2.0,
                },
                category_label: None,
                classification: None,
            },
        ];
        let mut buf = Vec::new();
        write_enriched(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "line,code,code_group,description,origin,weight_kg,value,category_label,classification"
        );
        assert_eq!(lines[1], "2,02011000,0201,\"Beef, carcass\",USA,10,100.5,Bovine meat,Cattle");
        assert_eq!(lines[2], "3,87,,Car,Japan,1,2,,");
    }
}
