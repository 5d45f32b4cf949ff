use colored::Colorize;

use crate::cli::report::text::{format_gap_listing, Presentation};
use crate::cli::{Context, InputArgs};
use crate::error::Result;

pub fn run(ctx: &Context, inputs: &InputArgs) -> Result<()> {
    let out = ctx.run_pipeline(inputs)?;
    let q = &out.quality;
    let p = Presentation::from_settings(&ctx.settings);

    println!(
        "{} rows, {} lookup entries: {} without lookup match, {} without classification",
        q.rows,
        out.lookup_entries,
        q.join_misses.to_string().yellow(),
        q.unclassified.to_string().yellow()
    );
    println!("\n{}", format_gap_listing(q, &p));
    Ok(())
}
