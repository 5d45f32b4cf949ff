use crate::cli::report::text::{format_chart, format_view, Presentation};
use crate::cli::{Context, InputArgs};
use crate::error::Result;
use crate::reports::{aggregate, aggregate_within, GroupKey};

pub struct SummaryArgs {
    pub inputs: InputArgs,
    pub by: String,
    pub within: Option<String>,
    pub top: Option<usize>,
    pub chart: bool,
}

pub fn run(ctx: &Context, args: SummaryArgs) -> Result<()> {
    let by: GroupKey = args.by.parse()?;
    let out = ctx.run_pipeline(&args.inputs)?;

    let view = match &args.within {
        Some(class) => aggregate_within(&out.rows, by, class),
        None => aggregate(&out.rows, by),
    };
    let view = match args.top.or(ctx.settings.top_n) {
        Some(n) => view.top(n),
        None => view,
    };

    let p = Presentation::from_settings(&ctx.settings);
    println!("{}", format_view(&view, &p));
    if args.chart && !view.groups.is_empty() {
        println!("\n{}", format_chart(&view, &p));
    }
    Ok(())
}
