pub mod text;

use std::path::Path;

use tracing::info;

use crate::cli::{Context, InputArgs, OutputFormat};
use crate::error::Result;
use crate::reports::{build_report, GroupKey, ImportReport, ReportOptions};
use crate::settings::shellexpand_path;

use text::Presentation;

pub struct ReportArgs {
    pub inputs: InputArgs,
    pub format: OutputFormat,
    pub output: Option<String>,
    pub breakdowns: Vec<String>,
    pub breakdown_by: String,
    pub top: Option<usize>,
}

pub fn run(ctx: &Context, args: ReportArgs) -> Result<()> {
    let out = ctx.run_pipeline(&args.inputs)?;
    let opts = ReportOptions {
        breakdowns: if args.breakdowns.is_empty() {
            ctx.settings.breakdowns.clone()
        } else {
            args.breakdowns
        },
        breakdown_by: args.breakdown_by.parse::<GroupKey>()?,
        top_n: args.top.or(ctx.settings.top_n),
    };
    let report = build_report(&out.rows, &opts);
    let p = Presentation::from_settings(&ctx.settings);

    match args.format {
        OutputFormat::Text => {
            if args.output.is_some() {
                colored::control::set_override(false);
            }
            emit(text::format_report(&report, &p), args.output)
        }
        OutputFormat::Json => emit(serde_json::to_string_pretty(&report)?, args.output),
        OutputFormat::Pdf => export_pdf(ctx, &report, &p, args.output),
    }
}

/// Print to stdout, or write to `output` when given.
pub(crate) fn emit(content: String, output: Option<String>) -> Result<()> {
    match output {
        None => {
            println!("{content}");
            Ok(())
        }
        Some(path) => {
            let p = shellexpand_path(&path);
            write_file(&p, content.as_bytes())
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote report");
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(feature = "pdf")]
fn default_pdf_path(ctx: &Context) -> std::path::PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    shellexpand_path(&ctx.settings.output_dir).join(format!("import-report-{date}.pdf"))
}

#[cfg(feature = "pdf")]
fn export_pdf(
    ctx: &Context,
    report: &ImportReport,
    p: &Presentation,
    output: Option<String>,
) -> Result<()> {
    let bytes = crate::pdf::render_report(report, p)?;
    let path = output
        .map(|o| shellexpand_path(&o))
        .unwrap_or_else(|| default_pdf_path(ctx));
    write_file(&path, &bytes)
}

#[cfg(not(feature = "pdf"))]
fn export_pdf(
    _ctx: &Context,
    _report: &ImportReport,
    _p: &Presentation,
    _output: Option<String>,
) -> Result<()> {
    Err(crate::error::LadingError::Other(
        "PDF export requires the 'pdf' feature (build with `cargo build --features pdf`)".into(),
    ))
}
