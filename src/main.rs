mod chart;
mod classifier;
mod cli;
mod error;
mod fmt;
mod loader;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod pipeline;
mod reports;
mod settings;
mod tui;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::report::ReportArgs;
use cli::summary::SummaryArgs;
use cli::{Cli, Commands, Context, RulesCommands};
use error::Result;

/// Logs go to stderr so report output on stdout stays clean. `RUST_LOG`
/// wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => cli::init::run(config, force),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lading", &mut std::io::stdout());
            Ok(())
        }
        Commands::Report {
            inputs,
            format,
            output,
            breakdowns,
            breakdown_by,
            top,
        } => {
            let ctx = Context::load(config, inputs.rules.as_deref())?;
            cli::report::run(
                &ctx,
                ReportArgs {
                    inputs,
                    format,
                    output,
                    breakdowns,
                    breakdown_by,
                    top,
                },
            )
        }
        Commands::Summary {
            inputs,
            by,
            within,
            top,
            chart,
        } => {
            let ctx = Context::load(config, inputs.rules.as_deref())?;
            cli::summary::run(
                &ctx,
                SummaryArgs {
                    inputs,
                    by,
                    within,
                    top,
                    chart,
                },
            )
        }
        Commands::Classify { inputs, output } => {
            let ctx = Context::load(config, inputs.rules.as_deref())?;
            cli::classify::run(&ctx, &inputs, output.as_deref())
        }
        Commands::Unmatched { inputs } => {
            let ctx = Context::load(config, inputs.rules.as_deref())?;
            cli::unmatched::run(&ctx, &inputs)
        }
        Commands::Rules { command } => match command {
            RulesCommands::List { inputs } => {
                let ctx = Context::load(config, inputs.rules.as_deref())?;
                cli::rules::list(&ctx, &inputs)
            }
            RulesCommands::Export { path, rules } => {
                let ctx = Context::load(config, rules.as_deref())?;
                cli::rules::export(&ctx, &path)
            }
        },
        Commands::View { inputs, top } => {
            let ctx = Context::load(config, inputs.rules.as_deref())?;
            cli::view::run(&ctx, &inputs, top)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
