pub mod classify;
pub mod init;
pub mod report;
pub mod rules;
pub mod summary;
pub mod unmatched;
pub mod view;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::classifier::RuleSet;
use crate::error::{LadingError, Result};
use crate::loader::LoaderOptions;
use crate::pipeline::{self, PipelineInputs, PipelineOutput};
use crate::settings::{load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "lading",
    version,
    about = "Classify customs import transactions and report value and weight by origin."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/lading/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input files; each falls back to the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Transactions extract (CSV, TSV or XLSX)
    #[arg(long, short = 't')]
    pub transactions: Option<String>,
    /// Code-group lookup (CSV or TSV)
    #[arg(long, short = 'l')]
    pub lookup: Option<String>,
    /// Classification rules JSON (default: built-in rules)
    #[arg(long)]
    pub rules: Option<String>,
    /// Worksheet to read from a transactions workbook
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Pdf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the full report: origin and classification tables, breakdowns, charts.
    Report {
        #[command(flatten)]
        inputs: InputArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Write to a file instead of stdout (pdf defaults to <output_dir>/import-report-<date>.pdf)
        #[arg(long, short = 'o')]
        output: Option<String>,
        /// Classification to break down (repeatable; default from settings)
        #[arg(long = "breakdown")]
        breakdowns: Vec<String>,
        /// Dimension for breakdowns: category, description, origin, code-group
        #[arg(long = "breakdown-by", default_value = "category")]
        breakdown_by: String,
        /// Keep the N largest groups per table and fold the rest into "Other"
        #[arg(long)]
        top: Option<usize>,
    },
    /// Print one aggregate table.
    Summary {
        #[command(flatten)]
        inputs: InputArgs,
        /// Grouping: origin, classification, category, description, code-group
        #[arg(long, default_value = "origin")]
        by: String,
        /// Restrict to one classification
        #[arg(long)]
        within: Option<String>,
        /// Keep the N largest groups
        #[arg(long)]
        top: Option<usize>,
        /// Also draw a bar chart of values
        #[arg(long)]
        chart: bool,
    },
    /// Write the enriched transaction table as CSV.
    Classify {
        #[command(flatten)]
        inputs: InputArgs,
        /// Output CSV path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
    /// List code groups missing from the lookup and rows no rule classified.
    Unmatched {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Inspect classification rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Interactive bar charts of value by origin and classification.
    View {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Write a settings file with defaults.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in evaluation order, with hit counts when inputs are given.
    List {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Write the active rule set as JSON for editing.
    Export {
        /// Output path
        path: String,
        #[arg(long)]
        rules: Option<String>,
    },
}

/// Settings plus the active rule set, shared by every data command.
pub struct Context {
    pub settings: Settings,
    pub rules: RuleSet,
}

impl Context {
    pub fn load(config: Option<&Path>, rules_override: Option<&str>) -> Result<Self> {
        let settings = load_settings(config)?;
        let rules = match rules_override.or(settings.rules.as_deref()) {
            Some(path) => RuleSet::from_json_file(&shellexpand_path(path))?,
            None => RuleSet::default_rules()?,
        };
        Ok(Self { settings, rules })
    }

    fn input_path(&self, arg: Option<&str>, setting: Option<&str>, what: &str) -> Result<PathBuf> {
        arg.or(setting).map(shellexpand_path).ok_or_else(|| {
            LadingError::Settings(format!(
                "no {what} file given (pass --{what} or set \"{what}\" in settings)"
            ))
        })
    }

    /// Load, join and classify the inputs named on the command line or in settings.
    pub fn run_pipeline(&self, inputs: &InputArgs) -> Result<PipelineOutput> {
        let transactions = self.input_path(
            inputs.transactions.as_deref(),
            self.settings.transactions.as_deref(),
            "transactions",
        )?;
        let lookup = self.input_path(inputs.lookup.as_deref(), self.settings.lookup.as_deref(), "lookup")?;
        let options = LoaderOptions {
            sheet: inputs.sheet.clone(),
            ..LoaderOptions::from_settings(&self.settings)?
        };
        pipeline::run(&PipelineInputs {
            transactions: &transactions,
            lookup: &lookup,
            rules: &self.rules,
            columns: &self.settings.columns,
            options: &options,
        })
    }
}
