use anyhow::{Context, Result};
use cartmine_core::{MiningMode, Price};
use cartmine_import::{
    category_sequences, high_value_payment_mix, monthly_activity, MonthlyActivity, PaymentShare,
    PurchaseRecordParser, SequencePattern,
};
use cartmine_mining::{Metric, MiningConfig, Pipeline, RuleFilter};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod load;
mod output;

use output::Format;

#[derive(Parser, Debug)]
#[command(name = "cartmine", version, about = "Association rule mining over purchase histories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine frequent itemsets and print the ranked rule table
    Mine {
        #[command(flatten)]
        inputs: Inputs,

        /// Mining configuration TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Preset analysis; overrides the configured filter
        #[arg(long, value_enum, default_value_t = Analysis::Configured)]
        analysis: Analysis,

        #[command(flatten)]
        overrides: Overrides,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Payment mix of high-value items, monthly activity and category sequences
    Insights {
        #[command(flatten)]
        inputs: Inputs,

        /// Item price above which a purchase counts as high value
        #[arg(long, default_value = "5000")]
        high_value: Decimal,
    },
}

#[derive(Args, Debug)]
struct Inputs {
    /// Product catalog JSON ({"products": [...]})
    #[arg(long)]
    catalog: PathBuf,

    /// Purchase events, one {"id", "purchase_history"} object per line
    #[arg(long)]
    events: PathBuf,

    /// Subcategory to group TOML (defaults to the bundled table)
    #[arg(long)]
    taxonomy: Option<PathBuf>,
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long)]
    mode: Option<MiningMode>,
    #[arg(long)]
    min_support: Option<f64>,
    #[arg(long)]
    min_confidence: Option<f64>,
    #[arg(long)]
    max_len: Option<usize>,
    /// Category group for the focus analyses
    #[arg(long)]
    focus: Option<String>,
    #[arg(long)]
    metric: Option<Metric>,
    #[arg(long)]
    top_k: Option<usize>,
    #[arg(long)]
    shard_size: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut MiningConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(v) = self.min_support {
            config.min_support = v;
        }
        if let Some(v) = self.min_confidence {
            config.min_confidence = v;
        }
        if self.max_len.is_some() {
            config.max_len = self.max_len;
        }
        if self.focus.is_some() {
            config.focus_token = self.focus;
        }
        if let Some(metric) = self.metric {
            config.ranking.metric = metric;
        }
        if let Some(k) = self.top_k {
            config.ranking.top_k = k;
        }
        if let Some(size) = self.shard_size {
            config.shard_size = size;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Analysis {
    /// Filter from the config file, if any
    Configured,
    /// Every rule
    All,
    /// Payment method => category groups
    Payment,
    /// Category groups => watched refund statuses
    Refund,
    /// Rules mentioning the focus group
    Focus,
    /// Rules not mentioning the focus group
    WithoutFocus,
}

impl Analysis {
    /// Adjusts the mining mode the preset needs and returns its filter.
    fn prepare(self, config: &mut MiningConfig) -> Result<Option<RuleFilter>> {
        let filter = match self {
            Analysis::Configured => return Ok(None),
            Analysis::All => RuleFilter::Always,
            Analysis::Payment => {
                config.mode = MiningMode::WithPayment;
                RuleFilter::payment_to_category()
            }
            Analysis::Refund => {
                config.mode = MiningMode::WithOutcome;
                RuleFilter::refund_outcome(&config.outcome_watch_set)
            }
            Analysis::Focus => config.focus_filter(true)?,
            Analysis::WithoutFocus => config.focus_filter(false)?,
        };
        Ok(Some(filter))
    }
}

#[derive(Serialize)]
struct Insights {
    events: usize,
    parse_errors: usize,
    high_value_payment_mix: Vec<PaymentShare>,
    monthly_activity: MonthlyActivity,
    category_sequences: Vec<SequencePattern>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Mine {
            inputs,
            config,
            analysis,
            overrides,
            format,
        } => {
            let catalog = load::catalog(&inputs.catalog)?;
            let taxonomy = load::taxonomy(inputs.taxonomy.as_deref())?;

            let mut config = load::config(config.as_deref())?;
            overrides.apply(&mut config);
            let filter = analysis.prepare(&mut config)?;

            let loaded = load::events(&inputs.events)?;
            let mut pipeline =
                Pipeline::new(config, &catalog, &taxonomy).context("Invalid mining settings")?;
            if let Some(filter) = filter {
                pipeline = pipeline.with_filter(filter);
            }

            let mut report = pipeline.run(&loaded.events)?;
            loaded.count_rejected(&mut report);
            tracing::info!(
                rules = report.rules.len(),
                parse_errors = report.parse_errors,
                partial = report.partial,
                "Mining finished"
            );
            output::write_report(&report, format, io::stdout().lock())?;
        }

        Command::Insights { inputs, high_value } => {
            let catalog = load::catalog(&inputs.catalog)?;
            let taxonomy = load::taxonomy(inputs.taxonomy.as_deref())?;
            let loaded = load::events(&inputs.events)?;

            let batch = PurchaseRecordParser::parse_events(
                &loaded.events,
                cartmine_mining::DEFAULT_SHARD_SIZE,
            );
            let threshold = Price::from_decimal(high_value);
            let insights = Insights {
                events: loaded.line_count(),
                parse_errors: batch.error_count() + loaded.rejected.len(),
                high_value_payment_mix: high_value_payment_mix(&batch.records, &catalog, threshold),
                monthly_activity: monthly_activity(&batch.records, &catalog, &taxonomy),
                category_sequences: category_sequences(&batch.records, &catalog, &taxonomy),
            };
            output::write_json(&insights, io::stdout().lock())?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
