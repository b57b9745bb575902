use anyhow::{Context, Result};
use cartmine_mining::{MiningReport, Rule};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Json,
    Csv,
}

/// Flat rule record; itemsets are rendered as token display strings.
#[derive(Debug, Serialize)]
struct RuleRow {
    antecedent: String,
    consequent: String,
    support: f64,
    confidence: f64,
    lift: f64,
    antecedent_support: f64,
    consequent_support: f64,
    leverage: f64,
    conviction: Option<f64>,
}

impl From<&Rule> for RuleRow {
    fn from(rule: &Rule) -> Self {
        RuleRow {
            antecedent: rule.antecedent.labels().join(", "),
            consequent: rule.consequent.labels().join(", "),
            support: rule.support,
            confidence: rule.confidence,
            lift: rule.lift,
            antecedent_support: rule.antecedent_support,
            consequent_support: rule.consequent_support,
            leverage: rule.leverage,
            conviction: rule.conviction,
        }
    }
}

#[derive(Serialize)]
struct Summary {
    events: usize,
    parse_errors: usize,
    transactions: usize,
    discarded: usize,
    frequent_itemsets: usize,
    candidate_rules: usize,
    filtered_rules: usize,
    partial: bool,
}

#[derive(Serialize)]
struct JsonReport {
    summary: Summary,
    rules: Vec<RuleRow>,
}

pub fn write_report<W: Write>(report: &MiningReport, format: Format, out: W) -> Result<()> {
    let rows: Vec<RuleRow> = report.rules.iter().map(RuleRow::from).collect();
    match format {
        Format::Json => {
            let doc = JsonReport {
                summary: Summary {
                    events: report.events,
                    parse_errors: report.parse_errors,
                    transactions: report.transactions,
                    discarded: report.discarded,
                    frequent_itemsets: report.frequent_itemsets,
                    candidate_rules: report.candidate_rules,
                    filtered_rules: report.filtered_rules,
                    partial: report.partial,
                },
                rules: rows,
            };
            write_json(&doc, out)
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in &rows {
                writer.serialize(row).context("Failed to write CSV row")?;
            }
            writer.flush().context("Failed to flush CSV output")?;
            Ok(())
        }
    }
}

pub fn write_json<T: Serialize, W: Write>(value: &T, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write JSON output")?;
    writeln!(out)?;
    Ok(())
}
