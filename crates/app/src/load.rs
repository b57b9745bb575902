use anyhow::{Context, Result};
use cartmine_core::{Catalog, CategoryTaxonomy, PurchaseEvent};
use cartmine_import::{ParseError, RecordFailure};
use cartmine_mining::{MiningConfig, MiningReport};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Subcategory table shipped with the binary.
pub const DEFAULT_TAXONOMY: &str = include_str!("../../../data/taxonomy.toml");

pub fn catalog(path: &Path) -> Result<Catalog> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    Catalog::from_json(&json).with_context(|| format!("Invalid catalog {}", path.display()))
}

pub fn taxonomy(path: Option<&Path>) -> Result<CategoryTaxonomy> {
    let Some(path) = path else {
        return CategoryTaxonomy::from_toml(DEFAULT_TAXONOMY).context("Invalid bundled taxonomy");
    };
    let toml_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read taxonomy {}", path.display()))?;
    CategoryTaxonomy::from_toml(&toml_content)
        .with_context(|| format!("Invalid taxonomy {}", path.display()))
}

pub fn config(path: Option<&Path>) -> Result<MiningConfig> {
    let Some(path) = path else {
        return Ok(MiningConfig::default());
    };
    let toml_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    MiningConfig::from_toml(&toml_content)
        .with_context(|| format!("Invalid config {}", path.display()))
}

/// Events read from a JSON Lines export, plus the lines that were not
/// purchase records at all.
#[derive(Debug, Default)]
pub struct EventFile {
    pub events: Vec<PurchaseEvent>,
    pub rejected: Vec<RecordFailure>,
}

impl EventFile {
    /// Every line that carried or claimed to carry a purchase.
    pub fn line_count(&self) -> usize {
        self.events.len() + self.rejected.len()
    }

    /// Rejected lines count as events that failed to parse.
    pub fn count_rejected(&self, report: &mut MiningReport) {
        report.events += self.rejected.len();
        report.parse_errors += self.rejected.len();
    }
}

/// Reads a JSON Lines export. Blank lines and records with a null history
/// are skipped; event ids are 1-based line numbers.
pub fn events(path: &Path) -> Result<EventFile> {
    let file =
        File::open(path).with_context(|| format!("Failed to open events {}", path.display()))?;

    let mut loaded = EventFile::default();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}:{}", path.display(), idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match event_from_line(idx + 1, &line) {
            Ok(Some(event)) => loaded.events.push(event),
            Ok(None) => {}
            Err(error) => loaded.rejected.push(RecordFailure {
                event_id: (idx + 1).to_string(),
                error,
            }),
        }
    }

    if !loaded.rejected.is_empty() {
        tracing::warn!(
            rejected = loaded.rejected.len(),
            "Skipped lines that are not purchase records"
        );
    }
    tracing::info!(events = loaded.events.len(), path = %path.display(), "Loaded purchase events");
    Ok(loaded)
}

fn event_from_line(line_no: usize, line: &str) -> Result<Option<PurchaseEvent>, ParseError> {
    let Ok(Value::Object(mut wrapper)) = serde_json::from_str::<Value>(line) else {
        return Err(ParseError::NotAnEvent);
    };
    let payload = match wrapper.remove("purchase_history") {
        None => return Err(ParseError::NotAnEvent),
        Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let event = PurchaseEvent::new(line_no.to_string(), payload);
    Ok(Some(match wrapper.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => event.with_user(s),
        Some(Value::Number(n)) => event.with_user(n.to_string()),
        _ => event,
    }))
}
