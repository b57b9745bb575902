use cartmine_core::{ItemId, ParsedPurchase, PurchaseEvent, PurchaseRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error("Line is not an id/purchase_history record")]
    NotAnEvent,
}

/// A record that could not be parsed, reported instead of raised.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub event_id: String,
    pub error: ParseError,
}

/// Outcome of parsing a batch of events: parsed records in input order and
/// the failures, which the caller aggregates into an error count.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<PurchaseRecord>,
    pub failures: Vec<RecordFailure>,
}

impl ParsedBatch {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    fn merge(mut self, other: ParsedBatch) -> ParsedBatch {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
        self
    }
}

pub struct PurchaseRecordParser;

impl PurchaseRecordParser {
    pub fn parse(raw_payload: &str) -> Result<ParsedPurchase, ParseError> {
        let value: Value = serde_json::from_str(raw_payload)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;
        let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

        Ok(ParsedPurchase {
            payment_method: string_field(obj, "payment_method"),
            payment_status: string_field(obj, "payment_status"),
            items: item_ids(obj),
            purchase_date: string_field(obj, "purchase_date").and_then(|s| parse_timestamp(&s)),
        })
    }

    /// Parses every event, one shard per rayon task. Shards are merged in
    /// input order so the result does not depend on scheduling.
    pub fn parse_events(events: &[PurchaseEvent], shard_size: usize) -> ParsedBatch {
        let shards: Vec<ParsedBatch> = events
            .par_chunks(shard_size.max(1))
            .map(|shard| shard.iter().fold(ParsedBatch::default(), parse_into))
            .collect();

        let batch = shards.into_iter().fold(ParsedBatch::default(), ParsedBatch::merge);
        if !batch.failures.is_empty() {
            tracing::warn!(
                failed = batch.failures.len(),
                total = events.len(),
                "Skipped malformed purchase payloads"
            );
        }
        batch
    }
}

fn parse_into(mut batch: ParsedBatch, event: &PurchaseEvent) -> ParsedBatch {
    match PurchaseRecordParser::parse(&event.raw_payload) {
        Ok(purchase) => batch.records.push(PurchaseRecord {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            purchase,
        }),
        Err(error) => {
            tracing::debug!(event_id = %event.event_id, %error, "Payload rejected");
            batch.failures.push(RecordFailure {
                event_id: event.event_id.clone(),
                error,
            });
        }
    }
    batch
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Entries without a usable `id` are dropped; unknown ids are kept for the
/// builder to resolve.
fn item_ids(obj: &Map<String, Value>) -> Vec<ItemId> {
    obj.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(ItemId::from_json))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in &["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
