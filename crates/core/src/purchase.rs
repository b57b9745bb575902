use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::catalog::ItemId;

/// One raw input unit as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub event_id: String,
    pub user_id: Option<String>,
    pub raw_payload: String,
}

impl PurchaseEvent {
    pub fn new(event_id: impl Into<String>, raw_payload: impl Into<String>) -> Self {
        PurchaseEvent {
            event_id: event_id.into(),
            user_id: None,
            raw_payload: raw_payload.into(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Structured view of a purchase payload. Absent keys stay absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPurchase {
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub items: Vec<ItemId>,
    pub purchase_date: Option<NaiveDateTime>,
}

/// A successfully parsed event, keeping the identifiers the insights need.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub event_id: String,
    pub user_id: Option<String>,
    pub purchase: ParsedPurchase,
}
