use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Price(decimal.round_dp(2))
    }

    pub fn from_cents(cents: i64) -> Self {
        Price(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn exceeds(self, threshold: Price) -> bool {
        self.0 > threshold.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
