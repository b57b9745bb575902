pub mod builder;
pub mod insights;
pub mod payload;

pub use builder::{BuiltCorpus, TransactionBuilder};
pub use insights::{
    category_sequences, high_value_payment_mix, monthly_activity, MonthlyActivity, PaymentShare,
    SequencePattern,
};
pub use payload::{ParseError, ParsedBatch, PurchaseRecordParser, RecordFailure};
