pub mod apriori;
pub mod config;
pub mod error;
pub mod filter;
pub mod itemset;
pub mod pipeline;
pub mod rank;
pub mod rules;

pub use apriori::{support_by_scan, Corpus, ItemsetMiner, DEFAULT_SHARD_SIZE};
pub use config::{MiningConfig, RankingConfig};
pub use error::{ConfigError, MiningError};
pub use filter::RuleFilter;
pub use itemset::{FrequentItemsets, ItemSet, Support};
pub use pipeline::{MiningReport, Pipeline, Stage};
pub use rank::{Metric, RuleRanker};
pub use rules::{Rule, RuleGenerator};
