use cartmine_core::{MiningMode, Token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::apriori::DEFAULT_SHARD_SIZE;
use crate::error::{in_unit_interval, ConfigError};
use crate::filter::RuleFilter;
use crate::rank::Metric;

pub const DEFAULT_MIN_SUPPORT: f64 = 0.01;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    pub metric: Metric,
    pub top_k: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiningConfig {
    pub mode: MiningMode,
    pub min_support: f64,
    pub min_confidence: f64,
    pub max_len: Option<usize>,
    /// Category group the focus analyses include or exclude.
    pub focus_token: Option<String>,
    /// Payment statuses kept as `Status` tokens in outcome mode.
    pub outcome_watch_set: BTreeSet<String>,
    pub shard_size: usize,
    pub ranking: RankingConfig,
    pub filter: Option<RuleFilter>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            mode: MiningMode::default(),
            min_support: DEFAULT_MIN_SUPPORT,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_len: None,
            focus_token: None,
            outcome_watch_set: ["已退款", "部分退款"].iter().map(|s| s.to_string()).collect(),
            shard_size: DEFAULT_SHARD_SIZE,
            ranking: RankingConfig::default(),
            filter: None,
        }
    }
}

impl MiningConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: MiningConfig =
            toml::from_str(toml_content).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !in_unit_interval(self.min_support) {
            return Err(ConfigError::SupportOutOfRange(self.min_support));
        }
        if !in_unit_interval(self.min_confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(self.min_confidence));
        }
        if self.shard_size == 0 {
            return Err(ConfigError::ZeroShardSize);
        }
        if self.max_len == Some(0) {
            return Err(ConfigError::ZeroMaxLen);
        }
        if self.ranking.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        if matches!(&self.focus_token, Some(f) if f.trim().is_empty()) {
            return Err(ConfigError::BlankFocusToken);
        }
        Ok(())
    }

    /// The focus group as a mining token.
    pub fn focus(&self) -> Option<Token> {
        self.focus_token.as_deref().map(|f| Token::group(f.trim()))
    }

    /// Preset focus filter; errors when no focus group is configured.
    pub fn focus_filter(&self, include: bool) -> Result<RuleFilter, ConfigError> {
        let token = self.focus().ok_or(ConfigError::MissingFocusToken)?;
        Ok(if include {
            RuleFilter::involving(token)
        } else {
            RuleFilter::without(token)
        })
    }

    /// The configured filter, or the pass-through filter.
    pub fn effective_filter(&self) -> RuleFilter {
        self.filter.clone().unwrap_or_default()
    }
}
