use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_support must be in (0, 1], got {0}")]
    SupportOutOfRange(f64),
    #[error("min_confidence must be in (0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("shard_size must be at least 1")]
    ZeroShardSize,
    #[error("max_len must be at least 1")]
    ZeroMaxLen,
    #[error("top_k must be at least 1")]
    ZeroTopK,
    #[error("focus_token must not be blank")]
    BlankFocusToken,
    #[error("Focus analysis requires a focus_token")]
    MissingFocusToken,
    #[error("Failed to parse mining config: {0}")]
    Toml(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

/// Thresholds are fractions in (0, 1]; NaN fails both comparisons.
pub(crate) fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}
