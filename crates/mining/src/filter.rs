use cartmine_core::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::rules::Rule;

/// Structural predicate over rules. Deserializable so a filter can be
/// written directly into the mining config:
///
/// ```toml
/// [filter]
/// kind = "and"
/// all = [
///     { kind = "single_cause" },
///     { kind = "excludes", token = { kind = "group", label = "Other" } },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleFilter {
    #[default]
    Always,
    /// One non-group cause (payment method or status) implying only
    /// category groups.
    SingleCause,
    /// Consequent contains at least one of `tokens`.
    Outcome { tokens: BTreeSet<Token> },
    /// `token` appears on either side.
    Includes { token: Token },
    /// `token` appears on neither side.
    Excludes { token: Token },
    And { all: Vec<RuleFilter> },
    Or { any: Vec<RuleFilter> },
    Not { filter: Box<RuleFilter> },
}

impl RuleFilter {
    pub fn matches(&self, rule: &Rule) -> bool {
        match self {
            RuleFilter::Always => true,
            RuleFilter::SingleCause => {
                let cause = rule.antecedent.tokens();
                cause.len() == 1
                    && !cause[0].is_group()
                    && rule.consequent.tokens().iter().all(Token::is_group)
            }
            RuleFilter::Outcome { tokens } => {
                rule.consequent.tokens().iter().any(|t| tokens.contains(t))
            }
            RuleFilter::Includes { token } => mentions(rule, token),
            RuleFilter::Excludes { token } => !mentions(rule, token),
            RuleFilter::And { all } => all.iter().all(|f| f.matches(rule)),
            RuleFilter::Or { any } => any.iter().any(|f| f.matches(rule)),
            RuleFilter::Not { filter } => !filter.matches(rule),
        }
    }

    pub fn and(self, other: RuleFilter) -> RuleFilter {
        match self {
            RuleFilter::Always => other,
            RuleFilter::And { mut all } => {
                all.push(other);
                RuleFilter::And { all }
            }
            first => RuleFilter::And {
                all: vec![first, other],
            },
        }
    }

    pub fn or(self, other: RuleFilter) -> RuleFilter {
        match self {
            RuleFilter::Or { mut any } => {
                any.push(other);
                RuleFilter::Or { any }
            }
            first => RuleFilter::Or {
                any: vec![first, other],
            },
        }
    }

    pub fn negate(self) -> RuleFilter {
        match self {
            RuleFilter::Not { filter } => *filter,
            inner => RuleFilter::Not {
                filter: Box::new(inner),
            },
        }
    }

    /// Keeps matching rules, preserving their order.
    pub fn apply(&self, rules: Vec<Rule>) -> Vec<Rule> {
        rules.into_iter().filter(|r| self.matches(r)).collect()
    }

    // ── Preset analyses ──

    /// Payment method => category groups.
    pub fn payment_to_category() -> RuleFilter {
        RuleFilter::SingleCause
    }

    /// Rules concluding in one of the watched payment statuses.
    pub fn refund_outcome<I, S>(statuses: I) -> RuleFilter
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RuleFilter::Outcome {
            tokens: statuses
                .into_iter()
                .map(|s| Token::status(s.as_ref()))
                .collect(),
        }
    }

    pub fn involving(token: Token) -> RuleFilter {
        RuleFilter::Includes { token }
    }

    pub fn without(token: Token) -> RuleFilter {
        RuleFilter::Excludes { token }
    }
}

fn mentions(rule: &Rule, token: &Token) -> bool {
    rule.antecedent.contains(token) || rule.consequent.contains(token)
}
