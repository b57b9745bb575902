use cartmine_core::Token;
use serde::Serialize;
use std::fmt;

use crate::error::{in_unit_interval, ConfigError, MiningError};
use crate::itemset::{FrequentItemsets, ItemSet, Support};

/// Directional association rule `antecedent => consequent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub antecedent: ItemSet,
    pub consequent: ItemSet,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub leverage: f64,
    /// `None` when confidence is 1 (the rule never fails).
    pub conviction: Option<f64>,
}

impl Rule {
    /// Every token on either side of the rule.
    pub fn itemset(&self) -> ItemSet {
        self.antecedent.union(&self.consequent)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.antecedent, self.consequent)
    }
}

pub struct RuleGenerator {
    min_confidence: f64,
}

impl RuleGenerator {
    pub fn new(min_confidence: f64) -> Result<Self, ConfigError> {
        if !in_unit_interval(min_confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(min_confidence));
        }
        Ok(Self { min_confidence })
    }

    /// Splits every frequent itemset of two or more tokens into each
    /// antecedent/consequent pair and keeps the confident ones.
    pub fn generate(&self, itemsets: &FrequentItemsets) -> Result<Vec<Rule>, MiningError> {
        let mut rules = Vec::new();
        for (itemset, support) in itemsets.iter().filter(|(set, _)| set.len() >= 2) {
            self.expand(itemsets, itemset, *support, &mut rules)?;
        }
        tracing::debug!(rules = rules.len(), "Generated association rules");
        Ok(rules)
    }

    fn expand(
        &self,
        itemsets: &FrequentItemsets,
        itemset: &ItemSet,
        whole: Support,
        rules: &mut Vec<Rule>,
    ) -> Result<(), MiningError> {
        let tokens = itemset.tokens();
        if tokens.len() >= 64 {
            return Err(MiningError::Invariant(format!(
                "itemset {itemset} is too large to enumerate"
            )));
        }

        let full: u64 = (1 << tokens.len()) - 1;
        for mask in 1..full {
            let (antecedent, consequent) = split(tokens, mask);

            let a = subset_support(itemsets, &antecedent, itemset)?;
            let confidence = whole.count as f64 / a.count as f64;
            if confidence < self.min_confidence {
                continue;
            }

            let b = subset_support(itemsets, &consequent, itemset)?;
            let lift = confidence / b.fraction;
            let conviction = (confidence < 1.0).then(|| (1.0 - b.fraction) / (1.0 - confidence));

            rules.push(Rule {
                support: whole.fraction,
                confidence,
                lift,
                antecedent_support: a.fraction,
                consequent_support: b.fraction,
                leverage: whole.fraction - a.fraction * b.fraction,
                conviction,
                antecedent,
                consequent,
            });
        }
        Ok(())
    }
}

/// Tokens whose bit is set in `mask` go left, the rest right. Both halves
/// stay in canonical order.
fn split(tokens: &[Token], mask: u64) -> (ItemSet, ItemSet) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if mask & (1 << i) != 0 {
            left.push(token.clone());
        } else {
            right.push(token.clone());
        }
    }
    (ItemSet::from_sorted(left), ItemSet::from_sorted(right))
}

/// Every subset of a frequent itemset is frequent, so a missing or zero
/// entry means the itemset table is corrupt.
fn subset_support(
    itemsets: &FrequentItemsets,
    subset: &ItemSet,
    parent: &ItemSet,
) -> Result<Support, MiningError> {
    match itemsets.get(subset) {
        Some(s) if s.count > 0 && s.fraction > 0.0 => Ok(s),
        Some(_) => Err(MiningError::Invariant(format!(
            "subset {subset} of {parent} has zero support"
        ))),
        None => Err(MiningError::Invariant(format!(
            "subset {subset} of {parent} missing from frequent itemsets"
        ))),
    }
}
