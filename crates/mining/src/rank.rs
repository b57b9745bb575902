use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::rules::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Support,
    Confidence,
    #[default]
    Lift,
    Leverage,
}

impl Metric {
    pub fn of(self, rule: &Rule) -> f64 {
        match self {
            Metric::Support => rule.support,
            Metric::Confidence => rule.confidence,
            Metric::Lift => rule.lift,
            Metric::Leverage => rule.leverage,
        }
    }

    /// Metric consulted when two rules tie on `self`.
    pub fn tiebreak(self) -> Metric {
        match self {
            Metric::Support => Metric::Confidence,
            Metric::Confidence => Metric::Lift,
            Metric::Lift | Metric::Leverage => Metric::Confidence,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Support => write!(f, "support"),
            Metric::Confidence => write!(f, "confidence"),
            Metric::Lift => write!(f, "lift"),
            Metric::Leverage => write!(f, "leverage"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "support" => Ok(Metric::Support),
            "confidence" => Ok(Metric::Confidence),
            "lift" => Ok(Metric::Lift),
            "leverage" => Ok(Metric::Leverage),
            other => Err(format!("Unknown ranking metric: '{other}'")),
        }
    }
}

pub struct RuleRanker;

impl RuleRanker {
    /// Top `k` rules by `metric`, descending. Ties fall back to the
    /// secondary metric, then to the canonical itemset order of antecedent
    /// and consequent, so the order never depends on the input order.
    pub fn rank(mut rules: Vec<Rule>, metric: Metric, k: usize) -> Vec<Rule> {
        let secondary = metric.tiebreak();
        rules.sort_by(|a, b| {
            descending(metric.of(a), metric.of(b))
                .then_with(|| descending(secondary.of(a), secondary.of(b)))
                .then_with(|| a.antecedent.cmp(&b.antecedent))
                .then_with(|| a.consequent.cmp(&b.consequent))
        });
        rules.truncate(k);
        rules
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itemset::ItemSet;
    use cartmine_core::Token;

    fn rule(from: &str, to: &str, support: f64, confidence: f64, lift: f64) -> Rule {
        Rule {
            antecedent: ItemSet::new([Token::group(from)]),
            consequent: ItemSet::new([Token::group(to)]),
            support,
            confidence,
            lift,
            antecedent_support: 0.5,
            consequent_support: 0.5,
            leverage: support - 0.25,
            conviction: None,
        }
    }

    fn names(rules: &[Rule]) -> Vec<String> {
        rules.iter().map(Rule::to_string).collect()
    }

    #[test]
    fn sorts_descending_and_truncates() {
        let rules = vec![
            rule("a", "b", 0.1, 0.5, 1.1),
            rule("c", "d", 0.2, 0.6, 2.0),
            rule("e", "f", 0.3, 0.7, 1.5),
        ];
        let top = RuleRanker::rank(rules.clone(), Metric::Lift, 2);
        assert_eq!(names(&top), vec!["{c} => {d}", "{e} => {f}"]);

        let top = RuleRanker::rank(rules, Metric::Support, 10);
        assert_eq!(names(&top), vec!["{e} => {f}", "{c} => {d}", "{a} => {b}"]);
    }

    #[test]
    fn ties_use_secondary_metric_then_name() {
        let rules = vec![
            rule("z", "y", 0.2, 0.5, 1.5),
            rule("b", "a", 0.2, 0.5, 1.5),
            rule("m", "n", 0.1, 0.9, 1.5),
        ];
        let top = RuleRanker::rank(rules.clone(), Metric::Lift, 3);
        assert_eq!(names(&top), vec!["{m} => {n}", "{b} => {a}", "{z} => {y}"]);

        let mut reversed = rules;
        reversed.reverse();
        assert_eq!(names(&RuleRanker::rank(reversed, Metric::Lift, 3)), names(&top));
    }

    #[test]
    fn same_label_of_different_kinds_ranks_by_kind() {
        let with_cause = |cause: Token| Rule {
            antecedent: ItemSet::new([cause]),
            ..rule("unused", "y", 0.2, 0.5, 1.5)
        };
        let group = with_cause(Token::group("x"));
        let payment = with_cause(Token::payment("x"));
        assert_eq!(group.to_string(), payment.to_string());

        let forward = RuleRanker::rank(vec![group.clone(), payment.clone()], Metric::Lift, 1);
        let backward = RuleRanker::rank(vec![payment, group.clone()], Metric::Lift, 1);
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![group]);
    }

    #[test]
    fn zero_k_and_empty_input() {
        assert!(RuleRanker::rank(vec![rule("a", "b", 0.1, 0.1, 1.0)], Metric::Lift, 0).is_empty());
        assert!(RuleRanker::rank(Vec::new(), Metric::Support, 5).is_empty());
    }

    #[test]
    fn metric_parses_and_displays() {
        assert_eq!("Leverage".parse::<Metric>(), Ok(Metric::Leverage));
        assert_eq!(Metric::Confidence.to_string(), "confidence");
        assert!("conviction".parse::<Metric>().is_err());
        assert_eq!(Metric::default(), Metric::Lift);
    }
}
