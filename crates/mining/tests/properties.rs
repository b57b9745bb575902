//! Property tests for the Apriori miner and rule metrics.
//!
//! The pruned, shard-parallel path is checked against a full scan, and every
//! output must be independent of how the corpus is sharded.

use cartmine_core::{Token, Transaction};
use cartmine_mining::{
    support_by_scan, Corpus, ItemsetMiner, MiningConfig, Pipeline, RuleGenerator,
};
use proptest::prelude::*;

const LABELS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn transaction() -> impl Strategy<Value = Transaction> {
    (prop::collection::btree_set(0..LABELS.len(), 1..5), any::<bool>()).prop_map(|(ids, paid)| {
        let mut tokens: Vec<Token> = ids.into_iter().map(|i| Token::group(LABELS[i])).collect();
        if paid {
            tokens.push(Token::payment("card"));
        }
        Transaction::from_tokens(tokens).expect("at least one token")
    })
}

fn corpus() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec(transaction(), 0..40)
}

fn min_support() -> impl Strategy<Value = f64> {
    (1u32..=10).prop_map(|tenths| tenths as f64 / 10.0)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn support_is_anti_monotone(txs in corpus(), support in min_support()) {
        let mined = ItemsetMiner::new(support).unwrap().mine(&Corpus::new(&txs, 7));
        for (itemset, s) in &mined {
            for (other, t) in &mined {
                if itemset.is_subset(other) {
                    prop_assert!(s.count >= t.count, "{} < {}", itemset, other);
                }
            }
        }
    }

    #[test]
    fn pruned_counts_match_full_scan(txs in corpus(), support in min_support()) {
        let mined = ItemsetMiner::new(support).unwrap().mine(&Corpus::new(&txs, 5));
        for (itemset, s) in &mined {
            prop_assert_eq!(s.count, support_by_scan(&txs, itemset));
            prop_assert!(s.fraction >= support);
        }
    }

    #[test]
    fn frequent_singletons_are_never_missed(txs in corpus(), support in min_support()) {
        let mined = ItemsetMiner::new(support).unwrap().mine(&Corpus::new(&txs, 3));
        let n = txs.len();
        for label in LABELS {
            let single = cartmine_mining::ItemSet::new([Token::group(label)]);
            let count = support_by_scan(&txs, &single);
            let frequent = count > 0 && count as f64 / n as f64 >= support;
            prop_assert_eq!(mined.get(&single).is_some(), frequent);
        }
    }

    #[test]
    fn rule_metrics_are_bounded(txs in corpus(), support in min_support()) {
        let mined = ItemsetMiner::new(support).unwrap().mine(&Corpus::new(&txs, 4));
        let rules = RuleGenerator::new(0.1).unwrap().generate(&mined).unwrap();
        for rule in &rules {
            prop_assert!(rule.confidence >= 0.1 && rule.confidence <= 1.0);
            prop_assert!(rule.lift >= 0.0 && rule.lift.is_finite());
            prop_assert!(rule.antecedent.is_disjoint(&rule.consequent));
            prop_assert!(mined.get(&rule.itemset()).is_some());
        }
    }

    #[test]
    fn results_do_not_depend_on_shard_size(
        txs in corpus(),
        support in min_support(),
        shard_a in 1usize..16,
        shard_b in 1usize..16,
    ) {
        let miner = ItemsetMiner::new(support).unwrap();
        let a = miner.mine(&Corpus::new(&txs, shard_a));
        let b = miner.mine(&Corpus::new(&txs, shard_b));
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn pipeline_output_is_deterministic(txs in corpus(), shard_size in 1usize..16) {
        let catalog = cartmine_core::Catalog::new(Vec::new()).unwrap();
        let taxonomy = cartmine_core::CategoryTaxonomy::default();
        let config = |shard_size| MiningConfig {
            min_support: 0.2,
            min_confidence: 0.3,
            shard_size,
            ..MiningConfig::default()
        };

        let reference = Pipeline::new(config(4096), &catalog, &taxonomy)
            .unwrap()
            .run_on_transactions(&txs)
            .unwrap();
        let sharded = Pipeline::new(config(shard_size), &catalog, &taxonomy)
            .unwrap()
            .run_on_transactions(&txs)
            .unwrap();
        prop_assert_eq!(
            serde_json::to_string(&reference).unwrap(),
            serde_json::to_string(&sharded).unwrap()
        );
    }
}

#[test]
fn independent_tokens_have_unit_lift() {
    // x and y each occur in half the transactions, independently.
    let txs: Vec<Transaction> = [
        vec!["x", "y"],
        vec!["x", "z"],
        vec!["w", "y"],
        vec!["w", "z"],
    ]
    .iter()
    .map(|labels| Transaction::from_tokens(labels.iter().map(|l| Token::group(l))).unwrap())
    .collect();

    let mined = ItemsetMiner::new(0.25).unwrap().mine(&Corpus::new(&txs, 2));
    let rules = RuleGenerator::new(0.5).unwrap().generate(&mined).unwrap();
    let xy = rules
        .iter()
        .find(|r| r.to_string() == "{x} => {y}")
        .expect("x => y is generated");
    assert!((xy.lift - 1.0).abs() < 1e-12);
    assert!(xy.leverage.abs() < 1e-12);
}
