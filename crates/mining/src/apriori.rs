use cartmine_core::{Token, Transaction};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{in_unit_interval, ConfigError};
use crate::itemset::{FrequentItemsets, ItemSet, Support};

pub const DEFAULT_SHARD_SIZE: usize = 4096;

type TokenId = u32;

/// Token -> local transaction index lists for one slice of the corpus.
struct Shard {
    postings: Vec<Vec<u32>>,
}

impl Shard {
    fn build(transactions: &[Transaction], ids: &BTreeMap<&Token, TokenId>, vocab: usize) -> Self {
        let mut postings = vec![Vec::new(); vocab];
        for (local, tx) in transactions.iter().enumerate() {
            for token in tx.tokens() {
                postings[ids[token] as usize].push(local as u32);
            }
        }
        Shard { postings }
    }

    /// Number of transactions in this shard containing every token in `itemset`.
    fn count(&self, itemset: &[TokenId]) -> usize {
        let mut lists: Vec<&[u32]> = itemset
            .iter()
            .map(|&id| self.postings[id as usize].as_slice())
            .collect();
        lists.sort_by_key(|l| l.len());
        let Some((shortest, rest)) = lists.split_first() else {
            return 0;
        };
        shortest
            .iter()
            .filter(|tx| rest.iter().all(|l| l.binary_search(tx).is_ok()))
            .count()
    }
}

/// Indexed transaction corpus, split into fixed-size shards that are counted
/// independently and summed.
pub struct Corpus {
    vocabulary: Vec<Token>,
    shards: Vec<Shard>,
    len: usize,
}

impl Corpus {
    pub fn new(transactions: &[Transaction], shard_size: usize) -> Self {
        let vocabulary: Vec<Token> = transactions
            .iter()
            .flat_map(|tx| tx.tokens())
            .collect::<BTreeSet<&Token>>()
            .into_iter()
            .cloned()
            .collect();
        // Ids follow canonical token order, so sorted id lists map to sorted itemsets.
        let ids: BTreeMap<&Token, TokenId> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t, i as TokenId))
            .collect();

        let shards = transactions
            .par_chunks(shard_size.max(1))
            .map(|chunk| Shard::build(chunk, &ids, vocabulary.len()))
            .collect();

        Corpus {
            shards,
            len: transactions.len(),
            vocabulary,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn vocabulary(&self) -> &[Token] {
        &self.vocabulary
    }

    /// Support counts for a batch of candidates: each shard counts all of
    /// them, partial counts are summed afterwards.
    fn count_candidates(&self, candidates: &[Vec<TokenId>]) -> Vec<usize> {
        self.shards
            .par_iter()
            .map(|shard| candidates.iter().map(|c| shard.count(c)).collect::<Vec<_>>())
            .reduce(
                || vec![0; candidates.len()],
                |mut acc, partial| {
                    acc.iter_mut().zip(partial).for_each(|(a, p)| *a += p);
                    acc
                },
            )
    }

    fn to_itemset(&self, ids: &[TokenId]) -> ItemSet {
        ItemSet::from_sorted(ids.iter().map(|&id| self.vocabulary[id as usize].clone()).collect())
    }
}

/// Level-wise frequent itemset search with anti-monotone candidate pruning.
#[derive(Debug, Clone)]
pub struct ItemsetMiner {
    min_support: f64,
    max_len: Option<usize>,
}

impl ItemsetMiner {
    pub fn new(min_support: f64) -> Result<Self, ConfigError> {
        if !in_unit_interval(min_support) {
            return Err(ConfigError::SupportOutOfRange(min_support));
        }
        Ok(Self {
            min_support,
            max_len: None,
        })
    }

    /// Stops the search after itemsets of `max_len` tokens.
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    pub fn mine(&self, corpus: &Corpus) -> FrequentItemsets {
        self.mine_with_cancel(corpus, &AtomicBool::new(false))
    }

    /// Like [`mine`](Self::mine), checking `cancel` before each level. A
    /// cancelled run keeps every completed level and is flagged partial.
    pub fn mine_with_cancel(&self, corpus: &Corpus, cancel: &AtomicBool) -> FrequentItemsets {
        let n = corpus.len();
        let mut result = FrequentItemsets {
            transactions: n,
            ..FrequentItemsets::default()
        };
        if n == 0 {
            return result;
        }

        let mut candidates: Vec<Vec<TokenId>> = (0..corpus.vocabulary.len() as TokenId)
            .map(|id| vec![id])
            .collect();
        let mut k = 1;

        while !candidates.is_empty() {
            if self.max_len.is_some_and(|max| k > max) {
                break;
            }
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(level = k, "Itemset mining cancelled");
                result.partial = true;
                break;
            }

            let counts = corpus.count_candidates(&candidates);
            let frequent: Vec<Vec<TokenId>> = candidates
                .into_iter()
                .zip(counts)
                .filter(|&(_, count)| self.is_frequent(count, n))
                .map(|(ids, count)| {
                    result.table.insert(corpus.to_itemset(&ids), Support::new(count, n));
                    ids
                })
                .collect();
            result.levels_completed = k;

            tracing::debug!(level = k, frequent = frequent.len(), "Apriori level complete");

            candidates = generate_candidates(&frequent);
            k += 1;
        }

        result
    }

    fn is_frequent(&self, count: usize, n: usize) -> bool {
        count > 0 && count as f64 / n as f64 >= self.min_support
    }
}

/// Joins frequent k-itemsets sharing their first k-1 tokens, then drops any
/// candidate with an infrequent k-subset. `frequent` must be sorted.
fn generate_candidates(frequent: &[Vec<TokenId>]) -> Vec<Vec<TokenId>> {
    let known: HashSet<&[TokenId]> = frequent.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();

    for (i, a) in frequent.iter().enumerate() {
        let (prefix, last_a) = a.split_at(a.len() - 1);
        for b in &frequent[i + 1..] {
            if !b.starts_with(prefix) {
                break;
            }
            let mut candidate = a.clone();
            candidate.push(b[b.len() - 1]);
            debug_assert!(last_a[0] < candidate[candidate.len() - 1]);

            if all_subsets_frequent(&candidate, &known) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn all_subsets_frequent(candidate: &[TokenId], known: &HashSet<&[TokenId]>) -> bool {
    // Dropping either of the last two tokens yields the join parents.
    let mut subset = Vec::with_capacity(candidate.len() - 1);
    (0..candidate.len().saturating_sub(2)).all(|skip| {
        subset.clear();
        subset.extend(
            candidate
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &id)| id),
        );
        known.contains(subset.as_slice())
    })
}

/// Reference support count by scanning every transaction.
pub fn support_by_scan(transactions: &[Transaction], itemset: &ItemSet) -> usize {
    transactions
        .iter()
        .filter(|tx| itemset.is_contained_in(tx))
        .count()
}
