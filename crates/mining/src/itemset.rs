use cartmine_core::{Token, Transaction};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// A set of tokens held in canonical (sorted, deduplicated) order.
///
/// Itemsets order by size first, then token-wise, so a table keyed by
/// `ItemSet` lists singletons before pairs and is reproducible byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemSet(Vec<Token>);

impl ItemSet {
    pub fn new<I: IntoIterator<Item = Token>>(tokens: I) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().collect();
        tokens.sort();
        tokens.dedup();
        ItemSet(tokens)
    }

    /// Caller guarantees `tokens` is strictly increasing.
    pub(crate) fn from_sorted(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.windows(2).all(|w| w[0] < w[1]));
        ItemSet(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.0.binary_search(token).is_ok()
    }

    pub fn is_subset(&self, other: &ItemSet) -> bool {
        self.0.iter().all(|t| other.contains(t))
    }

    pub fn is_disjoint(&self, other: &ItemSet) -> bool {
        !self.0.iter().any(|t| other.contains(t))
    }

    pub fn union(&self, other: &ItemSet) -> ItemSet {
        ItemSet::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    pub fn is_contained_in(&self, tx: &Transaction) -> bool {
        self.0.iter().all(|t| tx.contains(t))
    }

    /// Display strings of the tokens, in canonical order.
    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(Token::to_string).collect()
    }
}

impl Ord for ItemSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for ItemSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.labels().join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Support {
    pub count: usize,
    pub fraction: f64,
}

impl Support {
    pub fn new(count: usize, transactions: usize) -> Self {
        let fraction = if transactions == 0 {
            0.0
        } else {
            count as f64 / transactions as f64
        };
        Support { count, fraction }
    }
}

/// The miner's output: every frequent itemset with its support.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequentItemsets {
    pub(crate) transactions: usize,
    pub(crate) table: BTreeMap<ItemSet, Support>,
    pub(crate) levels_completed: usize,
    pub(crate) partial: bool,
}

impl FrequentItemsets {
    pub fn get(&self, itemset: &ItemSet) -> Option<Support> {
        self.table.get(itemset).copied()
    }

    pub fn support(&self, itemset: &ItemSet) -> Option<f64> {
        self.get(itemset).map(|s| s.fraction)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ItemSet, Support> {
        self.table.iter()
    }

    pub fn of_size(&self, k: usize) -> impl Iterator<Item = (&ItemSet, &Support)> {
        self.table.iter().filter(move |(set, _)| set.len() == k)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Size of the corpus the supports are relative to.
    pub fn transaction_count(&self) -> usize {
        self.transactions
    }

    pub fn levels_completed(&self) -> usize {
        self.levels_completed
    }

    /// True when mining was cancelled before the level-wise search ended.
    pub fn is_partial(&self) -> bool {
        self.partial
    }
}

impl<'a> IntoIterator for &'a FrequentItemsets {
    type Item = (&'a ItemSet, &'a Support);
    type IntoIter = btree_map::Iter<'a, ItemSet, Support>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.iter()
    }
}

#[derive(Serialize)]
struct ItemsetRow<'a> {
    itemset: &'a ItemSet,
    count: usize,
    support: f64,
}

impl Serialize for FrequentItemsets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.table.iter().map(|(itemset, s)| ItemsetRow {
            itemset,
            count: s.count,
            support: s.fraction,
        }))
    }
}
