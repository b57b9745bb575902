use cartmine_core::{
    Catalog, CategoryTaxonomy, MiningMode, ParsedPurchase, PurchaseRecord, Token, Transaction,
};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Turns parsed purchases into symbolic transactions for one mining mode.
pub struct TransactionBuilder<'a> {
    catalog: &'a Catalog,
    taxonomy: &'a CategoryTaxonomy,
    mode: MiningMode,
    outcome_watch_set: BTreeSet<String>,
}

/// Transactions built from a batch of records, in record order.
#[derive(Debug, Clone, Default)]
pub struct BuiltCorpus {
    pub transactions: Vec<Transaction>,
    /// Records that mapped to no token at all.
    pub discarded: usize,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(catalog: &'a Catalog, taxonomy: &'a CategoryTaxonomy, mode: MiningMode) -> Self {
        Self {
            catalog,
            taxonomy,
            mode,
            outcome_watch_set: BTreeSet::new(),
        }
    }

    /// Payment statuses that become `Status` tokens in `WithOutcome` mode.
    pub fn with_outcome_watch_set<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outcome_watch_set = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(&self, parsed: &ParsedPurchase) -> Option<Transaction> {
        let mut tokens: Vec<Token> = parsed
            .items
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .map(|item| Token::group(self.taxonomy.resolve(&item.subcategory_label)))
            .collect();

        match self.mode {
            MiningMode::Plain => {}
            MiningMode::WithPayment => {
                if let Some(method) = non_empty(parsed.payment_method.as_deref()) {
                    tokens.push(Token::payment(method));
                }
            }
            MiningMode::WithOutcome => {
                if let Some(status) = non_empty(parsed.payment_status.as_deref()) {
                    if self.outcome_watch_set.contains(status) {
                        tokens.push(Token::status(status));
                    }
                }
            }
        }

        Transaction::from_tokens(tokens)
    }

    /// Builds transactions shard by shard and concatenates them in shard
    /// order, so the corpus is identical for any shard size.
    pub fn build_corpus(&self, records: &[PurchaseRecord], shard_size: usize) -> BuiltCorpus {
        let shards: Vec<BuiltCorpus> = records
            .par_chunks(shard_size.max(1))
            .map(|shard| {
                shard.iter().fold(BuiltCorpus::default(), |mut acc, record| {
                    match self.build(&record.purchase) {
                        Some(tx) => acc.transactions.push(tx),
                        None => acc.discarded += 1,
                    }
                    acc
                })
            })
            .collect();

        shards
            .into_iter()
            .fold(BuiltCorpus::default(), |mut acc, shard| {
                acc.transactions.extend(shard.transactions);
                acc.discarded += shard.discarded;
                acc
            })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
