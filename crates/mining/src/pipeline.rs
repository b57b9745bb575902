use cartmine_core::{Catalog, CategoryTaxonomy, PurchaseEvent, Transaction};
use cartmine_import::{PurchaseRecordParser, TransactionBuilder};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::apriori::{Corpus, ItemsetMiner};
use crate::config::MiningConfig;
use crate::error::MiningError;
use crate::filter::RuleFilter;
use crate::rank::RuleRanker;
use crate::rules::{Rule, RuleGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Parsing,
    TransactionsBuilt,
    ItemsetsMined,
    RulesGenerated,
    Filtered,
    Ranked,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Parsing => "parsing",
            Stage::TransactionsBuilt => "transactions_built",
            Stage::ItemsetsMined => "itemsets_mined",
            Stage::RulesGenerated => "rules_generated",
            Stage::Filtered => "filtered",
            Stage::Ranked => "ranked",
            Stage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Result of one pipeline run: the ranked rules plus corpus statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MiningReport {
    pub rules: Vec<Rule>,
    /// Raw events handed to [`Pipeline::run`]; 0 when mining started from
    /// built transactions.
    pub events: usize,
    pub parse_errors: usize,
    pub transactions: usize,
    /// Parsed records that produced no token.
    pub discarded: usize,
    pub frequent_itemsets: usize,
    pub candidate_rules: usize,
    pub filtered_rules: usize,
    /// Mining was cancelled; rules cover the completed levels only.
    pub partial: bool,
}

pub struct Pipeline<'a> {
    config: MiningConfig,
    catalog: &'a Catalog,
    taxonomy: &'a CategoryTaxonomy,
    filter: RuleFilter,
    cancel: Arc<AtomicBool>,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    /// Validates `config` up front so a bad threshold fails before any
    /// record is touched.
    pub fn new(
        config: MiningConfig,
        catalog: &'a Catalog,
        taxonomy: &'a CategoryTaxonomy,
    ) -> Result<Self, MiningError> {
        config.validate()?;
        let filter = config.effective_filter();
        Ok(Self {
            config,
            catalog,
            taxonomy,
            filter,
            cancel: Arc::new(AtomicBool::new(false)),
            stage: Stage::Idle,
        })
    }

    /// Replaces the configured filter, e.g. with a preset analysis.
    pub fn with_filter(mut self, filter: RuleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Shares a cancellation flag checked between Apriori levels.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn run(&mut self, events: &[PurchaseEvent]) -> Result<MiningReport, MiningError> {
        self.advance(Stage::Parsing);
        let batch = PurchaseRecordParser::parse_events(events, self.config.shard_size);

        let builder = TransactionBuilder::new(self.catalog, self.taxonomy, self.config.mode)
            .with_outcome_watch_set(self.config.outcome_watch_set.iter().cloned());
        let corpus = builder.build_corpus(&batch.records, self.config.shard_size);
        tracing::info!(
            events = events.len(),
            parse_errors = batch.error_count(),
            transactions = corpus.transactions.len(),
            discarded = corpus.discarded,
            mode = %self.config.mode,
            "Built transaction corpus"
        );

        let mut report = self.run_on_transactions(&corpus.transactions)?;
        report.events = events.len();
        report.parse_errors = batch.error_count();
        report.discarded = corpus.discarded;
        Ok(report)
    }

    /// Runs from an already built corpus.
    pub fn run_on_transactions(
        &mut self,
        transactions: &[Transaction],
    ) -> Result<MiningReport, MiningError> {
        self.advance(Stage::TransactionsBuilt);
        let corpus = Corpus::new(transactions, self.config.shard_size);

        let miner = ItemsetMiner::new(self.config.min_support)?.with_max_len(self.config.max_len);
        let itemsets = miner.mine_with_cancel(&corpus, &self.cancel);
        self.advance(Stage::ItemsetsMined);
        tracing::info!(
            frequent = itemsets.len(),
            levels = itemsets.levels_completed(),
            partial = itemsets.is_partial(),
            "Mined frequent itemsets"
        );

        let candidates = RuleGenerator::new(self.config.min_confidence)?.generate(&itemsets)?;
        let candidate_rules = candidates.len();
        self.advance(Stage::RulesGenerated);

        let filtered = self.filter.apply(candidates);
        let filtered_rules = filtered.len();
        self.advance(Stage::Filtered);

        let metric = self.config.ranking.metric;
        let rules = RuleRanker::rank(filtered, metric, self.config.ranking.top_k);
        self.advance(Stage::Ranked);

        tracing::info!(
            candidates = candidate_rules,
            filtered = filtered_rules,
            ranked = rules.len(),
            metric = %metric,
            "Ranked association rules"
        );
        self.advance(Stage::Done);

        Ok(MiningReport {
            rules,
            events: 0,
            parse_errors: 0,
            transactions: transactions.len(),
            discarded: 0,
            frequent_itemsets: itemsets.len(),
            candidate_rules,
            filtered_rules,
            partial: itemsets.is_partial(),
        })
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = %self.stage, to = %next, "Pipeline stage");
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::rank::Metric;
    use cartmine_core::{CatalogItem, MiningMode, Price, Token};
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogItem::new(1u64, "智能手机", Price::from_cents(399_900)),
            CatalogItem::new(2u64, "T恤", Price::from_cents(9_900)),
            CatalogItem::new(3u64, "零食", Price::from_cents(1_500)),
            CatalogItem::new(4u64, "未收录", Price::from_cents(500)),
        ])
        .unwrap()
    }

    fn taxonomy() -> CategoryTaxonomy {
        let mut groups = BTreeMap::new();
        groups.insert("电子产品".to_string(), vec!["智能手机".to_string()]);
        groups.insert("服装".to_string(), vec!["T恤".to_string()]);
        groups.insert("食品".to_string(), vec!["零食".to_string()]);
        CategoryTaxonomy::from_groups(groups).unwrap()
    }

    fn event(id: usize, payload: &str) -> PurchaseEvent {
        PurchaseEvent::new(id.to_string(), payload)
    }

    fn payload(method: &str, status: &str, ids: &[u64]) -> String {
        let items: Vec<String> = ids.iter().map(|id| format!("{{\"id\": {id}}}")).collect();
        format!(
            "{{\"payment_method\": \"{method}\", \"payment_status\": \"{status}\", \"items\": [{}]}}",
            items.join(", ")
        )
    }

    fn config(mode: MiningMode) -> MiningConfig {
        MiningConfig {
            mode,
            min_support: 0.25,
            min_confidence: 0.5,
            ..MiningConfig::default()
        }
    }

    fn events() -> Vec<PurchaseEvent> {
        vec![
            event(1, &payload("信用卡", "已支付", &[1, 2])),
            event(2, &payload("信用卡", "已退款", &[1, 2])),
            event(3, &payload("微信支付", "已支付", &[3])),
            event(4, &payload("微信支付", "已退款", &[3, 1])),
            event(5, "{not json"),
            event(6, &payload("现金", "已支付", &[99])),
        ]
    }

    #[test]
    fn plain_run_reports_statistics() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let mut pipeline = Pipeline::new(config(MiningMode::Plain), &catalog, &taxonomy).unwrap();
        assert_eq!(pipeline.stage(), Stage::Idle);

        let report = pipeline.run(&events()).unwrap();
        assert_eq!(pipeline.stage(), Stage::Done);
        assert_eq!(report.events, 6);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.transactions, 4);
        assert_eq!(report.discarded, 1);
        assert!(!report.partial);

        let first = &report.rules[0];
        assert!(first.lift >= report.rules.last().unwrap().lift);
        assert!(report
            .rules
            .iter()
            .any(|r| r.to_string() == "{服装} => {电子产品}" && r.confidence == 1.0));
    }

    #[test]
    fn payment_mode_with_single_cause_filter() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let mut pipeline = Pipeline::new(config(MiningMode::WithPayment), &catalog, &taxonomy)
            .unwrap()
            .with_filter(RuleFilter::payment_to_category());

        let report = pipeline.run(&events()).unwrap();
        assert!(!report.rules.is_empty());
        for rule in &report.rules {
            assert_eq!(rule.antecedent.len(), 1);
            assert!(!rule.antecedent.tokens()[0].is_group());
        }
        assert!(report
            .rules
            .iter()
            .any(|r| r.to_string() == "{信用卡} => {服装, 电子产品}"));
        assert!(report.filtered_rules <= report.candidate_rules);
    }

    #[test]
    fn outcome_mode_surfaces_refunds() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let mut pipeline = Pipeline::new(config(MiningMode::WithOutcome), &catalog, &taxonomy)
            .unwrap()
            .with_filter(RuleFilter::refund_outcome(["已退款"]));

        let report = pipeline.run(&events()).unwrap();
        let refund = Token::status("已退款");
        assert!(!report.rules.is_empty());
        assert!(report.rules.iter().all(|r| r.consequent.contains(&refund)));
    }

    #[test]
    fn ranking_respects_top_k() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let mut cfg = config(MiningMode::WithPayment);
        cfg.ranking.top_k = 2;
        cfg.ranking.metric = Metric::Support;
        let report = Pipeline::new(cfg, &catalog, &taxonomy)
            .unwrap()
            .run(&events())
            .unwrap();
        assert_eq!(report.rules.len(), 2);
        assert!(report.candidate_rules > 2);
        assert!(report.rules[0].support >= report.rules[1].support);
    }

    #[test]
    fn invalid_config_fails_before_parsing() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let cfg = MiningConfig {
            min_support: 0.0,
            ..MiningConfig::default()
        };
        assert!(matches!(
            Pipeline::new(cfg, &catalog, &taxonomy),
            Err(MiningError::Config(ConfigError::SupportOutOfRange(_)))
        ));
    }

    #[test]
    fn prebuilt_transactions_report_no_events() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let txs = vec![
            Transaction::from_tokens([Token::group("a"), Token::group("b")]).unwrap(),
            Transaction::from_tokens([Token::group("a")]).unwrap(),
        ];
        let report = Pipeline::new(config(MiningMode::Plain), &catalog, &taxonomy)
            .unwrap()
            .run_on_transactions(&txs)
            .unwrap();
        assert_eq!(report.events, 0);
        assert_eq!(report.parse_errors, 0);
        assert_eq!(report.transactions, 2);
        assert!(report.rules.iter().any(|r| r.to_string() == "{b} => {a}"));
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let mut pipeline = Pipeline::new(config(MiningMode::Plain), &catalog, &taxonomy).unwrap();
        let report = pipeline.run(&[]).unwrap();
        assert!(report.rules.is_empty());
        assert_eq!(report.frequent_itemsets, 0);
        assert_eq!(pipeline.stage(), Stage::Done);
    }

    #[test]
    fn cancelled_run_is_partial() {
        let catalog = catalog();
        let taxonomy = taxonomy();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut pipeline = Pipeline::new(config(MiningMode::Plain), &catalog, &taxonomy)
            .unwrap()
            .with_cancel(cancel.clone());
        let report = pipeline.run(&events()).unwrap();
        assert!(report.partial);
        assert!(report.rules.is_empty());
        assert!(cancel.load(Ordering::Relaxed));
    }
}
