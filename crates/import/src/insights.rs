use cartmine_core::{Catalog, CategoryTaxonomy, Price, PurchaseRecord, YearMonth};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentShare {
    pub payment_method: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyActivity {
    pub orders: BTreeMap<YearMonth, usize>,
    /// Purchased item count per category group, per month.
    pub categories: BTreeMap<YearMonth, BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencePattern {
    pub from: String,
    pub to: String,
    pub count: usize,
}

/// Payment-method distribution over items priced strictly above `threshold`.
/// Every qualifying item counts once for its purchase's method.
pub fn high_value_payment_mix(
    records: &[PurchaseRecord],
    catalog: &Catalog,
    threshold: Price,
) -> Vec<PaymentShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let Some(method) = record.purchase.payment_method.as_deref() else {
            continue;
        };
        let expensive = record
            .purchase
            .items
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|item| item.price.exceeds(threshold))
            .count();
        if expensive > 0 {
            *counts.entry(method).or_default() += expensive;
        }
    }

    let total: usize = counts.values().sum();
    let mut shares: Vec<PaymentShare> = counts
        .into_iter()
        .map(|(method, count)| PaymentShare {
            payment_method: method.to_string(),
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    shares.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.payment_method.cmp(&b.payment_method))
    });
    shares
}

/// Orders and per-group item counts by calendar month. Undated records are
/// left out.
pub fn monthly_activity(
    records: &[PurchaseRecord],
    catalog: &Catalog,
    taxonomy: &CategoryTaxonomy,
) -> MonthlyActivity {
    let mut activity = MonthlyActivity::default();
    for record in records {
        let Some(date) = record.purchase.purchase_date else {
            continue;
        };
        let month = YearMonth::of(&date);
        *activity.orders.entry(month).or_default() += 1;

        let per_group = activity.categories.entry(month).or_default();
        for item in record.purchase.items.iter().filter_map(|id| catalog.get(id)) {
            let group = taxonomy.resolve(&item.subcategory_label);
            *per_group.entry(group.to_string()).or_default() += 1;
        }
    }
    activity
}

/// Counts "group A, then group B" transitions in each user's dated purchase
/// history. Transitions within the same group are not counted.
pub fn category_sequences(
    records: &[PurchaseRecord],
    catalog: &Catalog,
    taxonomy: &CategoryTaxonomy,
) -> Vec<SequencePattern> {
    let mut histories: BTreeMap<&str, Vec<(NaiveDateTime, &str)>> = BTreeMap::new();
    for record in records {
        let (Some(user), Some(date)) = (record.user_id.as_deref(), record.purchase.purchase_date)
        else {
            continue;
        };
        let history = histories.entry(user).or_default();
        for item in record.purchase.items.iter().filter_map(|id| catalog.get(id)) {
            history.push((date, taxonomy.resolve(&item.subcategory_label)));
        }
    }

    let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for history in histories.values_mut() {
        // Stable: items of one purchase keep their payload order.
        history.sort_by_key(|(date, _)| *date);
        for window in history.windows(2) {
            let (from, to) = (window[0].1, window[1].1);
            if from != to {
                *pairs.entry((from, to)).or_default() += 1;
            }
        }
    }

    let mut patterns: Vec<SequencePattern> = pairs
        .into_iter()
        .map(|((from, to), count)| SequencePattern {
            from: from.to_string(),
            to: to.to_string(),
            count,
        })
        .collect();
    // BTreeMap order already breaks ties by (from, to); sort_by is stable.
    patterns.sort_by(|a, b| b.count.cmp(&a.count));
    patterns
}
