use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::price::Price;

/// Product identifier. Payloads and catalogs disagree on whether ids are JSON
/// numbers or strings, so both normalize to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts a JSON string or integer; anything else has no usable id.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(ItemId(s.trim().to_string())),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(ItemId(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::new(id)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        ItemId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid item id: {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    #[serde(alias = "category")]
    pub subcategory_label: String,
    pub price: Price,
}

impl CatalogItem {
    pub fn new(id: impl Into<ItemId>, subcategory_label: &str, price: Price) -> Self {
        CatalogItem {
            id: id.into(),
            subcategory_label: subcategory_label.to_string(),
            price,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog JSON: {0}")]
    Json(String),
    #[error("Duplicate catalog id: {0}")]
    DuplicateId(ItemId),
}

#[derive(Deserialize)]
struct CatalogFile {
    products: Vec<CatalogItem>,
}

/// Read-only product reference data keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<ItemId, CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            if map.contains_key(&item.id) {
                return Err(CatalogError::DuplicateId(item.id));
            }
            map.insert(item.id.clone(), item);
        }
        Ok(Catalog { items: map })
    }

    /// Loads the `{"products": [...]}` export format.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))?;
        Self::new(file.products)
    }

    pub fn get(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_normalize_together() {
        let a: ItemId = serde_json::from_str("42").unwrap();
        let b: ItemId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, ItemId::from(42u64));
    }

    #[test]
    fn from_json_rejects_unusable_ids() {
        assert!(ItemId::from_json(&serde_json::json!(null)).is_none());
        assert!(ItemId::from_json(&serde_json::json!(1.5)).is_none());
        assert!(ItemId::from_json(&serde_json::json!("  ")).is_none());
    }

    #[test]
    fn loads_products_export() {
        let json = r#"{"products": [
            {"id": 1, "category": "智能手机", "price": 5999.0},
            {"id": 2, "category": "零食", "price": 12.5}
        ]}"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let phone = catalog.get(&ItemId::from(1u64)).unwrap();
        assert_eq!(phone.subcategory_label, "智能手机");
        assert_eq!(phone.price, Price::from_cents(599_900));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let items = vec![
            CatalogItem::new(1u64, "零食", Price::from_cents(100)),
            CatalogItem::new(1u64, "饮料", Price::from_cents(200)),
        ];
        assert!(matches!(Catalog::new(items), Err(CatalogError::DuplicateId(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Catalog::from_json("{not json"), Err(CatalogError::Json(_))));
    }
}
