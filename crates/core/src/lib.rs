pub mod catalog;
pub mod period;
pub mod price;
pub mod purchase;
pub mod taxonomy;
pub mod transaction;

pub use catalog::{Catalog, CatalogError, CatalogItem, ItemId};
pub use period::YearMonth;
pub use price::Price;
pub use purchase::{ParsedPurchase, PurchaseEvent, PurchaseRecord};
pub use taxonomy::{CategoryTaxonomy, TaxonomyError, OTHER_GROUP};
pub use transaction::{MiningMode, Token, Transaction};
