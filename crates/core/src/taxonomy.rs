use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Group label every unmapped subcategory resolves to.
pub const OTHER_GROUP: &str = "Other";

#[derive(Debug, Clone, Error)]
pub enum TaxonomyError {
    #[error("Failed to parse taxonomy TOML: {0}")]
    Toml(String),
    #[error("Subcategory '{subcategory}' is listed under both '{first}' and '{second}'")]
    Conflict {
        subcategory: String,
        first: String,
        second: String,
    },
}

#[derive(Deserialize)]
struct TaxonomyFile {
    groups: BTreeMap<String, Vec<String>>,
}

/// Many-to-one mapping from fine-grained subcategory labels to the coarse
/// group labels used as mining tokens.
#[derive(Debug, Clone, Default)]
pub struct CategoryTaxonomy {
    lookup: HashMap<String, String>,
    groups: BTreeSet<String>,
}

impl CategoryTaxonomy {
    pub fn from_groups(groups: BTreeMap<String, Vec<String>>) -> Result<Self, TaxonomyError> {
        let mut lookup: HashMap<String, String> = HashMap::new();
        for (group, subcategories) in &groups {
            for sub in subcategories {
                match lookup.get(sub) {
                    Some(existing) if existing != group => {
                        return Err(TaxonomyError::Conflict {
                            subcategory: sub.clone(),
                            first: existing.clone(),
                            second: group.clone(),
                        });
                    }
                    _ => {
                        lookup.insert(sub.clone(), group.clone());
                    }
                }
            }
        }
        Ok(Self {
            lookup,
            groups: groups.into_keys().collect(),
        })
    }

    /// Parses a `[groups]` table of `group = ["subcategory", ...]` entries.
    pub fn from_toml(toml_content: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile =
            toml::from_str(toml_content).map_err(|e| TaxonomyError::Toml(e.to_string()))?;
        Self::from_groups(file.groups)
    }

    pub fn resolve(&self, subcategory_label: &str) -> &str {
        self.lookup
            .get(subcategory_label)
            .map(String::as_str)
            .unwrap_or(OTHER_GROUP)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
