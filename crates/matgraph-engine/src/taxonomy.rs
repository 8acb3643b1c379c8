//! Property taxonomy: property name → owning category bucket and usage tier.
//!
//! Built once from `taxonomy.yaml` and immutable afterwards. Lookups go
//! through a precomputed reverse index; a property that does not resolve is
//! reported, never defaulted into a bucket.
//!
//! ```yaml
//! categories:
//!   material_characteristics:
//!     label: Material Characteristics
//!     properties: [density, hardness]
//! usage_tiers:
//!   core: [density]
//!   common: [hardness]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use matgraph_model::{Domain, EntityView, Finding};
use matgraph_store::read_yaml_document;

use crate::error::TaxonomyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Core,
    Common,
    Specialized,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Core => "core",
            Tier::Common => "common",
            Tier::Specialized => "specialized",
        }
    }
}

/// Result of classifying a property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyClass<'a> {
    Categorized {
        category: &'a str,
        tier: Option<Tier>,
    },
    Uncategorized,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaxonomyDoc {
    #[serde(default)]
    categories: BTreeMap<String, CategoryDoc>,
    #[serde(default)]
    usage_tiers: BTreeMap<Tier, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CategoryDoc {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    properties: Vec<String>,
}

/// One taxonomy bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyCategory {
    pub id: String,
    pub label: Option<String>,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyTaxonomy {
    categories: Vec<TaxonomyCategory>,
    by_property: HashMap<String, usize>,
    tiers: HashMap<String, Tier>,
}

impl PropertyTaxonomy {
    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let (_, value) = read_yaml_document(path)?;
        let tax = Self::from_value(value)?;
        tracing::info!(
            path = %path.display(),
            categories = tax.categories.len(),
            properties = tax.by_property.len(),
            "loaded property taxonomy"
        );
        Ok(tax)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, TaxonomyError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(TaxonomyError::Parse)?;
        Self::from_value(value)
    }

    fn from_value(mut value: serde_yaml::Value) -> Result<Self, TaxonomyError> {
        // Some exports wrap the document under a `property_taxonomy:` key.
        if let Some(inner) = value
            .as_mapping_mut()
            .and_then(|m| m.remove("property_taxonomy"))
        {
            value = inner;
        }
        if value.is_null() {
            return Ok(Self::default());
        }
        let doc: TaxonomyDoc = serde_yaml::from_value(value).map_err(TaxonomyError::Parse)?;
        Self::from_doc(doc)
    }

    fn from_doc(doc: TaxonomyDoc) -> Result<Self, TaxonomyError> {
        let mut categories = Vec::with_capacity(doc.categories.len());
        let mut by_property: HashMap<String, usize> = HashMap::new();

        for (idx, (id, cat)) in doc.categories.into_iter().enumerate() {
            for prop in &cat.properties {
                if let Some(&prev) = by_property.get(prop) {
                    let first: &TaxonomyCategory = &categories[prev];
                    // Listed twice in the same bucket is harmless.
                    if first.id != id {
                        return Err(TaxonomyError::DuplicateProperty {
                            property: prop.clone(),
                            first: first.id.clone(),
                            second: id,
                        });
                    }
                    continue;
                }
                by_property.insert(prop.clone(), idx);
            }
            categories.push(TaxonomyCategory {
                id,
                label: cat.label,
                properties: cat.properties,
            });
        }

        let mut tiers: HashMap<String, Tier> = HashMap::new();
        for (tier, props) in doc.usage_tiers {
            for prop in props {
                match tiers.get(&prop) {
                    Some(&first) if first != tier => {
                        return Err(TaxonomyError::DuplicateTier {
                            property: prop,
                            first,
                            second: tier,
                        })
                    }
                    _ => {
                        tiers.insert(prop, tier);
                    }
                }
            }
        }

        Ok(Self {
            categories,
            by_property,
            tiers,
        })
    }

    pub fn categories(&self) -> &[TaxonomyCategory] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.by_property.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_property.is_empty()
    }

    pub fn category_for(&self, property: &str) -> Option<&str> {
        self.by_property
            .get(property)
            .map(|&idx| self.categories[idx].id.as_str())
    }

    pub fn tier_for(&self, property: &str) -> Option<Tier> {
        self.tiers.get(property).copied()
    }

    pub fn classify(&self, property: &str) -> PropertyClass<'_> {
        match self.category_for(property) {
            Some(category) => PropertyClass::Categorized {
                category,
                tier: self.tier_for(property),
            },
            None => PropertyClass::Uncategorized,
        }
    }

    /// Whether `id` names a taxonomy bucket.
    pub fn is_category(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    /// Classify every property of one entity.
    ///
    /// Emits `uncategorized` for names the taxonomy does not know, and
    /// `misplaced_property` when an entity groups a property under a
    /// different bucket than the one that owns it.
    pub fn check_entity(&self, domain: Domain, entity: &EntityView<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for prop in entity.properties() {
            match self.category_for(prop.name) {
                None => findings.push(
                    Finding::gap(
                        "uncategorized",
                        format!("property `{}` is not in the taxonomy", prop.name),
                    )
                    .in_domain(domain)
                    .entity(entity.key())
                    .property(prop.name),
                ),
                Some(owner) => {
                    if let Some(group) = prop.group {
                        if group != owner && self.is_category(group) {
                            findings.push(
                                Finding::gap(
                                    "misplaced_property",
                                    format!(
                                        "property `{}` is grouped under `{group}` but belongs to `{owner}`",
                                        prop.name
                                    ),
                                )
                                .in_domain(domain)
                                .entity(entity.key())
                                .category(owner)
                                .property(prop.name),
                            );
                        }
                    }
                }
            }
        }
        findings
    }
}
