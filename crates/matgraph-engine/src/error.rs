use matgraph_store::StoreError;
use thiserror::Error;

use crate::taxonomy::Tier;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid taxonomy document: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("property `{property}` is listed under both `{first}` and `{second}`")]
    DuplicateProperty {
        property: String,
        first: String,
        second: String,
    },
    #[error("property `{property}` is listed in both the {first:?} and {second:?} usage tiers")]
    DuplicateTier {
        property: String,
        first: Tier,
        second: Tier,
    },
}

#[derive(Debug, Error)]
pub enum RangeRegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid category range document: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("range {category}.{property} has min {min} greater than max {max}")]
    Inverted {
        category: String,
        property: String,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Error)]
pub enum DisplaySchemaError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid display schema: {0}")]
    Parse(#[source] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid population rule table: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("rule `{rule}` has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure to construct the engine's read-only inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    #[error(transparent)]
    Ranges(#[from] RangeRegistryError),
    #[error(transparent)]
    Display(#[from] DisplaySchemaError),
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
