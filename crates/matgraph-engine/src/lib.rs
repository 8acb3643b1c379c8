//! Matgraph engine: validation and repair of the cross-domain relationship graph.
//!
//! Passes, leaf first:
//! - `identity`: domain ID suffixes, `id`/key agreement, rename propagation
//! - `taxonomy`: property name → category bucket and usage tier
//! - `ranges`: category-level numeric ranges (the only place ranges live)
//! - `normalizer`: canonical `{presentation, items, _section}` relationship groups
//! - `integrity`: every reference resolves, checked per domain pair in parallel
//! - `populate`: declarative rules that add missing links
//! - `audit`: read-only aggregate report
//!
//! `pipeline` wires the mutating passes together with the all-or-nothing
//! write policy: findings accumulate, and the store is committed only when
//! the run produced no structural violation and no I/O failure.
//!
//! ## Example
//!
//! ```no_run
//! use matgraph_engine::{pipeline, Engine};
//! use matgraph_model::Domain;
//! use matgraph_store::{DocumentStore, KnowledgeBaseConfig};
//!
//! let config = KnowledgeBaseConfig::load("matgraph.yaml".as_ref())?;
//! let engine = Engine::load(&config)?;
//! let mut store = DocumentStore::load(config)?;
//! let report = pipeline::normalize(&engine, &mut store, &Domain::ALL, true)?;
//! println!("{} finding(s)", report.findings.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audit;
pub mod display;
pub mod engine;
pub mod error;
pub mod identity;
pub mod integrity;
pub mod normalizer;
pub mod pipeline;
pub mod populate;
pub mod ranges;
pub mod taxonomy;

pub use audit::{AuditReportV1, GraphAuditor, AUDIT_REPORT_VERSION};
pub use display::{DisplaySchema, RelationshipDisplay};
pub use engine::Engine;
pub use error::{DisplaySchemaError, EngineError, RangeRegistryError, RuleError, TaxonomyError};
pub use identity::{normalize_identity, IdentityOutcome, RenameMap};
pub use integrity::{BrokenLink, BrokenReason, IntegrityReport, ReferentialIntegrityChecker};
pub use normalizer::{NormalizedGroup, RelationshipNormalizer};
pub use pipeline::{RunReportV1, RUN_REPORT_VERSION};
pub use populate::{
    PopulationPlan, PopulationRuleSpec, ProposedLink, RelationshipPopulator, RuleTable,
};
pub use ranges::{compute_range_from_samples, CategoryRange, CategoryRangeRegistry};
pub use taxonomy::{PropertyClass, PropertyTaxonomy, Tier};
