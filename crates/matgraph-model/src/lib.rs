//! Matgraph domain vocabulary
//!
//! This crate defines the shared, storage-agnostic types of the knowledge
//! base graph:
//! - the five fixed entity domains and their ID-suffix conventions,
//! - read-only views over entity records as they appear in YAML documents,
//! - the canonical relationship-group shape,
//! - and the finding/report vocabulary every validation pass emits.
//!
//! Nothing here does I/O. Documents are held as `serde_yaml::Value` so that
//! fields the engine does not understand survive a load/save cycle.

pub mod digest;
pub mod domain;
pub mod entity;
pub mod finding;
pub mod relationship;

pub use domain::{Domain, UnknownDomain};
pub use entity::{EntityView, PropertyRecord, PropertyRef};
pub use finding::{Finding, FindingSummary, IssueKind, Severity};
pub use relationship::{
    Presentation, RelationshipGroup, RelationshipItem, SectionMetadata, SECTION_KEY,
};
