//! Matgraph Document Store
//!
//! Loads and saves one YAML document per entity domain:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      DOCUMENT STORE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  materials.yaml ─┐                        ┌─► backups/       │
//! │  contaminants ───┤     ┌─────────────┐    │   (timestamped)  │
//! │  compounds ──────┼────►│  in-memory  │────┤                  │
//! │  settings ───────┤     │  documents  │    └─► temp + rename  │
//! │  applications ───┘     └─────────────┘        (atomic)       │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Whole-collection loads**: every domain is read fully into memory
//! - **Dirty tracking**: only mutated domains are written back
//! - **All-or-nothing commit**: every backup is taken before any file is replaced
//! - **Never deletes backups**

pub mod config;
pub mod document;
pub mod error;
pub mod persistence;
pub mod store;


pub use config::{DomainFileConfig, KnowledgeBaseConfig};
pub use document::DomainDocument;
pub use error::{ConfigError, StoreError};
pub use persistence::{backup_file, read_yaml_document, write_document_atomic};
pub use store::{CommitOutcome, DocumentStore};
