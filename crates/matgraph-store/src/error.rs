use std::io;
use std::path::PathBuf;

use matgraph_model::Domain;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{}: top-level key `{key}` is missing or not a mapping", path.display())]
    MissingRoot { path: PathBuf, key: String },
    #[error("backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("domain `{0}` is not loaded")]
    DomainNotLoaded(Domain),
}

impl StoreError {
    /// Path of the document the error concerns, when there is one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            StoreError::Read { path, .. }
            | StoreError::Write { path, .. }
            | StoreError::Parse { path, .. }
            | StoreError::Serialize { path, .. }
            | StoreError::MissingRoot { path, .. }
            | StoreError::Backup { path, .. } => Some(path),
            StoreError::DomainNotLoaded(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
