//! Knowledge-base configuration.
//!
//! Loaded from `matgraph.yaml`. Path resolution:
//! - `data_dir` is relative to the directory holding the config file,
//! - every other path is relative to `data_dir`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use matgraph_model::Domain;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "matgraph.yaml";

/// Per-domain overrides of file name and document root key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// Directory holding the domain documents.
    pub data_dir: PathBuf,
    /// Where pre-write backups go.
    pub backup_dir: PathBuf,
    /// Where machine-readable reports go.
    pub report_dir: PathBuf,
    /// Property taxonomy document (read-only input).
    pub taxonomy: PathBuf,
    /// Display schema document (read-only input).
    pub display_schema: PathBuf,
    /// Category range registry document.
    pub category_ranges: PathBuf,
    /// Optional population rule table; built-in rules are used when absent.
    pub population_rules: Option<PathBuf>,
    pub domains: BTreeMap<Domain, DomainFileConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backup_dir: PathBuf::from("backups"),
            report_dir: PathBuf::from("reports"),
            taxonomy: PathBuf::from("taxonomy.yaml"),
            display_schema: PathBuf::from("display_schema.yaml"),
            category_ranges: PathBuf::from("category_ranges.yaml"),
            population_rules: None,
            domains: BTreeMap::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Load a config file. Relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: KnowledgeBaseConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Default layout rooted at an explicit data directory.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self.base_dir = PathBuf::from(".");
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        join_relative(&self.base_dir, &self.data_dir)
    }

    fn under_data(&self, p: &Path) -> PathBuf {
        join_relative(&self.data_dir(), p)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.under_data(&self.backup_dir)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.under_data(&self.report_dir)
    }

    pub fn taxonomy_path(&self) -> PathBuf {
        self.under_data(&self.taxonomy)
    }

    pub fn display_schema_path(&self) -> PathBuf {
        self.under_data(&self.display_schema)
    }

    pub fn category_ranges_path(&self) -> PathBuf {
        self.under_data(&self.category_ranges)
    }

    pub fn population_rules_path(&self) -> Option<PathBuf> {
        self.population_rules.as_deref().map(|p| self.under_data(p))
    }

    pub fn domain_path(&self, domain: Domain) -> PathBuf {
        let file = self
            .domains
            .get(&domain)
            .and_then(|d| d.file.clone())
            .unwrap_or_else(|| PathBuf::from(domain.default_file_name()));
        self.under_data(&file)
    }

    pub fn root_key(&self, domain: Domain) -> String {
        self.domains
            .get(&domain)
            .and_then(|d| d.root_key.clone())
            .unwrap_or_else(|| domain.tag().to_string())
    }
}

fn join_relative(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
