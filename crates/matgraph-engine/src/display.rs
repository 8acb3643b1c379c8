//! Display schema: per relationship type, the default presentation, target
//! domain and section metadata.
//!
//! ```yaml
//! relationships:
//!   contaminated_by:
//!     presentation: card
//!     target: contaminants
//!     title: Common Contaminants
//!     icon: droplet
//!     order: 1
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use matgraph_model::{Domain, Presentation, SectionMetadata};
use matgraph_store::read_yaml_document;

use crate::error::DisplaySchemaError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDisplay {
    #[serde(default)]
    pub presentation: Option<Presentation>,
    #[serde(default)]
    pub target: Option<Domain>,
    #[serde(flatten)]
    pub section: SectionMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DisplaySchemaDoc {
    #[serde(default)]
    relationships: BTreeMap<String, RelationshipDisplay>,
}

#[derive(Debug, Clone, Default)]
pub struct DisplaySchema {
    entries: BTreeMap<String, RelationshipDisplay>,
}

impl DisplaySchema {
    pub fn load(path: &Path) -> Result<Self, DisplaySchemaError> {
        let (_, value) = read_yaml_document(path)?;
        let schema = Self::from_value(value)?;
        tracing::info!(
            path = %path.display(),
            relationships = schema.entries.len(),
            "loaded display schema"
        );
        Ok(schema)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, DisplaySchemaError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(DisplaySchemaError::Parse)?;
        Self::from_value(value)
    }

    fn from_value(value: serde_yaml::Value) -> Result<Self, DisplaySchemaError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let doc: DisplaySchemaDoc =
            serde_yaml::from_value(value).map_err(DisplaySchemaError::Parse)?;
        Ok(Self {
            entries: doc.relationships,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn knows(&self, rel_type: &str) -> bool {
        self.entries.contains_key(rel_type)
    }

    pub fn entry(&self, rel_type: &str) -> Option<&RelationshipDisplay> {
        self.entries.get(rel_type)
    }

    /// Default presentation for a relationship type; `card` when unknown.
    pub fn presentation_for(&self, rel_type: &str) -> Presentation {
        self.entries
            .get(rel_type)
            .and_then(|e| e.presentation)
            .unwrap_or_default()
    }

    /// Section defaults for a relationship type (empty when unknown).
    pub fn section_for(&self, rel_type: &str) -> SectionMetadata {
        self.entries
            .get(rel_type)
            .map(|e| e.section.clone())
            .unwrap_or_default()
    }

    pub fn target_for(&self, rel_type: &str) -> Option<Domain> {
        self.entries.get(rel_type).and_then(|e| e.target)
    }
}
