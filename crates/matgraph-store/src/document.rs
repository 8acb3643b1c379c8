//! One domain's document collection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use matgraph_model::digest::document_digest_v1;
use matgraph_model::entity::str_key;
use matgraph_model::{Domain, EntityView};

use crate::error::StoreError;
use crate::persistence::{read_yaml_document, render_yaml};

/// A loaded domain document.
///
/// The entity map is held apart from the rest of the document so callers can
/// borrow it mutably; `to_value` splices it back under the root key, in its
/// original position.
#[derive(Debug, Clone)]
pub struct DomainDocument {
    domain: Domain,
    path: PathBuf,
    root_key: String,
    /// Full document with the entity map replaced by a placeholder.
    shell: Mapping,
    entities: Mapping,
    digest: String,
    dirty: bool,
}

impl DomainDocument {
    pub fn load(domain: Domain, path: &Path, root_key: &str) -> Result<Self, StoreError> {
        let (text, value) = read_yaml_document(path)?;
        let mut doc = Self::from_value(domain, path, root_key, value)?;
        doc.digest = document_digest_v1(&text);
        tracing::debug!(
            domain = %domain,
            path = %path.display(),
            entities = doc.len(),
            "loaded domain document"
        );
        Ok(doc)
    }

    /// Parse a document from YAML text (no filesystem access).
    pub fn from_yaml_str(
        domain: Domain,
        path: &Path,
        root_key: &str,
        text: &str,
    ) -> Result<Self, StoreError> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc = Self::from_value(domain, path, root_key, value)?;
        doc.digest = document_digest_v1(text);
        Ok(doc)
    }

    fn from_value(
        domain: Domain,
        path: &Path,
        root_key: &str,
        value: Value,
    ) -> Result<Self, StoreError> {
        let missing_root = || StoreError::MissingRoot {
            path: path.to_path_buf(),
            key: root_key.to_string(),
        };
        let Value::Mapping(mut shell) = value else {
            return Err(missing_root());
        };
        let entities = match shell.get_mut(root_key) {
            Some(Value::Mapping(m)) => std::mem::take(m),
            // An empty collection written as `materials:` parses as null.
            Some(v @ Value::Null) => {
                *v = Value::Mapping(Mapping::new());
                Mapping::new()
            }
            _ => return Err(missing_root()),
        };
        Ok(Self {
            domain,
            path: path.to_path_buf(),
            root_key: root_key.to_string(),
            shell,
            entities,
            digest: String::new(),
            dirty: false,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// Digest of the document text as loaded.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn entities(&self) -> &Mapping {
        &self.entities
    }

    /// Mutable access to the entity map. Callers that change anything must
    /// also call [`DomainDocument::mark_dirty`].
    pub fn entities_mut(&mut self) -> &mut Mapping {
        &mut self.entities
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().filter_map(str_key)
    }

    pub fn key_set(&self) -> HashSet<String> {
        self.keys().map(str::to_string).collect()
    }

    pub fn entity<'a>(&'a self, key: &'a str) -> Option<EntityView<'a>> {
        let record = self.entities.get(key)?.as_mapping()?;
        Some(EntityView::new(key, record))
    }

    /// All entity records that are mappings, in document order.
    pub fn views(&self) -> impl Iterator<Item = EntityView<'_>> {
        self.entities
            .iter()
            .filter_map(|(k, v)| EntityView::from_entry(k, v))
    }

    /// Full document value, ready for serialization.
    pub fn to_value(&self) -> Value {
        let mut shell = self.shell.clone();
        shell.insert(
            Value::String(self.root_key.clone()),
            Value::Mapping(self.entities.clone()),
        );
        Value::Mapping(shell)
    }

    pub fn render(&self) -> Result<String, StoreError> {
        render_yaml(&self.path, &self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
metadata:
  version: 3
materials:
  aluminum:
    name: Aluminum
    category: metal
footer: kept
"#;

    #[test]
    fn entities_are_split_out_and_spliced_back_in_place() {
        let doc = DomainDocument::from_yaml_str(
            Domain::Material,
            Path::new("materials.yaml"),
            "materials",
            DOC,
        )
        .unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.contains_key("aluminum"));
        assert_eq!(doc.entity("aluminum").and_then(|e| e.name()), Some("Aluminum"));

        let v = doc.to_value();
        let keys: Vec<&str> = v
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["metadata", "materials", "footer"]);
    }

    #[test]
    fn missing_root_key_is_an_error() {
        let err = DomainDocument::from_yaml_str(
            Domain::Compound,
            Path::new("compounds.yaml"),
            "compounds",
            "other: {}\n",
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::MissingRoot { .. }));
    }

    #[test]
    fn empty_collection_is_accepted() {
        let doc = DomainDocument::from_yaml_str(
            Domain::Setting,
            Path::new("settings.yaml"),
            "settings",
            "settings:\n",
        )
        .unwrap();
        assert!(doc.is_empty());
    }
}
