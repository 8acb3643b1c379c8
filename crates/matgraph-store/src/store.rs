//! The document store: all five domains, loaded together, committed together.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use matgraph_model::Domain;

use crate::config::KnowledgeBaseConfig;
use crate::document::DomainDocument;
use crate::error::StoreError;
use crate::persistence::{backup_file, backup_timestamp, write_text_atomic};

/// What a commit did (or would have done, for a dry run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub dry_run: bool,
    pub written: Vec<PathBuf>,
    pub backups: Vec<PathBuf>,
}

pub struct DocumentStore {
    config: KnowledgeBaseConfig,
    documents: BTreeMap<Domain, DomainDocument>,
}

impl DocumentStore {
    /// Load every domain document. Any unreadable domain aborts the load.
    pub fn load(config: KnowledgeBaseConfig) -> Result<Self, StoreError> {
        let mut documents = BTreeMap::new();
        for domain in Domain::ALL {
            let path = config.domain_path(domain);
            let root_key = config.root_key(domain);
            let doc = DomainDocument::load(domain, &path, &root_key)?;
            documents.insert(domain, doc);
        }
        tracing::info!(
            data_dir = %config.data_dir().display(),
            entities = documents.values().map(DomainDocument::len).sum::<usize>(),
            "loaded knowledge base"
        );
        Ok(Self { config, documents })
    }

    /// Build a store from already-parsed documents (tests, tooling).
    pub fn from_documents(
        config: KnowledgeBaseConfig,
        docs: impl IntoIterator<Item = DomainDocument>,
    ) -> Self {
        let documents = docs.into_iter().map(|d| (d.domain(), d)).collect();
        Self { config, documents }
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    pub fn domains(&self) -> impl Iterator<Item = Domain> + '_ {
        self.documents.keys().copied()
    }

    pub fn documents(&self) -> impl Iterator<Item = &DomainDocument> {
        self.documents.values()
    }

    pub fn document(&self, domain: Domain) -> Option<&DomainDocument> {
        self.documents.get(&domain)
    }

    pub fn document_mut(&mut self, domain: Domain) -> Option<&mut DomainDocument> {
        self.documents.get_mut(&domain)
    }

    pub fn require(&self, domain: Domain) -> Result<&DomainDocument, StoreError> {
        self.document(domain)
            .ok_or(StoreError::DomainNotLoaded(domain))
    }

    pub fn require_mut(&mut self, domain: Domain) -> Result<&mut DomainDocument, StoreError> {
        self.document_mut(domain)
            .ok_or(StoreError::DomainNotLoaded(domain))
    }

    pub fn documents_mut(&mut self) -> impl Iterator<Item = &mut DomainDocument> {
        self.documents.values_mut()
    }

    /// Current key set of every loaded domain.
    pub fn key_sets(&self) -> BTreeMap<Domain, HashSet<String>> {
        self.documents
            .iter()
            .map(|(d, doc)| (*d, doc.key_set()))
            .collect()
    }

    pub fn dirty_domains(&self) -> Vec<Domain> {
        self.documents
            .iter()
            .filter(|(_, d)| d.is_dirty())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Persist every dirty domain.
    ///
    /// Order matters: all documents are rendered, then every backup is taken,
    /// and only then is any file replaced. A failure before the write phase
    /// leaves every file untouched.
    pub fn commit(&mut self, dry_run: bool) -> Result<CommitOutcome, StoreError> {
        let dirty = self.dirty_domains();
        let mut outcome = CommitOutcome {
            dry_run,
            ..Default::default()
        };
        if dirty.is_empty() {
            tracing::info!("no documents changed; nothing to write");
            return Ok(outcome);
        }

        let mut rendered: Vec<(PathBuf, String)> = Vec::with_capacity(dirty.len());
        for domain in &dirty {
            let doc = self.require(*domain)?;
            rendered.push((doc.path().to_path_buf(), doc.render()?));
        }

        if dry_run {
            outcome.written = rendered.into_iter().map(|(p, _)| p).collect();
            return Ok(outcome);
        }

        let backup_dir = self.config.backup_dir();
        let stamp = backup_timestamp();
        for (path, _) in &rendered {
            if let Some(b) = backup_file(path, &backup_dir, &stamp)? {
                outcome.backups.push(b);
            }
        }

        for (path, text) in &rendered {
            write_text_atomic(path, text)?;
            tracing::info!(path = %path.display(), "wrote document");
            outcome.written.push(path.clone());
        }

        for domain in dirty {
            if let Some(doc) = self.document_mut(domain) {
                doc.clear_dirty();
            }
        }
        Ok(outcome)
    }
}
