//! Referential integrity across all five domains.
//!
//! Every relationship item carrying an `id` is a reference; it must name an
//! existing key in the domain its `type` resolves to. Lookups are exact key
//! matches. Each (source domain, target domain) pair is checked by its own
//! rayon task; results are joined and sorted so reports are deterministic.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use matgraph_model::relationship::{group_item_values, item_reference};
use matgraph_model::{Domain, Finding};
use matgraph_store::{DocumentStore, DomainDocument};

use crate::display::DisplaySchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenReason {
    /// The target domain has no entity with that key.
    MissingTarget,
    /// `type` names no known domain.
    UnknownTargetDomain,
    /// No `type`, and the relationship type has no configured target.
    MissingTargetType,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrokenLink {
    pub source_domain: Domain,
    pub source_id: String,
    pub relation: String,
    pub target_id: String,
    /// Raw `type` tag, or the resolved domain's tag when it came from the schema.
    pub target_domain: String,
    pub reason: BrokenReason,
}

impl BrokenLink {
    pub fn to_finding(&self) -> Finding {
        let (code, message) = match self.reason {
            BrokenReason::MissingTarget => (
                "broken_link",
                format!("`{}` does not exist in {}", self.target_id, self.target_domain),
            ),
            BrokenReason::UnknownTargetDomain => (
                "unknown_target_domain",
                format!("item type `{}` is not a known domain", self.target_domain),
            ),
            BrokenReason::MissingTargetType => (
                "missing_target_type",
                format!("item `{}` has no type and the relationship has no target", self.target_id),
            ),
        };
        Finding::broken(code, message)
            .in_domain(self.source_domain)
            .entity(self.source_id.as_str())
            .relation(self.relation.as_str())
            .target(self.target_id.as_str(), self.target_domain.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub broken_links: Vec<BrokenLink>,
    /// References examined, across all pairs.
    pub checked_references: usize,
    /// References per `source->target` pair.
    pub pairs: BTreeMap<String, usize>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.broken_links.is_empty()
    }

    pub fn to_findings(&self) -> Vec<Finding> {
        self.broken_links.iter().map(BrokenLink::to_finding).collect()
    }
}

/// Where one item reference points.
enum Resolution {
    Domain(Domain),
    Unknown(String),
    Untyped,
}

#[derive(Default)]
struct PairResult {
    checked: usize,
    broken: Vec<BrokenLink>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferentialIntegrityChecker<'a> {
    display: Option<&'a DisplaySchema>,
}

impl<'a> ReferentialIntegrityChecker<'a> {
    pub fn new(display: Option<&'a DisplaySchema>) -> Self {
        Self { display }
    }

    fn resolve(&self, rel_type: &str, item_type: Option<&str>) -> Resolution {
        match item_type {
            Some(tag) => match Domain::from_tag(tag) {
                Some(d) => Resolution::Domain(d),
                None => Resolution::Unknown(tag.to_string()),
            },
            None => match self.display.and_then(|d| d.target_for(rel_type)) {
                Some(d) => Resolution::Domain(d),
                None => Resolution::Untyped,
            },
        }
    }

    /// Scan one source document for references into `target`
    /// (`None`: references whose target cannot be resolved).
    fn check_pair(
        &self,
        source: &DomainDocument,
        target: Option<Domain>,
        keys: &BTreeMap<Domain, HashSet<String>>,
    ) -> PairResult {
        let mut out = PairResult::default();
        for entity in source.views() {
            let Some(rels) = entity.relationships() else {
                continue;
            };
            for (rk, group) in rels {
                let Some(rel_type) = rk.as_str() else {
                    continue;
                };
                for item in group_item_values(group) {
                    let Some((id, item_type)) = item_reference(item) else {
                        continue;
                    };
                    let broken = |target_domain: String, reason| BrokenLink {
                        source_domain: source.domain(),
                        source_id: entity.key().to_string(),
                        relation: rel_type.to_string(),
                        target_id: id.to_string(),
                        target_domain,
                        reason,
                    };
                    match (self.resolve(rel_type, item_type), target) {
                        (Resolution::Domain(d), Some(t)) if d == t => {
                            out.checked += 1;
                            let exists = keys.get(&d).map(|k| k.contains(id)).unwrap_or(false);
                            if !exists {
                                out.broken
                                    .push(broken(d.tag().to_string(), BrokenReason::MissingTarget));
                            }
                        }
                        (Resolution::Unknown(tag), None) => {
                            out.checked += 1;
                            out.broken.push(broken(tag, BrokenReason::UnknownTargetDomain));
                        }
                        (Resolution::Untyped, None) => {
                            out.checked += 1;
                            out.broken
                                .push(broken(String::new(), BrokenReason::MissingTargetType));
                        }
                        _ => {}
                    }
                }
            }
        }
        out
    }

    pub fn verify(&self, store: &DocumentStore) -> IntegrityReport {
        let keys = store.key_sets();
        let jobs: Vec<(&DomainDocument, Option<Domain>)> = store
            .documents()
            .flat_map(|doc| {
                std::iter::once(None)
                    .chain(Domain::ALL.into_iter().map(Some))
                    .map(move |t| (doc, t))
            })
            .collect();

        let results: Vec<(String, PairResult)> = jobs
            .par_iter()
            .map(|(doc, target)| {
                let label = match target {
                    Some(t) => format!("{}->{}", doc.domain(), t),
                    None => format!("{}->unresolved", doc.domain()),
                };
                (label, self.check_pair(doc, *target, &keys))
            })
            .collect();

        let mut report = IntegrityReport::default();
        for (label, r) in results {
            report.checked_references += r.checked;
            if r.checked > 0 {
                report.pairs.insert(label, r.checked);
            }
            report.broken_links.extend(r.broken);
        }
        report.broken_links.sort();
        tracing::info!(
            references = report.checked_references,
            broken = report.broken_links.len(),
            "verified referential integrity"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matgraph_store::KnowledgeBaseConfig;
    use std::path::Path;

    fn store(materials: &str, contaminants: &str) -> DocumentStore {
        let docs = Domain::ALL.into_iter().map(|d| {
            let text = match d {
                Domain::Material => materials.to_string(),
                Domain::Contaminant => contaminants.to_string(),
                _ => format!("{}: {{}}\n", d.tag()),
            };
            DomainDocument::from_yaml_str(d, Path::new(&d.default_file_name()), d.tag(), &text)
                .unwrap()
        });
        DocumentStore::from_documents(KnowledgeBaseConfig::default(), docs)
    }

    #[test]
    fn every_reference_resolves_in_a_closed_graph() {
        let s = store(
            "materials:\n  steel-laser-cleaning: {}\n",
            r#"
contaminants:
  rust-contamination:
    relationships:
      found_on_materials:
        presentation: card
        items: [{ id: steel-laser-cleaning, type: materials }]
        _section: {}
"#,
        );
        let report = ReferentialIntegrityChecker::default().verify(&s);
        assert!(report.is_clean());
        assert_eq!(report.checked_references, 1);
        assert_eq!(report.pairs.get("contaminants->materials"), Some(&1));
    }

    #[test]
    fn dangling_unknown_and_untyped_references_are_reported_sorted() {
        let s = store(
            r#"
materials:
  steel-laser-cleaning:
    relationships:
      contaminated_by:
        - { id: paint-contamination, type: contaminants }
        - { id: x, type: widgets }
        - { id: y }
        - { name: not a reference }
"#,
            "contaminants: {}\n",
        );
        let report = ReferentialIntegrityChecker::default().verify(&s);
        let reasons: Vec<BrokenReason> = report.broken_links.iter().map(|b| b.reason).collect();
        assert_eq!(reasons.len(), 3);
        assert!(reasons.contains(&BrokenReason::MissingTarget));
        assert!(reasons.contains(&BrokenReason::UnknownTargetDomain));
        assert!(reasons.contains(&BrokenReason::MissingTargetType));
        assert_eq!(report.checked_references, 3);

        let mut sorted = report.broken_links.clone();
        sorted.sort();
        assert_eq!(sorted, report.broken_links);

        let findings = report.to_findings();
        assert!(findings.iter().any(|f| f.code == "unknown_target_domain"));
        assert!(findings.iter().all(|f| !f.kind.blocks_write()));
    }

    #[test]
    fn display_schema_supplies_missing_item_types() {
        let s = store(
            "materials:\n  steel-laser-cleaning:\n    relationships:\n      contaminated_by: [{ id: rust-contamination }]\n",
            "contaminants:\n  rust-contamination: {}\n",
        );
        let display =
            DisplaySchema::from_yaml_str("relationships:\n  contaminated_by: { target: contaminants }\n")
                .unwrap();
        let report = ReferentialIntegrityChecker::new(Some(&display)).verify(&s);
        assert!(report.is_clean());
        assert_eq!(report.checked_references, 1);
    }

    #[test]
    fn bare_scalar_references_are_checked() {
        let s = store(
            "materials:\n  steel-laser-cleaning: {}\n",
            "contaminants:\n  rust-contamination:\n    relationships:\n      found_on_materials: [steel-laser-cleaning, ghost-laser-cleaning]\n",
        );
        let display =
            DisplaySchema::from_yaml_str("relationships:\n  found_on_materials: { target: materials }\n")
                .unwrap();
        let report = ReferentialIntegrityChecker::new(Some(&display)).verify(&s);
        assert_eq!(report.checked_references, 2);
        assert_eq!(report.broken_links.len(), 1);
        let b = &report.broken_links[0];
        assert_eq!(b.target_id, "ghost-laser-cleaning");
        assert_eq!(b.target_domain, "materials");
        assert_eq!(b.reason, BrokenReason::MissingTarget);

        // Without a configured target the scalar is an untyped reference.
        let untyped = ReferentialIntegrityChecker::default().verify(&s);
        assert_eq!(untyped.broken_links.len(), 2);
        assert!(untyped
            .broken_links
            .iter()
            .all(|b| b.reason == BrokenReason::MissingTargetType));
    }
}
