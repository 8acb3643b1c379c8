//! Read-only audit of the whole knowledge base.
//!
//! Runs every validation pass without mutating anything and aggregates the
//! findings into a versioned, serializable report:
//! - identity (suffixes, `id`/key agreement),
//! - taxonomy classification,
//! - category range validation,
//! - relationship shape (would the normalizer change this group?),
//! - referential integrity,
//! - completeness statistics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use matgraph_model::{Finding, FindingSummary};
use matgraph_store::DocumentStore;

use crate::display::DisplaySchema;
use crate::identity::check_identity;
use crate::integrity::ReferentialIntegrityChecker;
use crate::normalizer::RelationshipNormalizer;
use crate::populate::relation_coverage;
use crate::ranges::{CategoryCoverage, CategoryRangeRegistry};
use crate::taxonomy::{PropertyClass, PropertyTaxonomy};

pub const AUDIT_REPORT_VERSION: &str = "audit_report_v1";

/// One input document of the audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInputV1 {
    pub domain: String,
    pub path: String,
    pub digest: String,
    pub entities: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletenessV1 {
    /// Entities per domain.
    pub entities: BTreeMap<String, usize>,
    /// Domain → relation → share of entities with at least one item.
    pub relation_coverage: BTreeMap<String, BTreeMap<String, f64>>,
    /// Category → range coverage.
    pub range_coverage: BTreeMap<String, CategoryCoverage>,
    /// Unclassified property → number of entities using it.
    pub uncategorized: BTreeMap<String, usize>,
    /// Usage tier → number of property records in that tier.
    pub tier_usage: BTreeMap<String, usize>,
    pub references_checked: usize,
    pub broken_links: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReportV1 {
    pub version: String,
    pub generated_at: String,
    pub data_dir: String,
    pub inputs: Vec<AuditInputV1>,
    pub summary: FindingSummary,
    pub completeness: CompletenessV1,
    pub findings: Vec<Finding>,
}

impl AuditReportV1 {
    pub fn has_violations(&self) -> bool {
        self.summary.has_violations()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GraphAuditor<'a> {
    taxonomy: &'a PropertyTaxonomy,
    ranges: &'a CategoryRangeRegistry,
    display: &'a DisplaySchema,
}

impl<'a> GraphAuditor<'a> {
    pub fn new(
        taxonomy: &'a PropertyTaxonomy,
        ranges: &'a CategoryRangeRegistry,
        display: &'a DisplaySchema,
    ) -> Self {
        Self {
            taxonomy,
            ranges,
            display,
        }
    }

    pub fn audit(&self, store: &DocumentStore) -> AuditReportV1 {
        let mut findings: Vec<Finding> = Vec::new();
        let mut completeness = CompletenessV1::default();
        let mut inputs = Vec::new();

        // Identity and taxonomy, per entity.
        for doc in store.documents() {
            let domain = doc.domain();
            inputs.push(AuditInputV1 {
                domain: domain.tag().to_string(),
                path: doc.path().display().to_string(),
                digest: doc.digest().to_string(),
                entities: doc.len(),
            });
            completeness
                .entities
                .insert(domain.tag().to_string(), doc.len());
            findings.extend(check_identity(doc));

            for entity in doc.views() {
                for prop in entity.properties() {
                    match self.taxonomy.classify(prop.name) {
                        PropertyClass::Uncategorized => {
                            *completeness
                                .uncategorized
                                .entry(prop.name.to_string())
                                .or_default() += 1;
                        }
                        PropertyClass::Categorized {
                            tier: Some(tier), ..
                        } => {
                            *completeness
                                .tier_usage
                                .entry(tier.as_str().to_string())
                                .or_default() += 1;
                        }
                        PropertyClass::Categorized { tier: None, .. } => {}
                    }
                }
                findings.extend(self.taxonomy.check_entity(domain, &entity));
            }
        }

        // Ranges.
        let ranges = self.ranges.validate(store);
        findings.extend(ranges.findings);
        completeness.range_coverage = ranges.coverage;

        // Relationship shape.
        let normalizer = RelationshipNormalizer::new(self.display);
        let mut unknown_types: BTreeSet<(String, String)> = BTreeSet::new();
        for doc in store.documents() {
            let domain = doc.domain();
            let mut relations: BTreeSet<String> = BTreeSet::new();
            for entity in doc.views() {
                let Some(rels) = entity.relationships() else {
                    continue;
                };
                for (rk, group) in rels {
                    let Some(rel_type) = rk.as_str() else {
                        continue;
                    };
                    relations.insert(rel_type.to_string());
                    let result = normalizer.normalize(rel_type, group);
                    for f in result.findings {
                        if f.code == "unknown_relationship_type" {
                            // Reported once per (domain, relation).
                            if !unknown_types.insert((domain.tag().to_string(), rel_type.to_string())) {
                                continue;
                            }
                            findings.push(f.in_domain(domain));
                        } else {
                            findings.push(f.in_domain(domain).entity(entity.key()));
                        }
                    }
                    if result.changed {
                        findings.push(
                            Finding::gap(
                                "non_canonical_relationship",
                                format!("group needs normalization: {}", result.changes.join("; ")),
                            )
                            .in_domain(domain)
                            .entity(entity.key())
                            .relation(rel_type),
                        );
                    }
                }
            }
            let coverage: BTreeMap<String, f64> = relations
                .into_iter()
                .map(|r| {
                    let c = relation_coverage(store, domain, &r);
                    (r, c)
                })
                .collect();
            completeness
                .relation_coverage
                .insert(domain.tag().to_string(), coverage);
        }

        // Integrity.
        let integrity = ReferentialIntegrityChecker::new(Some(self.display)).verify(store);
        completeness.references_checked = integrity.checked_references;
        completeness.broken_links = integrity.broken_links.len();
        findings.extend(integrity.to_findings());

        let summary = FindingSummary::from_findings(&findings);
        tracing::info!(
            findings = findings.len(),
            errors = summary.error_count,
            warnings = summary.warning_count,
            "audit complete"
        );
        AuditReportV1 {
            version: AUDIT_REPORT_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            data_dir: store.config().data_dir().display().to_string(),
            inputs,
            summary,
            completeness,
            findings,
        }
    }
}
