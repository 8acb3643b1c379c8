//! Mutating runs.
//!
//! Each run works on the in-memory store, validates the result, and only then
//! commits. Write-back is all-or-nothing: a single structural violation or
//! I/O failure anywhere in the run leaves every file untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use matgraph_model::{Domain, Finding, FindingSummary};
use matgraph_store::{CommitOutcome, DocumentStore, StoreError};

use crate::engine::Engine;
use crate::identity::{apply_identity, check_identity, propagate_renames, RenameMap};
use crate::integrity::IntegrityReport;
use crate::populate::PopulationPlan;
use crate::ranges::entity_min_max_findings;

pub const RUN_REPORT_VERSION: &str = "run_report_v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameV1 {
    pub domain: Domain,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEntryV1 {
    pub category: String,
    pub property: String,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub samples: usize,
}

/// Report of a `normalize`, `populate`, `verify-integrity` or `ranges` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReportV1 {
    pub version: String,
    pub command: String,
    pub generated_at: String,
    pub data_dir: String,
    pub dry_run: bool,
    pub summary: FindingSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<RenameV1>,
    #[serde(default)]
    pub ids_filled: usize,
    #[serde(default)]
    pub references_rewritten: usize,
    #[serde(default)]
    pub groups_changed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<PopulationPlan>,
    #[serde(default)]
    pub links_added: usize,
    #[serde(default)]
    pub inverse_links_added: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<IntegrityReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<RangeEntryV1>,
    /// True when findings prevented write-back.
    pub write_blocked: bool,
    #[serde(default)]
    pub written: Vec<PathBuf>,
    #[serde(default)]
    pub backups: Vec<PathBuf>,
    pub findings: Vec<Finding>,
}

impl RunReportV1 {
    fn new(command: &str, store: &DocumentStore, dry_run: bool) -> Self {
        Self {
            version: RUN_REPORT_VERSION.to_string(),
            command: command.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            data_dir: store.config().data_dir().display().to_string(),
            dry_run,
            summary: FindingSummary::default(),
            renames: Vec::new(),
            ids_filled: 0,
            references_rewritten: 0,
            groups_changed: 0,
            population: None,
            links_added: 0,
            inverse_links_added: 0,
            integrity: None,
            ranges: Vec::new(),
            write_blocked: false,
            written: Vec::new(),
            backups: Vec::new(),
            findings: Vec::new(),
        }
    }

    fn record_commit(&mut self, outcome: CommitOutcome) {
        self.written = outcome.written;
        self.backups = outcome.backups;
    }

    /// Summarize findings, then commit the store unless the run is blocked.
    fn finish(mut self, store: &mut DocumentStore) -> Result<Self, StoreError> {
        self.summary = FindingSummary::from_findings(&self.findings);
        if !self.summary.allows_write() {
            self.write_blocked = true;
            tracing::warn!(
                structural = self.summary.structural_violations,
                io = self.summary.io_failures,
                "write-back blocked by findings; no files changed"
            );
            return Ok(self);
        }
        let outcome = store.commit(self.dry_run)?;
        self.record_commit(outcome);
        Ok(self)
    }

    /// Any finding that should make the command exit non-zero.
    pub fn has_violations(&self) -> bool {
        self.summary.has_violations()
    }
}

/// Entity records holding `min`/`max` anywhere in the store.
fn min_max_findings(store: &DocumentStore) -> Vec<Finding> {
    store
        .documents()
        .flat_map(|doc| {
            doc.views()
                .flat_map(move |e| entity_min_max_findings(doc.domain(), &e))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Identity + relationship normalization over `domains`, then the rename
/// barrier across all domains, then an integrity check; commits on success.
pub fn normalize(
    engine: &Engine,
    store: &mut DocumentStore,
    domains: &[Domain],
    dry_run: bool,
) -> Result<RunReportV1, StoreError> {
    let mut report = RunReportV1::new("normalize", store, dry_run);
    let mut renames = RenameMap::default();

    for &domain in domains {
        let doc = store.require_mut(domain)?;
        let identity = apply_identity(doc);
        report.ids_filled += identity.ids_filled;
        report.findings.extend(identity.findings);
        renames.extend(identity.renames);
    }
    report.findings.extend(min_max_findings(store));

    let normalizer = engine.normalizer();
    for &domain in domains {
        let doc = store.require_mut(domain)?;
        let result = normalizer.normalize_domain(doc);
        report.groups_changed += result.groups_changed;
        report.findings.extend(result.findings);
    }

    // Barrier: every domain has settled its keys before references move.
    report.references_rewritten = propagate_renames(store, &renames, Some(&engine.display));
    report.renames = renames
        .iter()
        .map(|(domain, from, to)| RenameV1 {
            domain,
            from: from.to_string(),
            to: to.to_string(),
        })
        .collect();

    let integrity = engine.integrity().verify(store);
    report.findings.extend(integrity.to_findings());
    report.integrity = Some(integrity);

    tracing::info!(
        renames = report.renames.len(),
        rewritten = report.references_rewritten,
        groups = report.groups_changed,
        "normalization pass finished"
    );
    report.finish(store)
}

/// Propose and apply links for one (domain, relation); commits on success.
pub fn populate(
    engine: &Engine,
    store: &mut DocumentStore,
    domain: Domain,
    relation: &str,
    coverage_target: f64,
    dry_run: bool,
) -> Result<RunReportV1, StoreError> {
    let mut report = RunReportV1::new("populate", store, dry_run);
    for doc in store.documents() {
        report.findings.extend(check_identity(doc));
    }
    report.findings.extend(min_max_findings(store));

    let populator = engine.populator();
    let plan = populator.propose(store, domain, relation, coverage_target);
    if let Some(reason) = &plan.skipped {
        tracing::info!(domain = %domain, relation = %relation, reason = %reason, "population skipped");
    }
    let outcome = populator.apply(store, &engine.normalizer(), &plan);
    report.links_added = outcome.added;
    report.inverse_links_added = outcome.inverse_added;
    report.findings.extend(outcome.findings);
    report.population = Some(plan);

    let integrity = engine.integrity().verify(store);
    report.findings.extend(integrity.to_findings());
    report.integrity = Some(integrity);
    report.finish(store)
}

/// Integrity check only.
pub fn verify_integrity(engine: &Engine, store: &DocumentStore) -> RunReportV1 {
    let mut report = RunReportV1::new("verify-integrity", store, true);
    let integrity = engine.integrity().verify(store);
    report.findings = integrity.to_findings();
    report.integrity = Some(integrity);
    report.summary = FindingSummary::from_findings(&report.findings);
    report
}

/// Recompute category ranges from entity values; persist them when `write`.
pub fn rebuild_ranges(
    engine: &Engine,
    store: &DocumentStore,
    write: bool,
) -> Result<RunReportV1, StoreError> {
    let mut report = RunReportV1::new("ranges", store, !write);
    let rebuilt = engine.ranges.rebuild_from_entities(store);
    report.findings.extend(rebuilt.findings.iter().cloned());

    let counts: &BTreeMap<(String, String), usize> = &rebuilt.sample_counts;
    for category in rebuilt.registry.categories() {
        for (property, range) in rebuilt.registry.ranges_in(category).into_iter().flatten() {
            report.ranges.push(RangeEntryV1 {
                category: category.to_string(),
                property: property.clone(),
                min: range.min,
                max: range.max,
                unit: range.unit.clone(),
                samples: counts
                    .get(&(category.to_string(), property.clone()))
                    .copied()
                    .unwrap_or(0),
            });
        }
    }

    report.summary = FindingSummary::from_findings(&report.findings);
    if write {
        let path = store.config().category_ranges_path();
        let backup = rebuilt.registry.save(&path, &store.config().backup_dir())?;
        report.written.push(path);
        report.backups.extend(backup);
    }
    Ok(report)
}
