//! Findings emitted by validation passes.
//!
//! Passes never stop at the first problem: they accumulate findings so that a
//! single run surfaces the complete violation set. Each finding carries enough
//! context (domain, entity, relation, target, category, property) to locate the
//! record directly.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Error taxonomy. The kind decides whether a run may write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Always fatal to the item; never repaired silently. Blocks write-back.
    StructuralViolation,
    /// Property not classifiable / range missing. Reported; processing continues.
    ClassificationGap,
    /// Dangling relationship reference. Reported; never auto-deleted.
    BrokenReference,
    /// Document unreadable/unwritable. Aborts the run for that domain.
    IoFailure,
}

impl IssueKind {
    pub fn blocks_write(self) -> bool {
        matches!(self, IssueKind::StructuralViolation | IssueKind::IoFailure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::StructuralViolation => "structural_violation",
            IssueKind::ClassificationGap => "classification_gap",
            IssueKind::BrokenReference => "broken_reference",
            IssueKind::IoFailure => "io_failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Stable machine code, e.g. `id_key_mismatch`, `entity_has_min_max`.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl Finding {
    pub fn new(kind: IssueKind, severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            code: code.to_string(),
            message: message.into(),
            domain: None,
            entity_id: None,
            relation: None,
            target_id: None,
            target_domain: None,
            category: None,
            property: None,
        }
    }

    pub fn structural(code: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::StructuralViolation, Severity::Error, code, message)
    }

    pub fn gap(code: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::ClassificationGap, Severity::Warning, code, message)
    }

    pub fn broken(code: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::BrokenReference, Severity::Error, code, message)
    }

    pub fn io(code: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::IoFailure, Severity::Error, code, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn in_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn target(mut self, id: impl Into<String>, domain: impl Into<String>) -> Self {
        self.target_id = Some(id.into());
        self.target_domain = Some(domain.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// One-line location context for text rendering.
    pub fn context(&self) -> String {
        let mut ctx = String::new();
        if let Some(d) = &self.domain {
            ctx.push_str(&format!(" domain={d}"));
        }
        if let Some(id) = &self.entity_id {
            ctx.push_str(&format!(" entity={id}"));
        }
        if let Some(rel) = &self.relation {
            ctx.push_str(&format!(" relation={rel}"));
        }
        if let Some(t) = &self.target_id {
            ctx.push_str(&format!(" target={t}"));
        }
        if let Some(t) = &self.target_domain {
            ctx.push_str(&format!(" target_domain={t}"));
        }
        if let Some(c) = &self.category {
            ctx.push_str(&format!(" category={c}"));
        }
        if let Some(p) = &self.property {
            ctx.push_str(&format!(" property={p}"));
        }
        ctx
    }
}

/// Counts by kind and severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FindingSummary {
    pub structural_violations: usize,
    pub classification_gaps: usize,
    pub broken_references: usize,
    pub io_failures: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl FindingSummary {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut s = FindingSummary::default();
        for f in findings {
            match f.kind {
                IssueKind::StructuralViolation => s.structural_violations += 1,
                IssueKind::ClassificationGap => s.classification_gaps += 1,
                IssueKind::BrokenReference => s.broken_references += 1,
                IssueKind::IoFailure => s.io_failures += 1,
            }
            match f.severity {
                Severity::Error => s.error_count += 1,
                Severity::Warning => s.warning_count += 1,
                Severity::Info => s.info_count += 1,
            }
        }
        s
    }

    /// Write-back is allowed only without structural or I/O failures.
    pub fn allows_write(&self) -> bool {
        self.structural_violations == 0 && self.io_failures == 0
    }

    /// Any finding that makes `audit` exit non-zero.
    pub fn has_violations(&self) -> bool {
        self.structural_violations > 0 || self.broken_references > 0 || self.io_failures > 0
    }
}
