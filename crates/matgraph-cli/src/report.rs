//! Report output shared by every command.
//!
//! Each run writes its versioned JSON report to disk (`--report`, or
//! `<report_dir>/<command>-report.json`) and prints either a text rendering
//! or the same JSON to stdout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use matgraph_model::{Finding, FindingSummary, Severity};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format for stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Where to write the JSON report (default: `<report_dir>/<command>-report.json`).
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

impl OutputArgs {
    pub fn report_path(&self, report_dir: &Path, command: &str) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| report_dir.join(format!("{command}-report.json")))
    }
}

/// Report for a run that could not load its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReportV1 {
    pub version: String,
    pub command: String,
    pub generated_at: String,
    pub summary: FindingSummary,
    pub findings: Vec<Finding>,
}

impl FailureReportV1 {
    pub fn new(command: &str, findings: Vec<Finding>) -> Self {
        Self {
            version: "failure_report_v1".to_string(),
            command: command.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            summary: FindingSummary::from_findings(&findings),
            findings,
        }
    }
}

pub fn write_json_report<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}

/// Persist the JSON report, then print it in the requested format.
pub fn emit<T: Serialize>(args: &OutputArgs, path: &Path, report: &T, text: String) -> Result<()> {
    write_json_report(report, path)?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            print!("{text}");
            println!("  report: {}", path.display());
        }
    }
    Ok(())
}

pub fn render_summary(out: &mut String, s: &FindingSummary) {
    out.push_str(&format!(
        "  summary: structural={} gaps={} broken={} io={}  (errors={} warnings={} infos={})\n",
        s.structural_violations,
        s.classification_gaps,
        s.broken_references,
        s.io_failures,
        s.error_count,
        s.warning_count,
        s.info_count
    ));
}

pub fn render_findings(out: &mut String, findings: &[Finding]) {
    if findings.is_empty() {
        out.push_str("  (no findings)\n");
        return;
    }

    let mut by_severity: BTreeMap<Severity, Vec<&Finding>> = BTreeMap::new();
    for f in findings {
        by_severity.entry(f.severity).or_default().push(f);
    }

    for (severity, items) in by_severity {
        let heading = match severity {
            Severity::Error => severity.as_str().red().bold(),
            Severity::Warning => severity.as_str().yellow().bold(),
            Severity::Info => severity.as_str().cyan(),
        };
        out.push_str(&format!("\n{heading} ({})\n", items.len()));
        for f in items {
            out.push_str(&format!(
                "  - {} [{}]: {}{}\n",
                f.code,
                f.kind.as_str(),
                f.message,
                f.context().dimmed()
            ));
        }
    }
}

pub fn status_line(ok: bool, label: &str) -> String {
    if ok {
        format!("{} {label}\n", "✓".green())
    } else {
        format!("{} {label}\n", "✗".red())
    }
}
