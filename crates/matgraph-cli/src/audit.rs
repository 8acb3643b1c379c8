//! `matgraph audit`: every validation pass, no mutation.

use anyhow::{anyhow, Result};
use colored::Colorize;

use matgraph_engine::AuditReportV1;

use crate::kb::{self, KbArgs};
use crate::report::{self, OutputArgs};

pub fn cmd_audit(kb: &KbArgs, output: &OutputArgs) -> Result<()> {
    let loaded = kb::load(kb, output, "audit")?;
    let report = loaded.engine.auditor().audit(&loaded.store);

    let path = output.report_path(&loaded.config.report_dir(), "audit");
    report::emit(output, &path, &report, render_audit_report_text(&report))?;

    if report.has_violations() {
        let s = &report.summary;
        return Err(anyhow!(
            "audit found {} violation(s)",
            s.structural_violations + s.broken_references + s.io_failures
        ));
    }
    Ok(())
}

pub fn render_audit_report_text(r: &AuditReportV1) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "audit".bold()));
    out.push_str(&format!("  data_dir: {}\n", r.data_dir));
    for input in &r.inputs {
        out.push_str(&format!(
            "  {:<13} {:>5} entities  {}  {}\n",
            input.domain, input.entities, input.digest, input.path
        ));
    }
    report::render_summary(&mut out, &r.summary);

    let c = &r.completeness;
    out.push_str(&format!(
        "  references: {} checked, {} broken\n",
        c.references_checked, c.broken_links
    ));
    if !c.relation_coverage.is_empty() {
        out.push_str("  relation coverage:\n");
        for (domain, relations) in &c.relation_coverage {
            for (relation, ratio) in relations {
                out.push_str(&format!(
                    "    {domain}.{relation}: {:.0}%\n",
                    ratio * 100.0
                ));
            }
        }
    }
    if !c.range_coverage.is_empty() {
        out.push_str("  category ranges:\n");
        for (category, cov) in &c.range_coverage {
            let line = format!(
                "{category}: {}/{} properties",
                cov.registered, cov.referenced
            );
            out.push_str("    ");
            out.push_str(&report::status_line(cov.missing.is_empty(), &line));
        }
    }
    if !c.tier_usage.is_empty() {
        let tiers: Vec<String> = c
            .tier_usage
            .iter()
            .map(|(tier, n)| format!("{tier}={n}"))
            .collect();
        out.push_str(&format!("  tier usage: {}\n", tiers.join(" ")));
    }

    report::render_findings(&mut out, &r.findings);
    out
}
