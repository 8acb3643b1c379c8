//! Rendering and exit status for mutating runs (`normalize`, `populate`,
//! `verify-integrity`, `ranges`).

use anyhow::{anyhow, Result};
use colored::Colorize;

use matgraph_engine::RunReportV1;
use matgraph_store::KnowledgeBaseConfig;

use crate::report::{self, OutputArgs};

/// Write and print the report; an `Err` when the run has violations.
pub fn finish(config: &KnowledgeBaseConfig, output: &OutputArgs, r: &RunReportV1) -> Result<()> {
    let path = output.report_path(&config.report_dir(), &r.command);
    report::emit(output, &path, r, render_run_report_text(r))?;

    if r.write_blocked {
        return Err(anyhow!(
            "{} blocked by {} structural violation(s); no files changed",
            r.command,
            r.summary.structural_violations + r.summary.io_failures
        ));
    }
    if r.has_violations() {
        return Err(anyhow!(
            "{} found {} broken reference(s)",
            r.command,
            r.summary.broken_references
        ));
    }
    Ok(())
}

pub fn render_run_report_text(r: &RunReportV1) -> String {
    let mut out = String::new();
    let title = if r.dry_run && r.command != "verify-integrity" {
        format!("{} (dry run)", r.command)
    } else {
        r.command.clone()
    };
    out.push_str(&format!("{}\n", title.bold()));
    out.push_str(&format!("  data_dir: {}\n", r.data_dir));

    if !r.renames.is_empty() || r.ids_filled > 0 {
        out.push_str(&format!(
            "  identity: {} rename(s), {} id(s) filled, {} reference(s) rewritten\n",
            r.renames.len(),
            r.ids_filled,
            r.references_rewritten
        ));
        for rename in &r.renames {
            out.push_str(&format!(
                "    {}: {} -> {}\n",
                rename.domain, rename.from, rename.to
            ));
        }
    }
    if r.command == "normalize" {
        out.push_str(&format!(
            "  relationships: {} group(s) rewritten\n",
            r.groups_changed
        ));
    }

    if let Some(plan) = &r.population {
        out.push_str(&format!(
            "  population: {}.{} coverage {:.0}% (target {:.0}%)\n",
            plan.domain,
            plan.relation,
            plan.coverage * 100.0,
            plan.coverage_target * 100.0
        ));
        match &plan.skipped {
            Some(reason) => out.push_str(&format!("    skipped: {reason}\n")),
            None => out.push_str(&format!(
                "    {} proposal(s), {} link(s) added, {} inverse link(s) added\n",
                plan.proposals.len(),
                r.links_added,
                r.inverse_links_added
            )),
        }
    }

    if let Some(integrity) = &r.integrity {
        out.push_str("  ");
        out.push_str(&report::status_line(
            integrity.is_clean(),
            &format!(
                "integrity: {} reference(s) checked, {} broken",
                integrity.checked_references,
                integrity.broken_links.len()
            ),
        ));
        for (pair, n) in integrity.pairs.iter().filter(|(_, n)| **n > 0) {
            out.push_str(&format!("    {pair}: {n}\n"));
        }
    }

    if !r.ranges.is_empty() {
        out.push_str("  category ranges:\n");
        for e in &r.ranges {
            out.push_str(&format!(
                "    {}.{}: [{}, {}] {} ({} sample(s))\n",
                e.category,
                e.property,
                e.min,
                e.max,
                e.unit.as_deref().unwrap_or("-"),
                e.samples
            ));
        }
    }

    report::render_summary(&mut out, &r.summary);
    if r.write_blocked {
        out.push_str(&format!("  {}\n", "write-back blocked; no files changed".red()));
    } else if !r.written.is_empty() {
        let verb = if r.dry_run { "would write" } else { "wrote" };
        for path in &r.written {
            out.push_str(&format!("  {verb} {}\n", path.display()));
        }
        for path in &r.backups {
            out.push_str(&format!("  backup {}\n", path.display()));
        }
    }

    report::render_findings(&mut out, &r.findings);
    out
}
