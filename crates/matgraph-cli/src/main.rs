//! Matgraph CLI
//!
//! Operates the cross-domain relationship graph of the materials knowledge
//! base:
//! - `audit` runs every validation pass without touching any file,
//! - `normalize` repairs entity identity and relationship shape,
//! - `verify-integrity` checks every cross-domain reference,
//! - `populate` proposes and adds missing links from the rule table,
//! - `ranges` recomputes category-level property ranges.
//!
//! Every command writes a versioned JSON report. A non-zero exit means the
//! run found violations (or could not load its inputs).

use anyhow::Result;
use clap::{Parser, Subcommand};

use matgraph_engine::pipeline;
use matgraph_model::Domain;

mod audit;
mod kb;
mod logging;
mod report;
mod run;

use kb::KbArgs;
use report::OutputArgs;

#[derive(Parser)]
#[command(name = "matgraph")]
#[command(about = "Cross-domain relationship graph and validation engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    kb: KbArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    log: logging::LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every validation pass and write a report (no mutation)
    Audit,

    /// Normalize entity identity and relationship shape, then write back
    Normalize {
        /// Limit local normalization to these domains (repeatable; default: all)
        #[arg(long = "domain")]
        domains: Vec<Domain>,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every relationship reference resolves
    VerifyIntegrity,

    /// Propose and add missing links for one relationship type
    Populate {
        /// Source domain (materials|contaminants|compounds|settings|applications)
        #[arg(long)]
        domain: Domain,

        /// Relationship type on the source entities, e.g. `found_on_materials`
        #[arg(long)]
        relation: String,

        /// Skip when this share of source entities already has a link
        #[arg(long, default_value_t = 1.0)]
        coverage_target: f64,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Recompute category ranges from entity values
    Ranges {
        /// Persist the recomputed ranges (with backup)
        #[arg(long)]
        write: bool,
    },
}

fn cmd_normalize(kb: &KbArgs, output: &OutputArgs, domains: &[Domain], dry_run: bool) -> Result<()> {
    let mut loaded = kb::load(kb, output, "normalize")?;
    let domains: &[Domain] = if domains.is_empty() {
        &Domain::ALL
    } else {
        domains
    };
    let report = pipeline::normalize(&loaded.engine, &mut loaded.store, domains, dry_run)?;
    run::finish(&loaded.config, output, &report)
}

fn cmd_verify_integrity(kb: &KbArgs, output: &OutputArgs) -> Result<()> {
    let loaded = kb::load(kb, output, "verify-integrity")?;
    let report = pipeline::verify_integrity(&loaded.engine, &loaded.store);
    run::finish(&loaded.config, output, &report)
}

fn cmd_populate(
    kb: &KbArgs,
    output: &OutputArgs,
    domain: Domain,
    relation: &str,
    coverage_target: f64,
    dry_run: bool,
) -> Result<()> {
    let mut loaded = kb::load(kb, output, "populate")?;
    let report = pipeline::populate(
        &loaded.engine,
        &mut loaded.store,
        domain,
        relation,
        coverage_target,
        dry_run,
    )?;
    run::finish(&loaded.config, output, &report)
}

fn cmd_ranges(kb: &KbArgs, output: &OutputArgs, write: bool) -> Result<()> {
    let loaded = kb::load(kb, output, "ranges")?;
    let report = pipeline::rebuild_ranges(&loaded.engine, &loaded.store, write)?;
    run::finish(&loaded.config, output, &report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log);

    match cli.command {
        Commands::Audit => audit::cmd_audit(&cli.kb, &cli.output),
        Commands::Normalize { domains, dry_run } => {
            cmd_normalize(&cli.kb, &cli.output, &domains, dry_run)
        }
        Commands::VerifyIntegrity => cmd_verify_integrity(&cli.kb, &cli.output),
        Commands::Populate {
            domain,
            relation,
            coverage_target,
            dry_run,
        } => cmd_populate(
            &cli.kb,
            &cli.output,
            domain,
            &relation,
            coverage_target,
            dry_run,
        ),
        Commands::Ranges { write } => cmd_ranges(&cli.kb, &cli.output, write),
    }
}
