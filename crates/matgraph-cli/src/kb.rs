//! Locating and loading the knowledge base for a command.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;

use matgraph_engine::Engine;
use matgraph_model::Finding;
use matgraph_store::config::DEFAULT_CONFIG_FILE;
use matgraph_store::{DocumentStore, KnowledgeBaseConfig};

use crate::report::{self, FailureReportV1, OutputArgs};

#[derive(Args, Debug, Clone, Default)]
pub struct KbArgs {
    /// Knowledge base config file (default: `matgraph.yaml` when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory; overrides `data_dir` from the config.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

impl KbArgs {
    pub fn resolve(&self) -> Result<KnowledgeBaseConfig> {
        let config = match &self.config {
            Some(path) => KnowledgeBaseConfig::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                KnowledgeBaseConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => KnowledgeBaseConfig::default(),
        };
        Ok(match &self.data_dir {
            Some(dir) => config.with_data_dir(dir),
            None => config,
        })
    }
}

/// A loaded run: config, engine inputs, and every domain document.
pub struct Loaded {
    pub config: KnowledgeBaseConfig,
    pub engine: Engine,
    pub store: DocumentStore,
}

/// Load everything a command needs.
///
/// A load failure is an `io_failure`: it is reported like any other run
/// (JSON report plus summary) and then returned as an error.
pub fn load(kb: &KbArgs, output: &OutputArgs, command: &str) -> Result<Loaded> {
    let config = match kb.resolve() {
        Ok(config) => config,
        Err(err) => {
            let fallback = PathBuf::from("reports");
            return Err(fail(output, &fallback, command, "config_unreadable", err));
        }
    };
    let report_dir = config.report_dir();

    let engine = match Engine::load(&config) {
        Ok(engine) => engine,
        Err(err) => {
            return Err(fail(output, &report_dir, command, "collaborator_unreadable", err.into()))
        }
    };
    let store = match DocumentStore::load(config.clone()) {
        Ok(store) => store,
        Err(err) => return Err(fail(output, &report_dir, command, "domain_unreadable", err.into())),
    };
    Ok(Loaded {
        config,
        engine,
        store,
    })
}

fn fail(
    output: &OutputArgs,
    report_dir: &Path,
    command: &str,
    code: &str,
    err: anyhow::Error,
) -> anyhow::Error {
    tracing::error!(error = %format!("{err:#}"), "load failed");
    let report = FailureReportV1::new(command, vec![Finding::io(code, format!("{err:#}"))]);
    let path = output.report_path(report_dir, command);

    let mut text = format!("{}\n", command.bold());
    report::render_summary(&mut text, &report.summary);
    report::render_findings(&mut text, &report.findings);
    if let Err(write_err) = report::emit(output, &path, &report, text) {
        tracing::warn!(error = %write_err, "could not write failure report");
    }
    anyhow!("{command} aborted: {err:#}")
}
