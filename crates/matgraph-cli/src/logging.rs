//! Diagnostic logging to stderr.
//!
//! `RUST_LOG` wins when set and no `-v` was given; otherwise verbosity picks
//! the level for the `matgraph_*` crates.

use clap::Args;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl LogArgs {
    fn filter(&self) -> EnvFilter {
        match self.verbose {
            0 => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("matgraph=warn")),
            1 => EnvFilter::new("matgraph=info"),
            2 => EnvFilter::new("matgraph=debug"),
            _ => EnvFilter::new("matgraph=trace"),
        }
    }
}

pub fn init(args: &LogArgs) {
    let _ = fmt()
        .with_env_filter(args.filter())
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_matgraph_levels() {
        let info = LogArgs { verbose: 1 }.filter().to_string();
        assert!(info.contains("matgraph=info"), "{info}");
        let debug = LogArgs { verbose: 2 }.filter().to_string();
        assert!(debug.contains("matgraph=debug"), "{debug}");
    }
}
