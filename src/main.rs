//! Command-line entry point.

use anyhow::Result;
use clap::Parser;
use prodkey::{run_scan, LocalProvider, WriterSink};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Show Windows installation information including product key.
#[derive(Parser, Debug)]
#[command(name = "prodkey", version, about, long_about = None, after_help = AFTER_HELP)]
struct Cli {
    /// Sources to query. With none given, the current machine is queried.
    sources: Vec<String>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const AFTER_HELP: &str = "\
Source forms:
  \\\\machinename        another machine on the network
  D:\\                   an offline Windows installation on an attached disk
  D:\\path\\image.vhd     a virtual machine image (vhd, vhdx, vmdk, vdi, raw)
  D:\\path\\setup.iso     a setup ISO or WIM image";

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider = LocalProvider::new();
    let output = WriterSink::new(std::io::stdout());
    let errors = WriterSink::new(std::io::stderr());

    let summary = run_scan(&provider, &cli.sources, &output, &errors);

    if summary.records == 0 && summary.failures > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
