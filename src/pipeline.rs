//! Staged scan pipeline.
//!
//! A run has three strictly ordered stages: enumerate all locators in
//! parallel, build and emit a record per opened source in parallel, then
//! release every surviving backing resource in parallel. Report building
//! never starts before enumeration has finished for every locator.

use crate::enumerate::enumerate_sources;
use crate::media::MediaProvider;
use crate::report::report_sources;
use crate::sink::Sink;
use rayon::prelude::*;
use tracing::info;

/// Outcome counts of one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records emitted to the output sink.
    pub records: usize,

    /// Locators that failed to open.
    pub failures: usize,
}

/// Runs a complete scan over the given locators.
///
/// An empty locator list means "the current machine": a single empty
/// locator is synthesized and resolved through the provider. Records go to
/// `output`, per-locator failures to `errors`; neither stage lets one
/// source's failure suppress another's output.
///
/// # Arguments
///
/// * `provider` - Media collaborator used to open every source kind
/// * `locators` - Caller-supplied source locators, possibly empty
/// * `output` - Sink receiving one block per successfully processed source
/// * `errors` - Sink receiving one labeled line per failed locator
pub fn run_scan(
    provider: &dyn MediaProvider,
    locators: &[String],
    output: &dyn Sink,
    errors: &dyn Sink,
) -> ScanSummary {
    let locators: Vec<String> = if locators.is_empty() {
        vec![String::new()]
    } else {
        locators.to_vec()
    };

    info!(locators = locators.len(), "Starting scan");

    let (sources, failures) = enumerate_sources(provider, &locators, errors);
    let records = report_sources(&sources, output);

    // Backing resources are owned by their readers; closing them is a drop.
    // Resources are independent, so release runs in parallel too.
    sources.into_par_iter().for_each(drop);

    let summary = ScanSummary { records, failures };
    info!(
        records = summary.records,
        failures = summary.failures,
        "Scan complete"
    );
    summary
}
