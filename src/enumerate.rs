//! Concurrent enumeration of locators into opened sources.
//!
//! One task per locator, no ordering guarantees. Successes land in a shared
//! append-only collection; failures become one labeled line on the error
//! sink and never reach the sibling tasks.

use crate::media::MediaProvider;
use crate::sink::Sink;
use crate::source::open_locator;
use crate::value::OpenedSource;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Opens every locator in parallel.
///
/// Returns all successfully opened sources (in no particular order) together
/// with the number of locators that failed. Each failure is reported to
/// `errors` as `Error opening '<locator>': <cause>`. A locator yielding zero
/// sources is not a failure; it just contributes nothing.
pub fn enumerate_sources(
    provider: &dyn MediaProvider,
    locators: &[String],
    errors: &dyn Sink,
) -> (Vec<OpenedSource>, usize) {
    let collected: Mutex<Vec<OpenedSource>> = Mutex::new(Vec::new());
    let failures = AtomicUsize::new(0);

    locators.par_iter().for_each(|locator| {
        match open_locator(provider, locator) {
            Ok(mut sources) => {
                debug!(locator = locator.as_str(), count = sources.len(), "Locator opened");
                collected.lock().append(&mut sources);
            }
            Err(err) => {
                failures.fetch_add(1, Ordering::Relaxed);
                errors.emit(&format!("Error opening '{}': {}", locator, err));
            }
        }
    });

    let sources = collected.into_inner();
    info!(
        sources = sources.len(),
        failures = failures.load(Ordering::Relaxed),
        "Enumeration complete"
    );
    (sources, failures.into_inner())
}
