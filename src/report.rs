//! Per-source record building and rendering.
//!
//! The report stage runs one task per opened source, reads the fixed field
//! set through the source's reader, and emits one assembled text block per
//! source. A field that cannot be read renders as empty; nothing a single
//! source does can keep another source's record from appearing.

use crate::fields::{install_time, read_soft, version_string};
use crate::product_key::product_key;
use crate::sink::Sink;
use crate::value::{FieldValue, OpenedSource};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info};

/// Aggregated installation metadata for one opened source.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    /// Provenance label of the source this record came from.
    pub label: String,

    /// Marketing product name (`ProductName`).
    pub product_name: Option<FieldValue>,

    /// Installation's product id (`ProductId`).
    pub product_id: Option<FieldValue>,

    /// Edition identifier (`EditionID`).
    pub edition: Option<FieldValue>,

    /// Installation type, e.g. Client or Server Core (`InstallationType`).
    pub installation_type: Option<FieldValue>,

    /// Composed version string (era-dependent, see [`crate::fields`]).
    pub version: String,

    /// Build type (`CurrentType`).
    pub current_type: Option<FieldValue>,

    /// Decoded installation key, absent when unset or undecodable.
    pub product_key: Option<String>,

    /// Installation moment in UTC, when recorded.
    pub install_time: Option<DateTime<Utc>>,

    /// Registered owner (`RegisteredOwner`).
    pub registered_owner: Option<FieldValue>,

    /// Registered organization (`RegisteredOrganization`).
    pub registered_organization: Option<FieldValue>,
}

/// Builds the record for one source.
///
/// Every field read is independent: a reader failure on one field leaves
/// that field absent and the rest of the record intact.
pub fn build_record(source: &OpenedSource) -> FieldRecord {
    let reader = |name: &str| read_soft(source.as_reader(), name);

    FieldRecord {
        label: source.label.clone(),
        product_name: reader("ProductName"),
        product_id: reader("ProductId"),
        edition: reader("EditionID"),
        installation_type: reader("InstallationType"),
        version: version_string(source.as_reader()),
        current_type: reader("CurrentType"),
        product_key: product_key(source.as_reader()).unwrap_or_default(),
        install_time: install_time(source.as_reader()),
        registered_owner: reader("RegisteredOwner"),
        registered_organization: reader("RegisteredOrganization"),
    }
}

/// Writes one aligned field line.
fn field_line(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: &Option<FieldValue>,
) -> fmt::Result {
    text_line(f, name, &value.as_ref().map(|v| v.to_string()).unwrap_or_default())
}

/// Writes one aligned line with a pre-rendered value.
fn text_line(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    writeln!(f, "{:<25}{}", format!("{}:", name), value)
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        field_line(f, "Product name", &self.product_name)?;
        field_line(f, "Product Id", &self.product_id)?;
        field_line(f, "Edition", &self.edition)?;
        field_line(f, "Installation type", &self.installation_type)?;
        text_line(f, "Version", &self.version)?;
        field_line(f, "Type", &self.current_type)?;
        text_line(f, "Product key", self.product_key.as_deref().unwrap_or(""))?;
        let time = self
            .install_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        text_line(f, "Install time (UTC)", &time)?;
        field_line(f, "Registered owner", &self.registered_owner)?;
        field_line(f, "Registered organization", &self.registered_organization)
    }
}

/// Builds and emits records for all sources in parallel.
///
/// Each record goes to `output` as one atomic block. Returns the number of
/// records emitted (always one per source).
pub fn report_sources(sources: &[OpenedSource], output: &dyn Sink) -> usize {
    sources.par_iter().for_each(|source| {
        debug!(label = source.label.as_str(), "Building record");
        let record = build_record(source);
        output.emit(&record.to_string());
    });

    info!(records = sources.len(), "Report complete");
    sources.len()
}
