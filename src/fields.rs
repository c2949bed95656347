//! Interpretation of raw version and install-time fields.
//!
//! Windows has recorded its version and installation moment differently
//! across eras. Modern installations carry `CurrentMajorVersionNumber` and a
//! FILETIME `InstallTime`; older ones only `CurrentVersion` and an
//! epoch-seconds `InstallDate`. The selection rules here follow the era of
//! the fields actually present, not the era of the tool.

use crate::value::{FieldValue, ValueReader};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01 (Unix epoch).
const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

/// Reads a field, degrading any reader failure to an absent value.
pub(crate) fn read_soft(reader: &dyn ValueReader, name: &str) -> Option<FieldValue> {
    match reader.value(name) {
        Ok(value) => value,
        Err(err) => {
            debug!(field = name, error = %err, "Field read failed");
            None
        }
    }
}

/// Renders an optional field value, absent as empty.
fn render(value: Option<FieldValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Composes the version string for one source.
///
/// When `CurrentMajorVersionNumber` is present the modern composition
/// `{major}.{minor}.{build} {displayVersion}` is used, regardless of which
/// legacy fields also exist. Otherwise the legacy composition
/// `{CurrentVersion}.{CurrentBuildNumber} {CSDVersion} {CSDBuildNumber}`
/// applies. Individually missing parts render as empty.
pub fn version_string(reader: &dyn ValueReader) -> String {
    if let Some(major) = read_soft(reader, "CurrentMajorVersionNumber") {
        format!(
            "{}.{}.{} {}",
            major,
            render(read_soft(reader, "CurrentMinorVersionNumber")),
            render(read_soft(reader, "CurrentBuildNumber")),
            render(read_soft(reader, "DisplayVersion")),
        )
    } else {
        format!(
            "{}.{} {} {}",
            render(read_soft(reader, "CurrentVersion")),
            render(read_soft(reader, "CurrentBuildNumber")),
            render(read_soft(reader, "CSDVersion")),
            render(read_soft(reader, "CSDBuildNumber")),
        )
    }
}

/// Determines the installation moment for one source.
///
/// `InstallTime` wins when present as a 64-bit integer and is interpreted as
/// a FILETIME tick count. Otherwise a 32-bit `InstallDate` is interpreted as
/// whole seconds since the Unix epoch. Values of any other type do not
/// match; there is no further fallback.
pub fn install_time(reader: &dyn ValueReader) -> Option<DateTime<Utc>> {
    if let Some(FieldValue::Qword(ticks)) = read_soft(reader, "InstallTime") {
        return filetime_to_datetime(ticks);
    }

    if let Some(FieldValue::Dword(seconds)) = read_soft(reader, "InstallDate") {
        return DateTime::from_timestamp(i64::from(seconds), 0);
    }

    None
}

/// Converts a FILETIME tick count (100 ns since 1601-01-01 UTC) to a UTC
/// timestamp.
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    let seconds = (ticks / 10_000_000) as i64 - FILETIME_UNIX_DIFF;
    let nanos = ((ticks % 10_000_000) * 100) as u32;

    DateTime::from_timestamp(seconds, nanos)
}
