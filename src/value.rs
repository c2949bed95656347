//! Field values, value readers, and opened sources.
//!
//! A [`ValueReader`] is the capability an opened source hands to the report
//! stage: given a field name, produce a tagged [`FieldValue`] or nothing.
//! Readers never expose raw hive or disk bytes; interpretation of those
//! formats lives behind the [`crate::media`] boundary.

use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A single registry-style field value.
///
/// Registry lookups are dynamically typed; this tagged variant lets the
/// interpreter and decoder pattern-match safely. Absence is expressed as
/// `Option::None` at the reader boundary rather than as a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// String value (REG_SZ and friends).
    Text(String),

    /// 32-bit integer (REG_DWORD).
    Dword(u32),

    /// 64-bit integer (REG_QWORD).
    Qword(u64),

    /// Raw byte sequence (REG_BINARY).
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Returns the string content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the 32-bit integer content, if this is a dword value.
    pub fn as_dword(&self) -> Option<u32> {
        match self {
            FieldValue::Dword(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the 64-bit integer content, if this is a qword value.
    pub fn as_qword(&self) -> Option<u64> {
        match self {
            FieldValue::Qword(q) => Some(*q),
            _ => None,
        }
    }

    /// Returns the raw bytes, if this is a binary value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Dword(d) => write!(f, "{}", d),
            FieldValue::Qword(q) => write!(f, "{}", q),
            FieldValue::Bytes(b) => write!(f, "{:02X?}", b),
        }
    }
}

/// Capability to read named fields from one source.
///
/// Implementations are provided by media collaborators (live registry keys,
/// parsed hives, fakes in tests). A reader must tolerate concurrent calls;
/// readers that share a physical backing resource are additionally wrapped
/// in a [`GuardedReader`] so accesses to that resource are serialized.
pub trait ValueReader: Send + Sync {
    /// Reads the named field.
    ///
    /// Returns `Ok(None)` when the field does not exist. Errors are per-field
    /// and degrade to an absent value at the report stage.
    fn value(&self, name: &str) -> Result<Option<FieldValue>>;
}

impl fmt::Debug for dyn ValueReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueReader")
    }
}

/// Exclusive-access guard owned by one physical backing resource.
///
/// All opened sources carved out of the same file (WIM image indices,
/// partitions of one disk image) clone the same guard.
pub type ResourceGuard = Arc<Mutex<()>>;

/// Creates a fresh guard for a newly opened backing resource.
pub fn new_resource_guard() -> ResourceGuard {
    Arc::new(Mutex::new(()))
}

/// Reader wrapper that serializes access to a shared backing resource.
pub struct GuardedReader {
    guard: ResourceGuard,
    inner: Box<dyn ValueReader>,
}

impl GuardedReader {
    /// Wraps `inner` so every read holds `guard` for its duration.
    pub fn new(inner: Box<dyn ValueReader>, guard: ResourceGuard) -> Self {
        Self { guard, inner }
    }
}

impl ValueReader for GuardedReader {
    fn value(&self, name: &str) -> Result<Option<FieldValue>> {
        let _lock = self.guard.lock();
        self.inner.value(name)
    }
}

/// One successfully opened source: a provenance label plus its reader.
///
/// A single locator may yield several of these (one per image index or
/// partition). Each maps to exactly one output record.
pub struct OpenedSource {
    /// Human-readable provenance, used in output and error messages.
    pub label: String,

    reader: Box<dyn ValueReader>,
}

impl OpenedSource {
    /// Creates a source that exclusively owns its backing resource.
    pub fn new(label: impl Into<String>, reader: Box<dyn ValueReader>) -> Self {
        Self {
            label: label.into(),
            reader,
        }
    }

    /// Creates a source whose backing resource is shared with siblings.
    ///
    /// # Arguments
    ///
    /// * `label` - Provenance label
    /// * `reader` - Reader carved out of the shared resource
    /// * `guard` - The resource's exclusive-access guard
    pub fn shared(
        label: impl Into<String>,
        reader: Box<dyn ValueReader>,
        guard: ResourceGuard,
    ) -> Self {
        Self {
            label: label.into(),
            reader: Box::new(GuardedReader::new(reader, guard)),
        }
    }

    /// Reads one field from this source.
    pub fn value(&self, name: &str) -> Result<Option<FieldValue>> {
        self.reader.value(name)
    }

    /// Borrows the underlying reader.
    pub fn as_reader(&self) -> &dyn ValueReader {
        self.reader.as_ref()
    }
}

impl fmt::Debug for OpenedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedSource")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
