//! Media collaborator boundary.
//!
//! Container formats (optical images, deployment images, virtual disks),
//! filesystem drivers and the registry hive binary format are deliberately
//! not implemented here. The core only ever talks to them through the traits
//! in this module: a locator-derived byte stream goes in, named value
//! readers come out. Everything else (detection, mounting, hive cell
//! parsing) is the provider's business.
//!
//! [`LocalProvider`] is the provider used by the command-line binary. It
//! serves the live machine's registry branch on Windows and reports every
//! media format as unavailable; richer providers (and the fakes used by the
//! integration tests) plug in through [`MediaProvider`].

use crate::error::{Result, ScanError};
use crate::value::ValueReader;
use std::io::{Read, Seek};
use std::path::Path;

/// Seekable byte stream handed across the collaborator boundary.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Boxed byte stream behind a file inside an image or volume.
pub type ByteStream = Box<dyn ReadSeek>;

/// A mounted filesystem volume.
pub trait Volume: Send {
    /// Opens a file inside the volume by its in-volume path.
    ///
    /// Paths use backslash separators as found on installation media
    /// (e.g. `sources\install.wim`). Returns `Ok(None)` when the file
    /// does not exist.
    fn open_file(&mut self, path: &str) -> Result<Option<ByteStream>>;
}

/// A deployment image holding one or more captured filesystem images.
pub trait DeploymentImage: Send {
    /// Number of captured images in the container.
    fn image_count(&self) -> usize;

    /// Opens the captured image at `index` (0-based) as a volume.
    fn open_image(&mut self, index: usize) -> Result<Box<dyn Volume>>;
}

/// An opened virtual or raw disk image.
pub trait VirtualDisk: Send {
    /// Number of entries in the partition table, 0 when there is none.
    fn partition_count(&self) -> usize;

    /// Mounts the filesystem on the partition at `index` (0-based).
    ///
    /// Returns `Ok(None)` when no filesystem can be detected on that
    /// partition.
    fn open_partition(&mut self, index: usize) -> Result<Option<Box<dyn Volume>>>;

    /// Mounts the whole device as a single volume (no partition table).
    ///
    /// Returns `Ok(None)` when no filesystem can be detected.
    fn open_device(&mut self) -> Result<Option<Box<dyn Volume>>>;
}

/// Root of an opened registry hive.
pub trait RegistryRoot: Send {
    /// Opens the branch at `path` (backslash-separated subkey path).
    ///
    /// Returns `Ok(None)` when the branch does not exist.
    fn open_branch(&self, path: &str) -> Result<Option<Box<dyn ValueReader>>>;
}

/// Factory for everything the source opener cannot do itself.
///
/// One provider instance is shared by all enumeration tasks, so
/// implementations must be `Send + Sync`.
pub trait MediaProvider: Send + Sync {
    /// Opens the current machine's OS version registry branch.
    fn open_local_machine(&self) -> Result<Box<dyn ValueReader>>;

    /// Opens the OS version registry branch of a remote machine.
    ///
    /// # Arguments
    ///
    /// * `machine` - Machine locator in `\\name` form
    fn open_remote_machine(&self, machine: &str) -> Result<Box<dyn ValueReader>>;

    /// Parses a registry hive from a byte stream.
    fn open_hive(&self, stream: ByteStream) -> Result<Box<dyn RegistryRoot>>;

    /// Opens optical installation media (UDF or ISO 9660) as a volume.
    fn open_optical(&self, stream: ByteStream) -> Result<Box<dyn Volume>>;

    /// Opens a deployment image (WIM) from a byte stream.
    fn open_deployment_image(&self, stream: ByteStream) -> Result<Box<dyn DeploymentImage>>;

    /// Opens a disk image, falling back to raw sector interpretation when
    /// the container format is unrecognized.
    fn open_virtual_disk(&self, path: &Path) -> Result<Box<dyn VirtualDisk>>;
}

/// Provider backed by the operating system alone.
///
/// Serves the live machine's registry on Windows. Media formats and remote
/// registry access have no collaborator in this build and are reported as
/// such per locator.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProvider;

impl LocalProvider {
    /// Creates the OS-backed provider.
    pub fn new() -> Self {
        Self
    }
}

impl MediaProvider for LocalProvider {
    #[cfg(windows)]
    fn open_local_machine(&self) -> Result<Box<dyn ValueReader>> {
        live::open_current_version_branch()
    }

    #[cfg(not(windows))]
    fn open_local_machine(&self) -> Result<Box<dyn ValueReader>> {
        Err(ScanError::platform_unsupported(
            "querying the current machine",
        ))
    }

    fn open_remote_machine(&self, _machine: &str) -> Result<Box<dyn ValueReader>> {
        // No remote registry collaborator is wired up on any platform.
        Err(ScanError::platform_unsupported(
            "querying other machines over network",
        ))
    }

    fn open_hive(&self, _stream: ByteStream) -> Result<Box<dyn RegistryRoot>> {
        Err(ScanError::source_open(
            "no registry hive collaborator is configured",
        ))
    }

    fn open_optical(&self, _stream: ByteStream) -> Result<Box<dyn Volume>> {
        Err(ScanError::source_open(
            "no optical media collaborator is configured",
        ))
    }

    fn open_deployment_image(&self, _stream: ByteStream) -> Result<Box<dyn DeploymentImage>> {
        Err(ScanError::source_open(
            "no deployment image collaborator is configured",
        ))
    }

    fn open_virtual_disk(&self, _path: &Path) -> Result<Box<dyn VirtualDisk>> {
        Err(ScanError::source_open(
            "no virtual disk collaborator is configured",
        ))
    }
}

#[cfg(windows)]
mod live {
    //! Live registry access through the Win32 registry API.

    use crate::error::{Result, ScanError};
    use crate::value::{FieldValue, ValueReader};
    use parking_lot::Mutex;
    use std::io;
    use tracing::debug;
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_64KEY};
    use winreg::{RegKey, RegValue};

    /// 64-bit registry view of `SOFTWARE\Microsoft\Windows NT\CurrentVersion`.
    const CURRENT_VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

    /// Opens the local OS version branch as a value reader.
    pub(super) fn open_current_version_branch() -> Result<Box<dyn ValueReader>> {
        let key = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey_with_flags(CURRENT_VERSION_KEY, KEY_READ | KEY_WOW64_64KEY)?;
        debug!(key = CURRENT_VERSION_KEY, "Opened local registry branch");
        Ok(Box::new(LiveKeyReader {
            key: Mutex::new(key),
        }))
    }

    /// Reader over one live registry key.
    ///
    /// `RegKey` is not `Sync`, so the handle sits behind a mutex; the report
    /// stage reads each source from a single task anyway.
    struct LiveKeyReader {
        key: Mutex<RegKey>,
    }

    impl ValueReader for LiveKeyReader {
        fn value(&self, name: &str) -> Result<Option<FieldValue>> {
            let raw = match self.key.lock().get_raw_value(name) {
                Ok(raw) => raw,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(err) => {
                    return Err(ScanError::field_read(name, err.to_string()));
                }
            };
            Ok(Some(decode_raw_value(raw)))
        }
    }

    /// Maps a raw Win32 registry value onto the tagged field variant.
    fn decode_raw_value(raw: RegValue) -> FieldValue {
        use winreg::enums::RegType;

        match raw.vtype {
            RegType::REG_SZ | RegType::REG_EXPAND_SZ => {
                let units: Vec<u16> = raw
                    .bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                let text = String::from_utf16_lossy(&units)
                    .trim_end_matches('\0')
                    .to_string();
                FieldValue::Text(text)
            }
            RegType::REG_DWORD if raw.bytes.len() >= 4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&raw.bytes[..4]);
                FieldValue::Dword(u32::from_le_bytes(buf))
            }
            RegType::REG_QWORD if raw.bytes.len() >= 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&raw.bytes[..8]);
                FieldValue::Qword(u64::from_le_bytes(buf))
            }
            _ => FieldValue::Bytes(raw.bytes),
        }
    }
}
