//! Locator classification and source opening.
//!
//! A locator is an opaque caller-supplied string: a `\\machine` name, a
//! directory holding an offline installation, an optical image, a deployment
//! image, or any other file treated as a disk image. Classification is by
//! priority order; the first matching rule wins. One locator can yield any
//! number of opened sources (one per image index or partition), and every
//! failure stays confined to its own locator.

use crate::error::{Result, ScanError};
use crate::media::{ByteStream, MediaProvider, Volume};
use crate::value::{new_resource_guard, OpenedSource, ResourceGuard, ValueReader};
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument};

/// Registry branch carrying installation metadata, relative to the
/// SOFTWARE hive root.
pub const CURRENT_VERSION_BRANCH: &str = r"Microsoft\Windows NT\CurrentVersion";

/// SOFTWARE hive location inside an NT-style installation volume.
pub const SOFTWARE_HIVE_PATH: &str = r"Windows\system32\config\SOFTWARE";

/// SOFTWARE hive location inside a legacy installation volume.
pub const SOFTWARE_HIVE_PATH_LEGACY: &str = r"WINNT\system32\config\SOFTWARE";

/// Primary deployment image on installation media.
pub const INSTALL_IMAGE_PATH: &str = r"sources\install.wim";

/// Fallback deployment image on installation media.
pub const BOOT_IMAGE_PATH: &str = r"sources\boot.wim";

/// Returns true for a `\\machine` locator: double-backslash prefix with no
/// further path separator.
pub fn is_remote_locator(locator: &str) -> bool {
    locator.starts_with(r"\\") && !locator[2..].contains('\\')
}

/// Label used for the current machine, mirroring the `\\machine` form.
fn machine_label() -> String {
    let name = std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| String::from("localhost"));
    format!(r"\\{}", name)
}

/// Case-insensitive extension check.
fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Opens all sources behind one locator.
///
/// Classification rules, in priority order: empty (current machine), remote
/// machine pattern, existing directory (offline volume), `.iso` file,
/// `.wim` file, any other existing file (disk image), otherwise not found.
///
/// # Errors
///
/// Any failure while opening this locator (unknown locator, collaborator
/// rejection, missing embedded image, unreadable hive) is returned as one
/// error for the caller to report; it never affects other locators.
#[instrument(skip(provider))]
pub fn open_locator(provider: &dyn MediaProvider, locator: &str) -> Result<Vec<OpenedSource>> {
    if locator.is_empty() {
        debug!("Opening current machine registry");
        let reader = provider.open_local_machine()?;
        return Ok(vec![OpenedSource::new(machine_label(), reader)]);
    }

    if is_remote_locator(locator) {
        debug!("Opening remote machine registry");
        let reader = provider.open_remote_machine(locator)?;
        return Ok(vec![OpenedSource::new(locator, reader)]);
    }

    let path = Path::new(locator);

    if path.is_dir() {
        return open_offline_volume(provider, locator, path);
    }

    if path.is_file() && has_extension(path, "iso") {
        return open_optical_media(provider, locator, path);
    }

    if path.is_file() && has_extension(path, "wim") {
        return open_deployment_file(provider, locator, path);
    }

    if path.is_file() {
        return open_disk_image(provider, locator, path);
    }

    Err(ScanError::LocatorNotFound(locator.to_string()))
}

/// Rule 2: a directory rooted at an offline installation volume.
fn open_offline_volume(
    provider: &dyn MediaProvider,
    locator: &str,
    root: &Path,
) -> Result<Vec<OpenedSource>> {
    let hive_path = root
        .join("Windows")
        .join("system32")
        .join("config")
        .join("SOFTWARE");
    debug!(path = %hive_path.display(), "Opening offline SOFTWARE hive");

    let file = File::open(&hive_path)?;
    let hive = provider.open_hive(Box::new(file))?;
    let reader = hive
        .open_branch(CURRENT_VERSION_BRANCH)?
        .ok_or_else(|| ScanError::BranchNotFound(CURRENT_VERSION_BRANCH.to_string()))?;

    Ok(vec![OpenedSource::new(locator, reader)])
}

/// Rule 3: optical installation media holding a deployment image.
fn open_optical_media(
    provider: &dyn MediaProvider,
    locator: &str,
    path: &Path,
) -> Result<Vec<OpenedSource>> {
    let file = File::open(path)?;
    let mut volume = provider.open_optical(Box::new(file))?;

    let (image_path, stream) = match volume.open_file(INSTALL_IMAGE_PATH)? {
        Some(stream) => (INSTALL_IMAGE_PATH, stream),
        None => match volume.open_file(BOOT_IMAGE_PATH)? {
            Some(stream) => (BOOT_IMAGE_PATH, stream),
            None => {
                return Err(ScanError::MissingImageFile {
                    path: INSTALL_IMAGE_PATH.to_string(),
                })
            }
        },
    };
    debug!(image = image_path, "Found deployment image on media");

    let label_base = format!(r"{}\{}", locator, image_path);
    open_image_indices(provider, stream, &label_base)
}

/// Rule 4: a deployment image file.
fn open_deployment_file(
    provider: &dyn MediaProvider,
    locator: &str,
    path: &Path,
) -> Result<Vec<OpenedSource>> {
    let file = File::open(path)?;
    open_image_indices(provider, Box::new(file), locator)
}

/// Opens every image index inside a deployment image; indices without the
/// SOFTWARE hive contribute nothing. All resulting sources share one
/// backing stream and therefore one guard.
fn open_image_indices(
    provider: &dyn MediaProvider,
    stream: ByteStream,
    label_base: &str,
) -> Result<Vec<OpenedSource>> {
    let mut image = provider.open_deployment_image(stream)?;
    let guard = new_resource_guard();
    let mut sources = Vec::new();

    for index in 0..image.image_count() {
        let mut volume = image.open_image(index)?;
        let Some(reader) = open_software_branch(provider, volume.as_mut())? else {
            debug!(index = index + 1, "Image index has no SOFTWARE hive");
            continue;
        };
        sources.push(OpenedSource::shared(
            format!("{} index {}", label_base, index + 1),
            reader,
            guard.clone(),
        ));
    }

    debug!(count = sources.len(), "Opened deployment image indices");
    Ok(sources)
}

/// Rule 5: any other existing file, opened as a virtual or raw disk image.
fn open_disk_image(
    provider: &dyn MediaProvider,
    locator: &str,
    path: &Path,
) -> Result<Vec<OpenedSource>> {
    let mut disk = provider.open_virtual_disk(path)?;
    let guard = new_resource_guard();
    let mut sources = Vec::new();

    let partitions = disk.partition_count();
    if partitions > 0 {
        for index in 0..partitions {
            // A partition with no recognizable filesystem is skipped, not
            // an error for the whole disk.
            let volume = match disk.open_partition(index) {
                Ok(Some(volume)) => volume,
                Ok(None) => continue,
                Err(err) => {
                    debug!(partition = index + 1, error = %err, "Partition unreadable");
                    continue;
                }
            };
            push_volume_source(
                provider,
                volume,
                format!("{} partition {}", locator, index + 1),
                &guard,
                &mut sources,
            )?;
        }
    } else if let Some(volume) = disk.open_device()? {
        push_volume_source(
            provider,
            volume,
            format!("{} partition 0", locator),
            &guard,
            &mut sources,
        )?;
    }

    debug!(count = sources.len(), "Opened disk image volumes");
    Ok(sources)
}

/// Searches a mounted volume for the SOFTWARE hive and appends a source
/// when the installation branch is present.
fn push_volume_source(
    provider: &dyn MediaProvider,
    mut volume: Box<dyn Volume>,
    label: String,
    guard: &ResourceGuard,
    sources: &mut Vec<OpenedSource>,
) -> Result<()> {
    if let Some(reader) = open_software_branch(provider, volume.as_mut())? {
        sources.push(OpenedSource::shared(label, reader, guard.clone()));
    }
    Ok(())
}

/// Locates the SOFTWARE hive on a volume (NT-style path first, then the
/// legacy path) and opens its installation branch.
///
/// Returns `Ok(None)` when no hive or no branch is present; enumerated
/// volumes without one simply contribute no source.
fn open_software_branch(
    provider: &dyn MediaProvider,
    volume: &mut dyn Volume,
) -> Result<Option<Box<dyn ValueReader>>> {
    let stream = match volume.open_file(SOFTWARE_HIVE_PATH)? {
        Some(stream) => Some(stream),
        None => volume.open_file(SOFTWARE_HIVE_PATH_LEGACY)?,
    };

    let Some(stream) = stream else {
        return Ok(None);
    };

    let hive = provider.open_hive(stream)?;
    hive.open_branch(CURRENT_VERSION_BRANCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::LocalProvider;

    #[test]
    fn test_remote_locator_pattern() {
        assert!(is_remote_locator(r"\\machine"));
        assert!(is_remote_locator(r"\\srv01"));
        assert!(!is_remote_locator(r"\\machine\share"));
        assert!(!is_remote_locator(r"C:\Windows"));
        assert!(!is_remote_locator("machine"));
        assert!(!is_remote_locator(""));
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        assert!(has_extension(Path::new("setup.ISO"), "iso"));
        assert!(has_extension(Path::new("install.Wim"), "wim"));
        assert!(!has_extension(Path::new("disk.vhd"), "iso"));
        assert!(!has_extension(Path::new("no_extension"), "iso"));
    }

    #[test]
    fn test_unknown_locator_is_not_found() {
        let provider = LocalProvider::new();
        let err = open_locator(&provider, "definitely/not/a/real/path").unwrap_err();
        assert!(matches!(err, ScanError::LocatorNotFound(_)));
    }

    #[test]
    fn test_directory_without_hive_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalProvider::new();
        let err = open_locator(&provider, dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ScanError::Io(_)));
    }

    #[test]
    fn test_machine_label_has_unc_prefix() {
        assert!(machine_label().starts_with(r"\\"));
    }
}
