//! Fake media collaborators backing the integration tests.
//!
//! Streams crossing the provider boundary carry a short UTF-8 tag instead
//! of real container bytes; the fakes route on that tag. Hive tags select
//! reader behavior: `goodN` yields a fully populated installation branch,
//! `flaky` a reader that fails every field, `corrupt` a hive that refuses
//! to open, `nobranch` a hive without the installation branch.

use prodkey::source::{
    CURRENT_VERSION_BRANCH, SOFTWARE_HIVE_PATH, SOFTWARE_HIVE_PATH_LEGACY,
};
use prodkey::{
    ByteStream, DeploymentImage, FieldValue, MediaProvider, RegistryRoot, Result, ScanError,
    ValueReader, VirtualDisk, Volume,
};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// Reads the routing tag out of a boundary stream.
fn read_tag(mut stream: ByteStream) -> String {
    let mut tag = String::new();
    stream
        .read_to_string(&mut tag)
        .expect("fake streams carry UTF-8 tags");
    tag
}

/// A volume holding tagged files by in-volume path.
pub struct FakeVolume {
    files: Vec<(String, String)>,
}

impl FakeVolume {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, tag)| (path.to_string(), tag.to_string()))
                .collect(),
        }
    }

    /// Volume holding the SOFTWARE hive with the given tag.
    fn with_hive(tag: &str, legacy: bool) -> Self {
        let path = if legacy {
            SOFTWARE_HIVE_PATH_LEGACY
        } else {
            SOFTWARE_HIVE_PATH
        };
        Self::new(&[(path, tag)])
    }
}

impl Volume for FakeVolume {
    fn open_file(&mut self, path: &str) -> Result<Option<ByteStream>> {
        Ok(self
            .files
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, tag)| Box::new(Cursor::new(tag.clone().into_bytes())) as ByteStream))
    }
}

/// A deployment image whose indices may or may not contain a hive.
pub struct FakeWim {
    image_hives: Vec<Option<String>>,
}

impl DeploymentImage for FakeWim {
    fn image_count(&self) -> usize {
        self.image_hives.len()
    }

    fn open_image(&mut self, index: usize) -> Result<Box<dyn Volume>> {
        Ok(match &self.image_hives[index] {
            Some(tag) => Box::new(FakeVolume::with_hive(tag, false)),
            None => Box::new(FakeVolume::new(&[])),
        })
    }
}

/// What one disk partition (or the whole device) looks like.
#[derive(Clone)]
pub enum Partition {
    /// No filesystem can be detected.
    NoFilesystem,
    /// Filesystem detection itself fails.
    Unreadable,
    /// Mountable volume carrying the SOFTWARE hive.
    WithHive {
        tag: String,
        legacy: bool,
    },
    /// Mountable volume without a hive.
    Bare,
}

impl Partition {
    pub fn with_hive(tag: &str) -> Self {
        Partition::WithHive {
            tag: tag.to_string(),
            legacy: false,
        }
    }

    pub fn with_legacy_hive(tag: &str) -> Self {
        Partition::WithHive {
            tag: tag.to_string(),
            legacy: true,
        }
    }

    fn open(&self) -> Result<Option<Box<dyn Volume>>> {
        match self {
            Partition::NoFilesystem => Ok(None),
            Partition::Unreadable => Err(ScanError::source_open("filesystem detection failed")),
            Partition::WithHive { tag, legacy } => {
                Ok(Some(Box::new(FakeVolume::with_hive(tag, *legacy))))
            }
            Partition::Bare => Ok(Some(Box::new(FakeVolume::new(&[])))),
        }
    }
}

/// A disk image with an optional partition table.
pub struct FakeDisk {
    partitions: Vec<Partition>,
    device: Option<Partition>,
}

impl VirtualDisk for FakeDisk {
    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn open_partition(&mut self, index: usize) -> Result<Option<Box<dyn Volume>>> {
        self.partitions[index].open()
    }

    fn open_device(&mut self) -> Result<Option<Box<dyn Volume>>> {
        match &self.device {
            Some(partition) => partition.open(),
            None => Ok(None),
        }
    }
}

/// Hive whose branch lookup is driven by its tag.
struct FakeHive {
    tag: String,
}

impl RegistryRoot for FakeHive {
    fn open_branch(&self, path: &str) -> Result<Option<Box<dyn ValueReader>>> {
        if path != CURRENT_VERSION_BRANCH || self.tag == "nobranch" {
            return Ok(None);
        }
        Ok(Some(reader_for(&self.tag)))
    }
}

/// Reader over a fixed field map.
pub struct MapReader(HashMap<&'static str, FieldValue>);

impl ValueReader for MapReader {
    fn value(&self, name: &str) -> Result<Option<FieldValue>> {
        Ok(self.0.get(name).cloned())
    }
}

/// Reader that fails every field, like a hive corrupt past its header.
pub struct FlakyReader;

impl ValueReader for FlakyReader {
    fn value(&self, name: &str) -> Result<Option<FieldValue>> {
        Err(ScanError::field_read(name, "hive cell corrupt"))
    }
}

/// `DigitalProductId` blob whose key window holds the value 1; it decodes
/// to `BBBBB-BBBBB-BBBBB-BBBBB-BBBBC`.
pub const DECODED_TEST_KEY: &str = "BBBBB-BBBBB-BBBBB-BBBBB-BBBBC";

fn product_id_blob() -> FieldValue {
    let mut blob = vec![0u8; 67];
    blob[52] = 1;
    FieldValue::Bytes(blob)
}

/// Builds the reader for a hive tag.
pub fn reader_for(tag: &str) -> Box<dyn ValueReader> {
    if tag == "flaky" {
        return Box::new(FlakyReader);
    }

    let mut map = HashMap::new();
    map.insert("ProductName", FieldValue::Text(format!("Windows ({})", tag)));
    map.insert(
        "ProductId",
        FieldValue::Text("00000-00000-00000-AAAAA".into()),
    );
    map.insert("EditionID", FieldValue::Text("Professional".into()));
    map.insert("InstallationType", FieldValue::Text("Client".into()));
    map.insert("CurrentMajorVersionNumber", FieldValue::Dword(10));
    map.insert("CurrentMinorVersionNumber", FieldValue::Dword(0));
    map.insert("CurrentBuildNumber", FieldValue::Text("19045".into()));
    map.insert("DisplayVersion", FieldValue::Text("22H2".into()));
    map.insert("CurrentType", FieldValue::Text("Multiprocessor Free".into()));
    map.insert("DigitalProductId", product_id_blob());
    map.insert("InstallDate", FieldValue::Dword(0));
    map.insert("RegisteredOwner", FieldValue::Text("Owner".into()));
    Box::new(MapReader(map))
}

/// Configurable fake provider.
///
/// Streams are routed by tag; locator-level classification still runs
/// against real files created by each test.
#[derive(Default)]
pub struct FakeProvider {
    /// Files present on any opened optical medium.
    pub optical_files: Vec<(String, String)>,
    /// Deployment image catalogs by stream tag.
    pub wim_images: HashMap<String, Vec<Option<String>>>,
    /// Layout served for any opened disk image.
    pub disk_partitions: Vec<Partition>,
    /// Whole-device layout when there is no partition table.
    pub whole_device: Option<Partition>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optical(mut self, files: &[(&str, &str)]) -> Self {
        self.optical_files = files
            .iter()
            .map(|(path, tag)| (path.to_string(), tag.to_string()))
            .collect();
        self
    }

    pub fn with_wim(mut self, tag: &str, image_hives: &[Option<&str>]) -> Self {
        self.wim_images.insert(
            tag.to_string(),
            image_hives
                .iter()
                .map(|hive| hive.map(str::to_string))
                .collect(),
        );
        self
    }

    pub fn with_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.disk_partitions = partitions;
        self
    }

    pub fn with_whole_device(mut self, device: Partition) -> Self {
        self.whole_device = Some(device);
        self
    }
}

impl MediaProvider for FakeProvider {
    fn open_local_machine(&self) -> Result<Box<dyn ValueReader>> {
        Err(ScanError::platform_unsupported(
            "querying the current machine",
        ))
    }

    fn open_remote_machine(&self, _machine: &str) -> Result<Box<dyn ValueReader>> {
        Ok(reader_for("remote"))
    }

    fn open_hive(&self, stream: ByteStream) -> Result<Box<dyn RegistryRoot>> {
        let tag = read_tag(stream);
        if tag == "corrupt" {
            return Err(ScanError::source_open("invalid hive signature"));
        }
        Ok(Box::new(FakeHive { tag }))
    }

    fn open_optical(&self, _stream: ByteStream) -> Result<Box<dyn Volume>> {
        let files: Vec<(&str, &str)> = self
            .optical_files
            .iter()
            .map(|(path, tag)| (path.as_str(), tag.as_str()))
            .collect();
        Ok(Box::new(FakeVolume::new(&files)))
    }

    fn open_deployment_image(&self, stream: ByteStream) -> Result<Box<dyn DeploymentImage>> {
        let tag = read_tag(stream);
        let image_hives = self
            .wim_images
            .get(&tag)
            .ok_or_else(|| ScanError::source_open("unrecognized deployment image"))?
            .clone();
        Ok(Box::new(FakeWim { image_hives }))
    }

    fn open_virtual_disk(&self, _path: &Path) -> Result<Box<dyn VirtualDisk>> {
        Ok(Box::new(FakeDisk {
            partitions: self.disk_partitions.clone(),
            device: self.whole_device.clone(),
        }))
    }
}
