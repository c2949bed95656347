//! # Windows Installation Metadata Extractor
//!
//! Extracts Windows installation information (product name, edition,
//! version, install timestamp, registered owner, and the embedded
//! installation key) from an arbitrary mix of sources in one run.
//!
//! ## Features
//!
//! - **Heterogeneous sources**: live machine, remote machine locators,
//!   offline installation volumes, setup ISO images, deployment (WIM)
//!   images, and virtual or raw disk images
//! - **Concurrent by default**: one task per locator, then one task per
//!   opened source; a failing source never blocks or suppresses the others
//! - **Bit-exact key decoding**: the 120-bit base-24 decode of the
//!   `DigitalProductId` blob, including unset-key sentinel handling
//! - **Pluggable media boundary**: container formats, filesystem drivers
//!   and the hive binary format stay behind one trait
//!
//! ## Architecture
//!
//! The pipeline runs in three strictly ordered stages:
//!
//! 1. **Enumeration**: every locator is classified (machine name,
//!    directory, `.iso`, `.wim`, other file) and opened in parallel into
//!    labeled sources; failures become labeled error lines
//! 2. **Report building**: each source's fixed field set is read, the
//!    version string, install time and product key are derived, and one
//!    text block per source is emitted atomically
//! 3. **Release**: all backing resources are dropped, in parallel
//!
//! ## Output
//!
//! ```text
//! \\MACHINE
//! Product name:            Windows 10 Pro
//! Product Id:              00330-80000-00000-AA218
//! Edition:                 Professional
//! Installation type:       Client
//! Version:                 10.0.19045 22H2
//! Type:                    Multiprocessor Free
//! Product key:             VK7JG-NPHTM-C97JM-9MPGT-3V66T
//! Install time (UTC):      2021-05-08 10:12:34
//! Registered owner:        User
//! Registered organization:
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use prodkey::{run_scan, LocalProvider, WriterSink};
//!
//! let provider = LocalProvider::new();
//! let output = WriterSink::new(std::io::stdout());
//! let errors = WriterSink::new(std::io::stderr());
//!
//! let locators = vec![String::from(r"D:\images\windows_setup.iso")];
//! let summary = run_scan(&provider, &locators, &output, &errors);
//! println!("{} records, {} failures", summary.records, summary.failures);
//! ```
//!
//! Decoding a key blob directly:
//!
//! ```rust
//! use prodkey::decode_product_key;
//!
//! // Blobs shorter than the key window decode to nothing.
//! assert_eq!(decode_product_key(&[0u8; 66]), None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod enumerate;
pub mod error;
pub mod fields;
pub mod media;
pub mod pipeline;
pub mod product_key;
pub mod report;
pub mod sink;
pub mod source;
pub mod value;

// Re-export main types for convenience
pub use enumerate::enumerate_sources;
pub use error::{Result, ScanError};
pub use fields::{filetime_to_datetime, install_time, version_string};
pub use media::{
    ByteStream, DeploymentImage, LocalProvider, MediaProvider, ReadSeek, RegistryRoot,
    VirtualDisk, Volume,
};
pub use pipeline::{run_scan, ScanSummary};
pub use product_key::{decode_product_key, product_key, KEY_ALPHABET};
pub use report::{build_record, report_sources, FieldRecord};
pub use sink::{MemorySink, Sink, WriterSink};
pub use source::{is_remote_locator, open_locator};
pub use value::{
    new_resource_guard, FieldValue, GuardedReader, OpenedSource, ResourceGuard, ValueReader,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
