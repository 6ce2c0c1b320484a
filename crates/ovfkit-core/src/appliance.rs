//! Appliance-level operations.
//!
//! [`OvfReader`] bundles the filesystem and compression collaborators and
//! exposes the operations that need them. [`OvfReader::inspect`] runs every
//! extractor over one descriptor and assembles the results into an
//! [`ApplianceInfo`].
//!
//! # Example
//!
//! ```no_run
//! use ovfkit_core::appliance::{InspectOptions, OvfReader};
//! use std::path::Path;
//!
//! let reader = OvfReader::new();
//! let info = reader
//!     .inspect(Path::new("/var/tmp/appliance"), &InspectOptions::default())
//!     .unwrap();
//! println!("{} disks, {} bytes", info.disks.len(), info.virtual_size);
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, trace};

use crate::compress::{CompressionLevel, Compressor, GzipCompressor};
use crate::disk::{self, DiskDescriptor};
use crate::error::{Error, Result};
use crate::eula::{self, EulaSection};
use crate::hardware::{extract_virtual_hardware, VirtualHardware};
use crate::network::{extract_network_prerequisites, NetworkPrerequisite};
use crate::property::{extract_configurable_properties, extract_properties, OvfProperty};
use crate::rewrite::retain_single_disk;
use crate::storage::{LocalStorage, Storage};
use crate::units::disk_capacity_bytes;
use crate::xml::{Document, Node};

/// Options for [`OvfReader::inspect`].
#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Compression level for stored EULA payloads.
    pub compression: CompressionLevel,
    /// Only report properties a user may set at deploy time.
    pub configurable_only: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            compression: CompressionLevel::Balanced,
            configurable_only: true,
        }
    }
}

impl InspectOptions {
    /// Create inspect options with specified settings.
    pub fn new(compression: CompressionLevel, configurable_only: bool) -> Self {
        Self {
            compression,
            configurable_only,
        }
    }

    /// Report every keyed property, not only the configurable ones.
    pub fn all_properties() -> Self {
        Self {
            configurable_only: false,
            ..Self::default()
        }
    }
}

/// Everything extracted from one appliance descriptor.
#[derive(Debug, Clone)]
pub struct ApplianceInfo {
    /// The descriptor that was read.
    pub ovf_path: PathBuf,
    /// Reconciled disks in `File` order, with a leading ISO moved to the end.
    pub disks: Vec<DiskDescriptor>,
    pub networks: Vec<NetworkPrerequisite>,
    pub properties: Vec<OvfProperty>,
    pub hardware: VirtualHardware,
    pub eulas: Vec<EulaSection>,
    /// Sum of the virtual capacities of all disks, in bytes.
    pub virtual_size: u64,
}

impl ApplianceInfo {
    /// The disk the appliance boots from, if any.
    pub fn bootable_disk(&self) -> Option<&DiskDescriptor> {
        self.disks.iter().find(|disk| disk.is_bootable)
    }

    /// Total size of all image files, in bytes.
    pub fn total_file_size(&self) -> u64 {
        self.disks.iter().map(|disk| disk.file_size).sum()
    }
}

/// Reads and rewrites OVF descriptors through explicit collaborators.
#[derive(Debug, Clone, Default)]
pub struct OvfReader<S = LocalStorage, C = GzipCompressor> {
    storage: S,
    compressor: C,
}

impl OvfReader {
    /// Reader over the local filesystem with default gzip compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader over the local filesystem using the compression level of `options`.
    pub fn from_options(options: &InspectOptions) -> Self {
        Self::with_collaborators(LocalStorage, GzipCompressor::new(options.compression))
    }
}

impl<S: Storage, C: Compressor> OvfReader<S, C> {
    /// Reader using the given storage and compressor.
    pub fn with_collaborators(storage: S, compressor: C) -> Self {
        Self { storage, compressor }
    }

    /// The storage collaborator.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The compression collaborator.
    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    /// Load and parse the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Xml`] if
    /// it is not UTF-8 or not well-formed.
    pub fn parse_file(&self, path: &Path) -> Result<Document> {
        let bytes = self.storage.read(path).map_err(|e| Error::io(e, path))?;
        let xml = String::from_utf8(bytes)
            .map_err(|e| Error::xml(format!("{}: {}", path.display(), e)))?;
        Document::parse_str(&xml)
    }

    /// Find the `.ovf` descriptor in an extracted appliance directory.
    ///
    /// Entries are considered in name order and the extension is matched
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be listed and
    /// [`Error::Ovf`] if it holds no descriptor.
    pub fn find_ovf_file(&self, dir: &Path) -> Result<PathBuf> {
        let mut entries = self.storage.list_dir(dir).map_err(|e| Error::io(e, dir))?;
        entries.sort();

        entries
            .into_iter()
            .find(|entry| {
                entry
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.to_lowercase().ends_with(".ovf"))
            })
            .ok_or_else(|| {
                let msg = format!(
                    "unable to locate OVF file in template package directory: {}",
                    dir.display()
                );
                error!("{}", msg);
                Error::ovf(msg)
            })
    }

    /// Resolve `path` to a descriptor: a file is used as-is, anything else
    /// is searched as an appliance directory.
    pub fn resolve_ovf_path(&self, path: &Path) -> Result<PathBuf> {
        if self.storage.is_file(path) {
            Ok(path.to_path_buf())
        } else {
            self.find_ovf_file(path)
        }
    }

    /// Reconciled disks of `doc`, whose images live in `ovf_dir`.
    pub fn extract_disks(&self, ovf_dir: &Path, doc: &Document) -> Result<Vec<DiskDescriptor>> {
        disk::extract_disks(&self.storage, ovf_dir, doc)
    }

    /// EULA sections of `doc`, licenses compressed with this reader's compressor.
    pub fn extract_eula_sections(&self, doc: &Document) -> Vec<EulaSection> {
        eula::extract_eula_sections(doc, &self.compressor)
    }

    /// Write a copy of the descriptor at `source` (a descriptor or an
    /// extracted appliance directory) to `dest`, keeping only the disk whose
    /// file href is `disk_href`.
    ///
    /// # Errors
    ///
    /// Fails before writing anything if `disk_href` names no `File`. A failed
    /// write is returned as [`Error::Io`] for `dest` and may leave a partial
    /// file behind.
    pub fn rewrite_for_single_disk(&self, source: &Path, dest: &Path, disk_href: &str) -> Result<()> {
        let source = self.resolve_ovf_path(source)?;
        let mut doc = self.parse_file(&source)?;
        retain_single_disk(&mut doc, disk_href)?;

        let xml = doc.to_xml()?;
        self.storage
            .write(dest, xml.as_bytes())
            .map_err(|e| Error::io(e, dest))?;
        debug!(source = %source.display(), dest = %dest.display(), "wrote single-disk descriptor");
        Ok(())
    }

    /// Run every extractor over the appliance at `path` (a descriptor or an
    /// extracted appliance directory).
    ///
    /// # Errors
    ///
    /// Any validation failure aborts the whole inspection.
    pub fn inspect(&self, path: &Path, options: &InspectOptions) -> Result<ApplianceInfo> {
        let ovf_path = self.resolve_ovf_path(path)?;
        let ovf_dir = ovf_path.parent().unwrap_or_else(|| Path::new("."));
        let doc = self.parse_file(&ovf_path)?;

        let disks = self.extract_disks(ovf_dir, &doc)?;
        trace!("found {} disks in template {}", disks.len(), ovf_path.display());

        let networks = extract_network_prerequisites(&doc)?;
        if !networks.is_empty() {
            info!("found {} prerequisite networks", networks.len());
        }

        let properties = if options.configurable_only {
            extract_configurable_properties(&doc)
        } else {
            extract_properties(&doc)
        };
        if !properties.is_empty() {
            info!("found {} OVF properties", properties.len());
        }

        let hardware = extract_virtual_hardware(&doc);
        if !hardware.configurations.is_empty() {
            info!(
                "found {} deployment option configurations",
                hardware.configurations.len()
            );
        }

        let eulas = self.extract_eula_sections(&doc);
        let virtual_size = template_virtual_size(&doc, &ovf_path)?;

        Ok(ApplianceInfo {
            ovf_path,
            disks,
            networks,
            properties,
            hardware,
            eulas,
            virtual_size,
        })
    }
}

/// Sum of the virtual capacities of every `Disk`, in bytes.
///
/// Unlike disk extraction this is strict: a missing or unparsable capacity
/// fails. A disk without allocation units counts its capacity as bytes.
///
/// # Errors
///
/// Returns [`Error::Ovf`] naming `ovf_path` for any unusable capacity.
pub fn template_virtual_size(doc: &Document, ovf_path: &Path) -> Result<u64> {
    doc.elements_by_name("Disk")
        .into_iter()
        .try_fold(0u64, |total, disk| -> Result<u64> {
            Ok(total.saturating_add(strict_capacity(disk, ovf_path)?))
        })
}

/// `(virtual_size, file_size)` of the disk whose file href is `disk_href`.
///
/// An href matching no `File` yields `(0, 0)`; a file without a `Disk`
/// yields a virtual size of 0.
///
/// # Errors
///
/// Returns [`Error::Ovf`] when the matched file has no usable `size` or the
/// matched disk has no usable capacity.
pub fn disk_details(doc: &Document, ovf_path: &Path, disk_href: &str) -> Result<(u64, u64)> {
    let Some(file) = doc
        .elements_by_name("File")
        .into_iter()
        .find(|file| file.attr("href") == Some(disk_href))
    else {
        debug!(href = disk_href, "no file definition for disk");
        return Ok((0, 0));
    };

    let file_size = parse_required(file.attr("size"), "size", ovf_path)?;
    let file_id = file.attr("id").unwrap_or_default();

    let virtual_size = match doc
        .elements_by_name("Disk")
        .into_iter()
        .find(|disk| disk.attr("fileRef") == Some(file_id))
    {
        Some(disk) => strict_capacity(disk, ovf_path)?,
        None => 0,
    };

    Ok((virtual_size, file_size))
}

fn strict_capacity(disk: Node<'_>, ovf_path: &Path) -> Result<u64> {
    let capacity = parse_required(disk.attr("capacity"), "capacity", ovf_path)?;
    let unit = disk.attr("capacityAllocationUnits").unwrap_or_default();
    disk_capacity_bytes(capacity, Some(unit), ovf_path)
}

fn parse_required(value: Option<&str>, field: &str, ovf_path: &Path) -> Result<u64> {
    value
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| {
            let msg = format!(
                "unable to parse {} '{}' in OVF document {}",
                field,
                value.unwrap_or_default(),
                ovf_path.display()
            );
            error!("{}", msg);
            Error::ovf(msg)
        })
}
