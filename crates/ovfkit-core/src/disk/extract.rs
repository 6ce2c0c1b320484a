//! `File` and `Disk` element scanning.

use std::path::Path;

use tracing::{debug, trace};

use super::controller::{ControllerInfo, HardwareGraph};
use crate::storage::Storage;
use crate::units::capacity_to_bytes;
use crate::xml::Document;

/// One `<File>` element referencing a disk image or ISO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the OVF directory.
    pub href: String,
    /// `ovf:id`, the key `Disk` elements reference through `fileRef`.
    pub id: String,
    /// Size in bytes, declared or taken from the file on disk.
    pub size: u64,
    /// Whether the file is an ISO image.
    pub is_iso: bool,
    /// Set on the first non-ISO file in document order.
    pub is_bootable: bool,
}

/// One `<Disk>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    /// `ovf:diskId`.
    pub disk_id: String,
    /// `ovf:fileRef`, joins to [`FileEntry::id`].
    pub file_ref: String,
    /// Virtual capacity in bytes.
    pub capacity: u64,
    /// `ovf:populatedSize`, 0 when absent.
    pub populated_size: u64,
    /// Controller the disk hangs off, if it could be resolved.
    pub controller: Option<ControllerInfo>,
}

/// Scan every `File` element whose href names a `.vmdk` or `.iso`.
///
/// Files without a usable `size` attribute are measured on disk relative to
/// `ovf_dir`; a file that cannot be measured gets size 0 and is reported
/// later by the reconciler if it is really missing.
pub fn extract_files<S: Storage>(storage: &S, ovf_dir: &Path, doc: &Document) -> Vec<FileEntry> {
    let mut files = Vec::new();
    let mut bootable_assigned = false;

    for element in doc.elements_by_name("File") {
        let href = element.attr("href").unwrap_or_default();
        let is_iso = href.ends_with(".iso");
        if !is_iso && !href.ends_with(".vmdk") {
            continue;
        }

        let size = match element.attr("size").and_then(|s| s.trim().parse::<u64>().ok()) {
            Some(size) => size,
            None => {
                let path = ovf_dir.join(href);
                storage.file_len(&path).unwrap_or_else(|e| {
                    debug!(path = %path.display(), error = %e, "could not determine file size");
                    0
                })
            }
        };

        let is_bootable = !is_iso && !bootable_assigned;
        bootable_assigned |= is_bootable;

        files.push(FileEntry {
            href: href.to_string(),
            id: element.attr("id").unwrap_or_default().to_string(),
            size,
            is_iso,
            is_bootable,
        });
    }

    trace!("found {} file definitions in {}", files.len(), ovf_dir.display());
    files
}

/// Scan every `Disk` element and resolve its controller.
///
/// Unparsable numbers default to 0 and capacities without a unit are kept
/// as-is.
pub fn extract_disk_entries(doc: &Document) -> Vec<DiskEntry> {
    let graph = HardwareGraph::new(doc);
    let parse = |value: Option<&str>| {
        value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0)
    };

    let disks: Vec<DiskEntry> = doc
        .elements_by_name("Disk")
        .into_iter()
        .map(|disk| {
            let disk_id = disk.attr("diskId").unwrap_or_default().to_string();
            let capacity = capacity_to_bytes(
                parse(disk.attr("capacity")),
                disk.attr("capacityAllocationUnits"),
            );
            DiskEntry {
                controller: graph.resolve_controller(&disk_id),
                file_ref: disk.attr("fileRef").unwrap_or_default().to_string(),
                capacity,
                populated_size: parse(disk.attr("populatedSize")),
                disk_id,
            }
        })
        .collect();

    trace!("found {} disk definitions", disks.len());
    disks
}
