//! Joining file records to disk records.

use std::path::{Path, PathBuf};

use tracing::{debug, error, trace};

use super::extract::{DiskEntry, FileEntry};
use crate::error::{Error, Result};
use crate::storage::Storage;

/// A reconciled disk or ISO of the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDescriptor {
    /// Absolute (or OVF-directory-relative) path of the image file.
    pub path: PathBuf,
    /// Virtual capacity in bytes; the file size for ISOs.
    pub virtual_size: u64,
    /// Size of the image file in bytes.
    pub file_size: u64,
    /// `ovf:id` of the source `File` element.
    pub file_id: String,
    /// Whether the image is an ISO.
    pub is_iso: bool,
    /// Whether this is the disk to boot from.
    pub is_bootable: bool,
    /// Controller element name, empty when unknown.
    pub controller: String,
    /// Controller subtype, empty when unknown.
    pub controller_sub_type: String,
    /// Position of the file in the descriptor, counted from 0.
    pub disk_number: usize,
}

/// Build one descriptor per file, in file order.
///
/// # Errors
///
/// Fails without returning a partial list when a file has no id, when a
/// non-ISO file has no matching `Disk`, or when the image is not a regular
/// file under `ovf_dir`.
pub fn reconcile<S: Storage>(
    storage: &S,
    ovf_dir: &Path,
    files: &[FileEntry],
    disks: &[DiskEntry],
) -> Result<Vec<DiskDescriptor>> {
    let mut descriptors = Vec::with_capacity(files.len());

    for (disk_number, file) in files.iter().enumerate() {
        if file.id.trim().is_empty() {
            error!(href = %file.href, "the ovf file info has incomplete file info");
            return Err(Error::ovf(format!(
                "the ovf file info has incomplete file info: no id on file '{}'",
                file.href
            )));
        }

        let disk = disks.iter().find(|disk| disk.file_ref == file.id);
        if disk.is_none() && !file.is_iso {
            error!(file_id = %file.id, "the ovf file info has incomplete disk info");
            return Err(Error::ovf(format!(
                "the ovf file info has incomplete disk info: no disk references file '{}'",
                file.id
            )));
        }

        let virtual_size = disk.map_or(file.size, |disk| disk.capacity);
        let (controller, controller_sub_type) = disk
            .and_then(|disk| disk.controller.as_ref())
            .map(|c| (c.name.clone(), c.sub_type.clone()))
            .unwrap_or_default();

        let path = ovf_dir.join(&file.href);
        if !storage.is_file(&path) {
            error!(path = %path.display(), "attached disk or iso does not exist");
            return Err(Error::ovf(format!(
                "one of the attached disk or iso does not exist: {}",
                path.display()
            )));
        }

        descriptors.push(DiskDescriptor {
            path,
            virtual_size,
            file_size: file.size,
            file_id: file.id.clone(),
            is_iso: file.is_iso,
            is_bootable: file.is_bootable,
            controller,
            controller_sub_type,
            disk_number,
        });
    }

    trace!(
        "reconciled {} file definitions in {}",
        descriptors.len(),
        ovf_dir.display()
    );
    Ok(descriptors)
}

/// Move a leading ISO to the end of the list.
///
/// Only the first entry is considered: lists with several ISOs, or with
/// nothing but ISOs, are not reordered any further.
pub fn move_leading_iso_to_end(disks: &mut Vec<DiskDescriptor>) {
    if disks.first().is_some_and(|disk| disk.is_iso) {
        debug!("moving first disk to the end as it is an ISO");
        let iso = disks.remove(0);
        disks.push(iso);
    }
}
