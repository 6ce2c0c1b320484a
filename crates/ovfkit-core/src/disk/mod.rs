//! Disk discovery and reconciliation.
//!
//! The disks of an appliance are described in three places: `File` elements
//! (what is shipped), `Disk` elements (virtual capacity, keyed by `fileRef`)
//! and hardware `Item`s (which controller a disk hangs off). This module
//! joins them into one ordered list of [`DiskDescriptor`]s.

pub mod controller;
pub mod extract;
pub mod reconcile;

use std::path::Path;

pub use controller::{ControllerInfo, HardwareGraph};
pub use extract::{extract_disk_entries, extract_files, DiskEntry, FileEntry};
pub use reconcile::{move_leading_iso_to_end, reconcile, DiskDescriptor};

use crate::error::Result;
use crate::storage::Storage;
use crate::xml::Document;

/// Extract the reconciled disk list of a document whose files live in `ovf_dir`.
///
/// Descriptors follow `File` order, except that a leading ISO is moved to
/// the end.
///
/// # Errors
///
/// See [`reconcile`]; no partial list is returned.
pub fn extract_disks<S: Storage>(storage: &S, ovf_dir: &Path, doc: &Document) -> Result<Vec<DiskDescriptor>> {
    let files = extract_files(storage, ovf_dir, doc);
    let disks = extract_disk_entries(doc);

    let mut descriptors = reconcile(storage, ovf_dir, &files, &disks)?;
    move_leading_iso_to_end(&mut descriptors);
    Ok(descriptors)
}
