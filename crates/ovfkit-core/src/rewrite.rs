//! Reducing a descriptor to a single disk.
//!
//! Multi-disk appliances are sometimes imported one disk at a time. For that
//! the descriptor is rewritten so that only one `File`, its `Disk` and the
//! hardware items that do not reference another disk remain.

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::xml::{Document, NodeId};

/// Remove every `File`, `Disk` and disk-backed `Item` not belonging to the
/// file at `disk_href`. Returns the number of elements removed.
///
/// An item is kept only if each of its `HostResource` children mentions
/// `ovf:/file/<disk>` or `ovf:/disk/<disk>` for the kept disk id. When the
/// kept file has no `Disk` (an ISO, say), every item with a `HostResource`
/// is removed.
///
/// # Errors
///
/// Returns [`Error::Ovf`] if no `File` has the href `disk_href`; the
/// document is left untouched in that case.
pub fn retain_single_disk(doc: &mut Document, disk_href: &str) -> Result<usize> {
    let mut to_remove: Vec<NodeId> = Vec::new();

    let mut keep_file = None;
    for file in doc.elements_by_name("File") {
        if file.attr("href") == Some(disk_href) {
            keep_file = Some(file.attr("id").unwrap_or_default().to_string());
        } else {
            to_remove.push(file.id());
        }
    }
    let Some(keep_file) = keep_file else {
        error!(href = disk_href, "no file in the OVF references the disk to keep");
        return Err(Error::ovf(format!(
            "OVA format error: no file with href '{}' in the OVF",
            disk_href
        )));
    };

    let mut keep_disk = None;
    for disk in doc.elements_by_name("Disk") {
        if disk.attr("fileRef") == Some(keep_file.as_str()) {
            keep_disk = Some(disk.attr("diskId").unwrap_or_default().to_string());
        } else {
            to_remove.push(disk.id());
        }
    }
    if keep_disk.is_none() {
        debug!(file_id = %keep_file, "kept file has no disk, dropping all disk-backed items");
    }

    for item in doc.elements_by_name("Item") {
        let references_other = item.children_named("HostResource").into_iter().any(|resource| {
            let target = resource.text();
            !keep_disk.as_deref().is_some_and(|disk| {
                target.contains(&format!("ovf:/file/{}", disk))
                    || target.contains(&format!("ovf:/disk/{}", disk))
            })
        });
        if references_other {
            to_remove.push(item.id());
        }
    }

    let removed = to_remove.len();
    for id in to_remove {
        doc.detach(id);
    }
    debug!(href = disk_href, removed, "reduced descriptor to a single disk");
    Ok(removed)
}
