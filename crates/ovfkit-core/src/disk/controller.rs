//! Storage controller resolution.
//!
//! OVF expresses device hierarchy through `rasd:Parent` references to another
//! item's `rasd:InstanceID` rather than through XML nesting. A disk drive item
//! points at its disk with `rasd:HostResource` (`ovf:/disk/<id>` or
//! `ovf:/file/<id>`); the controller is the root ancestor of that item.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::xml::{Document, Node};

/// Storage controller owning a disk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerInfo {
    /// Controller element name (e.g. "SCSI controller 0").
    pub name: String,
    /// Controller subtype (e.g. "lsilogic"); empty when not declared.
    pub sub_type: String,
}

impl ControllerInfo {
    fn from_item(item: Node<'_>) -> Self {
        Self {
            name: item.child_text("ElementName").unwrap_or_default(),
            sub_type: item.child_text("ResourceSubType").unwrap_or_default(),
        }
    }
}

/// Hardware items indexed by instance id.
#[derive(Debug)]
pub struct HardwareGraph<'a> {
    items: Vec<Node<'a>>,
    by_instance_id: HashMap<String, usize>,
}

impl<'a> HardwareGraph<'a> {
    /// Build the graph from every `Item` element in the document.
    pub fn new(doc: &'a Document) -> Self {
        Self::from_items(doc.elements_by_name("Item"))
    }

    /// Build the graph from an explicit item list.
    ///
    /// When several items share an instance id, the first one in document
    /// order is the one parent references resolve to.
    pub fn from_items(items: Vec<Node<'a>>) -> Self {
        let mut by_instance_id = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(id) = item.child_text("InstanceID") {
                by_instance_id.entry(id.trim().to_string()).or_insert(index);
            }
        }
        Self {
            items,
            by_instance_id,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.items.len()
    }

    /// Find the controller of the disk identified by `disk_id`.
    ///
    /// The first item (in document order) whose `HostResource` references the
    /// disk is walked up through its parents; the last item reached is the
    /// controller. Returns `None` when no item references the disk, when the
    /// referencing item has no parent, or when the parent chain loops.
    pub fn resolve_controller(&self, disk_id: &str) -> Option<ControllerInfo> {
        let start = self.find_host_item(disk_id)?;

        let mut visited = HashSet::from([start]);
        let mut current = start;
        let mut controller = None;
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent) {
                warn!(disk_id, "parent references of hardware items form a cycle; no controller resolved");
                return None;
            }
            controller = Some(parent);
            current = parent;
        }

        match controller {
            Some(index) => Some(ControllerInfo::from_item(self.items[index])),
            None => {
                warn!(disk_id, "disk item has no parent controller item");
                None
            }
        }
    }

    fn find_host_item(&self, disk_id: &str) -> Option<usize> {
        let file_ref = format!("ovf:/file/{}", disk_id);
        let disk_ref = format!("ovf:/disk/{}", disk_id);

        self.items.iter().position(|item| {
            item.children_named("HostResource").iter().any(|resource| {
                let text = resource.text();
                text.contains(&file_ref) || text.contains(&disk_ref)
            })
        })
    }

    fn parent_of(&self, index: usize) -> Option<usize> {
        let parent_id = self.items[index].child_text("Parent")?;
        self.by_instance_id.get(parent_id.trim()).copied()
    }
}
