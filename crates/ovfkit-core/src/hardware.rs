//! Virtual hardware and deployment options.
//!
//! A `DeploymentOptionSection` lists named sizing presets; each `Item` of the
//! `VirtualHardwareSection` may carry an `ovf:configuration` attribute naming
//! the presets it belongs to. Items without one apply to every preset.

use std::fmt;

use tracing::debug;

use crate::xml::{Document, Node};

/// CIM resource type of a hardware item (`rasd:ResourceType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Other,
    ComputerSystem,
    Processor,
    Memory,
    IdeController,
    ParallelScsiHba,
    FcHba,
    IscsiHba,
    IbHca,
    EthernetAdapter,
    OtherNetworkAdapter,
    IoSlot,
    IoDevice,
    FloppyDrive,
    CdDrive,
    DvdDrive,
    DiskDrive,
    TapeDrive,
    StorageExtent,
    OtherStorageDevice,
    SerialPort,
    ParallelPort,
    UsbController,
    GraphicsController,
    Ieee1394Controller,
    PartitionableUnit,
    BasePartitionableUnit,
    Power,
    CoolingCapacity,
    EthernetSwitchPort,
    LogicalDisk,
    StorageVolume,
    EthernetConnection,
    /// A code outside the known range, kept as written.
    Unknown(u32),
}

impl ResourceType {
    /// Map a CIM resource type code to its category.
    pub fn from_code(code: u32) -> Self {
        use ResourceType::*;
        match code {
            1 => Other,
            2 => ComputerSystem,
            3 => Processor,
            4 => Memory,
            5 => IdeController,
            6 => ParallelScsiHba,
            7 => FcHba,
            8 => IscsiHba,
            9 => IbHca,
            10 => EthernetAdapter,
            11 => OtherNetworkAdapter,
            12 => IoSlot,
            13 => IoDevice,
            14 => FloppyDrive,
            15 => CdDrive,
            16 => DvdDrive,
            17 => DiskDrive,
            18 => TapeDrive,
            19 => StorageExtent,
            20 => OtherStorageDevice,
            21 => SerialPort,
            22 => ParallelPort,
            23 => UsbController,
            24 => GraphicsController,
            25 => Ieee1394Controller,
            26 => PartitionableUnit,
            27 => BasePartitionableUnit,
            28 => Power,
            29 => CoolingCapacity,
            30 => EthernetSwitchPort,
            31 => LogicalDisk,
            32 => StorageVolume,
            33 => EthernetConnection,
            other => Unknown(other),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Processor => write!(f, "CPU"),
            ResourceType::Memory => write!(f, "Memory"),
            ResourceType::IdeController => write!(f, "IDE Controller"),
            ResourceType::ParallelScsiHba => write!(f, "SCSI Controller"),
            ResourceType::EthernetAdapter => write!(f, "Ethernet Adapter"),
            ResourceType::CdDrive => write!(f, "CD-ROM"),
            ResourceType::DvdDrive => write!(f, "DVD"),
            ResourceType::DiskDrive => write!(f, "Disk"),
            ResourceType::UsbController => write!(f, "USB Controller"),
            ResourceType::Unknown(code) => write!(f, "Unknown ({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One `Item` of the virtual hardware section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HardwareItem {
    /// Raw `ovf:configuration` value; blank means every configuration.
    pub configuration_ids: String,
    pub allocation_units: Option<String>,
    pub description: Option<String>,
    pub element_name: Option<String>,
    pub instance_id: Option<String>,
    pub limit: Option<i64>,
    pub reservation: Option<i64>,
    pub resource_type: Option<ResourceType>,
    pub virtual_quantity: Option<i64>,
}

impl HardwareItem {
    fn from_node(item: Node<'_>) -> Self {
        Self {
            configuration_ids: item.attr("configuration").unwrap_or_default().to_string(),
            allocation_units: item.child_text("AllocationUnits"),
            description: item.child_text("Description"),
            element_name: item.child_text("ElementName"),
            instance_id: item.child_text("InstanceID"),
            limit: parse_number(item.child_text("Limit")),
            reservation: parse_number(item.child_text("Reservation")),
            resource_type: parse_number::<u32>(item.child_text("ResourceType"))
                .map(ResourceType::from_code),
            virtual_quantity: parse_number(item.child_text("VirtualQuantity")),
        }
    }

    /// Whether the item applies to every configuration.
    pub fn is_common(&self) -> bool {
        self.configuration_ids.trim().is_empty()
    }

    /// Whether the item's configuration list mentions `configuration_id`.
    ///
    /// This is a case-insensitive substring test, so an id that is a
    /// substring of another id matches both.
    pub fn applies_to(&self, configuration_id: &str) -> bool {
        !self.is_common()
            && self
                .configuration_ids
                .to_lowercase()
                .contains(&configuration_id.to_lowercase())
    }
}

/// A named deployment option and the items specific to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentConfiguration {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub hardware_items: Vec<HardwareItem>,
}

/// Deployment options plus the items shared by all of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualHardware {
    pub configurations: Vec<DeploymentConfiguration>,
    pub common_items: Vec<HardwareItem>,
}

/// Read the first `DeploymentOptionSection`; empty when there is none.
pub fn extract_deployment_options(doc: &Document) -> Vec<DeploymentConfiguration> {
    let Some(section) = doc.elements_by_name("DeploymentOptionSection").into_iter().next() else {
        return Vec::new();
    };

    section
        .children_named("Configuration")
        .into_iter()
        .map(|configuration| DeploymentConfiguration {
            id: configuration.attr("id").unwrap_or_default().to_string(),
            label: configuration.child_text("Label"),
            description: configuration.child_text("Description"),
            hardware_items: Vec::new(),
        })
        .collect()
}

/// Read the direct `Item` children of the first `VirtualHardwareSection`.
pub fn extract_hardware_items(doc: &Document) -> Vec<HardwareItem> {
    let Some(section) = doc.elements_by_name("VirtualHardwareSection").into_iter().next() else {
        return Vec::new();
    };

    section
        .children_named("Item")
        .into_iter()
        .map(HardwareItem::from_node)
        .collect()
}

/// Deployment options with their items assigned, and the common items.
pub fn extract_virtual_hardware(doc: &Document) -> VirtualHardware {
    let items = extract_hardware_items(doc);
    let mut configurations = extract_deployment_options(doc);

    for configuration in &mut configurations {
        configuration.hardware_items = items
            .iter()
            .filter(|item| item.applies_to(&configuration.id))
            .cloned()
            .collect();
    }

    let common_items = items.into_iter().filter(HardwareItem::is_common).collect();
    VirtualHardware {
        configurations,
        common_items,
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            debug!("could not parse the value: {}, ignoring it", value);
            None
        }
    }
}
