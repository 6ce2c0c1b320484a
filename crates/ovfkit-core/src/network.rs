//! Network prerequisites.
//!
//! Networks are declared by `Network` elements and referenced from hardware
//! items through `rasd:Connection`. Each connection contributes the NIC
//! details of the item it sits in to the network it names.

use std::collections::HashMap;

use tracing::{info, trace, warn};

use crate::error::{Error, Result};
use crate::xml::{Document, Node};

/// A network the appliance expects, with the NIC attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkPrerequisite {
    /// Network name, as declared or as referenced by a connection.
    pub name: String,
    /// Description of the declared network.
    pub network_description: Option<String>,
    /// Description of the NIC item.
    pub nic_description: Option<String>,
    /// Slot of the NIC on its parent.
    pub address_on_parent: Option<i32>,
    /// Whether the NIC is connected at power-on.
    pub automatic_allocation: bool,
    /// Instance id of the NIC item.
    pub instance_id: Option<i32>,
    /// NIC element name (e.g. "Network adapter 1").
    pub element_name: Option<String>,
    /// NIC model (e.g. "E1000", "VmxNet3").
    pub resource_sub_type: Option<String>,
    /// CIM resource type code of the NIC item, as written.
    pub resource_type: Option<String>,
}

impl NetworkPrerequisite {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Overwrite the NIC fields from the item holding a `Connection`.
    fn fill_nic(&mut self, item: Node<'_>) {
        if let Some(address) = parse_int(item, "AddressOnParent") {
            self.address_on_parent = Some(address);
        }
        self.automatic_allocation = item
            .child_text("AutomaticAllocation")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        self.nic_description = item.child_text("Description");
        self.element_name = item.child_text("ElementName");
        if let Some(instance_id) = parse_int(item, "InstanceID") {
            self.instance_id = Some(instance_id);
        }
        self.resource_sub_type = item.child_text("ResourceSubType");
        self.resource_type = item.child_text("ResourceType");
    }
}

/// Collect the networks an appliance needs, in first-seen order.
///
/// # Errors
///
/// Returns [`Error::Ovf`] unless the document has exactly one `VirtualSystem`.
pub fn extract_network_prerequisites(doc: &Document) -> Result<Vec<NetworkPrerequisite>> {
    let mut networks = Networks::default();
    for element in doc.elements_by_name("Network") {
        let name = element.attr("name").unwrap_or_default();
        let mut network = NetworkPrerequisite::named(name);
        network.network_description = element.child_text("Description");
        networks.insert(network);
    }
    trace!("found {} networks in template", networks.len());

    check_single_virtual_system(doc)?;

    let mut nic_count = 0;
    for connection in doc.root().descendants().filter(|n| n.has_local_name("Connection")) {
        nic_count += 1;
        let name = connection.text().trim().to_string();
        if !networks.contains(&name) {
            info!("found a nic definition without a network definition by name {}, adding it to the list", name);
            networks.insert(NetworkPrerequisite::named(name.clone()));
        }
        if let (Some(network), Some(item)) = (networks.get_mut(&name), connection.parent()) {
            network.fill_nic(item);
        }
    }
    trace!(
        "ending up with {} network prerequisites, parsed {} nics",
        networks.len(),
        nic_count
    );

    Ok(networks.into_vec())
}

fn check_single_virtual_system(doc: &Document) -> Result<()> {
    let count = doc.elements_by_name("VirtualSystem").len();
    if count != 1 {
        let msg = format!(
            "found {} system definitions in OVA, can only handle exactly one",
            count
        );
        warn!("{}", msg);
        return Err(Error::ovf(msg));
    }
    Ok(())
}

fn parse_int(item: Node<'_>, field: &str) -> Option<i32> {
    let raw = item.child_text(field)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(
                "encountered element of type \"{}\" that could not be parsed to an integer number: {}",
                field, raw
            );
            None
        }
    }
}

/// Name-keyed records that remember insertion order.
#[derive(Default)]
struct Networks {
    records: Vec<NetworkPrerequisite>,
    index: HashMap<String, usize>,
}

impl Networks {
    fn insert(&mut self, network: NetworkPrerequisite) {
        match self.index.get(&network.name) {
            Some(&i) => self.records[i] = network,
            None => {
                self.index.insert(network.name.clone(), self.records.len());
                self.records.push(network);
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut NetworkPrerequisite> {
        let i = *self.index.get(name)?;
        self.records.get_mut(i)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn into_vec(self) -> Vec<NetworkPrerequisite> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPLIANCE: &str = r#"<Envelope>
        <NetworkSection>
            <Info>The list of logical networks</Info>
            <Network ovf:name="Management0-0">
                <Description>Management network interface</Description>
            </Network>
            <Network ovf:name="GigabitEthernet0-0">
                <Description>Data network</Description>
            </Network>
        </NetworkSection>
        <VirtualSystem ovf:id="asav">
            <VirtualHardwareSection>
                <Item>
                    <rasd:AddressOnParent>7</rasd:AddressOnParent>
                    <rasd:AutomaticAllocation>true</rasd:AutomaticAllocation>
                    <rasd:Connection>Management0-0</rasd:Connection>
                    <rasd:Description>E1000 Ethernet adapter on "Management Network"</rasd:Description>
                    <rasd:ElementName>Network adapter 1</rasd:ElementName>
                    <rasd:InstanceID>6</rasd:InstanceID>
                    <rasd:ResourceSubType>E1000</rasd:ResourceSubType>
                    <rasd:ResourceType>10</rasd:ResourceType>
                </Item>
                <Item>
                    <rasd:AddressOnParent>eight</rasd:AddressOnParent>
                    <rasd:Connection>Undeclared</rasd:Connection>
                    <rasd:ElementName>Network adapter 2</rasd:ElementName>
                    <rasd:InstanceID>9</rasd:InstanceID>
                    <rasd:ResourceType>10</rasd:ResourceType>
                </Item>
            </VirtualHardwareSection>
        </VirtualSystem>
    </Envelope>"#;

    #[test]
    fn test_declared_and_connected_networks() {
        let doc = Document::parse_str(APPLIANCE).unwrap();
        let nets = extract_network_prerequisites(&doc).unwrap();
        assert_eq!(nets.len(), 3);

        let mgmt = &nets[0];
        assert_eq!(mgmt.name, "Management0-0");
        assert_eq!(mgmt.network_description.as_deref(), Some("Management network interface"));
        assert_eq!(mgmt.address_on_parent, Some(7));
        assert!(mgmt.automatic_allocation);
        assert_eq!(mgmt.instance_id, Some(6));
        assert_eq!(mgmt.element_name.as_deref(), Some("Network adapter 1"));
        assert_eq!(mgmt.resource_sub_type.as_deref(), Some("E1000"));
        assert_eq!(mgmt.resource_type.as_deref(), Some("10"));

        // declared but never connected
        let data = &nets[1];
        assert_eq!(data.name, "GigabitEthernet0-0");
        assert_eq!(data.element_name, None);
        assert!(!data.automatic_allocation);
    }

    #[test]
    fn test_undeclared_connection_creates_record() {
        let doc = Document::parse_str(APPLIANCE).unwrap();
        let nets = extract_network_prerequisites(&doc).unwrap();
        let undeclared = &nets[2];
        assert_eq!(undeclared.name, "Undeclared");
        assert_eq!(undeclared.network_description, None);
        // unparsable AddressOnParent is skipped, not fatal
        assert_eq!(undeclared.address_on_parent, None);
        assert_eq!(undeclared.instance_id, Some(9));
        assert!(!undeclared.automatic_allocation);
    }

    #[test]
    fn test_last_connection_wins() {
        let doc = Document::parse_str(
            r#"<VirtualSystem>
                <Item><rasd:Connection>VM Network</rasd:Connection><rasd:ElementName>first</rasd:ElementName><rasd:InstanceID>1</rasd:InstanceID></Item>
                <Item><rasd:Connection>VM Network</rasd:Connection><rasd:ElementName>second</rasd:ElementName></Item>
            </VirtualSystem>"#,
        )
        .unwrap();
        let nets = extract_network_prerequisites(&doc).unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].element_name.as_deref(), Some("second"));
        // absent InstanceID leaves the previous value
        assert_eq!(nets[0].instance_id, Some(1));
    }

    #[test]
    fn test_requires_exactly_one_virtual_system() {
        let none = Document::parse_str("<Envelope><Network ovf:name=\"a\"/></Envelope>").unwrap();
        let err = extract_network_prerequisites(&none).unwrap_err();
        assert!(err.to_string().contains("found 0 system definitions"));

        let two = Document::parse_str(
            "<Envelope><VirtualSystem/><VirtualSystemCollection><VirtualSystem/></VirtualSystemCollection></Envelope>",
        )
        .unwrap();
        let err = extract_network_prerequisites(&two).unwrap_err();
        assert!(err.to_string().contains("found 2 system definitions"));
    }
}
