//! `ProductSection` properties.

use tracing::trace;

use crate::xml::{Document, Node};

/// One `<Property>` of a product section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OvfProperty {
    pub key: String,
    /// `ovf:type`, e.g. "string" or "boolean".
    pub property_type: Option<String>,
    /// Default value.
    pub value: Option<String>,
    /// `ovf:qualifiers`, e.g. "MinLen(0) MaxLen(65535)".
    pub qualifiers: Option<String>,
    pub user_configurable: bool,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Whether the value should be masked when shown.
    pub password: bool,
}

impl OvfProperty {
    fn from_node(property: Node<'_>) -> Option<Self> {
        let key = property.attr("key").filter(|k| !k.trim().is_empty())?;
        let owned = |name: &str| property.attr(name).map(str::to_string);
        let flag = |name: &str| {
            property
                .attr(name)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        };

        Some(Self {
            key: key.to_string(),
            property_type: owned("type"),
            value: owned("value"),
            qualifiers: owned("qualifiers"),
            user_configurable: flag("userConfigurable"),
            label: property.child_text("Label"),
            description: property.child_text("Description"),
            password: flag("password"),
        })
    }
}

/// Every `Property` with a non-blank key, in document order.
pub fn extract_properties(doc: &Document) -> Vec<OvfProperty> {
    let properties: Vec<OvfProperty> = doc
        .elements_by_name("Property")
        .into_iter()
        .filter_map(OvfProperty::from_node)
        .collect();
    trace!("found {} properties", properties.len());
    properties
}

/// The properties a user may set at deploy time.
pub fn extract_configurable_properties(doc: &Document) -> Vec<OvfProperty> {
    extract_properties(doc)
        .into_iter()
        .filter(|p| p.user_configurable)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"<ProductSection ovf:required="false">
        <Info>VM Arguments</Info>
        <Property ovf:key="va-ssh-public-key" ovf:type="string" ovf:userConfigurable="true" ovf:value="">
            <Label>Set the SSH public key allowed to access the appliance</Label>
            <Description>This will enable the SSHD service and configure the specified public key</Description>
        </Property>
        <Property ovf:key="user-data" ovf:type="string" ovf:userConfigurable="TRUE" ovf:value="">
            <Label>User data to be made available inside the instance</Label>
        </Property>
        <Property ovf:key="admin-password" ovf:type="string" ovf:password="true" ovf:qualifiers="MinLen(8)"/>
        <Property ovf:key="  " ovf:userConfigurable="true"/>
        <Property ovf:userConfigurable="true"/>
    </ProductSection>"#;

    #[test]
    fn test_configurable_subset() {
        let doc = Document::parse_str(PRODUCT).unwrap();
        let props = extract_configurable_properties(&doc);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].key, "va-ssh-public-key");
        assert_eq!(props[0].property_type.as_deref(), Some("string"));
        assert_eq!(props[0].value.as_deref(), Some(""));
        assert_eq!(
            props[0].label.as_deref(),
            Some("Set the SSH public key allowed to access the appliance")
        );
        assert!(props[0].description.is_some());
        assert_eq!(props[1].key, "user-data");
        assert_eq!(props[1].description, None);
    }

    #[test]
    fn test_unfiltered_drops_blank_keys() {
        let doc = Document::parse_str(PRODUCT).unwrap();
        let props = extract_properties(&doc);
        assert_eq!(props.len(), 3);

        let admin = &props[2];
        assert!(admin.password);
        assert!(!admin.user_configurable);
        assert_eq!(admin.qualifiers.as_deref(), Some("MinLen(8)"));
        assert_eq!(admin.value, None);
    }
}
