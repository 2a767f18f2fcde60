//! Scope deduction from a rendered Panorama configuration.

use crate::dom::{Document, NodeId};
use crate::error::{XmlError, XmlResult};
use crate::normalize::normalize;

/// Name of the single device entry Panorama keeps its templates under.
pub const PANORAMA_DEVICE: &str = "localhost.localdomain";

/// Item types, in the order their selectors are deduced.
pub const SCOPED_ITEM_TYPES: [&str; 2] = ["template", "device-group"];

/// Lists the `name` attributes of `/config/devices/entry/<item_type>/entry`
/// in document order, without duplicates. Unnamed entries are skipped.
pub fn list_item_names(xml: &str, item_type: &str) -> XmlResult<Vec<String>> {
    let doc = Document::parse(xml).map_err(|err| XmlError::Config(err.to_string()))?;

    let mut names: Vec<String> = Vec::new();
    if doc.root_element().name != "config" {
        return Ok(names);
    }

    for devices in children_named(&doc, doc.root(), "devices") {
        for device in children_named(&doc, devices, "entry") {
            for group in children_named(&doc, device, item_type) {
                for entry in children_named(&doc, group, "entry") {
                    let Some(name) = doc.element(entry).and_then(|e| e.attribute("name")) else {
                        continue;
                    };
                    if !names.iter().any(|known| known == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
    }

    Ok(names)
}

/// Derives the selectors covering every template and device group defined
/// in a rendered configuration. Invalid or empty input yields no selectors.
pub fn deduce_xpath_entries(rendered: &str) -> Vec<String> {
    let (normalized, valid) = normalize(rendered);
    if !valid {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for item_type in SCOPED_ITEM_TYPES {
        let names = match list_item_names(&normalized, item_type) {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, item_type, "could not list scoped items");
                continue;
            }
        };
        for name in names {
            entries.push(format!(
                "/config/devices/entry[@name='{}']/{}/entry[@name='{}']",
                PANORAMA_DEVICE, item_type, name
            ));
        }
    }
    entries
}

fn children_named<'d>(
    doc: &'d Document,
    parent: NodeId,
    name: &'d str,
) -> impl Iterator<Item = NodeId> + 'd {
    doc.child_elements(parent)
        .filter(move |&child| doc.element(child).is_some_and(|e| e.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = r#"<config>
  <devices>
    <entry name="localhost.localdomain">
      <template>
        <entry name="Netbox"/>
        <entry/>
        <entry name="Netbox2"/>
        <entry name="Netbox"/>
      </template>
      <device-group>
        <entry name="Branches"/>
      </device-group>
    </entry>
  </devices>
</config>"#;

    #[test]
    fn lists_names_in_document_order() {
        assert_eq!(
            list_item_names(RENDERED, "template").unwrap(),
            vec!["Netbox", "Netbox2"]
        );
        assert_eq!(
            list_item_names(RENDERED, "device-group").unwrap(),
            vec!["Branches"]
        );
        assert!(list_item_names(RENDERED, "log-collector-group")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn listing_invalid_xml_fails() {
        let err = list_item_names("<config>", "template").unwrap_err();
        assert!(err.to_string().starts_with("Error parsing XML config"));
        assert!(list_item_names("", "template").is_err());
    }

    #[test]
    fn deduces_templates_then_device_groups() {
        assert_eq!(
            deduce_xpath_entries(RENDERED),
            vec![
                "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox']",
                "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox2']",
                "/config/devices/entry[@name='localhost.localdomain']/device-group/entry[@name='Branches']",
            ]
        );
    }

    #[test]
    fn nothing_to_deduce_from_invalid_render() {
        assert!(deduce_xpath_entries("").is_empty());
        assert!(deduce_xpath_entries("<config>").is_empty());
    }
}
