//! Dictionary-shaped view of an XML element.
//!
//! Panorama responses are read through the same shaping rules the API's
//! own tooling uses: a leaf without attributes collapses to its trimmed
//! text (or null when empty), attributes become `@name` keys, text next to
//! attributes or children is stored under `#text`, and repeated child tags
//! become a list.

use configpump_xml::{Document, NodeId};

/// Key under which text is stored when an element also has structure.
pub const TEXT_KEY: &str = "#text";

/// A shaped XML value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// An empty leaf element.
    Null,
    /// A leaf element's trimmed text, or an attribute value.
    Text(String),
    /// Repeated sibling elements sharing one tag.
    List(Vec<XmlValue>),
    /// Attributes and children, in document order.
    Map(Vec<(String, XmlValue)>),
}

impl XmlValue {
    /// Shapes an element and its subtree.
    pub fn from_element(doc: &Document, id: NodeId) -> Self {
        let Some(element) = doc.element(id) else {
            return XmlValue::Null;
        };

        let mut entries: Vec<(String, XmlValue)> = element
            .attributes
            .iter()
            .map(|(key, value)| (format!("@{}", key), XmlValue::Text(value.clone())))
            .collect();

        for child in doc.child_elements(id) {
            let Some(child_element) = doc.element(child) else {
                continue;
            };
            let value = XmlValue::from_element(doc, child);
            match entries.iter_mut().find(|(key, _)| *key == child_element.name) {
                Some((_, XmlValue::List(items))) => items.push(value),
                Some((_, existing)) => {
                    let first = std::mem::replace(existing, XmlValue::Null);
                    *existing = XmlValue::List(vec![first, value]);
                }
                None => entries.push((child_element.name.clone(), value)),
            }
        }

        let text = doc.direct_text(id);
        let text = text.trim();
        if entries.is_empty() {
            return if text.is_empty() {
                XmlValue::Null
            } else {
                XmlValue::Text(text.to_string())
            };
        }
        if !text.is_empty() {
            entries.push((TEXT_KEY.to_string(), XmlValue::Text(text.to_string())));
        }
        XmlValue::Map(entries)
    }

    /// Looks up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Map(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the text when this value is a text leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true for maps.
    pub fn is_map(&self) -> bool {
        matches!(self, XmlValue::Map(_))
    }

    /// Truthiness as the API tooling sees it: null, empty text, empty
    /// lists and empty maps are all false.
    pub fn is_truthy(&self) -> bool {
        match self {
            XmlValue::Null => false,
            XmlValue::Text(text) => !text.is_empty(),
            XmlValue::List(items) => !items.is_empty(),
            XmlValue::Map(entries) => !entries.is_empty(),
        }
    }

    /// Collects every text leaf in discovery order. Attribute values are
    /// metadata and are skipped.
    pub fn text_leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            XmlValue::Null => {}
            XmlValue::Text(text) => {
                if !text.is_empty() {
                    out.push(text);
                }
            }
            XmlValue::List(items) => {
                for item in items {
                    item.collect_text(out);
                }
            }
            XmlValue::Map(entries) => {
                for (key, value) in entries {
                    if !key.starts_with('@') {
                        value.collect_text(out);
                    }
                }
            }
        }
    }

    /// Space-joins every text leaf.
    pub fn flatten(&self) -> String {
        self.text_leaves().join(" ")
    }
}
