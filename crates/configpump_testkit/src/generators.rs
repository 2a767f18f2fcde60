//! Property-based test generators.
//!
//! Provides proptest strategies for generating configuration documents,
//! scope selectors and text noise.

use proptest::prelude::*;

/// Strategy for generating element names.
pub fn element_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Invalid regex")
}

/// Strategy for generating `name` attribute values of list entries.
pub fn entry_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9_-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating text content without markup characters.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ._/-]{1,24}").expect("Invalid regex")
}

/// Strategy for generating a leaf element, with or without text.
pub fn leaf_strategy() -> impl Strategy<Value = String> {
    (element_name_strategy(), prop::option::of(text_strategy())).prop_map(|(name, text)| {
        match text {
            Some(text) => format!("<{n}>{t}</{n}>", n = name, t = text.trim()),
            None => format!("<{}/>", name),
        }
    })
}

/// Strategy for generating an element subtree up to `depth` levels deep.
pub fn element_strategy(depth: u32) -> BoxedStrategy<String> {
    let leaf = leaf_strategy().boxed();
    leaf.prop_recursive(depth, 32, 4, |inner| {
        (
            element_name_strategy(),
            prop::option::of(entry_name_strategy()),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(name, entry, children)| {
                let attrs = entry
                    .map(|value| format!(" name=\"{}\"", value))
                    .unwrap_or_default();
                format!("<{n}{a}>{c}</{n}>", n = name, a = attrs, c = children.concat())
            })
    })
    .boxed()
}

/// Strategy for generating a `<config>` document.
pub fn config_document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(element_strategy(3), 0..5)
        .prop_map(|children| format!("<config>{}</config>", children.concat()))
}

/// A generated Panorama configuration together with its managed items.
#[derive(Debug, Clone)]
pub struct PanoramaConfig {
    /// Serialized document.
    pub xml: String,
    /// Template names in document order.
    pub templates: Vec<String>,
    /// Device group names in document order.
    pub device_groups: Vec<String>,
}

/// Strategy for generating Panorama-shaped configurations with unique
/// template and device group names.
pub fn panorama_config_strategy() -> impl Strategy<Value = PanoramaConfig> {
    (
        prop::collection::btree_set(entry_name_strategy(), 0..4),
        prop::collection::btree_set(entry_name_strategy(), 0..4),
        prop::collection::vec(leaf_strategy(), 0..3),
    )
        .prop_map(|(templates, device_groups, shared)| {
            let templates: Vec<String> = templates.into_iter().collect();
            let device_groups: Vec<String> = device_groups.into_iter().collect();
            let entries = |names: &[String]| -> String {
                names
                    .iter()
                    .map(|name| format!("<entry name=\"{}\"><description>x</description></entry>", name))
                    .collect()
            };
            let xml = format!(
                "<config><shared>{}</shared><devices><entry name=\"localhost.localdomain\"><template>{}</template><device-group>{}</device-group></entry></devices></config>",
                shared.concat(),
                entries(&templates),
                entries(&device_groups)
            );
            PanoramaConfig {
                xml,
                templates,
                device_groups,
            }
        })
}

/// Strategy for generating absolute child-axis selectors under `/config`.
pub fn selector_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(element_name_strategy(), 1..4),
        prop::option::of(entry_name_strategy()),
    )
        .prop_map(|(steps, predicate)| {
            let mut selector = format!("/config/{}", steps.join("/"));
            if let Some(name) = predicate {
                selector.push_str(&format!("/entry[@name='{}']", name));
            }
            selector
        })
}

/// Strategy for generating trailing slashes to append to a selector.
pub fn trailing_slashes_strategy() -> impl Strategy<Value = String> {
    (0usize..4).prop_map(|count| "/".repeat(count))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
