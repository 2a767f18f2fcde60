//! Canonical pretty-printed form of a configuration document.

use crate::dom::{Document, NodeId, NodeKind};

/// Canonicalizes an XML document.
///
/// Returns the canonical text and whether the input was well-formed. Empty,
/// whitespace-only and malformed input all yield `("", false)`.
pub fn normalize(xml: &str) -> (String, bool) {
    if xml.trim().is_empty() {
        return (String::new(), false);
    }

    match Document::parse(xml) {
        Ok(mut doc) => {
            let root = doc.root();
            collapse_empty_elements(&mut doc, root);
            (doc.to_pretty_string(), true)
        }
        Err(err) => {
            tracing::debug!(error = %err, "document did not normalize");
            (String::new(), false)
        }
    }
}

/// Returns true if the text is well-formed XML.
pub fn is_valid(xml: &str) -> bool {
    normalize(xml).1
}

/// Clears whitespace-only text from elements that have no element children,
/// so that they serialize as `<tag/>`.
fn collapse_empty_elements(doc: &mut Document, id: NodeId) {
    let has_elements = doc.child_elements(id).next().is_some();
    if !has_elements && doc.direct_text(id).trim().is_empty() {
        doc.retain_children(id, |kind| !matches!(kind, NodeKind::Text(_)));
    }

    let children: Vec<NodeId> = doc.child_elements(id).collect();
    for child in children {
        collapse_empty_elements(doc, child);
    }
}
